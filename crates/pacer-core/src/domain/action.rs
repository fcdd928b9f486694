//! Action trait: the unit of work a caller hands to the queue.
//!
//! Closures returning a future of `Result<T, E>` are actions out of the box.
//! Implement the trait directly when the work is easier to express as a
//! struct carrying its own inputs.

use std::future::Future;

use async_trait::async_trait;

/// A zero-argument asynchronous operation.
///
/// # Example
/// ```ignore
/// struct Ping { host: String }
///
/// #[async_trait]
/// impl Action for Ping {
///     type Output = Duration;
///     type Error = io::Error;
///
///     async fn run(self) -> Result<Duration, io::Error> {
///         ping(&self.host).await
///     }
/// }
/// ```
#[async_trait]
pub trait Action: Sized + Send + 'static {
    type Output: Send + 'static;
    type Error: Send + 'static;

    async fn run(self) -> Result<Self::Output, Self::Error>;
}

#[async_trait]
impl<F, Fut, T, E> Action for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Send + 'static,
{
    type Output = T;
    type Error = E;

    async fn run(self) -> Result<T, E> {
        (self)().await
    }
}
