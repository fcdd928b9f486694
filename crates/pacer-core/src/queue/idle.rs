//! Re-armable drain signal.
//!
//! The queue numbers its runs (a run starts when a submission finds the
//! queue idle and ends when the queue is idle again) and publishes the
//! number of the last finished run on a `watch` channel. A signal taken
//! during run `n` resolves once that value reaches `n`; a signal taken while
//! idle is already resolved. Any number of observers can hold signals for
//! the same run.
//!
//! 待ち手は run 番号で待つ。カウンタは単調増加で、巻き戻らない。

use std::future::{Future, IntoFuture};
use std::pin::Pin;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct IdleSignal {
    target: Option<u64>,
    rx: watch::Receiver<u64>,
}

impl IdleSignal {
    pub(crate) fn new(target: Option<u64>, rx: watch::Receiver<u64>) -> Self {
        Self { target, rx }
    }

    /// Has the run this signal was taken in finished?
    pub fn is_resolved(&self) -> bool {
        match self.target {
            None => true,
            Some(target) => *self.rx.borrow() >= target,
        }
    }

    pub async fn wait(mut self) {
        if let Some(target) = self.target {
            // Err means the queue is gone, which is as idle as it gets.
            let _ = self.rx.wait_for(|finished| *finished >= target).await;
        }
    }
}

impl IntoFuture for IdleSignal {
    type Output = ();
    type IntoFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.wait())
    }
}
