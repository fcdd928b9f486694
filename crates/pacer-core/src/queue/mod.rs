//! Queue module: the serial processor, its phase machine, task records,
//! tickets and the drain signal.

mod builder;
mod idle;
mod processor;
mod record;
mod state;
mod ticket;

pub use builder::QueueBuilder;
pub use idle::IdleSignal;
pub use processor::SerialQueue;
pub use state::Phase;
pub use ticket::Ticket;
