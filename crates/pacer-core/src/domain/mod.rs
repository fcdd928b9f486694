//! Domain model: ticket ids and the action abstraction.

pub mod action;
pub mod ids;

pub use action::Action;
pub use ids::TicketId;
