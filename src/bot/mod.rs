pub mod auto_update;
pub mod commands;
pub mod handler;
pub mod polling;
pub mod subscriptions;

pub use handler::handle_update;
