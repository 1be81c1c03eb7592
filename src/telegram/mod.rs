// =============================================================================
// Telegram transport
// =============================================================================

pub mod client;
pub mod types;

pub use client::{ChatSender, TelegramClient};
pub use types::{OutgoingMessage, Update};
