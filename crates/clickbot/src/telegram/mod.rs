//! Telegram bot integration and handlers

pub mod bot;
pub mod handlers;

// Re-exports for convenience
pub use bot::{create_bot, setup_bot_commands, webapp_keyboard, Command};
pub use handlers::{answer_command, handle_update, schema, HandlerDeps, HandlerError};
