//! clicker - Telegram bot and web backend of the tap clicker Mini App
//!
//! The game itself (init data verification, scoring, storage) lives in
//! `clickcore`; this crate wires it to Telegram and HTTP.
//!
//! # Module Structure
//!
//! - `cli`: command line interface
//! - `telegram`: bot commands, long polling schema and webhook update routing
//! - `web`: axum router with the Mini App page, JSON API and webhook endpoint
//! - `tasks`: background auto-clicker

pub mod cli;
pub mod tasks;
pub mod telegram;
pub mod web;

// Re-export commonly used types for convenience
pub use telegram::{create_bot, schema, Command, HandlerDeps};
pub use web::{create_router, run_web_server, AppState, WebhookState};
