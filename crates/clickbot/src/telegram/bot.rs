//! Bot initialization
//!
//! This module contains:
//! - Command enum definition
//! - Bot instance creation
//! - The Web App keyboard that opens the clicker

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::types::{ButtonRequest, KeyboardButton, KeyboardMarkup, WebAppInfo};
use teloxide::utils::command::BotCommands;
use url::Url;

use clickcore::core::config;

/// Label of the button that opens the Mini App.
pub const OPEN_CLICKER_LABEL: &str = "Open clicker";

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "open the clicker")]
    Start,
    #[command(description = "your clicks, level and rank")]
    Stats,
    #[command(description = "leaderboard")]
    Top,
    #[command(description = "show this help")]
    Help,
}

/// Creates a Bot instance with a request timeout
///
/// # Returns
/// * `Ok(Bot)` - Successfully created bot instance
/// * `Err(anyhow::Error)` - The HTTP client could not be built
pub fn create_bot(bot_token: &str) -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::with_client(bot_token, client))
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}

/// Reply keyboard with a single Web App button pointing at `webapp_url`.
pub fn webapp_keyboard(webapp_url: &Url) -> KeyboardMarkup {
    let button = KeyboardButton::new(OPEN_CLICKER_LABEL).request(ButtonRequest::WebApp(WebAppInfo {
        url: webapp_url.clone(),
    }));
    KeyboardMarkup::new(vec![vec![button]]).resize_keyboard()
}
