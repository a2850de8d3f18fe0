//! Dispatcher schema and command answers
//!
//! Long polling goes through [`schema`]; webhook updates arrive over HTTP and
//! go through [`handle_update`]. Both end in [`answer_command`].

use clickcore::{ClickService, LeaderboardEntry, UserState, Viewer};
use indoc::formatdoc;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{Message, UpdateKind};
use teloxide::utils::command::BotCommands;
use url::Url;

use super::bot::{webapp_keyboard, Command};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub service: ClickService,
    pub webapp_url: Option<Url>,
    pub bot_username: Option<String>,
    pub leaderboard_size: usize,
}

impl HandlerDeps {
    pub fn new(
        service: ClickService,
        webapp_url: Option<Url>,
        bot_username: Option<String>,
        leaderboard_size: usize,
    ) -> Self {
        Self {
            service,
            webapp_url,
            bot_username,
            leaderboard_size,
        }
    }
}

/// Creates the dispatcher schema for long polling.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().branch(dptree::entry().filter_command::<Command>().endpoint(
        move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move { answer_command(&bot, &msg, cmd, &deps).await }
        },
    ))
}

/// Routes one webhook update. Anything but a command message is ignored.
pub async fn handle_update(bot: &Bot, update: Update, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let UpdateKind::Message(msg) = update.kind else {
        return Ok(());
    };
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let username = deps.bot_username.as_deref().unwrap_or_default();
    match Command::parse(text, username) {
        Ok(cmd) => answer_command(bot, &msg, cmd, deps).await,
        Err(_) => Ok(()),
    }
}

/// Answers one bot command.
pub async fn answer_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> Result<(), HandlerError> {
    log::info!("Received command {:?} from chat {}", cmd, msg.chat.id);
    let sender = msg.from.as_ref();
    let user_id = sender.and_then(|u| i64::try_from(u.id.0).ok());

    match cmd {
        Command::Start => match &deps.webapp_url {
            Some(url) => {
                bot.send_message(msg.chat.id, "Tap the button below to open the clicker.")
                    .reply_markup(webapp_keyboard(url))
                    .await?;
            }
            None => {
                bot.send_message(msg.chat.id, "The clicker web app is not configured yet.")
                    .await?;
            }
        },
        Command::Stats => {
            let Some(user_id) = user_id else {
                log::debug!("Ignoring /stats in chat {}: message has no sender", msg.chat.id);
                return Ok(());
            };
            let state = deps.service.user_state(user_id).await?;
            bot.send_message(msg.chat.id, format_stats(&state)).await?;
        }
        Command::Top => {
            let viewer = user_id.map(|user_id| Viewer {
                user_id,
                name: sender.map(|u| u.full_name()),
            });
            let board = deps.service.leaderboard(deps.leaderboard_size, viewer.as_ref()).await?;
            bot.send_message(msg.chat.id, format_leaderboard(&board)).await?;
        }
        Command::Help => {
            bot.send_message(msg.chat.id, Command::descriptions().to_string())
                .await?;
        }
    }

    Ok(())
}

pub fn format_stats(state: &UserState) -> String {
    let rank = state
        .rank
        .map(|rank| format!("#{}", rank))
        .unwrap_or_else(|| "not ranked yet".to_string());
    formatdoc! {"
        Clicks: {clicks}
        Level: {level}
        Auto-clickers: {auto_clickers}
        Total clicks: {total_clicks}
        Rank: {rank}",
        clicks = state.clicks,
        level = state.level,
        auto_clickers = state.auto_clickers,
        total_clicks = state.total_clicks,
        rank = rank,
    }
}

pub fn format_leaderboard(board: &[LeaderboardEntry]) -> String {
    if board.is_empty() {
        return "Nobody has clicked yet.".to_string();
    }

    let mut lines = vec!["Top players:".to_string()];
    for entry in board {
        let who = match &entry.name {
            Some(name) => format!("{} (you)", name),
            None => format!("player {}", entry.rank),
        };
        lines.push(format!(
            "{}. {}: {} clicks, level {}",
            entry.rank, who, entry.clicks, entry.level
        ));
    }
    lines.join("\n")
}
