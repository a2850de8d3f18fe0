use anyhow::Result;
use dotenvy::dotenv;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;
use tokio::signal;
use url::Url;

use clicker::cli::{Cli, Commands};
use clicker::tasks::spawn_auto_clicker;
use clicker::telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};
use clicker::web::{run_web_server, spawn_web_server, AppState, WebhookState};
use clickcore::auth::{sign_init_data, SharedSecret};
use clickcore::core::{config, init_logger, log_startup_configuration};
use clickcore::{open_store, ClickService, InitDataVerifier, LevelRule, StorageBackend};

/// Main entry point
///
/// Parses CLI arguments and dispatches to the selected subcommand.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    match cli.command {
        Some(Commands::Run { webhook }) => {
            init_logger(&config::LOG_FILE_PATH)?;
            log::info!("Running bot (webhook: {})", webhook);
            run_bot(webhook).await
        }
        Some(Commands::Serve) => {
            init_logger(&config::LOG_FILE_PATH)?;
            log::info!("Running web server only");
            run_server().await
        }
        Some(Commands::SignInitData {
            user_id,
            first_name,
            auth_date,
        }) => print_signed_init_data(user_id, &first_name, auth_date),
        None => {
            init_logger(&config::LOG_FILE_PATH)?;
            log::info!("No command specified, running bot in long polling mode");
            run_bot(false).await
        }
    }
}

fn bot_token() -> Result<&'static str> {
    if config::BOT_TOKEN.is_empty() {
        return Err(anyhow::anyhow!("BOT_TOKEN environment variable not set"));
    }
    Ok(config::BOT_TOKEN.as_str())
}

/// Opens the configured store and builds the click service
async fn build_service() -> Result<ClickService> {
    let backend = StorageBackend::from_env();
    log_startup_configuration(&backend);

    let store = open_store(&backend).await?;
    let rule = LevelRule::new(*config::game::LEVEL_THRESHOLD)?;
    Ok(ClickService::new(store, rule))
}

fn app_state(service: ClickService, bot_token: &str) -> AppState {
    let verifier = InitDataVerifier::new(bot_token).with_max_age(config::auth::max_age());
    AppState::new(service, verifier)
        .with_legacy(*config::web::ALLOW_LEGACY_USER_ID)
        .with_leaderboard_size(*config::game::LEADERBOARD_SIZE)
}

fn start_auto_clicker(service: &ClickService) {
    match config::game::auto_click_interval() {
        Some(period) => {
            spawn_auto_clicker(service.clone(), period);
        }
        None => log::info!("Auto-clicker disabled (AUTO_CLICK_INTERVAL_SECS=0)"),
    }
}

/// Web server and auto-clicker, no bot
async fn run_server() -> Result<()> {
    let service = build_service().await?;
    let state = app_state(service.clone(), bot_token()?);
    start_auto_clicker(&service);

    tokio::select! {
        result = run_web_server(*config::PORT, state) => result,
        _ = signal::ctrl_c() => {
            log::info!("Shutting down gracefully...");
            Ok(())
        }
    }
}

/// Bot, web server and auto-clicker
async fn run_bot(use_webhook: bool) -> Result<()> {
    let bot_token = bot_token()?;
    let service = build_service().await?;
    let bot = create_bot(bot_token)?;

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let me = bot.get_me().await?;
    log::info!("Bot username: @{}", me.username());

    let webapp_url = match config::WEBAPP_URL.as_deref() {
        Some(raw) => Some(Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid WEBAPP_URL: {}", e))?),
        None => {
            log::warn!("WEBAPP_URL is not set, /start cannot open the clicker");
            None
        }
    };
    let deps = HandlerDeps::new(
        service.clone(),
        webapp_url,
        Some(me.username().to_string()),
        *config::game::LEADERBOARD_SIZE,
    );

    let mut state = app_state(service.clone(), bot_token);

    if use_webhook {
        let secret = config::WEBHOOK_SECRET
            .clone()
            .ok_or_else(|| anyhow::anyhow!("WEBHOOK_SECRET is required in webhook mode"))?;
        let base = config::WEBHOOK_URL
            .clone()
            .ok_or_else(|| anyhow::anyhow!("WEBHOOK_URL or WEBAPP_URL is required in webhook mode"))?;
        let url = Url::parse(&format!("{}/webhook/{}", base, secret))?;

        // Delete existing webhook to ensure clean state
        bot.delete_webhook().drop_pending_updates(true).await?;
        bot.set_webhook(url).secret_token(secret.clone()).await?;
        log::info!("Webhook registered at {}/webhook/<secret>", base);

        state = state.with_webhook(WebhookState::new(bot.clone(), deps.clone(), SharedSecret::new(secret)));
    }

    let mut server = spawn_web_server(*config::PORT, state);
    start_auto_clicker(&service);

    if use_webhook {
        tokio::select! {
            result = &mut server => {
                result??;
            }
            _ = signal::ctrl_c() => {
                log::info!("Shutting down gracefully...");
                bot.delete_webhook().await?;
            }
        }
    } else {
        log::info!("Starting bot in long polling mode");
        bot.delete_webhook().drop_pending_updates(true).await?;

        let listener = Polling::builder(bot.clone()).drop_pending_updates().build();
        let mut dispatcher = Dispatcher::builder(bot, schema(deps)).enable_ctrlc_handler().build();
        let dispatch = dispatcher.dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("An error from the update listener"),
        );

        // the bot must not keep polling while the Mini App is down
        tokio::select! {
            result = &mut server => {
                result??;
                return Err(anyhow::anyhow!("Web server stopped unexpectedly"));
            }
            _ = dispatch => {
                log::info!("Dispatcher shutdown gracefully");
                server.abort();
            }
        }
    }

    Ok(())
}

/// Prints init data signed with BOT_TOKEN, for testing the API with curl
fn print_signed_init_data(user_id: i64, first_name: &str, auth_date: Option<i64>) -> Result<()> {
    let auth_date = auth_date.unwrap_or_else(|| chrono::Utc::now().timestamp()).to_string();
    let user = serde_json::json!({ "id": user_id, "first_name": first_name }).to_string();

    let signed = sign_init_data(&[("auth_date", &auth_date), ("user", &user)], bot_token()?)?;
    println!("{}", signed);
    Ok(())
}
