use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clicker")]
#[command(author, version, about = "Telegram Mini App clicker: bot, web backend and tools", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot, the web server and the auto-clicker
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Run only the web server and the auto-clicker, without the bot
    Serve,

    /// Print signed init data for local testing against BOT_TOKEN
    SignInitData {
        /// Telegram user id to embed
        #[arg(long)]
        user_id: i64,

        /// First name of the embedded user
        #[arg(long, default_value = "Tester")]
        first_name: String,

        /// Unix time of signing (defaults to now)
        #[arg(long)]
        auth_date: Option<i64>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
