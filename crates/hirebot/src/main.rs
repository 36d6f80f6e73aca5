use clap::{Parser, Subcommand};
use hirebot_engine::config::ConfigLoader;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod run;
mod settings;
mod terminal;

#[derive(Parser)]
#[command(
    name = "hirebot",
    version,
    about = "Watches the hiring site for nearby shifts and applies to the first match"
)]
struct Args {
    /// Config file (defaults to ./hirebot.yaml, then ~/.hirebot/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Enable the bot, poll for jobs and drive the application for a match
    Run {
        /// Launch browser in visible mode (not headless)
        #[arg(long)]
        visible: bool,
    },
    /// Inspect or change the stored settings
    Settings {
        #[command(subcommand)]
        action: settings::Action,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries `settings` output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => ConfigLoader::load_from(path).await?,
        None => ConfigLoader::load_default().await?,
    };

    match args.command {
        Command::Run { visible } => run::run(config, visible).await,
        Command::Settings { action } => settings::execute(&config, action).await,
    }
}
