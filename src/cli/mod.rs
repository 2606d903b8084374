//! Command-line interface.

mod config;
mod generate;
mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use codequiz::Config;

#[derive(Parser, Debug)]
#[command(name = "codequiz", version, about = "Code-reading quiz backed by LLM-generated questions")]
pub(crate) struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Start the replenisher and serve the quiz over HTTP.
    Serve,
    /// Generate a single question and print it as JSON.
    Generate,
    /// Print the effective configuration with secrets redacted.
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("codequiz=info,tower_http=info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

/// Parse arguments and dispatch.
pub(crate) async fn run() -> Result<()> {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_format);
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Serve => serve::cmd_serve(config).await,
        Command::Generate => generate::cmd_generate(config).await,
        Command::Config => config::cmd_config(&config),
    }
}
