//! mailsift - search an Outlook mailbox from the command line
//!
//! Records are printed to stdout as JSON lines; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::{StreamExt, TryStreamExt};
use mailsift_core::{AccountConfig, Credentials, MailClient, MessageRecord, MessageStream};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "mailsift", version, about)]
struct Cli {
    /// Mailbox address to log in as
    #[arg(long, env = "MAILSIFT_ACCOUNT")]
    account: String,

    /// OAuth2 application (client) id
    #[arg(long, env = "MAILSIFT_CLIENT_ID")]
    client_id: String,

    /// OAuth2 refresh token
    #[arg(long, env = "MAILSIFT_REFRESH_TOKEN", hide_env_values = true)]
    refresh_token: String,

    /// JSON account configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print at most this many records
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Every message
    All,
    /// Messages whose From header contains TEXT
    From { text: String },
    /// Messages received on or after DATE (YYYY-MM-DD)
    Since { date: String },
    /// Newest message whose subject contains TEXT
    Subject { text: String },
    /// Newest message whose body contains TEXT
    Body { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mailsift=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let credentials = Credentials::new(cli.client_id, cli.refresh_token, cli.account);

    let mut client = MailClient::connect(&credentials, &config)
        .await
        .with_context(|| format!("Failed to connect as {}", credentials.account_address))?;

    let result = run(&mut client, cli.command, cli.limit).await;

    if let Err(e) = client.logout().await {
        warn!("Logout failed: {}", e);
    }
    result
}

async fn run(client: &mut MailClient, command: Command, limit: Option<usize>) -> Result<()> {
    match command {
        Command::All => print_stream(client.fetch_all(), limit).await,
        Command::From { text } => print_stream(client.fetch_from_sender(&text)?, limit).await,
        Command::Since { date } => print_stream(client.fetch_since_date(&date)?, limit).await,
        Command::Subject { text } => {
            let record = client.fetch_by_subject(&text).await?;
            print_records(record.into_iter().take(limit.unwrap_or(1)))
        }
        Command::Body { text } => {
            let record = client.fetch_by_body(&text).await?;
            print_records(record.into_iter().take(limit.unwrap_or(1)))
        }
    }
}

async fn print_stream(stream: MessageStream<'_>, limit: Option<usize>) -> Result<()> {
    let mut stream = stream.take(limit.unwrap_or(usize::MAX));
    let mut stdout = std::io::stdout().lock();

    while let Some(record) = stream.try_next().await? {
        write_record(&mut stdout, &record)?;
    }
    Ok(())
}

fn print_records(records: impl IntoIterator<Item = MessageRecord>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    for record in records {
        write_record(&mut stdout, &record)?;
    }
    Ok(())
}

fn write_record(out: &mut impl Write, record: &MessageRecord) -> Result<()> {
    serde_json::to_writer(&mut *out, record).context("Failed to serialize record")?;
    writeln!(out)?;
    out.flush()?;
    Ok(())
}

/// Read the account configuration, or use the Outlook defaults
fn load_config(path: Option<&Path>) -> Result<AccountConfig> {
    let Some(path) = path else {
        return Ok(AccountConfig::default());
    };

    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse config {}", path.display()))
}
