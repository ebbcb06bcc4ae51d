//! Follows one character's event feed and prints it.
//!
//! ```text
//! muforge-feed --base-url http://localhost:8000 --character 42 --token $TOKEN
//! ```
//!
//! Every flag can also come from a `MUFORGE_*` environment variable.
//! Ctrl-C stops the stream and exits.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use clap::Parser;
use muforge::feed::{self, ConnectionIndicator};
use muforge::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "muforge-feed")]
#[command(about = "Follow a character's live event feed")]
struct Cli {
    /// Base URL of the game server
    #[arg(long, env = "MUFORGE_BASE_URL")]
    base_url: String,

    /// Character whose feed to follow
    #[arg(long, env = "MUFORGE_CHARACTER")]
    character: CharacterId,

    /// Bearer token (without one the feed stays offline)
    #[arg(long, env = "MUFORGE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Delay between reconnection attempts, in milliseconds
    #[arg(long, env = "MUFORGE_RETRY_MS", default_value_t = 2000)]
    retry_ms: u64,

    /// Print raw events as JSON lines instead of feed text
    #[arg(long, env = "MUFORGE_JSON")]
    json: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "MUFORGE_LOG", default_value = "info")]
    log_level: String,
}

fn init_tracing(level: &str) {
    // Logs go to stderr; stdout is the feed.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Prints the indicator whenever it changes, plus an error line for
/// failed attempts.
fn status_printer() -> impl Fn(&StreamStatus) + Send + Sync + 'static {
    let last = Mutex::new(None::<ConnectionIndicator>);
    move |status: &StreamStatus| {
        if let Some(line) = feed::status_line(status) {
            println!("{line}");
        }
        // The feed only runs while a character is selected.
        let indicator = ConnectionIndicator::from_status(status, true);
        let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
        if *last != Some(indicator) {
            println!("[{indicator}]");
            *last = Some(indicator);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), MuforgeError> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let dispatcher = Dispatcher::new();
    if cli.json {
        let _ = dispatcher.on_any(|event| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, event_type = %event.event_type, "could not encode event"),
        });
    } else {
        let _ = feed::attach(&dispatcher, |line| println!("{line}"));
    }

    let tokens = SharedToken::new();
    if let Some(token) = cli.token {
        tokens.set(token);
    }

    let mut characters = CharacterFeed::new(cli.base_url, HttpTransport::new()?)
        .tokens(tokens)
        .dispatcher(dispatcher)
        .on_status(status_printer())
        .config(StreamConfig::with_retry_delay(Duration::from_millis(cli.retry_ms)));

    tracing::info!(character = %cli.character, "following feed (ctrl-c to quit)");
    characters.activate(cli.character);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "could not listen for ctrl-c");
    }

    characters.deactivate();
    tracing::info!("feed stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_flags() {
        let cli = Cli::try_parse_from([
            "muforge-feed",
            "--base-url",
            "http://localhost:8000",
            "--character",
            "42",
            "--retry-ms",
            "500",
            "--json",
        ])
        .unwrap();
        assert_eq!(cli.base_url, "http://localhost:8000");
        assert_eq!(cli.character.as_str(), "42");
        assert_eq!(cli.retry_ms, 500);
        assert!(cli.json);
    }

    #[test]
    fn test_rejects_bad_character_id() {
        let result = Cli::try_parse_from([
            "muforge-feed",
            "--base-url",
            "http://localhost:8000",
            "--character",
            "a/b",
        ]);
        assert!(result.is_err());
    }
}
