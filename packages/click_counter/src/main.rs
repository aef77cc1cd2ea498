//! Headless click counter.
//!
//! Connects to a click counter server and turns lines read from stdin into
//! clicks. Counter and connection changes are logged as they happen.
//!
//! # Usage
//!
//! ```text
//! click_counter [--host <HOST>] [--port <PORT>] [--goal <GOAL>]
//! ```
//!
//! Each input line is either `x y` (a click at that position), empty (a click
//! at the origin) or `q` to quit.

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::io::BufRead as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use click_counter::{
    ClickCounterClient, ClickCounterHandle, ClientConfig, ConnectionState, CounterListener,
    TungsteniteConnector,
};
use thiserror::Error;

/// Command-line arguments for the click counter.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Counter server host.
    #[arg(long, env = "CLICK_COUNTER_HOST", default_value = click_counter::config::DEFAULT_HOST)]
    host: String,

    /// Counter server port.
    #[arg(long, env = "CLICK_COUNTER_PORT", default_value_t = click_counter::config::DEFAULT_PORT)]
    port: u16,

    /// Local click count at which the goal is reached.
    #[arg(long, default_value_t = 1500)]
    goal: u64,

    /// Seconds between heartbeat pings.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_secs: u64,

    /// Automatic reconnects before giving up.
    #[arg(long, default_value_t = click_counter::config::DEFAULT_MAX_RECONNECT_ATTEMPTS)]
    max_reconnect_attempts: u32,
}

#[derive(Debug, Error)]
enum Error {
    #[error(transparent)]
    Client(#[from] click_counter::ClientError),
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
}

struct LogListener {
    goal: u64,
    goal_reached: AtomicBool,
}

impl CounterListener for LogListener {
    fn on_local_count_changed(&self, count: u64) {
        log::info!("Your clicks: {count}");

        let reached = count >= self.goal;
        if self.goal_reached.swap(reached, Ordering::Relaxed) != reached && reached {
            log::info!("Goal of {} clicks reached!", self.goal);
        }
    }

    fn on_global_count_changed(&self, count: u64) {
        log::info!("Total: {count}");
    }

    fn on_status_changed(&self, state: ConnectionState) {
        log::info!("Status: {state}");
    }

    fn on_server_error(&self, message: &str) {
        log::warn!("Server says: {message}");
    }
}

fn parse_position(line: &str) -> Option<(f64, f64)> {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (None, None, None) => Some((0.0, 0.0)),
        (Some(x), Some(y), None) => Some((x.parse().ok()?, y.parse().ok()?)),
        _ => None,
    }
}

/// Reads clicks from stdin until it closes or `q` is entered.
fn read_clicks(handle: &ClickCounterHandle) -> Result<(), std::io::Error> {
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        let line = line.trim();
        if line == "q" {
            break;
        }
        match parse_position(line) {
            Some((x, y)) => handle.click(x, y),
            None => log::warn!("Expected 'x y', got '{line}'"),
        }
    }

    Ok(())
}

/// Runs the click counter until stdin closes, `q` is entered or the server
/// stays unreachable.
///
/// # Errors
///
/// * If every reconnect attempt failed
#[tokio::main]
async fn main() -> Result<(), Error> {
    pretty_env_logger::init();

    let args = Args::parse();
    log::debug!("args={args:?}");

    let config = ClientConfig::new(args.host, args.port)
        .with_heartbeat_interval(Duration::from_secs(args.heartbeat_secs))
        .with_max_reconnect_attempts(args.max_reconnect_attempts);
    let listener = LogListener {
        goal: args.goal,
        goal_reached: AtomicBool::new(false),
    };

    let (client, handle) = ClickCounterClient::new(config, TungsteniteConnector, listener);
    let client = tokio::spawn(client.start());

    std::thread::spawn({
        let handle = handle.clone();
        move || {
            if let Err(e) = read_clicks(&handle) {
                log::error!("Failed to read stdin: {e:?}");
            }
            handle.close();
        }
    });

    client.await??;
    handle.close();

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn test_parses_positions() {
        assert_eq!(parse_position("12 34.5"), Some((12.0, 34.5)));
        assert_eq!(parse_position(""), Some((0.0, 0.0)));
        assert_eq!(parse_position("12"), None);
        assert_eq!(parse_position("a b"), None);
        assert_eq!(parse_position("1 2 3"), None);
    }

    #[test_log::test]
    fn test_goal_is_announced_once_when_crossed() {
        let listener = LogListener {
            goal: 3,
            goal_reached: AtomicBool::new(false),
        };

        listener.on_local_count_changed(2);
        assert!(!listener.goal_reached.load(Ordering::Relaxed));
        listener.on_local_count_changed(3);
        assert!(listener.goal_reached.load(Ordering::Relaxed));
        listener.on_local_count_changed(0);
        assert!(!listener.goal_reached.load(Ordering::Relaxed));
    }
}
