//! Click counter client.
//!
//! Keeps a per-client and a global click total in sync with a counter server
//! over a websocket connection.
//!
//! # Features
//!
//! * Automatic reconnection with linear backoff (2s, 4s, 6s, ...) up to a
//!   fixed number of attempts
//! * Heartbeat pings while connected
//! * Server-authoritative counters with change callbacks
//! * Messages submitted while disconnected are dropped, never queued
//!
//! The connection lifecycle lives in [`ConnectionManager`], a synchronous
//! state machine. [`ClickCounterClient`] drives it from a tokio task and
//! [`ClickCounterHandle`] is how the rest of the program talks to that task.
//!
//! # Examples
//!
//! ```rust,no_run
//! use click_counter::{
//!     ClickCounterClient, ClientConfig, ConnectionState, CounterListener, TungsteniteConnector,
//! };
//!
//! struct Printer;
//!
//! impl CounterListener for Printer {
//!     fn on_global_count_changed(&self, count: u64) {
//!         println!("Total: {count}");
//!     }
//!
//!     fn on_status_changed(&self, state: ConnectionState) {
//!         println!("Status: {state}");
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new("127.0.0.1", 8765);
//! let (client, handle) = ClickCounterClient::new(config, TungsteniteConnector, Printer);
//!
//! let task = tokio::spawn(client.start());
//! handle.click(10.0, 20.0);
//! handle.close();
//! task.await??;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

pub mod client;
pub mod config;
pub mod counters;
pub mod listener;
pub mod session;
pub mod transport;

pub use click_counter_models as models;
pub use client::{ClickCounterClient, ClickCounterHandle, ClientError};
pub use config::ClientConfig;
pub use counters::ClickCounters;
pub use listener::CounterListener;
pub use session::{ConnectionManager, ConnectionState, Session};
#[cfg(feature = "tungstenite")]
pub use transport::TungsteniteConnector;
pub use transport::{Connection, Connector, TransportError};
