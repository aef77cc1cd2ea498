//! Connection lifecycle state machine.
//!
//! [`ConnectionManager`] performs no I/O. The driver in [`crate::client`]
//! reports transport and timer events to it and acts on what it returns:
//!
//! * [`ConnectionManager::connect`] hands out an [`Attempt`] for the driver to
//!   open a transport with
//! * [`ConnectionManager::on_close`] answers with a [`Reconnect`] decision
//! * [`ConnectionManager::send`] and [`ConnectionManager::on_heartbeat`] decide
//!   whether anything may be written
//!
//! Every attempt gets a new epoch. Events and timers carrying an older epoch
//! are stale and ignored, so a timer armed for a superseded connection can
//! never act on a newer one.

use std::time::Duration;

use click_counter_models::{InboundMessage, OutboundMessage};
use strum_macros::AsRefStr;
use thiserror::Error;

use crate::{ClickCounters, ClientConfig, CounterListener};

/// Lifecycle state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr)]
pub enum ConnectionState {
    /// No transport is open. Either nothing has been tried yet or a
    /// reconnect is pending.
    Disconnected,
    /// A transport is being opened.
    Connecting,
    /// The transport is open and messages are delivered.
    Connected,
    /// Terminal. Reached once the reconnect budget is spent.
    #[strum(serialize = "Failed to connect")]
    Failed,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Connection state plus the reconnect budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    state: ConnectionState,
    reconnect_attempts: u32,
    max_reconnect_attempts: u32,
}

impl Session {
    #[must_use]
    pub const fn new(max_reconnect_attempts: u32) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            reconnect_attempts: 0,
            max_reconnect_attempts,
        }
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnects scheduled since the last successful open.
    #[must_use]
    pub const fn reconnect_attempts(&self) -> u32 {
        self.reconnect_attempts
    }

    #[must_use]
    pub const fn max_reconnect_attempts(&self) -> u32 {
        self.max_reconnect_attempts
    }
}

/// Token for one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    epoch: u64,
}

impl Attempt {
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// A reconnect the driver should perform once `delay` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTimer {
    epoch: u64,
    attempt: u32,
    delay: Duration,
}

impl ReconnectTimer {
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// 1-based index of this reconnect within the current budget.
    #[must_use]
    pub const fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// What to do after a connection closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnect {
    /// Wait out the timer's delay, then pass it to
    /// [`ConnectionManager::on_reconnect_timer`].
    After(ReconnectTimer),
    /// The budget is spent and the session is now [`ConnectionState::Failed`].
    GiveUp,
    /// The close belonged to a superseded attempt. Nothing changed.
    Stale,
}

/// Result of [`ConnectionManager::send`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Write this frame to the transport.
    Deliver(String),
    /// The session is not connected. The message was logged and discarded.
    Dropped,
}

/// An inbound frame that could not be understood.
#[derive(Debug, Error)]
pub enum MessageError {
    /// Not JSON, no `type` tag, or a known type with missing or invalid
    /// fields.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Owns the [`Session`] and [`ClickCounters`] and notifies a
/// [`CounterListener`] of every change.
pub struct ConnectionManager {
    session: Session,
    counters: ClickCounters,
    epoch: u64,
    reconnect_base_delay: Duration,
    listener: Box<dyn CounterListener>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("session", &self.session)
            .field("counters", &self.counters)
            .field("epoch", &self.epoch)
            .field("reconnect_base_delay", &self.reconnect_base_delay)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    #[must_use]
    pub fn new(config: &ClientConfig, listener: impl CounterListener + 'static) -> Self {
        Self {
            session: Session::new(config.max_reconnect_attempts),
            counters: ClickCounters::new(),
            epoch: 0,
            reconnect_base_delay: config.reconnect_base_delay,
            listener: Box::new(listener),
        }
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.session.state
    }

    #[must_use]
    pub const fn counters(&self) -> &ClickCounters {
        &self.counters
    }

    /// Epoch of the most recent attempt. `0` before the first one.
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    fn set_state(&mut self, state: ConnectionState) {
        if self.session.state != state {
            log::debug!("set_state: {} -> {state}", self.session.state);
            self.session.state = state;
            self.listener.on_status_changed(state);
        }
    }

    /// Starts a new attempt, superseding any previous one.
    ///
    /// Returns `None` once the session has [`ConnectionState::Failed`].
    pub fn connect(&mut self) -> Option<Attempt> {
        if self.session.state == ConnectionState::Failed {
            log::warn!("connect: session failed, not reconnecting");
            return None;
        }

        self.epoch += 1;
        self.set_state(ConnectionState::Connecting);

        Some(Attempt { epoch: self.epoch })
    }

    /// The transport for `attempt` opened.
    ///
    /// Returns `false` if the attempt was superseded, in which case the
    /// caller should discard the transport.
    pub fn on_open(&mut self, attempt: Attempt) -> bool {
        if attempt.epoch != self.epoch || self.session.state != ConnectionState::Connecting {
            log::debug!(
                "on_open: ignoring stale attempt {} (current={} state={})",
                attempt.epoch,
                self.epoch,
                self.session.state
            );
            return false;
        }

        self.session.reconnect_attempts = 0;
        self.set_state(ConnectionState::Connected);
        log::info!("Connected to click counter server");

        true
    }

    /// The transport for `attempt` failed to open, closed or errored.
    pub fn on_close(&mut self, attempt: Attempt) -> Reconnect {
        if attempt.epoch != self.epoch
            || !matches!(
                self.session.state,
                ConnectionState::Connecting | ConnectionState::Connected
            )
        {
            log::debug!("on_close: ignoring stale attempt {}", attempt.epoch);
            return Reconnect::Stale;
        }

        self.set_state(ConnectionState::Disconnected);
        log::info!("Disconnected from click counter server");

        self.schedule_reconnect()
    }

    /// Spends one unit of the reconnect budget, or fails the session if none
    /// is left.
    pub fn schedule_reconnect(&mut self) -> Reconnect {
        if self.session.state == ConnectionState::Failed {
            return Reconnect::GiveUp;
        }

        if self.session.reconnect_attempts < self.session.max_reconnect_attempts {
            self.session.reconnect_attempts += 1;
            let attempt = self.session.reconnect_attempts;
            let delay = self.reconnect_base_delay * attempt;

            log::info!(
                "Attempting to reconnect in {delay:?}... ({attempt}/{})",
                self.session.max_reconnect_attempts
            );

            Reconnect::After(ReconnectTimer {
                epoch: self.epoch,
                attempt,
                delay,
            })
        } else {
            log::error!(
                "Max reconnection attempts reached ({})",
                self.session.max_reconnect_attempts
            );
            self.set_state(ConnectionState::Failed);
            Reconnect::GiveUp
        }
    }

    /// A reconnect timer fired.
    ///
    /// Starts the next attempt, or returns `None` if the timer is stale.
    pub fn on_reconnect_timer(&mut self, timer: ReconnectTimer) -> Option<Attempt> {
        if timer.epoch != self.epoch || self.session.state != ConnectionState::Disconnected {
            log::debug!("on_reconnect_timer: ignoring stale timer {timer:?}");
            return None;
        }

        self.connect()
    }

    /// A heartbeat armed under `epoch` fired.
    #[must_use]
    pub fn on_heartbeat(&self, epoch: u64) -> Option<OutboundMessage> {
        (epoch == self.epoch && self.session.state == ConnectionState::Connected)
            .then_some(OutboundMessage::Ping)
    }

    /// Encodes `message` if it may be written now.
    ///
    /// Messages are never queued: anything sent while not connected is logged
    /// and dropped.
    #[must_use]
    pub fn send(&self, message: &OutboundMessage) -> Outgoing {
        if self.session.state != ConnectionState::Connected {
            log::warn!(
                "Not connected ({}), dropping {message} message",
                self.session.state
            );
            return Outgoing::Dropped;
        }

        match message.to_json() {
            Ok(data) => {
                log::trace!("Sending to server: {data}");
                Outgoing::Deliver(data)
            }
            Err(e) => {
                log::error!("Failed to encode {message} message: {e:?}");
                Outgoing::Dropped
            }
        }
    }

    /// Parses an inbound frame and applies it to the counters.
    ///
    /// # Errors
    ///
    /// * [`MessageError::Malformed`] if the frame cannot be parsed. No state
    ///   is touched in that case.
    pub fn on_message(&mut self, raw: &str) -> Result<InboundMessage, MessageError> {
        let message = InboundMessage::parse(raw)?;
        log::debug!("Received from server: {message:?}");

        match &message {
            InboundMessage::Init { total_clicks } => {
                self.update_local(0);
                if let Some(total) = total_clicks {
                    self.update_global(*total);
                }
            }
            InboundMessage::ClickResponse {
                client_clicks,
                total_clicks,
            } => {
                self.update_local(*client_clicks);
                if let Some(total) = total_clicks {
                    self.update_global(*total);
                }
            }
            InboundMessage::GlobalUpdate { total_clicks } => {
                if let Some(total) = total_clicks {
                    self.update_global(*total);
                }
            }
            InboundMessage::Pong => {
                log::debug!("Received pong from server");
            }
            InboundMessage::Error { message } => {
                log::error!("Server error: {message}");
                self.listener.on_server_error(message);
            }
            InboundMessage::Unknown => {
                log::debug!("Ignoring unknown message: {raw}");
            }
        }

        Ok(message)
    }

    fn update_local(&mut self, count: u64) {
        if self.counters.set_local(count) {
            self.listener.on_local_count_changed(count);
        }
    }

    fn update_global(&mut self, count: u64) {
        if self.counters.set_global(count) {
            self.listener.on_global_count_changed(count);
        }
    }
}
