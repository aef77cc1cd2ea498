//! Async driver for the click counter connection.
//!
//! [`ClickCounterClient::start`] runs a single event loop that owns the
//! [`ConnectionManager`]. It opens transports through a [`Connector`], waits
//! out reconnect backoff, sends heartbeats and forwards messages submitted
//! through a [`ClickCounterHandle`].
//!
//! ```rust,no_run
//! # use click_counter::{ClickCounterClient, ClientConfig, TungsteniteConnector};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, handle) =
//!     ClickCounterClient::new(ClientConfig::default(), TungsteniteConnector, ());
//!
//! tokio::spawn(client.start());
//!
//! handle.click(120.0, 48.0);
//! handle.close();
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use click_counter_models::{ClickPosition, OutboundMessage};
use futures_util::{SinkExt as _, StreamExt as _};
use thiserror::Error;
use tokio::select;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::time::{Instant, MissedTickBehavior, interval_at, sleep};
use tokio_util::sync::CancellationToken;

use crate::{
    ClientConfig, ConnectionManager, CounterListener,
    session::{Attempt, Outgoing, Reconnect},
    transport::{Connection, Connector, TransportSink},
};

/// Why [`ClickCounterClient::start`] stopped with an error.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every automatic reconnect failed. The session is terminally failed.
    #[error("Failed to connect after {attempts} reconnect attempts")]
    ReconnectBudgetExhausted { attempts: u32 },
}

/// Handle for submitting messages to a running [`ClickCounterClient`].
#[derive(Debug, Clone)]
pub struct ClickCounterHandle {
    sender: UnboundedSender<OutboundMessage>,
    cancellation_token: CancellationToken,
}

impl ClickCounterHandle {
    /// Submits `message` for delivery.
    ///
    /// Delivery only happens if the client is connected when the message is
    /// processed. Otherwise it is logged and dropped. This never fails.
    pub fn send(&self, message: OutboundMessage) {
        if let Err(e) = self.sender.send(message) {
            log::warn!("Client stopped, dropping {} message", e.0);
        }
    }

    /// Sends a click at `(x, y)` stamped with the current time.
    pub fn click(&self, x: f64, y: f64) {
        self.send(OutboundMessage::click(ClickPosition::new(x, y)));
    }

    /// Stops the client, closing any live connection.
    pub fn close(&self) {
        self.cancellation_token.cancel();
    }
}

/// What ended a connection attempt.
enum Ended {
    Closed,
    Cancelled,
}

/// Click counter client. Consumed by [`Self::start`].
pub struct ClickCounterClient<C: Connector> {
    config: ClientConfig,
    connector: C,
    manager: ConnectionManager,
    receiver: UnboundedReceiver<OutboundMessage>,
    cancellation_token: CancellationToken,
}

impl<C: Connector> std::fmt::Debug for ClickCounterClient<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickCounterClient")
            .field("config", &self.config)
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> ClickCounterClient<C> {
    /// Creates a client and the handle used to talk to it.
    #[must_use]
    pub fn new(
        config: ClientConfig,
        connector: C,
        listener: impl CounterListener + 'static,
    ) -> (Self, ClickCounterHandle) {
        let (sender, receiver) = unbounded_channel();
        let cancellation_token = CancellationToken::new();
        let manager = ConnectionManager::new(&config, listener);

        (
            Self {
                config,
                connector,
                manager,
                receiver,
                cancellation_token: cancellation_token.clone(),
            },
            ClickCounterHandle {
                sender,
                cancellation_token,
            },
        )
    }

    /// Replaces the cancellation token, e.g. to tie the client to an
    /// application-wide shutdown signal.
    ///
    /// Handles created before this call keep the old token.
    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = token;
        self
    }

    /// Runs the client until it is closed or gives up reconnecting.
    ///
    /// # Errors
    ///
    /// * [`ClientError::ReconnectBudgetExhausted`] if every reconnect attempt
    ///   failed
    pub async fn start(mut self) -> Result<(), ClientError> {
        let url = self.config.url();
        let Some(mut attempt) = self.manager.connect() else {
            return Err(self.budget_exhausted());
        };

        loop {
            if matches!(self.run_attempt(&url, attempt).await, Ended::Cancelled) {
                log::debug!("start: cancelled");
                break;
            }

            match self.manager.on_close(attempt) {
                Reconnect::After(timer) => {
                    let wait = until_ready(
                        &self.manager,
                        &mut self.receiver,
                        &self.cancellation_token,
                        sleep(timer.delay()),
                    );
                    if wait.await.is_none() {
                        log::debug!("start: cancelling retry");
                        break;
                    }
                    match self.manager.on_reconnect_timer(timer) {
                        Some(next) => attempt = next,
                        None => return Err(self.budget_exhausted()),
                    }
                }
                Reconnect::GiveUp => return Err(self.budget_exhausted()),
                Reconnect::Stale => {
                    log::debug!("start: close for attempt {} was stale", attempt.epoch());
                    match self.manager.connect() {
                        Some(next) => attempt = next,
                        None => return Err(self.budget_exhausted()),
                    }
                }
            }
        }

        log::debug!("Client closed");

        Ok(())
    }

    const fn budget_exhausted(&self) -> ClientError {
        ClientError::ReconnectBudgetExhausted {
            attempts: self.manager.session().max_reconnect_attempts(),
        }
    }

    async fn run_attempt(&mut self, url: &str, attempt: Attempt) -> Ended {
        let connect = until_ready(
            &self.manager,
            &mut self.receiver,
            &self.cancellation_token,
            self.connector.connect(url),
        );

        let connection = match connect.await {
            None => return Ended::Cancelled,
            Some(Ok(connection)) => connection,
            Some(Err(e)) => {
                log::error!("Failed to connect to click counter server: {e:?}");
                return Ended::Closed;
            }
        };

        // Anything submitted while connecting is dropped before the state flips.
        while let Ok(message) = self.receiver.try_recv() {
            discard(&self.manager, &message);
        }

        if !self.manager.on_open(attempt) {
            return Ended::Closed;
        }

        self.run_connected(attempt, connection).await
    }

    async fn run_connected(&mut self, attempt: Attempt, connection: Connection) -> Ended {
        let Connection {
            mut sink,
            mut stream,
        } = connection;

        // interval_at panics on a zero period
        let period = self.config.heartbeat_interval.max(Duration::from_millis(1));
        let mut heartbeat = interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            select! {
                () = self.cancellation_token.cancelled() => {
                    if let Err(e) = sink.close().await {
                        log::debug!("run_connected: failed to close transport: {e:?}");
                    }
                    return Ended::Cancelled;
                }
                inbound = stream.next() => match inbound {
                    Some(Ok(raw)) => {
                        if let Err(e) = self.manager.on_message(&raw) {
                            log::warn!("Discarding message: {e}");
                        }
                    }
                    Some(Err(e)) => {
                        log::error!("Transport error: {e:?}");
                        return Ended::Closed;
                    }
                    None => {
                        log::debug!("run_connected: server closed the connection");
                        return Ended::Closed;
                    }
                },
                Some(message) = self.receiver.recv() => {
                    if !deliver(&self.manager, &mut sink, &message).await {
                        return Ended::Closed;
                    }
                }
                _ = heartbeat.tick() => {
                    if let Some(ping) = self.manager.on_heartbeat(attempt.epoch()) {
                        log::trace!("Sending heartbeat");
                        if !deliver(&self.manager, &mut sink, &ping).await {
                            return Ended::Closed;
                        }
                    }
                }
            }
        }
    }
}

/// Writes `message` if the manager allows it.
///
/// Returns `false` if the transport rejected the write.
async fn deliver(
    manager: &ConnectionManager,
    sink: &mut TransportSink,
    message: &OutboundMessage,
) -> bool {
    let Outgoing::Deliver(data) = manager.send(message) else {
        return true;
    };

    if let Err(e) = sink.send(data).await {
        log::error!("Failed to send {message} message: {e:?}");
        return false;
    }

    true
}

/// Waits for `future` while dropping anything submitted through the handle.
///
/// Returns `None` if cancelled first.
async fn until_ready<F: Future>(
    manager: &ConnectionManager,
    receiver: &mut UnboundedReceiver<OutboundMessage>,
    cancellation_token: &CancellationToken,
    future: F,
) -> Option<F::Output> {
    tokio::pin!(future);

    loop {
        select! {
            biased;

            () = cancellation_token.cancelled() => return None,
            Some(message) = receiver.recv() => discard(manager, &message),
            output = &mut future => return Some(output),
        }
    }
}

/// Hands `message` to the manager while not connected, where it is dropped.
fn discard(manager: &ConnectionManager, message: &OutboundMessage) {
    if let Outgoing::Deliver(_) = manager.send(message) {
        log::warn!("Discarding {message} message submitted before the connection opened");
    }
}
