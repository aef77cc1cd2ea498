//! Message transport seam.
//!
//! The client only needs a way to open a connection that accepts outbound
//! text frames and yields inbound ones. [`Connector`] abstracts that so the
//! driver can run against a real websocket or an in-memory pair.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Sink, Stream};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The websocket connection or handshake failed.
    #[cfg(feature = "tungstenite")]
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),
    /// Any other transport failure.
    #[error("Transport error: {0}")]
    Other(String),
}

/// Outbound half of a connection.
pub type TransportSink = Pin<Box<dyn Sink<String, Error = TransportError> + Send>>;

/// Inbound half of a connection. The stream ending means the remote closed.
pub type TransportStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// An open connection, already split into its two halves.
pub struct Connection {
    /// Outbound text frames.
    pub sink: TransportSink,
    /// Inbound text frames.
    pub stream: TransportStream,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{Connection}}")
    }
}

/// Opens connections to a counter server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a new connection to `url`.
    ///
    /// # Errors
    ///
    /// * If the connection could not be established
    async fn connect(&self, url: &str) -> Result<Connection, TransportError>;
}

#[cfg(feature = "tungstenite")]
pub use tungstenite::TungsteniteConnector;

#[cfg(feature = "tungstenite")]
mod tungstenite {
    use async_trait::async_trait;
    use futures_util::{SinkExt as _, StreamExt as _, future};
    use tokio_tungstenite::{connect_async, tungstenite::Message};

    use super::{Connection, Connector, TransportError};

    /// [`Connector`] backed by `tokio-tungstenite`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct TungsteniteConnector;

    fn text_frame(message: Message) -> Option<Result<String, TransportError>> {
        match message {
            Message::Text(text) => Some(Ok(text.to_string())),
            Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                Ok(text) => Some(Ok(text.to_string())),
                Err(e) => {
                    log::warn!("Ignoring non-UTF-8 binary frame: {e:?}");
                    None
                }
            },
            Message::Close(frame) => {
                log::debug!("Received close frame: {frame:?}");
                None
            }
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
        }
    }

    #[async_trait]
    impl Connector for TungsteniteConnector {
        async fn connect(&self, url: &str) -> Result<Connection, TransportError> {
            log::debug!("Connecting to websocket '{url}'...");
            let (ws_stream, _) = connect_async(url).await?;
            log::debug!("WebSocket handshake has been successfully completed");

            let (write, read) = ws_stream.split();

            let sink = write.with(|data: String| {
                log::trace!("Sending text frame: {data}");
                future::ready(Ok::<_, TransportError>(Message::Text(data.into())))
            });
            let stream = read.filter_map(|message| {
                future::ready(match message {
                    Ok(message) => text_frame(message),
                    Err(e) => Some(Err(e.into())),
                })
            });

            Ok(Connection {
                sink: Box::pin(sink),
                stream: Box::pin(stream),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use pretty_assertions::assert_eq;

        use super::*;

        #[test_log::test]
        fn test_text_frames_pass_through() {
            let frame = text_frame(Message::Text(r#"{"type":"pong"}"#.to_string().into()));

            assert_eq!(frame.unwrap().unwrap(), r#"{"type":"pong"}"#);
        }

        #[test_log::test]
        fn test_utf8_binary_frames_are_decoded() {
            let frame = text_frame(Message::Binary(br#"{"type":"init"}"#.to_vec().into()));

            assert_eq!(frame.unwrap().unwrap(), r#"{"type":"init"}"#);
        }

        #[test_log::test]
        fn test_control_frames_are_skipped() {
            assert!(text_frame(Message::Ping(vec![].into())).is_none());
            assert!(text_frame(Message::Pong(vec![].into())).is_none());
            assert!(text_frame(Message::Close(None)).is_none());
            assert!(text_frame(Message::Binary(vec![0xff, 0xfe].into())).is_none());
        }
    }
}
