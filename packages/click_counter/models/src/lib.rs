//! Wire models for the click counter protocol.
//!
//! Every frame exchanged with the counter server is a JSON object carrying a
//! `type` tag. [`OutboundMessage`] covers the frames the client sends and
//! [`InboundMessage`] the frames it receives.
//!
//! # Examples
//!
//! ```rust
//! use click_counter_models::{InboundMessage, OutboundMessage};
//!
//! let ping = OutboundMessage::Ping.to_json().unwrap();
//! assert_eq!(ping, r#"{"type":"ping"}"#);
//!
//! let inbound = InboundMessage::parse(r#"{"type":"global_update","total_clicks":50}"#).unwrap();
//! assert_eq!(inbound, InboundMessage::GlobalUpdate { total_clicks: Some(50) });
//! ```

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::AsRefStr;

/// Screen position of a click.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClickPosition {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl ClickPosition {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Frames sent from the client to the counter server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OutboundMessage {
    /// A single click, stamped with an ISO-8601 UTC timestamp.
    Click {
        timestamp: String,
        position: ClickPosition,
    },
    /// Keep-alive heartbeat.
    Ping,
}

impl OutboundMessage {
    /// Creates a click message stamped with the current time.
    #[must_use]
    pub fn click(position: ClickPosition) -> Self {
        Self::click_at(position, Utc::now())
    }

    /// Creates a click message stamped with `at`.
    ///
    /// The timestamp uses millisecond precision and a `Z` suffix, e.g.
    /// `2024-05-01T12:30:00.125Z`.
    #[must_use]
    pub fn click_at(position: ClickPosition, at: DateTime<Utc>) -> Self {
        Self::Click {
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
            position,
        }
    }

    /// Serializes the message into its JSON wire form.
    ///
    /// # Errors
    ///
    /// * If the message fails to serialize
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// Frames received from the counter server.
///
/// Any `type` this client does not know about decodes to
/// [`InboundMessage::Unknown`] so newer servers can add message kinds without
/// breaking older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
#[serde(tag = "type", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InboundMessage {
    /// Sent once right after the connection opens.
    Init { total_clicks: Option<u64> },
    /// Acknowledgement of one of our clicks.
    ClickResponse {
        client_clicks: u64,
        total_clicks: Option<u64>,
    },
    /// Broadcast whenever any client clicks.
    GlobalUpdate { total_clicks: Option<u64> },
    /// Reply to a [`OutboundMessage::Ping`].
    Pong,
    /// Error reported by the server.
    Error { message: String },
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Parses a raw text frame.
    ///
    /// # Errors
    ///
    /// * If `raw` is not JSON
    /// * If the `type` tag is missing
    /// * If a known message kind is missing a required field or carries a
    ///   value of the wrong type
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl std::fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test_log::test]
    fn test_click_serializes_with_type_tag_and_position() {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let message = OutboundMessage::click_at(ClickPosition::new(120.0, 48.5), at);

        let value: serde_json::Value = serde_json::from_str(&message.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "click",
                "timestamp": "2024-05-01T12:30:00.000Z",
                "position": { "x": 120.0, "y": 48.5 },
            })
        );
    }

    #[test_log::test]
    fn test_ping_serializes_without_payload() {
        assert_eq!(OutboundMessage::Ping.to_json().unwrap(), r#"{"type":"ping"}"#);
    }

    #[test_log::test]
    fn test_click_response_parses_counts() {
        let message =
            InboundMessage::parse(r#"{"type":"click_response","client_clicks":7,"total_clicks":142}"#)
                .unwrap();

        assert_eq!(
            message,
            InboundMessage::ClickResponse {
                client_clicks: 7,
                total_clicks: Some(142),
            }
        );
    }

    #[test_log::test]
    fn test_click_response_ignores_extra_server_fields() {
        let message = InboundMessage::parse(
            r#"{"type":"click_response","client_clicks":3,"total_clicks":9,"timestamp":"2024-05-01T12:30:00"}"#,
        )
        .unwrap();

        assert_eq!(
            message,
            InboundMessage::ClickResponse {
                client_clicks: 3,
                total_clicks: Some(9),
            }
        );
    }

    #[test_log::test]
    fn test_init_without_total_clicks_parses() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"init"}"#).unwrap(),
            InboundMessage::Init { total_clicks: None }
        );
    }

    #[test_log::test]
    fn test_error_carries_message() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"error","message":"slow down"}"#).unwrap(),
            InboundMessage::Error {
                message: "slow down".to_string(),
            }
        );
    }

    #[test_log::test]
    fn test_unknown_type_decodes_to_unknown() {
        assert_eq!(
            InboundMessage::parse(r#"{"type":"leaderboard","entries":[]}"#).unwrap(),
            InboundMessage::Unknown
        );
    }

    #[test_log::test]
    fn test_missing_type_is_rejected() {
        assert!(InboundMessage::parse(r#"{"total_clicks":5}"#).is_err());
    }

    #[test_log::test]
    fn test_click_response_without_client_clicks_is_rejected() {
        assert!(InboundMessage::parse(r#"{"type":"click_response","total_clicks":5}"#).is_err());
    }

    #[test_log::test]
    fn test_negative_count_is_rejected() {
        assert!(InboundMessage::parse(r#"{"type":"global_update","total_clicks":-1}"#).is_err());
    }

    #[test_log::test]
    fn test_non_json_is_rejected() {
        assert!(InboundMessage::parse("pong").is_err());
    }

    #[test_log::test]
    fn test_display_uses_wire_name() {
        assert_eq!(InboundMessage::GlobalUpdate { total_clicks: None }.to_string(), "global_update");
        assert_eq!(OutboundMessage::Ping.to_string(), "ping");
    }
}
