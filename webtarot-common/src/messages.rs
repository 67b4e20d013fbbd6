//! Messages exchanged on the interpretation notify WebSocket
//!
//! The client sends one `Subscribe` per connection and waits for the server's
//! `Done` for the same id. The `Done` carries no content; the receiver refetches
//! the interpretation over HTTP.

use crate::uuid_utils;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notify channel message
///
/// Wire shapes (externally tagged, camelCase):
/// - `{"subscribe":{"uuid":"<reading-id>"}}` client → server
/// - `{"done":{"uuid":"<reading-id>"}}` server → client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationMessage {
    Subscribe { uuid: String },
    Done { uuid: String },
}

/// Text that is not one of the known notify shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnrecognizedMessage {
    pub raw: String,
    pub reason: String,
}

impl fmt::Display for UnrecognizedMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized notify message ({}): {}", self.reason, self.raw)
    }
}

impl NotificationMessage {
    pub fn subscribe(id: impl Into<String>) -> Self {
        Self::Subscribe { uuid: id.into() }
    }

    pub fn done(id: impl Into<String>) -> Self {
        Self::Done { uuid: id.into() }
    }

    /// Parse a text frame
    pub fn parse(text: &str) -> Result<Self, UnrecognizedMessage> {
        serde_json::from_str(text).map_err(|e| UnrecognizedMessage {
            raw: text.to_string(),
            reason: e.to_string(),
        })
    }

    /// Serialize to the JSON text frame
    pub fn to_text(&self) -> String {
        // Two string-keyed variants; serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn uuid(&self) -> &str {
        match self {
            Self::Subscribe { uuid } | Self::Done { uuid } => uuid,
        }
    }

    /// True for a `Done` addressed to `id`
    ///
    /// Ids that parse as UUIDs compare by value, so `6F96...` matches `6f96...`.
    pub fn is_done_for(&self, id: &str) -> bool {
        match self {
            Self::Done { uuid } => same_id(uuid, id),
            Self::Subscribe { .. } => false,
        }
    }
}

fn same_id(a: &str, b: &str) -> bool {
    match (uuid_utils::parse(a), uuid_utils::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_wire_shape() {
        assert_eq!(
            NotificationMessage::subscribe("r1").to_text(),
            r#"{"subscribe":{"uuid":"r1"}}"#
        );
    }

    #[test]
    fn test_parse_done() {
        let message = NotificationMessage::parse(r#"{"done":{"uuid":"r1"}}"#).unwrap();
        assert_eq!(message, NotificationMessage::done("r1"));
        assert!(message.is_done_for("r1"));
        assert!(!message.is_done_for("r2"));
    }

    #[test]
    fn test_done_matches_uuid_regardless_of_case() {
        let message =
            NotificationMessage::parse(r#"{"done":{"uuid":"6f9619ff-8b86-d011-b42d-00cf4fc964ff"}}"#)
                .unwrap();
        assert!(message.is_done_for("6F9619FF-8B86-D011-B42D-00CF4FC964FF"));
        assert!(message.is_done_for("6f9619ff8b86d011b42d00cf4fc964ff"));
        assert!(!message.is_done_for("6f9619ff-8b86-d011-b42d-00cf4fc964fe"));
    }

    #[test]
    fn test_opaque_ids_compare_exactly() {
        let message = NotificationMessage::done("Reading-1");
        assert!(message.is_done_for("Reading-1"));
        assert!(!message.is_done_for("reading-1"));
    }

    #[test]
    fn test_subscribe_is_never_done() {
        let message = NotificationMessage::subscribe("r1");
        assert!(!message.is_done_for("r1"));
        assert_eq!(message.uuid(), "r1");
    }

    #[test]
    fn test_parse_rejects_unknown_shapes() {
        for raw in [
            r#"{"progress":{"uuid":"r1"}}"#,
            r#"{"done":{"id":"r1"}}"#,
            r#"{"done":"r1"}"#,
            "PING",
            "",
        ] {
            let err = NotificationMessage::parse(raw).unwrap_err();
            assert_eq!(err.raw, raw);
        }
    }
}
