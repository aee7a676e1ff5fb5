//! Shared types used across the ticketwatch workspace.
//!
//! This module defines the identifiers, records, and cursor state that the
//! discovery engine, the store, and the notification sink all exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public identifier of a ticket on the portal.
///
/// The usual shape is an optional alphabetic prefix followed by zero-padded
/// digits (`cab099`, `007`), but any string is accepted: the sequencer has a
/// degraded path for malformed ids and never rejects input.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Create a new `TicketId`.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the id and return the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for TicketId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for TicketId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A discovered ticket, as stored and published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Unique, immutable key
    pub id: TicketId,
    /// Issuing officer as shown on the portal
    pub officer: Option<String>,
    /// Issuing department or unit
    pub department: Option<String>,
    /// Latitude read from the evidence image
    pub latitude: Option<f64>,
    /// Longitude read from the evidence image
    pub longitude: Option<f64>,
    /// Free-text location label
    pub location: Option<String>,
    /// When the ticket was issued
    pub issued_at: DateTime<Utc>,
}

impl TicketRecord {
    /// Whether both coordinates are known.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

/// Short status code describing the last loop phase, kept for crash diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CursorStatus {
    /// Cursor created from the configured start id
    Initialized,
    /// A search for the current id is in flight
    Searching,
    /// Waiting for the current id to appear
    Awaiting,
    /// Working through an anti-automation challenge
    Challenge,
    /// Building and storing a record
    Persisting,
    /// Current id resolved and committed
    Advanced,
    /// A page operation timed out; the id will be retried
    Timeout,
    /// An unclassified fault occurred; the id will be retried
    Error,
    /// The loop shut down
    Stopped,
    /// Any status code written by another version
    Other(String),
}

impl CursorStatus {
    /// Stable text form stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialized => "initialized",
            Self::Searching => "searching",
            Self::Awaiting => "awaiting",
            Self::Challenge => "challenge",
            Self::Persisting => "persisting",
            Self::Advanced => "advanced",
            Self::Timeout => "timeout",
            Self::Error => "error",
            Self::Stopped => "stopped",
            Self::Other(code) => code,
        }
    }

    /// Parse from the stored text form. Unknown codes are preserved.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "initialized" => Self::Initialized,
            "searching" => Self::Searching,
            "awaiting" => Self::Awaiting,
            "challenge" => Self::Challenge,
            "persisting" => Self::Persisting,
            "advanced" => Self::Advanced,
            "timeout" => Self::Timeout,
            "error" => Self::Error,
            "stopped" => Self::Stopped,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CursorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for CursorStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<CursorStatus> for String {
    fn from(status: CursorStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Durable pointer to the last resolved id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperCursor {
    /// Last id whose resolution was committed
    pub last_checked_id: TicketId,
    /// Last loop phase
    pub status: CursorStatus,
    /// When the cursor was last written
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_id_accepts_anything() {
        for raw in ["cab099", "007", "", "weird id!"] {
            assert_eq!(TicketId::from(raw).as_str(), raw);
        }
    }

    #[test]
    fn test_ticket_id_serializes_transparently() {
        let id = TicketId::new("cab100");
        let json = serde_json::to_string(&id).expect("serialize ticket id");
        assert_eq!(json, "\"cab100\"");
    }

    #[test]
    fn test_cursor_status_round_trip() {
        for status in [
            CursorStatus::Initialized,
            CursorStatus::Awaiting,
            CursorStatus::Error,
            CursorStatus::Stopped,
        ] {
            assert_eq!(CursorStatus::parse(status.as_str()), status);
        }
    }

    #[test]
    fn test_cursor_status_preserves_unknown_codes() {
        let status = CursorStatus::parse("legacy-phase");
        assert_eq!(status, CursorStatus::Other("legacy-phase".to_string()));
        assert_eq!(status.to_string(), "legacy-phase");
    }

    #[test]
    fn test_record_without_coordinates_is_valid() {
        let record = TicketRecord {
            id: TicketId::new("cab001"),
            officer: None,
            department: None,
            latitude: Some(42.444),
            longitude: None,
            location: None,
            issued_at: Utc::now(),
        };
        assert!(!record.has_coordinates());
    }
}
