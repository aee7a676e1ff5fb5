//! Classified search results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketwatch_core::{TicketId, TicketRecord};
use ticketwatch_ocr::GpsFix;

/// A ticket located on a result page, before evidence extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCandidate {
    pub id: TicketId,
    pub officer: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub issued_at: DateTime<Utc>,
    /// Absolute URL or `data:` URI of the evidence photo
    pub evidence_image: Option<String>,
}

impl TicketCandidate {
    /// Build the stored record, with coordinates when a fix is available.
    #[must_use]
    pub fn into_record(self, fix: Option<&GpsFix>) -> TicketRecord {
        TicketRecord {
            id: self.id,
            officer: self.officer,
            department: self.department,
            latitude: fix.map(|f| f.latitude),
            longitude: fix.map(|f| f.longitude),
            location: self.location,
            issued_at: self.issued_at,
        }
    }
}

/// What a search for one id produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A result card for the id was found and parsed
    Accessible(TicketCandidate),
    /// Nothing for the id yet
    NoResults,
    /// An interactive challenge blocks the results
    Captcha,
    /// The last challenge answer was rejected
    FailedChallenge,
    /// The ticket has been paid or closed
    Closed,
}

impl SearchOutcome {
    /// Whether the outcome is one the challenge resolver handles.
    #[must_use]
    pub fn is_challenge(&self) -> bool {
        matches!(self, Self::Captcha | Self::FailedChallenge)
    }

    /// Short name for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accessible(_) => "accessible",
            Self::NoResults => "no-results",
            Self::Captcha => "captcha",
            Self::FailedChallenge => "failed-challenge",
            Self::Closed => "closed",
        }
    }
}
