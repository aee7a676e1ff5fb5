//! Response classification.
//!
//! Turns what a search page shows into a [`SearchOutcome`]. Rules are
//! checked in a fixed order and the first match wins:
//!
//! 1. no readable page text: `NoResults`
//! 2. visible challenge widget: `Captcha`
//! 3. failed-challenge phrase: `FailedChallenge`
//! 4. remittance or closed phrase: `Closed`
//! 5. no-results phrase: `NoResults`
//! 6. a parseable result card for the expected id: `Accessible`, else `NoResults`
//!
//! Challenge pages often repeat the portal's ordinary wording, so the widget
//! check comes before every phrase check.

use crate::outcome::SearchOutcome;
use crate::parser::ResultParser;
use ticketwatch_core::{PortalConfig, TicketId};

/// What the session observed after a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Visible text of the whole page
    pub text: Option<String>,
    /// Whether the challenge widget is rendered
    pub challenge_visible: bool,
    /// Serialized document
    pub html: String,
}

/// Classify a page snapshot for `expected`.
///
/// Phrases come from `portal`; result cards are read with `parser`, which
/// the caller compiles once from the same portal section.
#[must_use]
pub fn classify(
    snapshot: &PageSnapshot,
    expected: &TicketId,
    portal: &PortalConfig,
    parser: &ResultParser,
) -> SearchOutcome {
    let Some(text) = snapshot.text.as_deref().filter(|t| !t.trim().is_empty()) else {
        return SearchOutcome::NoResults;
    };
    if snapshot.challenge_visible {
        return SearchOutcome::Captcha;
    }

    let text = text.to_lowercase();
    if contains_phrase(&text, &portal.failed_challenge_phrase) {
        return SearchOutcome::FailedChallenge;
    }
    if contains_phrase(&text, &portal.remittance_phrase)
        || contains_phrase(&text, &portal.closed_phrase)
    {
        return SearchOutcome::Closed;
    }
    if contains_phrase(&text, &portal.no_results_phrase) {
        return SearchOutcome::NoResults;
    }

    parser
        .find_card(&snapshot.html, expected)
        .map_or(SearchOutcome::NoResults, SearchOutcome::Accessible)
}

/// Case-insensitive substring match against already-lowercased text.
/// A blank phrase never matches.
fn contains_phrase(lowercase_text: &str, phrase: &str) -> bool {
    let phrase = phrase.trim();
    !phrase.is_empty() && lowercase_text.contains(&phrase.to_lowercase())
}
