//! Result card parsing.

use crate::error::{Result, ScanError};
use crate::outcome::TicketCandidate;
use crate::url_builder::resolve_evidence_url;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use scraper::{ElementRef, Html, Selector};
use ticketwatch_core::{PortalConfig, TicketId};

/// Compiled selectors for a portal result card.
struct CardSelectors {
    card: Selector,
    id: Selector,
    officer: Selector,
    department: Selector,
    location: Selector,
    issued_at: Selector,
    evidence_image: Selector,
}

fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

impl CardSelectors {
    fn new(portal: &PortalConfig) -> Result<Self> {
        Ok(Self {
            card: compile(&portal.result_card)?,
            id: compile(&portal.card_id)?,
            officer: compile(&portal.card_officer)?,
            department: compile(&portal.card_department)?,
            location: compile(&portal.card_location)?,
            issued_at: compile(&portal.card_issued_at)?,
            evidence_image: compile(&portal.card_evidence_image)?,
        })
    }
}

/// Result card reader with selectors compiled once up front.
pub struct ResultParser {
    base_url: String,
    issued_at_formats: Vec<String>,
    utc_offset_minutes: i32,
    selectors: CardSelectors,
}

impl ResultParser {
    /// Compile the portal's card selectors. Fails on the first one that does
    /// not parse.
    pub fn new(portal: &PortalConfig) -> Result<Self> {
        Ok(Self {
            base_url: portal.url.clone(),
            issued_at_formats: portal.issued_at_formats.clone(),
            utc_offset_minutes: portal.utc_offset_minutes,
            selectors: CardSelectors::new(portal)?,
        })
    }

    /// Find and parse the result card for `expected`.
    ///
    /// Cards for other ids are skipped. A matching card whose issuance time
    /// cannot be read counts as not found.
    pub fn find_card(&self, html: &str, expected: &TicketId) -> Option<TicketCandidate> {
        let document = Html::parse_document(html);

        for card in document.select(&self.selectors.card) {
            let Some(card_id) = extract_text(&card, &self.selectors.id) else {
                continue;
            };
            if !card_id.eq_ignore_ascii_case(expected.as_str()) {
                tracing::debug!("Skipping card for {} while looking for {}", card_id, expected);
                continue;
            }
            return self.parse_card(&card, expected);
        }

        None
    }

    fn parse_card(&self, card: &ElementRef, expected: &TicketId) -> Option<TicketCandidate> {
        let raw_issued_at = extract_text(card, &self.selectors.issued_at);
        let issued_at = raw_issued_at.as_deref().and_then(|raw| {
            parse_issued_at(raw, &self.issued_at_formats, self.utc_offset_minutes)
        });
        let Some(issued_at) = issued_at else {
            tracing::warn!(
                "Card for {} has an unreadable issuance time {:?}",
                expected,
                raw_issued_at
            );
            return None;
        };

        let evidence_image = card
            .select(&self.selectors.evidence_image)
            .next()
            .and_then(|img| img.value().attr("src"))
            .and_then(|src| resolve_evidence_url(&self.base_url, src));

        Some(TicketCandidate {
            id: expected.clone(),
            officer: extract_text(card, &self.selectors.officer),
            department: extract_text(card, &self.selectors.department),
            location: extract_text(card, &self.selectors.location),
            issued_at,
            evidence_image,
        })
    }
}

/// Trimmed text of the first match, `None` when missing or blank.
fn extract_text(element: &ElementRef, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<Vec<_>>().join(" "))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}

/// Parse a portal timestamp.
///
/// RFC 3339 is tried first, then each naive format, interpreted at the
/// portal's UTC offset.
pub fn parse_issued_at(raw: &str, formats: &[String], utc_offset_minutes: i32) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let offset = FixedOffset::east_opt(utc_offset_minutes.checked_mul(60)?)?;
    formats.iter().find_map(|format| {
        NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .and_then(|naive| offset.from_local_datetime(&naive).single())
            .map(|dt| dt.with_timezone(&Utc))
    })
}
