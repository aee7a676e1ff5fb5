//! Ticket id sequencing.

use once_cell::sync::Lazy;
use regex::Regex;
use ticketwatch_core::TicketId;

/// ASCII alphabetic prefix followed by ASCII digits. `\d` would also accept
/// non-ASCII decimal digits, which the byte-wise increment cannot handle.
static ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z]*)([0-9]+)$").expect("Ticket id regex is hardcoded and valid")
});

/// The id following `id` on the portal.
///
/// The numeric suffix is incremented in place, keeping its width and
/// growing it on overflow (`cab099` -> `cab100`, `999` -> `1000`). Ids of any
/// other shape get `"1"` appended.
#[must_use]
pub fn next_id(id: &TicketId) -> TicketId {
    let Some(captures) = ID_PATTERN.captures(id.as_str()) else {
        tracing::warn!("Ticket id {:?} has no numeric suffix; appending '1'", id.as_str());
        return TicketId::new(format!("{}1", id.as_str()));
    };

    let prefix = captures.get(1).map_or("", |m| m.as_str());
    let digits = captures.get(2).map_or("", |m| m.as_str());
    TicketId::new(format!("{prefix}{}", increment_digits(digits)))
}

/// Add one to a string of ASCII digits without converting to an integer.
fn increment_digits(digits: &str) -> String {
    let mut bytes = digits.as_bytes().to_vec();
    for byte in bytes.iter_mut().rev() {
        if *byte == b'9' {
            *byte = b'0';
        } else {
            *byte += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
    }
    format!("1{}", String::from_utf8_lossy(&bytes))
}
