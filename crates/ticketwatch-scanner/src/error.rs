use thiserror::Error;
use ticketwatch_browser::BrowserError;

/// Errors raised during a discovery cycle.
#[derive(Debug, Error)]
pub enum ScanError {
    /// A configured CSS selector does not parse
    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),
}

impl ScanError {
    /// Whether the cycle should be retried after a short pause rather than a cool-down.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Browser(e) if e.is_timeout())
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_transient() {
        let err = ScanError::from(BrowserError::Timeout("navigate exceeded 30s".to_string()));
        assert!(err.is_transient());

        let err = ScanError::from(BrowserError::SelectorNotFound("#ticket-number".to_string()));
        assert!(!err.is_transient());

        let err = ScanError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_transient());
    }
}
