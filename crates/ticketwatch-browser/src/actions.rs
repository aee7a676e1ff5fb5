use crate::error::{BrowserError, Result};
use std::time::Duration;

/// What a navigation or reload waits for before returning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// Return once the load event fired
    Load,
    /// Wait for the load event, then let scripts settle for the given time
    Settle(Duration),
}

/// Page automation capability used by the discovery engine.
///
/// One implementation drives one page; callers never issue operations
/// concurrently.
#[async_trait::async_trait]
pub trait PageAutomation: Send {
    /// Navigate to a URL
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<()>;

    /// Replace the contents of a text field and activate the submit control
    async fn fill_and_submit(
        &mut self,
        input_selector: &str,
        submit_selector: &str,
        value: &str,
    ) -> Result<()>;

    /// Wait for a selector to match, failing with `BrowserError::Timeout`
    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Whether the first element matching the selector is rendered and visible
    async fn is_visible(&mut self, selector: &str) -> Result<bool>;

    /// Inner text of the first match, or of the whole page when `selector` is `None`
    async fn read_text(&mut self, selector: Option<&str>) -> Result<Option<String>>;

    /// Attribute of the first match
    async fn get_attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Reload the current page
    async fn reload(&mut self, wait: WaitPolicy) -> Result<()>;

    /// Set the value of a (possibly hidden) form field
    async fn inject_value(&mut self, selector: &str, value: &str) -> Result<()>;

    /// Serialized HTML of the current document
    async fn content(&mut self) -> Result<String>;

    /// URL of the current document
    async fn current_url(&mut self) -> Result<String>;
}

/// Helper to extract domain from URL
pub fn extract_domain(url: &str) -> Result<String> {
    let url = url::Url::parse(url)
        .map_err(|e| BrowserError::NavigationError(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| BrowserError::NavigationError("No host in URL".to_string()))
        .map(|s| s.to_string())
}

/// Quote a string as a JavaScript literal.
pub(crate) fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}
