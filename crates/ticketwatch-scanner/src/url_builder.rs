use url::Url;

/// Resolve an evidence image `src` against the page it appeared on.
///
/// `data:` URIs are returned unchanged. Returns `None` when `src` is blank or
/// cannot be resolved.
#[must_use]
pub fn resolve_evidence_url(page_url: &str, src: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    if src.starts_with("data:") {
        return Some(src.to_string());
    }

    match Url::parse(src) {
        Ok(absolute) => Some(absolute.to_string()),
        Err(url::ParseError::RelativeUrlWithoutBase) => Url::parse(page_url)
            .and_then(|base| base.join(src))
            .map(|resolved| resolved.to_string())
            .ok(),
        Err(_) => None,
    }
}
