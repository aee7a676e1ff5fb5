//! Portal search sessions.

use crate::classifier::{classify, PageSnapshot};
use crate::error::Result;
use crate::outcome::SearchOutcome;
use crate::parser::ResultParser;
use async_trait::async_trait;
use std::time::Duration;
use ticketwatch_browser::{BrowserError, PageAutomation, WaitPolicy};
use ticketwatch_core::{AppConfig, PortalConfig, TicketId};
use tokio::time::Instant;

/// Interval between checks while waiting for the portal to respond.
const RESPONSE_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One search capability against the portal, used by a single worker.
#[async_trait]
pub trait SearchSession: Send {
    /// Search for `id` and classify what the portal shows.
    async fn search(&mut self, id: &TicketId) -> Result<SearchOutcome>;

    /// Reload the current page.
    async fn reload(&mut self) -> Result<()>;

    /// Site key of the challenge widget, if one is present.
    async fn challenge_site_key(&mut self) -> Result<Option<String>>;

    /// URL of the current page.
    async fn page_url(&mut self) -> Result<String>;

    /// Hand a solved challenge token to the page.
    async fn inject_challenge_token(&mut self, token: &str) -> Result<()>;
}

/// [`SearchSession`] that drives the portal's search form through a browser page.
pub struct PortalSession<P: PageAutomation> {
    page: P,
    portal: PortalConfig,
    parser: ResultParser,
    response_timeout: Duration,
    settle: Duration,
    form_ready: bool,
}

impl<P: PageAutomation> PortalSession<P> {
    /// Create a session over `page`. `parser` must be compiled from `portal`.
    pub fn new(
        page: P,
        portal: PortalConfig,
        parser: ResultParser,
        response_timeout: Duration,
        settle: Duration,
    ) -> Self {
        Self {
            page,
            portal,
            parser,
            response_timeout,
            settle,
            form_ready: false,
        }
    }

    /// Create a session using the portal and browser sections of `config`.
    pub fn from_config(page: P, config: &AppConfig, parser: ResultParser) -> Self {
        Self::new(
            page,
            config.portal.clone(),
            parser,
            Duration::from_secs(config.browser.operation_timeout_secs),
            Duration::from_millis(config.browser.settle_ms),
        )
    }

    /// Give back the underlying page.
    pub fn into_inner(self) -> P {
        self.page
    }

    async fn open_search_form(&mut self) -> Result<()> {
        tracing::debug!("Opening search form at {}", self.portal.url);
        self.page
            .navigate(&self.portal.url, WaitPolicy::Settle(self.settle))
            .await?;
        self.page
            .wait_for(&self.portal.search_input, self.response_timeout)
            .await?;
        self.form_ready = true;
        Ok(())
    }

    async fn submit(&mut self, id: &TicketId) -> Result<()> {
        if !self.form_ready {
            self.open_search_form().await?;
        }

        let submitted = self
            .page
            .fill_and_submit(&self.portal.search_input, &self.portal.search_submit, id.as_str())
            .await;
        match submitted {
            Err(BrowserError::SelectorNotFound(selector)) => {
                tracing::debug!("Search form lost ({} missing); reopening", selector);
                self.form_ready = false;
                self.open_search_form().await?;
                self.page
                    .fill_and_submit(
                        &self.portal.search_input,
                        &self.portal.search_submit,
                        id.as_str(),
                    )
                    .await?;
                Ok(())
            }
            other => Ok(other?),
        }
    }

    /// Wait until the page shows a result card, a challenge, or one of the
    /// portal's status phrases. Running out of time is not an error.
    async fn await_response(&mut self) -> Result<()> {
        tokio::time::sleep(self.settle).await;
        let deadline = Instant::now() + self.response_timeout;
        loop {
            if self.page.is_visible(&self.portal.challenge_marker).await? {
                return Ok(());
            }
            if self.page.read_text(Some(&self.portal.result_card)).await?.is_some() {
                return Ok(());
            }
            if let Some(text) = self.page.read_text(None).await? {
                let text = text.to_lowercase();
                let shows_phrase = [
                    &self.portal.no_results_phrase,
                    &self.portal.failed_challenge_phrase,
                    &self.portal.remittance_phrase,
                    &self.portal.closed_phrase,
                ]
                .iter()
                .any(|phrase| !phrase.is_empty() && text.contains(&phrase.to_lowercase()));
                if shows_phrase {
                    return Ok(());
                }
            }
            if Instant::now() >= deadline {
                tracing::debug!(
                    "No response marker within {:?}; classifying page as is",
                    self.response_timeout
                );
                return Ok(());
            }
            tokio::time::sleep(RESPONSE_POLL_INTERVAL).await;
        }
    }

    async fn snapshot(&mut self) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            text: self.page.read_text(None).await?,
            challenge_visible: self.page.is_visible(&self.portal.challenge_marker).await?,
            html: self.page.content().await?,
        })
    }
}

#[async_trait]
impl<P: PageAutomation> SearchSession for PortalSession<P> {
    async fn search(&mut self, id: &TicketId) -> Result<SearchOutcome> {
        self.submit(id).await?;
        self.await_response().await?;
        let snapshot = self.snapshot().await?;
        let outcome = classify(&snapshot, id, &self.portal, &self.parser);
        tracing::debug!("Search for {} classified as {}", id, outcome.label());
        Ok(outcome)
    }

    async fn reload(&mut self) -> Result<()> {
        self.page.reload(WaitPolicy::Settle(self.settle)).await?;
        Ok(())
    }

    async fn challenge_site_key(&mut self) -> Result<Option<String>> {
        Ok(self
            .page
            .get_attribute(&self.portal.challenge_marker, "data-sitekey")
            .await?)
    }

    async fn page_url(&mut self) -> Result<String> {
        Ok(self.page.current_url().await?)
    }

    async fn inject_challenge_token(&mut self, token: &str) -> Result<()> {
        self.page
            .inject_value(&self.portal.challenge_response, token)
            .await?;
        Ok(())
    }
}
