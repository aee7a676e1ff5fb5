use crate::actions::{extract_domain, js_string, PageAutomation, WaitPolicy};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::page::Page;
use futures::stream::StreamExt;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;
use ticketwatch_core::BrowserConfig;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Interval between polls while waiting for a selector.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Minimum spacing between navigations to the same domain.
const MIN_NAVIGATION_INTERVAL_MS: u64 = 1000;

/// Per-domain navigation pacing
#[derive(Debug)]
struct NavigationPacer {
    last_access: HashMap<String, Instant>,
    min_delay: Duration,
}

impl NavigationPacer {
    fn new(min_delay_ms: u64) -> Self {
        Self {
            last_access: HashMap::new(),
            min_delay: Duration::from_millis(min_delay_ms),
        }
    }

    /// Sleep until the domain may be hit again, then record the access.
    /// Returns how long the caller was held back.
    async fn wait_turn(&mut self, domain: &str) -> Duration {
        let mut waited = Duration::ZERO;
        if let Some(last) = self.last_access.get(domain) {
            let elapsed = last.elapsed();
            if elapsed < self.min_delay {
                waited = self.min_delay - elapsed;
                tokio::time::sleep(waited).await;
            }
        }
        self.last_access.insert(domain.to_string(), Instant::now());
        waited
    }
}

/// Headless Chromium session driving a single page.
pub struct BrowserEngine {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    pacer: NavigationPacer,
    operation_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chromium and open the page used for the whole session.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let fingerprint = match &config.user_agent {
            Some(user_agent) => FingerprintConfig::fixed(
                user_agent.clone(),
                config.window_width,
                config.window_height,
            ),
            None => FingerprintConfig::randomized(),
        };

        let mut builder = ChromiumConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg(format!("--user-agent={}", fingerprint.user_agent))
            .arg(format!("--lang={}", fingerprint.accept_language))
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled");
        if !config.headless {
            builder = builder.with_head();
        }
        let chromium_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        // Spawn browser handler
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

        tracing::info!(
            "Browser session launched (headless: {}, viewport: {}x{})",
            config.headless,
            fingerprint.viewport_width,
            fingerprint.viewport_height
        );

        Ok(Self {
            browser,
            page,
            handler,
            pacer: NavigationPacer::new(MIN_NAVIGATION_INTERVAL_MS),
            operation_timeout: Duration::from_secs(config.operation_timeout_secs),
        })
    }

    /// Close the browser and release the session.
    pub async fn close(mut self) -> Result<()> {
        let closed = self
            .browser
            .close()
            .await
            .map_err(|e| BrowserError::ChromiumError(e.to_string()));
        let _ = self.browser.wait().await;
        self.handler.abort();
        tracing::info!("Browser session closed");
        closed.map(|_| ())
    }

    /// Run a page operation under the per-operation timeout.
    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.operation_timeout, fut)
            .await
            .map_err(|_| {
                BrowserError::Timeout(format!(
                    "{operation} exceeded {:?}",
                    self.operation_timeout
                ))
            })?
    }

    /// Evaluate an expression and decode its JSON-encoded result.
    ///
    /// Results are passed through `JSON.stringify` so that `null` and
    /// `undefined` survive the protocol round trip.
    async fn eval_json<T: DeserializeOwned>(&self, expression: &str) -> Result<T> {
        let script = format!("JSON.stringify(({expression}) ?? null)");
        self.bounded("evaluate", async {
            let result = self
                .page
                .evaluate(script)
                .await
                .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
            let encoded: String = result
                .into_value()
                .map_err(|e| BrowserError::Evaluation(e.to_string()))?;
            serde_json::from_str(&encoded).map_err(|e| BrowserError::Evaluation(e.to_string()))
        })
        .await
    }

    async fn settle(&self, wait: WaitPolicy) {
        if let WaitPolicy::Settle(extra) = wait {
            tokio::time::sleep(extra).await;
        }
    }
}

#[async_trait::async_trait]
impl PageAutomation for BrowserEngine {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> Result<()> {
        let domain = extract_domain(url)?;
        let held = self.pacer.wait_turn(&domain).await;
        if !held.is_zero() {
            tracing::debug!("Held navigation to {} for {:?}", domain, held);
        }

        self.bounded("navigate", async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok(())
        })
        .await?;
        self.settle(wait).await;
        Ok(())
    }

    async fn fill_and_submit(
        &mut self,
        input_selector: &str,
        submit_selector: &str,
        value: &str,
    ) -> Result<()> {
        let cleared: bool = self
            .eval_json(&format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; el.value = ''; return true; }})()",
                js_string(input_selector)
            ))
            .await?;
        if !cleared {
            return Err(BrowserError::SelectorNotFound(input_selector.to_string()));
        }

        self.bounded("fill_and_submit", async {
            let input = self
                .page
                .find_element(input_selector)
                .await
                .map_err(|_| BrowserError::SelectorNotFound(input_selector.to_string()))?;
            input
                .click()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            input
                .type_str(value)
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;

            let submit = self
                .page
                .find_element(submit_selector)
                .await
                .map_err(|_| BrowserError::SelectorNotFound(submit_selector.to_string()))?;
            submit
                .click()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let probe = format!("document.querySelector({}) !== null", js_string(selector));
        loop {
            if self.eval_json::<bool>(&probe).await? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(format!(
                    "waiting for '{selector}' exceeded {timeout:?}"
                )));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn is_visible(&mut self, selector: &str) -> Result<bool> {
        self.eval_json(&format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; \
             const rect = el.getBoundingClientRect(); const style = window.getComputedStyle(el); \
             return rect.width > 0 && rect.height > 0 && style.visibility !== 'hidden' && style.display !== 'none'; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn read_text(&mut self, selector: Option<&str>) -> Result<Option<String>> {
        let expression = match selector {
            Some(selector) => format!(
                "(() => {{ const el = document.querySelector({}); return el ? el.innerText : null; }})()",
                js_string(selector)
            ),
            None => "document.body ? document.body.innerText : null".to_string(),
        };
        self.eval_json(&expression).await
    }

    async fn get_attribute(&mut self, selector: &str, name: &str) -> Result<Option<String>> {
        self.eval_json(&format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_string(selector),
            js_string(name)
        ))
        .await
    }

    async fn reload(&mut self, wait: WaitPolicy) -> Result<()> {
        self.bounded("reload", async {
            self.page
                .reload()
                .await
                .map_err(|e| BrowserError::NavigationError(e.to_string()))?;
            Ok(())
        })
        .await?;
        self.settle(wait).await;
        Ok(())
    }

    async fn inject_value(&mut self, selector: &str, value: &str) -> Result<()> {
        let found: bool = self
            .eval_json(&format!(
                "(() => {{ const el = document.querySelector({}); if (!el) return false; \
                 el.value = {value}; if ('innerHTML' in el && el.tagName === 'TEXTAREA') el.innerHTML = {value}; \
                 el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
                 el.dispatchEvent(new Event('change', {{ bubbles: true }})); return true; }})()",
                js_string(selector),
                value = js_string(value)
            ))
            .await?;
        if found {
            Ok(())
        } else {
            Err(BrowserError::SelectorNotFound(selector.to_string()))
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.bounded("content", async {
            self.page
                .content()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))
        })
        .await
    }

    async fn current_url(&mut self) -> Result<String> {
        self.bounded("current_url", async {
            self.page
                .url()
                .await
                .map_err(|e| BrowserError::ChromiumError(e.to_string()))
                .map(Option::unwrap_or_default)
        })
        .await
    }
}
