//! Ticketwatch daemon
//!
//! Thin process shell: loads configuration, opens the store, launches the
//! browser and recognition engine, and runs the discovery loop until Ctrl-C.
//! Discovery logic lives in the `crates/` directory.

use anyhow::Context;
use std::sync::Arc;
use ticketwatch_browser::BrowserEngine;
use ticketwatch_core::{AppConfig, PortalConfig, SolverConfig};
use ticketwatch_db::Database;
use ticketwatch_ocr::{EvidenceGpsExtractor, ImageSource, RecognitionEngine};
use ticketwatch_scanner::{
    BackoffSchedule, BroadcastNotifier, CaptchaSolver, ChallengeResolver, DiscoveryOrchestrator,
    DiscoverySettings, PortalSession, ResultParser, TwoCaptchaSolver,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Records buffered per notification subscriber.
const NOTIFICATION_CAPACITY: usize = 64;

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ticketwatch=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Solver from configuration; `None` when no API key is set.
fn build_solver(config: &SolverConfig) -> Option<Arc<dyn CaptchaSolver>> {
    match TwoCaptchaSolver::from_config(config) {
        Some(solver) => {
            info!("Challenge solver enabled ({})", config.api_base);
            Some(Arc::new(solver))
        }
        None => {
            info!("No challenge solver configured; challenges are answered by reloading");
            None
        }
    }
}

/// Compile the portal's result card selectors before anything is opened.
fn build_parser(portal: &PortalConfig) -> anyhow::Result<ResultParser> {
    ResultParser::new(portal).context("invalid result card selector in [portal]")
}

/// Log every published ticket until the channel closes.
async fn log_notifications(mut receiver: broadcast::Receiver<ticketwatch_core::TicketRecord>) {
    loop {
        match receiver.recv().await {
            Ok(record) => match (record.latitude, record.longitude) {
                (Some(lat), Some(lng)) => info!(
                    "New ticket {} issued {} at {:.5}, {:.5}",
                    record.id,
                    record.issued_at.to_rfc3339(),
                    lat,
                    lng
                ),
                _ => info!(
                    "New ticket {} issued {} (no coordinates)",
                    record.id,
                    record.issued_at.to_rfc3339()
                ),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Notification log fell behind; {} tickets skipped", skipped);
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

/// Run the daemon until interrupted.
pub async fn run() -> anyhow::Result<()> {
    init_tracing();

    info!("Starting ticketwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load_with_env().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    let parser = build_parser(&config.portal)?;

    let db_path = config.database.resolve_path()?;
    let db = Database::new(&db_path)
        .await
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    db.run_migrations().await?;
    let db = Arc::new(db);

    let engine = Arc::new(RecognitionEngine::tesseract(&config.ocr));
    let extractor = Arc::new(EvidenceGpsExtractor::new(
        ImageSource::new(&config.ocr)?,
        Arc::clone(&engine),
        &config.ocr,
    ));

    let notifier = BroadcastNotifier::new(NOTIFICATION_CAPACITY);
    let listener = tokio::spawn(log_notifications(notifier.subscribe()));

    let browser = BrowserEngine::launch(&config.browser)
        .await
        .context("failed to launch browser")?;

    let mut orchestrator = DiscoveryOrchestrator::new(
        PortalSession::from_config(browser, &config, parser),
        Arc::clone(&db),
        extractor,
        Arc::new(notifier),
        ChallengeResolver::new(
            config.discovery.challenge_max_attempts,
            build_solver(&config.solver),
        ),
        BackoffSchedule::new(config.discovery.backoff()),
        DiscoverySettings::from_config(&config),
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutdown requested"),
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
        on_signal.cancel();
    });

    let outcome = orchestrator.run(cancel).await;

    // Release resources whether or not the loop exited cleanly
    let browser = orchestrator.into_session().into_inner();
    if let Err(e) = browser.close().await {
        warn!("Browser did not close cleanly: {}", e);
    }
    engine.shutdown().await;
    db.close().await;
    listener.abort();

    outcome?;
    info!("ticketwatch stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_solver_without_key() {
        assert!(build_solver(&SolverConfig::default()).is_none());
    }

    #[test]
    fn test_solver_with_key() {
        let config = SolverConfig {
            api_key: Some("abc123".to_string()),
            ..SolverConfig::default()
        };
        assert!(build_solver(&config).is_some());
    }

    #[test]
    fn test_default_portal_selectors_compile() {
        assert!(build_parser(&PortalConfig::default()).is_ok());
    }

    #[test]
    fn test_bad_card_selector_fails_startup() {
        let portal = PortalConfig {
            result_card: "div[".to_string(),
            ..PortalConfig::default()
        };
        let err = build_parser(&portal).err().expect("selector rejected");
        assert!(err.to_string().contains("result card selector"));
    }

    #[tokio::test]
    async fn test_notification_log_ends_with_channel() {
        let notifier = BroadcastNotifier::new(4);
        let listener = tokio::spawn(log_notifications(notifier.subscribe()));
        drop(notifier);
        listener.await.expect("listener exits when the channel closes");
    }
}
