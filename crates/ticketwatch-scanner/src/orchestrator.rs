//! Discovery orchestrator.
//!
//! Walks ticket ids one at a time: search, classify, work through challenges,
//! wait with backoff until the id appears, then store it and move on. The
//! cursor is committed only after an id is resolved, so a restart resumes at
//! the id after the last committed one.

use crate::backoff::BackoffSchedule;
use crate::challenge::ChallengeResolver;
use crate::error::Result;
use crate::notify::{is_fresh, NotificationSink};
use crate::outcome::{SearchOutcome, TicketCandidate};
use crate::sequencer::next_id;
use crate::session::SearchSession;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use ticketwatch_core::{AppConfig, CursorStatus, TicketId};
use ticketwatch_db::{cursor, records, Database};
use ticketwatch_ocr::EvidenceGpsExtractor;
use tokio_util::sync::CancellationToken;

/// How one id was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// A record was written, or found already written by the insert
    Persisted {
        /// Whether this cycle inserted the row
        new: bool,
        /// Whether the record went to the notification sink
        notified: bool,
    },
    /// The record existed before the cycle; extraction was skipped
    AlreadyKnown,
    /// The ticket is paid or closed; nothing stored
    Closed,
    /// Challenges persisted past the attempt bound; nothing stored
    ChallengeUnresolved,
}

/// Timing and seed settings for the discovery loop.
#[derive(Debug, Clone)]
pub struct DiscoverySettings {
    /// Cursor seed on first run
    pub start_id: TicketId,
    /// Maximum age of a record that is still published
    pub freshness_window: Duration,
    /// Pause after an unclassified fault
    pub fault_cooldown: Duration,
    /// Pause after a page-operation timeout
    pub transient_retry: Duration,
}

impl DiscoverySettings {
    /// Settings from the portal and discovery sections of `config`.
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            start_id: TicketId::from(config.portal.start_id.as_str()),
            freshness_window: config.discovery.freshness_window(),
            fault_cooldown: Duration::from_secs(config.discovery.fault_cooldown_secs),
            transient_retry: Duration::from_secs(config.discovery.transient_retry_secs),
        }
    }
}

/// Sequential discovery worker.
pub struct DiscoveryOrchestrator<S: SearchSession> {
    session: S,
    db: Arc<Database>,
    extractor: Arc<EvidenceGpsExtractor>,
    notifier: Arc<dyn NotificationSink>,
    resolver: ChallengeResolver,
    backoff: BackoffSchedule,
    settings: DiscoverySettings,
}

impl<S: SearchSession> DiscoveryOrchestrator<S> {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        session: S,
        db: Arc<Database>,
        extractor: Arc<EvidenceGpsExtractor>,
        notifier: Arc<dyn NotificationSink>,
        resolver: ChallengeResolver,
        backoff: BackoffSchedule,
        settings: DiscoverySettings,
    ) -> Self {
        Self {
            session,
            db,
            extractor,
            notifier,
            resolver,
            backoff,
            settings,
        }
    }

    /// Give back the session, e.g. to close its browser.
    pub fn into_session(self) -> S {
        self.session
    }

    /// Run until `cancel` fires.
    ///
    /// Faults never stop the loop: the same id is retried after a pause.
    /// Cancellation abandons the in-flight cycle without committing it.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let cursor = cursor::get_or_create_cursor(self.db.pool(), &self.settings.start_id).await?;
        let mut current = next_id(&cursor.last_checked_id);
        tracing::info!(
            "Discovery starting at {} (last resolved: {})",
            current,
            cursor.last_checked_id
        );

        loop {
            let cycle = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                resolution = self.probe(&current) => resolution,
            };
            let committed = match cycle {
                Ok(resolution) => self.commit(&current).await.map(|()| resolution),
                Err(e) => Err(e),
            };

            match committed {
                Ok(resolution) => {
                    tracing::info!("Resolved {}: {:?}", current, resolution);
                    current = next_id(&current);
                }
                Err(e) => {
                    let (status, pause) = if e.is_transient() {
                        tracing::warn!("Transient failure on {}: {}", current, e);
                        (CursorStatus::Timeout, self.settings.transient_retry)
                    } else {
                        tracing::error!("Cycle for {} failed: {}", current, e);
                        (CursorStatus::Error, self.settings.fault_cooldown)
                    };
                    if let Err(status_err) = cursor::update_status(self.db.pool(), &status).await {
                        tracing::error!("Failed to record status {}: {}", status, status_err);
                    }
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(pause) => {}
                    }
                }
            }
        }

        cursor::update_status(self.db.pool(), &CursorStatus::Stopped).await?;
        tracing::info!("Discovery stopped before {}", current);
        Ok(())
    }

    /// Resolve one id without committing the cursor.
    pub async fn probe(&mut self, id: &TicketId) -> Result<Resolution> {
        self.set_status(CursorStatus::Searching).await?;
        let mut outcome = self.search(id).await?;
        let mut backoff = self.backoff.start();

        loop {
            match outcome {
                SearchOutcome::NoResults => {
                    self.set_status(CursorStatus::Awaiting).await?;
                    let wait = backoff.current();
                    tracing::debug!("{} not available yet; retrying in {:?}", id, wait);
                    tokio::time::sleep(wait).await;
                    backoff.advance();
                    outcome = self.search(id).await?;
                }
                SearchOutcome::Accessible(candidate) => return self.persist(candidate).await,
                SearchOutcome::Closed => {
                    tracing::info!("Ticket {} is closed; not storing", id);
                    return Ok(Resolution::Closed);
                }
                SearchOutcome::Captcha | SearchOutcome::FailedChallenge => {
                    tracing::warn!("Giving up on {} after unresolved challenge", id);
                    return Ok(Resolution::ChallengeUnresolved);
                }
            }
        }
    }

    /// Search once and work through any challenge.
    async fn search(&mut self, id: &TicketId) -> Result<SearchOutcome> {
        let outcome = self.session.search(id).await?;
        if !outcome.is_challenge() {
            return Ok(outcome);
        }
        self.set_status(CursorStatus::Challenge).await?;
        self.resolver.resolve(outcome, &mut self.session, id).await
    }

    async fn persist(&mut self, candidate: TicketCandidate) -> Result<Resolution> {
        self.set_status(CursorStatus::Persisting).await?;
        let pool = self.db.pool();

        if records::find_record(pool, &candidate.id).await?.is_some() {
            tracing::debug!("Ticket {} already stored; skipping extraction", candidate.id);
            return Ok(Resolution::AlreadyKnown);
        }

        let fix = match candidate.evidence_image.as_deref() {
            Some(image_ref) => match self.extractor.extract(image_ref).await {
                Ok(fix) => fix,
                Err(e) => {
                    tracing::warn!("Evidence extraction failed for {}: {}", candidate.id, e);
                    None
                }
            },
            None => None,
        };
        if let Some(fix) = &fix {
            tracing::debug!("Overlay for {}: {:?}", candidate.id, fix.raw_text);
        }

        let record = candidate.into_record(fix.as_ref());
        let new = records::create_record(pool, &record).await?;
        let notified = new && is_fresh(record.issued_at, Utc::now(), self.settings.freshness_window);
        if notified {
            self.notifier.publish(&record);
        }

        tracing::info!(
            "Stored ticket {} (coordinates: {}, notified: {})",
            record.id,
            record.has_coordinates(),
            notified
        );
        Ok(Resolution::Persisted { new, notified })
    }

    async fn commit(&self, id: &TicketId) -> Result<()> {
        cursor::save_cursor(self.db.pool(), id, &CursorStatus::Advanced).await?;
        Ok(())
    }

    async fn set_status(&self, status: CursorStatus) -> Result<()> {
        cursor::update_status(self.db.pool(), &status).await?;
        Ok(())
    }
}
