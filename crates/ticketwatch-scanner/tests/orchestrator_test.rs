//! Discovery loop tests against a scripted session and an in-memory store.

use async_trait::async_trait;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use ticketwatch_browser::BrowserError;
use ticketwatch_core::{CursorStatus, OcrConfig, TicketId, TicketRecord};
use ticketwatch_db::{cursor, records, Database};
use ticketwatch_ocr::{EvidenceGpsExtractor, ImageSource, RecognitionEngine, TextRecognizer};
use ticketwatch_scanner::{
    BackoffSchedule, BroadcastNotifier, ChallengeResolver, DiscoveryOrchestrator,
    DiscoverySettings, Resolution, Result, ScanError, SearchOutcome, SearchSession,
    TicketCandidate,
};
use tokio_util::sync::CancellationToken;

/// Session replaying scripted search results.
///
/// Once the script runs out it cancels the loop and never answers.
struct Scripted {
    steps: VecDeque<Result<SearchOutcome>>,
    searched: Vec<String>,
    stop: Option<CancellationToken>,
}

impl Scripted {
    fn new(steps: Vec<Result<SearchOutcome>>) -> Self {
        Self {
            steps: steps.into(),
            searched: Vec::new(),
            stop: None,
        }
    }

    fn stopping(mut self, token: &CancellationToken) -> Self {
        self.stop = Some(token.clone());
        self
    }
}

#[async_trait]
impl SearchSession for Scripted {
    async fn search(&mut self, id: &TicketId) -> Result<SearchOutcome> {
        self.searched.push(id.to_string());
        if let Some(step) = self.steps.pop_front() {
            return step;
        }
        if let Some(token) = &self.stop {
            token.cancel();
        }
        std::future::pending::<Result<SearchOutcome>>().await
    }

    async fn reload(&mut self) -> Result<()> {
        Ok(())
    }

    async fn challenge_site_key(&mut self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn page_url(&mut self) -> Result<String> {
        Ok("https://tickets.example.gov/search".to_string())
    }

    async fn inject_challenge_token(&mut self, _token: &str) -> Result<()> {
        Ok(())
    }
}

struct FixedText {
    text: &'static str,
    calls: Arc<AtomicUsize>,
}

impl TextRecognizer for FixedText {
    fn recognize(&self, _image: &GrayImage) -> ticketwatch_ocr::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.to_string())
    }
}

struct Harness {
    db: Arc<Database>,
    notifier: BroadcastNotifier,
    ocr_calls: Arc<AtomicUsize>,
    max_attempts: u32,
    backoff: Vec<Duration>,
}

impl Harness {
    async fn new() -> Self {
        let db = Database::new(":memory:").await.expect("create test database");
        db.run_migrations().await.expect("run migrations");
        Self {
            db: Arc::new(db),
            notifier: BroadcastNotifier::new(16),
            ocr_calls: Arc::new(AtomicUsize::new(0)),
            max_attempts: 5,
            backoff: vec![Duration::from_millis(1), Duration::from_millis(2)],
        }
    }

    fn orchestrator(&self, session: Scripted) -> DiscoveryOrchestrator<Scripted> {
        let config = OcrConfig::default();
        let calls = Arc::clone(&self.ocr_calls);
        let engine = RecognitionEngine::new(move || {
            Ok(Arc::new(FixedText {
                text: "Lat: 42.4440 Lng: -76.5019",
                calls: Arc::clone(&calls),
            }) as Arc<dyn TextRecognizer>)
        });
        let extractor = EvidenceGpsExtractor::new(
            ImageSource::new(&config).expect("build image source"),
            Arc::new(engine),
            &config,
        );

        DiscoveryOrchestrator::new(
            session,
            Arc::clone(&self.db),
            Arc::new(extractor),
            Arc::new(self.notifier.clone()),
            ChallengeResolver::new(self.max_attempts, None),
            BackoffSchedule::new(self.backoff.clone()),
            DiscoverySettings {
                start_id: TicketId::new("cab000"),
                freshness_window: Duration::from_secs(10 * 60),
                fault_cooldown: Duration::from_millis(5),
                transient_retry: Duration::from_millis(5),
            },
        )
    }

    async fn cursor(&self) -> ticketwatch_core::ScraperCursor {
        cursor::get_cursor(self.db.pool())
            .await
            .expect("get cursor")
            .expect("cursor exists")
    }

    async fn record(&self, id: &str) -> Option<TicketRecord> {
        records::find_record(self.db.pool(), &TicketId::new(id))
            .await
            .expect("find record")
    }
}

fn evidence_uri() -> String {
    let mut bytes = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(RgbImage::new(64, 48))
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes.into_inner())
    )
}

fn candidate(id: &str, issued_at: DateTime<Utc>, evidence_image: Option<String>) -> TicketCandidate {
    TicketCandidate {
        id: TicketId::new(id),
        officer: Some("Ofc. Reyes".to_string()),
        department: Some("Parking Enforcement".to_string()),
        location: Some("200 E State St".to_string()),
        issued_at,
        evidence_image,
    }
}

fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    Utc::now() - chrono::Duration::minutes(minutes)
}

async fn run_until_stopped(orchestrator: &mut DiscoveryOrchestrator<Scripted>, token: CancellationToken) {
    tokio::time::timeout(Duration::from_secs(10), orchestrator.run(token))
        .await
        .expect("loop stops when cancelled")
        .expect("loop exits cleanly");
}

#[tokio::test]
async fn test_restart_resumes_after_committed_cursor() {
    let harness = Harness::new().await;
    cursor::save_cursor(
        harness.db.pool(),
        &TicketId::new("cab150"),
        &CursorStatus::Advanced,
    )
    .await
    .expect("save cursor");

    let token = CancellationToken::new();
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(1),
        None,
    )))])
    .stopping(&token);
    let mut orchestrator = harness.orchestrator(session);

    run_until_stopped(&mut orchestrator, token).await;

    let session = orchestrator.into_session();
    assert_eq!(session.searched, vec!["cab151", "cab152"]);

    let cursor = harness.cursor().await;
    assert_eq!(cursor.last_checked_id.as_str(), "cab151");
    assert_eq!(cursor.status, CursorStatus::Stopped);
    assert!(harness.record("cab151").await.is_some());
}

#[tokio::test]
async fn test_first_run_starts_after_configured_id() {
    let harness = Harness::new().await;

    let token = CancellationToken::new();
    let session = Scripted::new(vec![Ok(SearchOutcome::Closed)]).stopping(&token);
    let mut orchestrator = harness.orchestrator(session);

    run_until_stopped(&mut orchestrator, token).await;

    let session = orchestrator.into_session();
    assert_eq!(session.searched, vec!["cab001", "cab002"]);

    // Closed tickets are resolved but not stored
    assert_eq!(harness.cursor().await.last_checked_id.as_str(), "cab001");
    assert_eq!(
        records::count_records(harness.db.pool()).await.expect("count"),
        0
    );
}

#[tokio::test]
async fn test_fresh_record_is_notified() {
    let harness = Harness::new().await;
    let mut receiver = harness.notifier.subscribe();
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(9),
        None,
    )))]);
    let mut orchestrator = harness.orchestrator(session);

    let resolution = orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    assert_eq!(
        resolution,
        Resolution::Persisted {
            new: true,
            notified: true
        }
    );
    let published = receiver.try_recv().expect("record published");
    assert_eq!(published.id.as_str(), "cab151");
}

#[tokio::test]
async fn test_stale_record_is_stored_silently() {
    let harness = Harness::new().await;
    let mut receiver = harness.notifier.subscribe();
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(11),
        None,
    )))]);
    let mut orchestrator = harness.orchestrator(session);

    let resolution = orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    assert_eq!(
        resolution,
        Resolution::Persisted {
            new: true,
            notified: false
        }
    );
    assert!(receiver.try_recv().is_err());
    assert!(harness.record("cab151").await.is_some());
}

#[tokio::test]
async fn test_known_record_skips_extraction() {
    let harness = Harness::new().await;
    let existing = candidate("cab151", minutes_ago(1), None).into_record(None);
    records::create_record(harness.db.pool(), &existing)
        .await
        .expect("seed record");

    let mut receiver = harness.notifier.subscribe();
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(1),
        Some(evidence_uri()),
    )))]);
    let mut orchestrator = harness.orchestrator(session);

    let resolution = orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    assert_eq!(resolution, Resolution::AlreadyKnown);
    assert_eq!(harness.ocr_calls.load(Ordering::SeqCst), 0);
    assert!(receiver.try_recv().is_err());
    assert_eq!(
        records::count_records(harness.db.pool()).await.expect("count"),
        1
    );
}

#[tokio::test]
async fn test_evidence_coordinates_are_stored() {
    let harness = Harness::new().await;
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(1),
        Some(evidence_uri()),
    )))]);
    let mut orchestrator = harness.orchestrator(session);

    orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    let stored = harness.record("cab151").await.expect("record stored");
    assert_eq!(stored.latitude, Some(42.444));
    assert_eq!(stored.longitude, Some(-76.5019));
    assert_eq!(harness.ocr_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreadable_evidence_leaves_coordinates_unset() {
    let harness = Harness::new().await;
    let session = Scripted::new(vec![Ok(SearchOutcome::Accessible(candidate(
        "cab151",
        minutes_ago(1),
        Some("data:image/png;base64,bm90IGFuIGltYWdl".to_string()),
    )))]);
    let mut orchestrator = harness.orchestrator(session);

    let resolution = orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    assert!(matches!(resolution, Resolution::Persisted { new: true, .. }));
    let stored = harness.record("cab151").await.expect("record stored");
    assert!(!stored.has_coordinates());
}

#[tokio::test]
async fn test_waits_with_backoff_until_ticket_appears() {
    let harness = Harness::new().await;
    let session = Scripted::new(vec![
        Ok(SearchOutcome::NoResults),
        Ok(SearchOutcome::NoResults),
        Ok(SearchOutcome::NoResults),
        Ok(SearchOutcome::Accessible(candidate("cab151", minutes_ago(1), None))),
    ]);
    let mut orchestrator = harness.orchestrator(session);

    let resolution = orchestrator
        .probe(&TicketId::new("cab151"))
        .await
        .expect("probe");

    assert!(matches!(resolution, Resolution::Persisted { .. }));
    assert_eq!(orchestrator.into_session().searched.len(), 4);
}

#[tokio::test]
async fn test_unresolved_challenge_still_advances() {
    let mut harness = Harness::new().await;
    harness.max_attempts = 2;

    let token = CancellationToken::new();
    let session = Scripted::new(vec![
        Ok(SearchOutcome::Captcha),
        Ok(SearchOutcome::FailedChallenge),
        Ok(SearchOutcome::Captcha),
    ])
    .stopping(&token);
    let mut orchestrator = harness.orchestrator(session);

    run_until_stopped(&mut orchestrator, token).await;

    let session = orchestrator.into_session();
    assert_eq!(session.searched, vec!["cab001", "cab001", "cab001", "cab002"]);
    assert_eq!(harness.cursor().await.last_checked_id.as_str(), "cab001");
}

#[tokio::test]
async fn test_faults_retry_the_same_id() {
    let harness = Harness::new().await;

    let token = CancellationToken::new();
    let session = Scripted::new(vec![
        Err(ScanError::Browser(BrowserError::Timeout(
            "navigate exceeded 30s".to_string(),
        ))),
        Err(ScanError::Browser(BrowserError::NavigationError(
            "connection reset".to_string(),
        ))),
        Ok(SearchOutcome::Closed),
    ])
    .stopping(&token);
    let mut orchestrator = harness.orchestrator(session);

    run_until_stopped(&mut orchestrator, token).await;

    let session = orchestrator.into_session();
    assert_eq!(session.searched, vec!["cab001", "cab001", "cab001", "cab002"]);
    assert_eq!(harness.cursor().await.last_checked_id.as_str(), "cab001");
}

#[tokio::test]
async fn test_cancel_during_backoff_does_not_commit() {
    let mut harness = Harness::new().await;
    harness.backoff = vec![Duration::from_secs(3600)];
    cursor::save_cursor(
        harness.db.pool(),
        &TicketId::new("cab150"),
        &CursorStatus::Advanced,
    )
    .await
    .expect("save cursor");

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let session = Scripted::new(vec![Ok(SearchOutcome::NoResults)]);
    let mut orchestrator = harness.orchestrator(session);
    run_until_stopped(&mut orchestrator, token).await;

    let cursor = harness.cursor().await;
    assert_eq!(cursor.last_checked_id.as_str(), "cab150");
    assert_eq!(cursor.status, CursorStatus::Stopped);
}
