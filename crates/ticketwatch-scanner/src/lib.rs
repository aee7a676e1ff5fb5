//! Ticketwatch Scanner - sequential ticket discovery.
//!
//! This crate walks the portal's ticket ids in order. For each id it submits
//! a search, classifies the response, works through anti-automation
//! challenges, waits with backoff until the ticket appears, reads GPS
//! coordinates from the evidence photo, and stores the ticket exactly once.
//!
//! # Features
//!
//! - Carry-based id sequencing that preserves zero padding
//! - Fixed-precedence response classification
//! - Challenge resolution with an optional 2Captcha-style solver
//! - Saturating backoff while waiting for an id to appear
//! - Durable cursor so restarts resume after the last resolved id
//! - Broadcast notification of fresh tickets
//!
//! # Example
//!
//! ```rust,ignore
//! use ticketwatch_scanner::{
//!     BackoffSchedule, BroadcastNotifier, ChallengeResolver, DiscoveryOrchestrator,
//!     DiscoverySettings, PortalSession, ResultParser,
//! };
//!
//! let parser = ResultParser::new(&config.portal)?;
//! let session = PortalSession::from_config(browser, &config, parser);
//! let mut orchestrator = DiscoveryOrchestrator::new(
//!     session,
//!     db,
//!     extractor,
//!     Arc::new(BroadcastNotifier::new(64)),
//!     ChallengeResolver::new(config.discovery.challenge_max_attempts, None),
//!     BackoffSchedule::new(config.discovery.backoff()),
//!     DiscoverySettings::from_config(&config),
//! );
//! orchestrator.run(cancel).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod backoff;
pub mod challenge;
pub mod classifier;
#[allow(missing_docs)]
pub mod error;
pub mod notify;
pub mod orchestrator;
#[allow(missing_docs)]
pub mod outcome;
pub mod parser;
pub mod sequencer;
pub mod session;
#[allow(missing_docs)]
pub mod url_builder;

// Re-export commonly used types
pub use backoff::{BackoffCursor, BackoffSchedule};
pub use challenge::{CaptchaSolver, ChallengeResolver, SolverError, TwoCaptchaSolver};
pub use classifier::{classify, PageSnapshot};
pub use error::{Result, ScanError};
pub use notify::{is_fresh, BroadcastNotifier, NotificationSink};
pub use orchestrator::{DiscoveryOrchestrator, DiscoverySettings, Resolution};
pub use outcome::{SearchOutcome, TicketCandidate};
pub use parser::{parse_issued_at, ResultParser};
pub use sequencer::next_id;
pub use session::{PortalSession, SearchSession};
pub use url_builder::resolve_evidence_url;
