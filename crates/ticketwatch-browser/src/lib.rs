//! Browser automation for the ticket portal.
//!
//! Provides the [`PageAutomation`] capability the discovery engine drives,
//! and [`BrowserEngine`], its headless Chromium implementation with a
//! randomized fingerprint and per-domain navigation pacing.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{PageAutomation, WaitPolicy};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
