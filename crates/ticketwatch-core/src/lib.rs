//! Ticketwatch Core - Foundation crate for the ticketwatch discovery engine.
//!
//! This crate provides shared types, error handling, and configuration
//! management that all other ticketwatch crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Configuration error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared domain types (`TicketId`, `TicketRecord`, `ScraperCursor`)
//!
//! # Example
//!
//! ```rust
//! use ticketwatch_core::{AppConfig, TicketId};
//!
//! let config = AppConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let start = TicketId::from(config.portal.start_id.as_str());
//! println!("Probing after {start}");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, DatabaseConfig, DiscoveryConfig, OcrConfig, PortalConfig,
    SolverConfig,
};
pub use error::{ConfigError, ConfigResult};
pub use types::{CursorStatus, ScraperCursor, TicketId, TicketRecord};
