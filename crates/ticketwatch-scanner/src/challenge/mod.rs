//! Anti-automation challenge handling.
//!
//! [`ChallengeResolver`] drives a session through challenge pages, using a
//! [`CaptchaSolver`] when one is configured and falling back to reloading.

mod resolver;
mod solver;

pub use resolver::ChallengeResolver;
pub use solver::{CaptchaSolver, SolverError, TwoCaptchaSolver};
