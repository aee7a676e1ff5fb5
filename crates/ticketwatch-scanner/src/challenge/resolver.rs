use super::solver::CaptchaSolver;
use crate::error::Result;
use crate::outcome::SearchOutcome;
use crate::session::SearchSession;
use std::sync::Arc;
use ticketwatch_core::TicketId;

/// Works a search past challenge pages with a bounded number of reissues.
#[derive(Clone)]
pub struct ChallengeResolver {
    max_attempts: u32,
    solver: Option<Arc<dyn CaptchaSolver>>,
}

impl ChallengeResolver {
    /// Create a resolver. Without a solver every challenge is answered by reloading.
    #[must_use]
    pub fn new(max_attempts: u32, solver: Option<Arc<dyn CaptchaSolver>>) -> Self {
        Self {
            max_attempts,
            solver,
        }
    }

    /// Reissue the search until the outcome is no longer a challenge.
    ///
    /// Non-challenge outcomes pass straight through. After `max_attempts`
    /// reissues the last outcome is returned as is, even if still a challenge.
    pub async fn resolve<S>(
        &self,
        outcome: SearchOutcome,
        session: &mut S,
        id: &TicketId,
    ) -> Result<SearchOutcome>
    where
        S: SearchSession + ?Sized,
    {
        let mut outcome = outcome;
        let mut attempts = 0;

        while outcome.is_challenge() {
            if attempts >= self.max_attempts {
                tracing::warn!(
                    "Challenge for {} unresolved after {} attempts",
                    id,
                    attempts
                );
                return Ok(outcome);
            }
            attempts += 1;

            match outcome {
                SearchOutcome::Captcha => {
                    if !self.try_solve(session).await? {
                        session.reload().await?;
                    }
                }
                _ => {
                    tracing::debug!("Challenge answer rejected for {}; reloading", id);
                    session.reload().await?;
                }
            }

            outcome = session.search(id).await?;
            tracing::debug!(
                "Challenge attempt {}/{} for {}: {}",
                attempts,
                self.max_attempts,
                id,
                outcome.label()
            );
        }

        Ok(outcome)
    }

    /// Ask the solver for a token and inject it. Returns whether a token was injected.
    async fn try_solve<S>(&self, session: &mut S) -> Result<bool>
    where
        S: SearchSession + ?Sized,
    {
        let Some(solver) = &self.solver else {
            return Ok(false);
        };
        let Some(site_key) = session.challenge_site_key().await? else {
            tracing::warn!("Challenge widget has no site key; reloading instead");
            return Ok(false);
        };
        let page_url = session.page_url().await?;

        match solver.solve(&site_key, &page_url).await {
            Ok(Some(token)) => {
                session.inject_challenge_token(&token).await?;
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => {
                tracing::warn!("Challenge solver failed: {}", e);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for ChallengeResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChallengeResolver")
            .field("max_attempts", &self.max_attempts)
            .field("solver", &self.solver.is_some())
            .finish()
    }
}
