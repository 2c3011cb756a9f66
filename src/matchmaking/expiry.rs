//! Expiry of stale queue entries and unreported matches
//!
//! Queue entries older than the queue timeout are dropped. Active matches
//! older than the match timeout are closed as disputed with `expired` set;
//! no rating changes are applied to them.

use crate::config::{RankedSettings, MAX_TIMEOUT_SECONDS};
use crate::error::{RankedError, Result};
use crate::types::{MatchStatus, ScopeState, SweepReport};
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Timeouts applied by a sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryPolicy {
    pub queue_timeout: Duration,
    pub match_timeout: Duration,
}

impl ExpiryPolicy {
    pub fn new(queue_timeout: Duration, match_timeout: Duration) -> Self {
        Self {
            queue_timeout,
            match_timeout,
        }
    }

    /// Sweep one scope; returns what was removed
    pub fn sweep(&self, state: &mut ScopeState, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let queue_cutoff = now - self.queue_timeout;
        for queue in state.queues.values_mut() {
            let mode = queue.mode();
            report.expired_queue_entries.extend(
                queue
                    .remove_joined_before(queue_cutoff)
                    .into_iter()
                    .map(|player_id| (player_id, mode)),
            );
        }

        let match_cutoff = now - self.match_timeout;
        let mut stale: Vec<_> = state
            .active_matches
            .values()
            .filter(|m| m.created_at < match_cutoff)
            .map(|m| (m.created_at, m.match_id.clone()))
            .collect();
        stale.sort();

        for (_, match_id) in stale {
            if let Some(mut expired) = state.active_matches.remove(&match_id) {
                expired.status = MatchStatus::Disputed;
                expired.expired = true;
                expired.resolved_at = Some(now);
                state.history.push(expired);
                report.expired_matches.push(match_id);
            }
        }

        if !report.is_empty() {
            info!(
                "Expiry sweep removed {} queue entries and closed {} matches",
                report.expired_queue_entries.len(),
                report.expired_matches.len()
            );
        }

        report
    }
}

impl TryFrom<&RankedSettings> for ExpiryPolicy {
    type Error = RankedError;

    fn try_from(settings: &RankedSettings) -> Result<Self> {
        Ok(Self::new(
            timeout("queue_timeout_seconds", settings.queue_timeout_seconds)?,
            timeout("match_timeout_seconds", settings.match_timeout_seconds)?,
        ))
    }
}

fn timeout(name: &str, seconds: u64) -> Result<Duration> {
    if seconds > MAX_TIMEOUT_SECONDS {
        return Err(RankedError::Internal {
            message: format!(
                "{} = {} exceeds the maximum of {}",
                name, seconds, MAX_TIMEOUT_SECONDS
            ),
        });
    }
    i64::try_from(seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| RankedError::Internal {
            message: format!("{} = {} is out of range", name, seconds),
        })
}
