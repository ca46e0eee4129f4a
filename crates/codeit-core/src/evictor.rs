use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use codeit_schema::GuildId;
use tokio_util::sync::CancellationToken;

use crate::registry::{Eviction, SessionRegistry};

pub const DEFAULT_EVICTION_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
/// Slightly under the interval, so a session untouched for a whole cycle is
/// always gone after the next sweep.
pub const DEFAULT_INACTIVITY_THRESHOLD: Duration = Duration::from_secs(86_340);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictionPolicy {
    pub interval: Duration,
    pub threshold: TimeDelta,
}

impl Default for EvictionPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_EVICTION_INTERVAL,
            threshold: TimeDelta::seconds(DEFAULT_INACTIVITY_THRESHOLD.as_secs() as i64),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub evicted: Vec<GuildId>,
    pub still_active: usize,
    pub busy: usize,
}

/// Periodically drops guild sessions (and their challenges) that have been
/// idle for longer than the policy threshold.
pub struct Evictor {
    registry: Arc<SessionRegistry>,
    policy: EvictionPolicy,
}

impl Evictor {
    pub fn new(registry: Arc<SessionRegistry>, policy: EvictionPolicy) -> Self {
        Self { registry, policy }
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Utc::now()).await
    }

    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let expired = self
            .registry
            .ledger()
            .snapshot_expired(self.policy.threshold, now)
            .await;

        let mut report = SweepReport::default();
        for guild in expired {
            match self
                .registry
                .evict_if_idle(&guild, self.policy.threshold, now)
                .await
            {
                Eviction::Removed => report.evicted.push(guild),
                Eviction::StillActive => report.still_active += 1,
                Eviction::Busy => {
                    tracing::debug!(guild = %guild, "skipping eviction of busy guild");
                    report.busy += 1;
                }
            }
        }

        let pruned = self.registry.locks().prune_idle().await;
        tracing::debug!("pruned {pruned} idle guild locks");
        report
    }

    /// Runs until `cancel` fires. The first sweep happens one interval after start.
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.policy.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("evictor stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        let report = self.sweep().await;
                        tracing::info!(
                            "eviction sweep: {} evicted, {} reactivated, {} busy",
                            report.evicted.len(),
                            report.still_active,
                            report.busy
                        );
                    }
                }
            }
        })
    }
}
