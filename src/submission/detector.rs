//! Periodic sweep for submissions stuck in flight.
//!
//! The sweep only reads. It finds submissions of either machine that have
//! sat in [`IN_FLIGHT_STATUS`] longer than the configured threshold, groups
//! them by tenant and raises one aggregated alert per tenant. Running it twice
//! over unchanged data yields the same groups.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DetectorConfig;
use crate::error::{EngineError, EngineResult};
use crate::store::SubmissionStore;

use super::states::IN_FLIGHT_STATUS;
use super::{EntityRef, EntityType};

/// The stuck submissions of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StuckGroup {
    /// The tenant.
    pub tenant_id: String,
    /// Number of stuck submissions per machine.
    pub counts: BTreeMap<EntityType, usize>,
    /// The stuck entities, ordered.
    pub entities: Vec<EntityRef>,
    /// The oldest last-transition time in the group.
    pub oldest_transition_at: DateTime<Utc>,
}

impl StuckGroup {
    /// Total stuck submissions in the group.
    pub fn total(&self) -> usize {
        self.entities.len()
    }
}

/// Receives aggregated stuck-submission alerts.
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Delivers one tenant's alert.
    async fn send(&self, group: &StuckGroup) -> EngineResult<()>;
}

/// Finds in-flight submissions whose last transition is older than
/// `threshold_days` before `now`, grouped by tenant in tenant order.
///
/// A threshold that is not positive, or that reaches past the earliest
/// representable time, is `InvalidConfiguration`.
pub async fn find_stuck_submissions(
    store: &dyn SubmissionStore,
    threshold_days: i64,
    now: DateTime<Utc>,
) -> EngineResult<Vec<StuckGroup>> {
    if threshold_days <= 0 {
        return Err(EngineError::invalid_config(
            "threshold_days",
            "must be greater than zero",
        ));
    }
    let cutoff = chrono::Duration::try_days(threshold_days)
        .and_then(|age| now.checked_sub_signed(age))
        .ok_or_else(|| {
            EngineError::invalid_config(
                "threshold_days",
                format!("{} days before {} is out of range", threshold_days, now),
            )
        })?;
    let records = store.find_in_state(IN_FLIGHT_STATUS, cutoff).await?;

    let mut groups: BTreeMap<String, StuckGroup> = BTreeMap::new();
    for record in records {
        let group = groups
            .entry(record.tenant_id.clone())
            .or_insert_with(|| StuckGroup {
                tenant_id: record.tenant_id.clone(),
                counts: BTreeMap::new(),
                entities: Vec::new(),
                oldest_transition_at: record.last_transition_at,
            });
        *group.counts.entry(record.entity.entity_type).or_insert(0) += 1;
        group.oldest_transition_at = group.oldest_transition_at.min(record.last_transition_at);
        group.entities.push(record.entity);
    }

    Ok(groups
        .into_values()
        .map(|mut group| {
            group.entities.sort();
            group
        })
        .collect())
}

/// Outcome of one sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepReport {
    /// Every stuck group found.
    pub groups: Vec<StuckGroup>,
    /// Tenants whose alert was delivered.
    pub alerted: Vec<String>,
    /// Tenants whose alert failed; they are retried on the next sweep.
    pub failed: Vec<String>,
}

/// Runs [`find_stuck_submissions`] on a schedule and forwards alerts.
pub struct StuckSubmissionDetector {
    store: Arc<dyn SubmissionStore>,
    sink: Arc<dyn AlertSink>,
    config: DetectorConfig,
}

impl StuckSubmissionDetector {
    /// Creates a detector. The configuration is validated here.
    pub fn new(
        store: Arc<dyn SubmissionStore>,
        sink: Arc<dyn AlertSink>,
        config: DetectorConfig,
    ) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self {
            store,
            sink,
            config,
        })
    }

    /// Runs one sweep as of `now`.
    ///
    /// Sink failures are logged and reported, never propagated.
    pub async fn sweep(&self, now: DateTime<Utc>) -> EngineResult<SweepReport> {
        let groups =
            find_stuck_submissions(self.store.as_ref(), self.config.threshold_days, now).await?;
        let mut report = SweepReport::default();

        for group in &groups {
            match self.sink.send(group).await {
                Ok(()) => {
                    info!(
                        tenant_id = %group.tenant_id,
                        stuck = group.total(),
                        "Raised stuck submission alert"
                    );
                    report.alerted.push(group.tenant_id.clone());
                }
                Err(e) => {
                    warn!(
                        tenant_id = %group.tenant_id,
                        error = %e,
                        "Stuck submission alert failed"
                    );
                    report.failed.push(group.tenant_id.clone());
                }
            }
        }

        report.groups = groups;
        Ok(report)
    }

    /// Spawns the periodic sweep on the current tokio runtime.
    pub fn spawn(self: Arc<Self>) -> JoinHandle<()> {
        let period = Duration::from_secs(self.config.sweep_interval_hours.saturating_mul(3600));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    warn!(error = %e, "Stuck submission sweep failed");
                }
            }
        })
    }
}
