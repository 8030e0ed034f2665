//! In-memory reference store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::models::{PayrollRun, PayslipResult, RunStatus};
use crate::submission::{EntityRef, SubmissionRecord, SubmissionStatusLog};

use super::{PayrollStore, SubmissionStore};

#[derive(Debug)]
struct StoredRun {
    run: PayrollRun,
    payslips: BTreeMap<String, PayslipResult>,
}

/// Runs, payslips, submissions and the status log held in memory.
///
/// Each run's lock check and payslip writes happen under one write lock, so
/// the locked-run guarantee holds for concurrent writers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    runs: RwLock<HashMap<Uuid, StoredRun>>,
    submissions: RwLock<HashMap<EntityRef, SubmissionRecord>>,
    status_log: RwLock<Vec<SubmissionStatusLog>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of status log entries across all entities.
    pub async fn status_log_len(&self) -> usize {
        self.status_log.read().await.len()
    }
}

#[async_trait]
impl PayrollStore for MemoryStore {
    async fn create_run(&self, run: PayrollRun) -> EngineResult<()> {
        let mut runs = self.runs.write().await;
        if let Some(adjustment) = &run.adjustment_of {
            match runs.get(&adjustment.original_run_id) {
                Some(original) if original.run.is_locked() => {}
                Some(_) => {
                    return Err(EngineError::InvalidAdjustment {
                        original_run_id: adjustment.original_run_id,
                        message: "original run is not locked".to_string(),
                    });
                }
                None => {
                    return Err(EngineError::InvalidAdjustment {
                        original_run_id: adjustment.original_run_id,
                        message: "original run does not exist".to_string(),
                    });
                }
            }
        }
        if runs.contains_key(&run.id) {
            return Err(EngineError::Store {
                message: format!("run {} already exists", run.id),
            });
        }
        debug!(run_id = %run.id, tenant_id = %run.tenant_id, "Stored payroll run");
        runs.insert(
            run.id,
            StoredRun {
                run,
                payslips: BTreeMap::new(),
            },
        );
        Ok(())
    }

    async fn get_run(&self, run_id: Uuid) -> EngineResult<PayrollRun> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .map(|stored| stored.run.clone())
            .ok_or(EngineError::RunNotFound { run_id })
    }

    async fn create_payslip_lines(
        &self,
        run_id: Uuid,
        payslip: PayslipResult,
    ) -> EngineResult<u64> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(&run_id)
            .ok_or(EngineError::RunNotFound { run_id })?;
        if stored.run.is_locked() {
            return Err(EngineError::RunLocked { run_id });
        }
        stored
            .payslips
            .insert(payslip.employee_id.clone(), payslip);
        stored.run.revision += 1;
        Ok(stored.run.revision)
    }

    async fn lock_run(&self, run_id: Uuid, expected_revision: u64) -> EngineResult<PayrollRun> {
        let mut runs = self.runs.write().await;
        let stored = runs
            .get_mut(&run_id)
            .ok_or(EngineError::RunNotFound { run_id })?;
        if stored.run.is_locked() {
            return Err(EngineError::RunLocked { run_id });
        }
        if stored.run.revision != expected_revision {
            return Err(EngineError::LockConflict {
                run_id,
                expected: expected_revision,
                found: stored.run.revision,
            });
        }
        stored.run.status = RunStatus::Locked;
        stored.run.locked_at = Some(Utc::now());
        Ok(stored.run.clone())
    }

    async fn payslips(&self, run_id: Uuid) -> EngineResult<Vec<PayslipResult>> {
        self.runs
            .read()
            .await
            .get(&run_id)
            .map(|stored| stored.payslips.values().cloned().collect())
            .ok_or(EngineError::RunNotFound { run_id })
    }

    async fn adjustments_of(&self, run_id: Uuid) -> EngineResult<Vec<PayrollRun>> {
        let runs = self.runs.read().await;
        let mut adjustments: Vec<PayrollRun> = runs
            .values()
            .filter(|stored| {
                stored
                    .run
                    .adjustment_of
                    .as_ref()
                    .is_some_and(|a| a.original_run_id == run_id)
            })
            .map(|stored| stored.run.clone())
            .collect();
        adjustments.sort_by_key(|run| run.created_at);
        Ok(adjustments)
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn append_status_log(&self, entry: SubmissionStatusLog) -> EngineResult<()> {
        self.status_log.write().await.push(entry);
        Ok(())
    }

    async fn load_submission(&self, entity: &EntityRef) -> EngineResult<Option<SubmissionRecord>> {
        Ok(self.submissions.read().await.get(entity).cloned())
    }

    async fn save_submission_state(&self, record: SubmissionRecord) -> EngineResult<()> {
        self.submissions
            .write()
            .await
            .insert(record.entity.clone(), record);
        Ok(())
    }

    async fn find_in_state(
        &self,
        status: &str,
        before: DateTime<Utc>,
    ) -> EngineResult<Vec<SubmissionRecord>> {
        let mut found: Vec<SubmissionRecord> = self
            .submissions
            .read()
            .await
            .values()
            .filter(|r| r.status == status && r.last_transition_at < before)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.entity.cmp(&b.entity));
        Ok(found)
    }

    async fn status_log(&self, entity: &EntityRef) -> EngineResult<Vec<SubmissionStatusLog>> {
        Ok(self
            .status_log
            .read()
            .await
            .iter()
            .filter(|e| e.entity_type == entity.entity_type && e.entity_id == entity.entity_id)
            .cloned()
            .collect())
    }
}
