//! Applies submission transitions against a store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};
use crate::store::SubmissionStore;

use super::locks::EntityLocks;
use super::states::{initial_status, validate_transition};
use super::{EntityRef, SubmissionRecord, SubmissionStatusLog};

/// Registers submissions and moves them through their state machine.
///
/// Transitions of one entity are serialized through the shared
/// [`EntityLocks`]; each accepted transition is appended to the status log
/// before the new state is saved.
#[derive(Clone)]
pub struct SubmissionService {
    store: Arc<dyn SubmissionStore>,
    locks: Arc<EntityLocks>,
}

impl SubmissionService {
    /// Creates a service over a store and a lock registry.
    pub fn new(store: Arc<dyn SubmissionStore>, locks: Arc<EntityLocks>) -> Self {
        Self { store, locks }
    }

    /// Creates a submission in its machine's initial state.
    ///
    /// # Errors
    ///
    /// `StaleSubmissionState` if the entity already exists.
    pub async fn register(
        &self,
        entity: EntityRef,
        tenant_id: &str,
        changed_by: &str,
    ) -> EngineResult<SubmissionRecord> {
        let _guard = self.locks.acquire(&entity).await?;

        if let Some(existing) = self.store.load_submission(&entity).await? {
            return Err(EngineError::StaleSubmissionState {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id,
                expected: "(none)".to_string(),
                actual: existing.status,
            });
        }

        let status = initial_status(entity.entity_type);
        let now = Utc::now();
        self.store
            .append_status_log(SubmissionStatusLog {
                id: Uuid::new_v4(),
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
                from_status: None,
                to_status: status.to_string(),
                changed_by: changed_by.to_string(),
                reason: None,
                created_at: now,
            })
            .await?;

        let record = SubmissionRecord {
            entity,
            tenant_id: tenant_id.to_string(),
            status: status.to_string(),
            last_transition_at: now,
        };
        self.store.save_submission_state(record.clone()).await?;

        info!(
            entity_type = %record.entity.entity_type,
            entity_id = %record.entity.entity_id,
            tenant_id = %record.tenant_id,
            status,
            "Registered submission"
        );
        Ok(record)
    }

    /// Moves a submission from `from` to `to`.
    ///
    /// # Errors
    ///
    /// * `SubmissionNotFound` if the entity was never registered.
    /// * `StaleSubmissionState` if the stored state is not `from`.
    /// * `InvalidTransition` if the machine does not allow `from -> to`.
    /// * `Store` if the log append or state save fails. A failed save after a
    ///   successful append leaves the log one entry ahead of the state.
    pub async fn apply_transition(
        &self,
        entity: &EntityRef,
        from: &str,
        to: &str,
        changed_by: &str,
        reason: Option<&str>,
    ) -> EngineResult<SubmissionStatusLog> {
        let _guard = self.locks.acquire(entity).await?;

        let current = self.store.load_submission(entity).await?.ok_or_else(|| {
            EngineError::SubmissionNotFound {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
            }
        })?;

        if current.status != from {
            debug!(
                entity_type = %entity.entity_type,
                entity_id = %entity.entity_id,
                expected = from,
                actual = %current.status,
                "Rejected stale transition"
            );
            return Err(EngineError::StaleSubmissionState {
                entity_type: entity.entity_type,
                entity_id: entity.entity_id.clone(),
                expected: from.to_string(),
                actual: current.status,
            });
        }

        validate_transition(entity.entity_type, from, to)?;

        let entry = SubmissionStatusLog {
            id: Uuid::new_v4(),
            entity_type: entity.entity_type,
            entity_id: entity.entity_id.clone(),
            from_status: Some(from.to_string()),
            to_status: to.to_string(),
            changed_by: changed_by.to_string(),
            reason: reason.map(str::to_string),
            created_at: Utc::now(),
        };
        self.store.append_status_log(entry.clone()).await?;

        self.store
            .save_submission_state(SubmissionRecord {
                status: to.to_string(),
                last_transition_at: entry.created_at,
                ..current
            })
            .await?;

        info!(
            entity_type = %entity.entity_type,
            entity_id = %entity.entity_id,
            from,
            to,
            changed_by,
            "Applied submission transition"
        );
        Ok(entry)
    }

    /// The status log of one entity, oldest first.
    pub async fn history(&self, entity: &EntityRef) -> EngineResult<Vec<SubmissionStatusLog>> {
        self.store.status_log(entity).await
    }
}
