//! Payroll run lifecycle.
//!
//! A run is created DRAFT against a snapshot of its tenant's settings,
//! executed any number of times while DRAFT, then locked once. Corrections to
//! a locked run go into a new adjustment run that references it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{EmployeeFailure, RunReport, calculate_run};
use crate::config::{SettingsRegistry, SettingsSnapshot};
use crate::error::{EngineError, EngineResult};
use crate::models::{AdjustmentRef, EmployeeInputs, PayPeriod, PayrollRun};
use crate::store::PayrollStore;

/// Creates, executes and locks payroll runs.
pub struct PayrollRunService {
    registry: Arc<SettingsRegistry>,
    store: Arc<dyn PayrollStore>,
    snapshots: Mutex<HashMap<Uuid, SettingsSnapshot>>,
}

impl PayrollRunService {
    /// Creates a service over a settings registry and a store.
    pub fn new(registry: Arc<SettingsRegistry>, store: Arc<dyn PayrollStore>) -> Self {
        Self {
            registry,
            store,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a DRAFT run, snapshotting the tenant's current settings.
    pub async fn create_run(&self, tenant_id: &str, period: PayPeriod) -> EngineResult<PayrollRun> {
        let snapshot = self.registry.snapshot(tenant_id)?;
        let run = PayrollRun::new(tenant_id, period, snapshot.version);
        self.store.create_run(run.clone()).await?;
        self.remember(run.id, snapshot)?;

        info!(
            run_id = %run.id,
            tenant_id,
            settings_version = run.settings_version,
            "Created payroll run"
        );
        Ok(run)
    }

    /// Starts a DRAFT adjustment of a LOCKED run for the same tenant and
    /// period.
    ///
    /// # Errors
    ///
    /// `InvalidAdjustment` when the reason is blank or the original is not
    /// locked; `RunNotFound` when the original does not exist.
    pub async fn create_adjustment_run(
        &self,
        original_run_id: Uuid,
        reason: &str,
    ) -> EngineResult<PayrollRun> {
        if reason.trim().is_empty() {
            return Err(EngineError::InvalidAdjustment {
                original_run_id,
                message: "a reason is required".to_string(),
            });
        }

        let original = self.store.get_run(original_run_id).await?;
        if !original.is_locked() {
            return Err(EngineError::InvalidAdjustment {
                original_run_id,
                message: format!("original run is {}", original.status),
            });
        }

        let snapshot = self.registry.snapshot(&original.tenant_id)?;
        let mut run = PayrollRun::new(&original.tenant_id, original.period.clone(), snapshot.version);
        run.adjustment_of = Some(AdjustmentRef {
            original_run_id,
            reason: reason.trim().to_string(),
        });
        // The store re-checks the original under its own lock.
        self.store.create_run(run.clone()).await?;
        self.remember(run.id, snapshot)?;

        info!(
            run_id = %run.id,
            original_run_id = %original_run_id,
            tenant_id = %run.tenant_id,
            "Created adjustment run"
        );
        Ok(run)
    }

    /// Computes and stores payslips for a DRAFT run.
    ///
    /// Inputs for a different period fail for that employee only. Store
    /// failures, including the run being locked meanwhile, abort the call.
    pub async fn execute(
        &self,
        run_id: Uuid,
        inputs: Vec<EmployeeInputs>,
    ) -> EngineResult<RunReport> {
        let run = self.store.get_run(run_id).await?;
        if run.is_locked() {
            return Err(EngineError::RunLocked { run_id });
        }
        let snapshot = self.snapshot_for(&run)?;

        let in_period = |input: &EmployeeInputs| {
            input.period.start_date == run.period.start_date
                && input.period.end_date == run.period.end_date
        };
        // An employee with inputs both in and out of the period stays in the
        // batch, where the repeated inputs are reported together.
        let in_period_ids: HashSet<String> = inputs
            .iter()
            .filter(|&input| in_period(input))
            .map(|input| input.employee_id.clone())
            .collect();
        let (inputs, mismatched): (Vec<_>, Vec<_>) = inputs
            .into_iter()
            .partition(|input| in_period(input) || in_period_ids.contains(&input.employee_id));

        let mut report = calculate_run(inputs, Arc::clone(&snapshot.settings)).await?;
        for input in mismatched {
            warn!(run_id = %run_id, employee_id = %input.employee_id, "Inputs for another period");
            report.failures.push(EmployeeFailure {
                error: EngineError::calculation(
                    &input.employee_id,
                    format!(
                        "inputs cover {} to {}, run covers {} to {}",
                        input.period.start_date,
                        input.period.end_date,
                        run.period.start_date,
                        run.period.end_date
                    ),
                ),
                employee_id: input.employee_id,
            });
        }
        report
            .failures
            .sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

        let mut revision = run.revision;
        for payslip in &report.payslips {
            revision = self
                .store
                .create_payslip_lines(run_id, payslip.clone())
                .await?;
        }

        info!(
            run_id = %run_id,
            payslips = report.payslips.len(),
            failures = report.failures.len(),
            revision,
            "Executed payroll run"
        );
        Ok(report)
    }

    /// Locks a run if no payslip was written since `expected_revision`.
    pub async fn lock(&self, run_id: Uuid, expected_revision: u64) -> EngineResult<PayrollRun> {
        let run = self.store.lock_run(run_id, expected_revision).await?;
        if let Ok(mut snapshots) = self.snapshots.lock() {
            snapshots.remove(&run_id);
        }
        info!(run_id = %run_id, revision = run.revision, "Locked payroll run");
        Ok(run)
    }

    /// Locks a run at its current revision.
    pub async fn lock_current(&self, run_id: Uuid) -> EngineResult<PayrollRun> {
        let run = self.store.get_run(run_id).await?;
        self.lock(run_id, run.revision).await
    }

    /// Loads a run.
    pub async fn get_run(&self, run_id: Uuid) -> EngineResult<PayrollRun> {
        self.store.get_run(run_id).await
    }

    fn remember(&self, run_id: Uuid, snapshot: SettingsSnapshot) -> EngineResult<()> {
        self.snapshots
            .lock()
            .map_err(|_| EngineError::Store {
                message: "run snapshot map poisoned".to_string(),
            })?
            .insert(run_id, snapshot);
        Ok(())
    }

    // Falls back to the registry only when its version still matches the run.
    fn snapshot_for(&self, run: &PayrollRun) -> EngineResult<SettingsSnapshot> {
        let remembered = self
            .snapshots
            .lock()
            .map_err(|_| EngineError::Store {
                message: "run snapshot map poisoned".to_string(),
            })?
            .get(&run.id)
            .cloned();
        if let Some(snapshot) = remembered {
            return Ok(snapshot);
        }

        let current = self.registry.snapshot(&run.tenant_id)?;
        if current.version != run.settings_version {
            return Err(EngineError::invalid_config(
                "settings_version",
                format!(
                    "run {} was started with settings v{}, registry holds v{}",
                    run.id, run.settings_version, current.version
                ),
            ));
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RunStatus;
    use crate::store::MemoryStore;
    use crate::test_support::{dec, sample_inputs, sample_settings};

    fn service() -> (PayrollRunService, Arc<SettingsRegistry>) {
        let registry = Arc::new(SettingsRegistry::new());
        registry.replace(sample_settings()).unwrap();
        let service = PayrollRunService::new(registry.clone(), Arc::new(MemoryStore::new()));
        (service, registry)
    }

    fn march() -> PayPeriod {
        PayPeriod::month(2026, 3).unwrap()
    }

    #[tokio::test]
    async fn test_create_run_records_settings_version() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();
        assert_eq!(run.status, RunStatus::Draft);
        assert_eq!(run.settings_version, 1);
        assert_eq!(run.revision, 0);
    }

    #[tokio::test]
    async fn test_create_run_for_unknown_tenant() {
        let (service, _) = service();
        assert!(matches!(
            service.create_run("initech", march()).await,
            Err(EngineError::InvalidConfiguration { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_writes_payslips() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();

        let report = service
            .execute(run.id, vec![sample_inputs("emp_001"), sample_inputs("emp_002")])
            .await
            .unwrap();
        assert!(report.is_complete());
        assert_eq!(report.payslips.len(), 2);
        assert_eq!(service.get_run(run.id).await.unwrap().revision, 2);
    }

    #[tokio::test]
    async fn test_execute_uses_snapshot_from_run_start() {
        let (service, registry) = service();
        let run = service.create_run("acme", march()).await.unwrap();

        let mut changed = sample_settings();
        changed.rounding.nearest = dec("7000");
        registry.replace(changed).unwrap();

        let report = service
            .execute(run.id, vec![sample_inputs("emp_001")])
            .await
            .unwrap();
        assert_eq!(report.payslips[0].totals.net_salary, dec("9000"));
        assert_eq!(service.get_run(run.id).await.unwrap().settings_version, 1);

        let later = service.create_run("acme", march()).await.unwrap();
        assert_eq!(later.settings_version, 2);
        let report = service
            .execute(later.id, vec![sample_inputs("emp_001")])
            .await
            .unwrap();
        assert_eq!(report.payslips[0].totals.net_salary, dec("7000"));
    }

    #[tokio::test]
    async fn test_execute_reports_period_mismatch() {
        let (service, _) = service();
        let run = service.create_run("acme", PayPeriod::month(2026, 4).unwrap()).await.unwrap();

        let report = service
            .execute(run.id, vec![sample_inputs("emp_001")])
            .await
            .unwrap();
        assert!(report.payslips.is_empty());
        assert!(matches!(
            report.failure("emp_001"),
            Some(EngineError::CalculationError { .. })
        ));
    }

    #[tokio::test]
    async fn test_execute_reports_repeated_employee_once() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();

        let mut other_period = sample_inputs("emp_002");
        other_period.period = PayPeriod::month(2026, 4).unwrap();
        let inputs = vec![
            sample_inputs("emp_001"),
            sample_inputs("emp_001"),
            sample_inputs("emp_002"),
            other_period,
            sample_inputs("emp_003"),
        ];

        let report = service.execute(run.id, inputs).await.unwrap();
        assert_eq!(report.payslips.len(), 1);
        assert!(report.payslip("emp_003").is_some());
        assert_eq!(report.failures.len(), 2);
        for employee_id in ["emp_001", "emp_002"] {
            assert!(matches!(
                report.failure(employee_id),
                Some(EngineError::CalculationError { message, .. }) if message.contains("2 input sets")
            ));
        }
        assert_eq!(service.get_run(run.id).await.unwrap().revision, 1);
    }

    #[tokio::test]
    async fn test_locked_run_rejects_execution() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();
        service.execute(run.id, vec![sample_inputs("emp_001")]).await.unwrap();

        let locked = service.lock_current(run.id).await.unwrap();
        assert_eq!(locked.status, RunStatus::Locked);

        assert!(matches!(
            service.execute(run.id, vec![sample_inputs("emp_002")]).await,
            Err(EngineError::RunLocked { .. })
        ));
    }

    #[tokio::test]
    async fn test_lock_after_concurrent_write_conflicts() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();
        let seen = service.get_run(run.id).await.unwrap().revision;

        service.execute(run.id, vec![sample_inputs("emp_001")]).await.unwrap();

        assert!(matches!(
            service.lock(run.id, seen).await,
            Err(EngineError::LockConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_adjustment_run() {
        let (service, _) = service();
        let run = service.create_run("acme", march()).await.unwrap();

        assert!(matches!(
            service.create_adjustment_run(run.id, "missed overtime").await,
            Err(EngineError::InvalidAdjustment { .. })
        ));

        service.lock_current(run.id).await.unwrap();
        assert!(matches!(
            service.create_adjustment_run(run.id, "   ").await,
            Err(EngineError::InvalidAdjustment { .. })
        ));

        let adjustment = service
            .create_adjustment_run(run.id, "missed overtime")
            .await
            .unwrap();
        assert!(adjustment.is_adjustment());
        assert_eq!(adjustment.period, run.period);
        assert_eq!(
            adjustment.adjustment_of.as_ref().map(|a| a.reason.as_str()),
            Some("missed overtime")
        );

        let report = service
            .execute(adjustment.id, vec![sample_inputs("emp_001")])
            .await
            .unwrap();
        assert!(report.is_complete());
    }

    #[tokio::test]
    async fn test_adjustment_of_unknown_run() {
        let (service, _) = service();
        assert!(matches!(
            service.create_adjustment_run(Uuid::new_v4(), "fix").await,
            Err(EngineError::RunNotFound { .. })
        ));
    }
}
