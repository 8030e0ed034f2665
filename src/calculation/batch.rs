//! Run-level payslip computation.
//!
//! Employees are computed concurrently on tokio tasks that share one
//! settings snapshot. A failure for one employee never aborts the run; it is
//! collected into the [`RunReport`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::config::PayrollSettings;
use crate::error::{EngineError, EngineResult};
use crate::models::{EmployeeInputs, PayslipResult};

use super::payslip::calculate_payslip;

/// Default number of employees computed at once.
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;

/// An employee whose payslip could not be computed.
#[derive(Debug)]
pub struct EmployeeFailure {
    /// The employee.
    pub employee_id: String,
    /// Why the calculation failed.
    pub error: EngineError,
}

/// The outcome of computing a whole run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Successful payslips, ordered by employee id.
    pub payslips: Vec<PayslipResult>,
    /// Failed employees, ordered by employee id.
    pub failures: Vec<EmployeeFailure>,
}

impl RunReport {
    /// Whether every employee was computed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The payslip of one employee, if it succeeded.
    pub fn payslip(&self, employee_id: &str) -> Option<&PayslipResult> {
        self.payslips.iter().find(|p| p.employee_id == employee_id)
    }

    /// The failure of one employee, if it failed.
    pub fn failure(&self, employee_id: &str) -> Option<&EngineError> {
        self.failures
            .iter()
            .find(|f| f.employee_id == employee_id)
            .map(|f| &f.error)
    }
}

/// Computes payslips for every employee with the default concurrency.
pub async fn calculate_run(
    inputs: Vec<EmployeeInputs>,
    settings: Arc<PayrollSettings>,
) -> EngineResult<RunReport> {
    calculate_run_with_limit(inputs, settings, DEFAULT_MAX_CONCURRENCY).await
}

/// Computes payslips for every employee, at most `max_concurrency` at once.
///
/// An employee supplied more than once gets no payslip; a single
/// `CalculationError` is reported for them instead.
///
/// # Errors
///
/// Fails when `max_concurrency` is zero or the settings are invalid.
/// Per-employee errors are reported in the returned [`RunReport`].
pub async fn calculate_run_with_limit(
    inputs: Vec<EmployeeInputs>,
    settings: Arc<PayrollSettings>,
    max_concurrency: usize,
) -> EngineResult<RunReport> {
    if max_concurrency == 0 {
        return Err(EngineError::invalid_config(
            "max_concurrency",
            "must be greater than zero",
        ));
    }
    settings.validate()?;

    let employee_count = inputs.len();
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    for employee in &inputs {
        *occurrences.entry(employee.employee_id.clone()).or_insert(0) += 1;
    }

    let mut report = RunReport::default();
    let permits = Arc::new(Semaphore::new(max_concurrency));
    let mut tasks = JoinSet::new();

    for employee in inputs {
        let supplied = occurrences.remove(&employee.employee_id);
        match supplied {
            Some(1) => {}
            Some(count) => {
                let error = EngineError::calculation(
                    &employee.employee_id,
                    format!("{} input sets supplied for one employee", count),
                );
                warn!(employee_id = %employee.employee_id, error = %error, "Payslip calculation failed");
                report.failures.push(EmployeeFailure {
                    employee_id: employee.employee_id,
                    error,
                });
                continue;
            }
            // Already reported on its first occurrence.
            None => continue,
        }
        let settings = Arc::clone(&settings);
        let permits = Arc::clone(&permits);
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let result = calculate_payslip(&employee, &settings);
            (employee.employee_id, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(payslip))) => report.payslips.push(payslip),
            Ok((employee_id, Err(error))) => {
                warn!(employee_id = %employee_id, error = %error, "Payslip calculation failed");
                report.failures.push(EmployeeFailure { employee_id, error });
            }
            Err(join_error) => {
                error!(error = %join_error, "Payslip task did not complete");
                report.failures.push(EmployeeFailure {
                    employee_id: String::new(),
                    error: EngineError::Store {
                        message: format!("payslip task did not complete: {}", join_error),
                    },
                });
            }
        }
    }

    report
        .payslips
        .sort_by(|a, b| a.employee_id.cmp(&b.employee_id));
    report
        .failures
        .sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

    info!(
        tenant_id = %settings.tenant_id,
        employees = employee_count,
        succeeded = report.payslips.len(),
        failed = report.failures.len(),
        "Run calculated"
    );
    Ok(report)
}
