//! Performance benchmarks for the payroll engine.
//!
//! This benchmark suite covers:
//! - Single payslip with a month of attendance
//! - Concurrent runs of 100 and 1000 employees
//! - Scaling with attendance days per employee
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use std::sync::Arc;

use chrono::NaiveDate;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use payroll_engine::calculation::{calculate_payslip, calculate_run};
use payroll_engine::config::{PayrollSettings, SettingsLoader};
use payroll_engine::models::{
    AttendanceRecord, AttendanceStatus, EmployeeInputs, ManualDeduction, PayPeriod,
    SalaryAssignment, StructureComponent,
};

/// Loads one tenant's settings from the bundled configuration.
fn load_settings(tenant_id: &str) -> PayrollSettings {
    let loader = SettingsLoader::load("./config").expect("Failed to load config");
    loader.get_settings(tenant_id).unwrap().clone()
}

/// Creates March 2026 inputs with `days` attendance records.
///
/// Every seventh day is late, every tenth has overtime and every fifteenth is
/// an absence.
fn create_inputs(employee_id: &str, days: u32) -> EmployeeInputs {
    let attendance = (1..=days.min(31))
        .map(|day| {
            let status = if day % 15 == 0 {
                AttendanceStatus::Absent
            } else {
                AttendanceStatus::Present
            };
            AttendanceRecord {
                employee_id: employee_id.to_string(),
                date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
                status,
                late_minutes: if day % 7 == 0 { 40 } else { 0 },
                overtime_minutes: if day % 10 == 0 { 120 } else { 0 },
                overtime_split: None,
            }
        })
        .collect();

    EmployeeInputs {
        employee_id: employee_id.to_string(),
        period: PayPeriod::month(2026, 3).unwrap(),
        assignment: Some(SalaryAssignment {
            employee_id: employee_id.to_string(),
            base_salary: "9000".parse().unwrap(),
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            effective_to: None,
            components: vec![StructureComponent {
                code: "HOUSING".to_string(),
                name: "Housing allowance".to_string(),
                amount: "2500".parse().unwrap(),
                prorate: true,
                insurable: true,
                overtime_eligible: true,
            }],
        }),
        attendance,
        manual_deductions: vec![ManualDeduction {
            kind: payroll_engine::config::DeductionKind::Loan,
            amount: "750".parse().unwrap(),
            description: "Loan installment".to_string(),
        }],
        statutory_eligible: true,
    }
}

fn create_batch(count: usize) -> Vec<EmployeeInputs> {
    (0..count)
        .map(|i| create_inputs(&format!("emp_batch_{:04}", i), 22))
        .collect()
}

/// Benchmark: Single payslip with a full month of attendance.
fn bench_single_payslip(c: &mut Criterion) {
    let settings = load_settings("globex");
    let inputs = create_inputs("emp_bench_001", 31);

    c.bench_function("single_payslip", |b| {
        b.iter(|| black_box(calculate_payslip(black_box(&inputs), &settings).unwrap()))
    });
}

/// Benchmark: Run of 100 employees.
fn bench_run_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let settings = Arc::new(load_settings("acme"));
    let inputs = create_batch(100);

    let mut group = c.benchmark_group("run_processing");
    group.throughput(Throughput::Elements(100));

    group.bench_function("run_100", |b| {
        b.to_async(&rt).iter(|| async {
            let report = calculate_run(inputs.clone(), Arc::clone(&settings))
                .await
                .unwrap();
            black_box(report)
        })
    });

    group.finish();
}

/// Benchmark: Run of 1000 employees.
fn bench_run_1000(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let settings = Arc::new(load_settings("acme"));
    let inputs = create_batch(1000);

    let mut group = c.benchmark_group("large_run_processing");
    group.throughput(Throughput::Elements(1000));
    // Reduce sample size for large runs to keep benchmark time reasonable
    group.sample_size(10);

    group.bench_function("run_1000", |b| {
        b.to_async(&rt).iter(|| async {
            let report = calculate_run(inputs.clone(), Arc::clone(&settings))
                .await
                .unwrap();
            black_box(report)
        })
    });

    group.finish();
}

/// Benchmark: Attendance days per employee to understand scaling behavior.
fn bench_scaling(c: &mut Criterion) {
    let settings = load_settings("globex");
    let mut group = c.benchmark_group("scaling");

    for days in [1u32, 7, 14, 22, 31].iter() {
        let inputs = create_inputs("emp_scaling", *days);
        group.throughput(Throughput::Elements(u64::from(*days)));
        group.bench_with_input(BenchmarkId::new("attendance_days", days), days, |b, _| {
            b.iter(|| black_box(calculate_payslip(&inputs, &settings).unwrap()))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_single_payslip,
    bench_run_100,
    bench_run_1000,
    bench_scaling,
);
criterion_main!(benches);
