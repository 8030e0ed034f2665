//! Monthly Payroll Engine
//!
//! This crate computes monthly net pay from attendance, salary structure and
//! per-tenant policy settings, and drives the payroll-compliance and bank
//! wage-file submission workflows through strict state machines.
//!
//! Persistence is supplied by the embedder through the [`store`] traits; an
//! in-memory implementation is included.

#![warn(missing_docs)]

pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod run;
pub mod store;
pub mod submission;

#[cfg(test)]
pub(crate) mod test_support;
