//! Job execution module
//!
//! This module provides the extraction job: cleanup, object downloads and
//! table exports into the shared export tree.

mod cleanup;
mod executor;
pub mod export;
pub mod layout;
pub mod pool;
pub mod storage;

pub use cleanup::{CleanupOutcome, cleanup_export_dir};
pub use executor::{Error, JobError, JobExecutor, JobReport, UnitOutcome};
