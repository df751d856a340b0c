//! Job executor implementation
//!
//! Runs the cleanup, then the download and export branches concurrently,
//! dispatching one unit per object key and per table to the worker pool.

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::join;
use tracing::{debug, error, info, warn};

use crate::{
    config::JobParams,
    progress::{EntryStatus, Phase, ProgressReporter},
};

use super::{
    cleanup::{CleanupOutcome, cleanup_export_dir},
    export::{select_all, split_tables, to_csv},
    layout::{
        ExportLayout, InvalidName, create_world_writable_dir, make_world_writable, partial_path,
    },
    pool::fan_out,
    storage::{database, objstore},
};

/// Coordinates the object store, the database and the export tree.
pub struct JobExecutor<O, D> {
    pub objstore: O,
    pub database: D,
    pub shared_volume: PathBuf,
    pub concurrency: usize,
    pub reporter: Arc<dyn ProgressReporter>,
}

/// Error type for job execution.
#[derive(Debug, thiserror::Error)]
pub enum JobError<OE, DE> {
    #[error("objstore: {0}")]
    ObjectStorage(OE),
    #[error("database: {0}")]
    Database(DE),
    #[error("{path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("csv: {0}")]
    Csv(csv::Error),
    #[error(transparent)]
    InvalidName(InvalidName),
}

impl<OE, DE> JobError<OE, DE> {
    fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |error| Self::Io { path, error }
    }
}

/// Outcome of one fan-out unit.
#[derive(Debug)]
pub struct UnitOutcome<E> {
    pub item: String,
    pub result: Result<PathBuf, E>,
}

/// What a run produced.
#[derive(Debug)]
pub struct JobReport<E> {
    pub cleanup: CleanupOutcome,
    /// `Err` when listing failed and no download ran.
    pub downloads: Result<Vec<UnitOutcome<E>>, E>,
    pub exports: Vec<UnitOutcome<E>>,
}

impl<E> JobReport<E> {
    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    pub fn failure_count(&self) -> usize {
        let downloads = match &self.downloads {
            Ok(units) => units.iter().filter(|unit| unit.result.is_err()).count(),
            Err(_) => 1,
        };
        downloads + self.exports.iter().filter(|unit| unit.result.is_err()).count()
    }

    /// Paths written by successful units, downloads first.
    pub fn written(&self) -> impl Iterator<Item = &PathBuf> {
        self.downloads
            .iter()
            .flatten()
            .chain(&self.exports)
            .filter_map(|unit| unit.result.as_ref().ok())
    }
}

pub type Error<O, D> = JobError<<O as objstore::Client>::Error, <D as database::Client>::Error>;

impl<O: objstore::Client, D: database::Client> JobExecutor<O, D>
where
    O::Error: std::fmt::Display,
    D::Error: std::fmt::Display,
{
    pub fn layout(&self, params: &JobParams) -> Result<ExportLayout, Error<O, D>> {
        ExportLayout::new(&self.shared_volume, params).map_err(JobError::InvalidName)
    }

    /// Remove the previous export tree.
    pub async fn cleanup(&self, layout: &ExportLayout) -> Result<CleanupOutcome, Error<O, D>> {
        cleanup_export_dir(layout.root())
            .await
            .map_err(JobError::io(layout.root()))
    }

    pub async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, Error<O, D>> {
        let keys = self
            .objstore
            .list_keys(bucket, prefix)
            .await
            .map_err(JobError::ObjectStorage)?;
        info!(bucket, prefix, count = keys.len(), "listed objects");
        Ok(keys)
    }

    /// Fetch one object into the export tree and return the local path.
    pub async fn download(
        &self,
        layout: &ExportLayout,
        bucket: &str,
        key: &str,
    ) -> Result<PathBuf, Error<O, D>> {
        let dest = layout.object_path(key).map_err(JobError::InvalidName)?;
        if let Some(dir) = dest.parent() {
            create_world_writable_dir(layout.shared_volume(), dir)
                .await
                .map_err(JobError::io(dir))?;
        }
        debug!(bucket, key, dest = %dest.display(), "download object");
        let partial = partial_path(&dest);
        let fetched = self
            .objstore
            .download(bucket, key, &partial)
            .await
            .map_err(JobError::ObjectStorage);
        if let Err(e) = fetched {
            discard(&partial).await;
            return Err(e);
        }
        commit::<O::Error, D::Error>(&partial, &dest).await?;
        Ok(dest)
    }

    /// Dump one table as CSV into the export tree and return the file path.
    pub async fn export_table(
        &self,
        layout: &ExportLayout,
        table: &str,
    ) -> Result<PathBuf, Error<O, D>> {
        let dest = layout.table_path(table).map_err(JobError::InvalidName)?;
        let statement = select_all(table);
        debug!(%statement, "query table");
        let rows = self
            .database
            .fetch_all(&statement)
            .await
            .map_err(JobError::Database)?;
        create_world_writable_dir(layout.shared_volume(), layout.tables_dir())
            .await
            .map_err(JobError::io(layout.tables_dir()))?;
        let body = to_csv(&rows).map_err(JobError::Csv)?;
        let partial = partial_path(&dest);
        if let Err(e) = tokio::fs::write(&partial, body).await {
            discard(&partial).await;
            return Err(JobError::io(&partial)(e));
        }
        commit::<O::Error, D::Error>(&partial, &dest).await?;
        debug!(table, rows = rows.rows.len(), dest = %dest.display(), "exported table");
        Ok(dest)
    }

    async fn track<F>(&self, entry: String, unit: F) -> UnitOutcome<Error<O, D>>
    where
        F: Future<Output = Result<PathBuf, Error<O, D>>>,
    {
        self.reporter.update_entry(&entry, EntryStatus::Running);
        let result = unit.await;
        match &result {
            Ok(path) => {
                info!(%entry, path = %path.display(), "unit finished");
                self.reporter.update_entry(&entry, EntryStatus::Done);
            }
            Err(e) => {
                error!(%entry, error = %e, "unit failed");
                self.reporter
                    .update_entry(&entry, EntryStatus::Failed(e.to_string()));
            }
        }
        UnitOutcome {
            item: entry,
            result,
        }
    }

    async fn download_all(
        &self,
        layout: &ExportLayout,
        params: &JobParams,
    ) -> Result<Vec<UnitOutcome<Error<O, D>>>, Error<O, D>> {
        let bucket = params.s3_bucket_name.as_str();
        let keys = self
            .list_keys(bucket, &params.s3_files_prefix)
            .await
            .inspect_err(|e| {
                error!(error = %e, bucket, "failed to list objects");
                self.reporter.log_error(&format!("listing failed: {e}"));
            })?;
        self.reporter
            .register_entries(keys.iter().map(|key| download_entry(key)).collect());
        self.reporter.set_phase(Phase::Transferring);
        let outcomes = fan_out(keys, self.concurrency, |key| async move {
            let mut outcome = self
                .track(download_entry(&key), self.download(layout, bucket, &key))
                .await;
            outcome.item = key;
            outcome
        })
        .await;
        Ok(outcomes)
    }

    async fn export_all(
        &self,
        layout: &ExportLayout,
        params: &JobParams,
    ) -> Vec<UnitOutcome<Error<O, D>>> {
        let tables = split_tables(&params.mysql_tables_list);
        info!(count = tables.len(), "enumerated tables");
        self.reporter
            .register_entries(tables.iter().map(|table| export_entry(table)).collect());
        fan_out(tables, self.concurrency, |table| async move {
            let mut outcome = self
                .track(export_entry(&table), self.export_table(layout, &table))
                .await;
            outcome.item = table;
            outcome
        })
        .await
    }

    /// Execute the whole job.
    ///
    /// Returns `Err` when the directory parameters are unusable or cleanup
    /// fails; unit failures are in the report.
    pub async fn run(&self, params: &JobParams) -> Result<JobReport<Error<O, D>>, Error<O, D>> {
        let layout = self.layout(params).inspect_err(|e| {
            error!(error = %e, "invalid export layout");
            self.reporter.set_phase(Phase::Failed(e.to_string()));
        })?;

        self.reporter.set_phase(Phase::Cleaning);
        let cleanup = self.cleanup(&layout).await.inspect_err(|e| {
            error!(error = %e, "failed to clean export directory");
            self.reporter.set_phase(Phase::Failed(e.to_string()));
        })?;
        self.reporter.log_info(&cleanup.to_string());

        self.reporter.set_phase(Phase::Listing);
        let (downloads, exports) = join!(
            self.download_all(&layout, params),
            self.export_all(&layout, params),
        );

        let report = JobReport {
            cleanup,
            downloads,
            exports,
        };
        if report.is_success() {
            self.reporter.set_phase(Phase::Completed);
        } else {
            self.reporter.set_phase(Phase::Failed(format!(
                "{} unit(s) failed",
                report.failure_count()
            )));
        }
        Ok(report)
    }
}

/// Publish a fully written `partial` file at `dest`, world-writable.
async fn commit<OE, DE>(partial: &Path, dest: &Path) -> Result<(), JobError<OE, DE>> {
    if let Err(e) = make_world_writable(partial).await {
        discard(partial).await;
        return Err(JobError::io(partial)(e));
    }
    if let Err(e) = tokio::fs::rename(partial, dest).await {
        discard(partial).await;
        return Err(JobError::io(dest)(e));
    }
    Ok(())
}

async fn discard(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => debug!(path = %partial.display(), "removed partial file"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %partial.display(), error = %e, "failed to remove partial file"),
    }
}

fn download_entry(key: &str) -> String {
    format!("download {key}")
}

fn export_entry(table: &str) -> String {
    format!("export {table}")
}
