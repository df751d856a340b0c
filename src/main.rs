use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use data_extraction::{
    config::Config,
    deploy,
    job::JobExecutor,
    progress::{NullReporter, ProgressReporter, create_reporter},
};
use tracing::{error, info};

#[derive(Parser)]
#[clap(about = "Export bucket objects and database tables into a shared volume")]
struct Opts {
    #[clap(short, long, env = "DATA_EXTRACTION_CONFIG")]
    config: PathBuf,
    /// Override one job parameter, e.g. `-p s3_files_prefix=bank2024-01-01`
    #[clap(short, long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,
    #[clap(long, env = "DATA_EXTRACTION_DATABASE_URL", hide_env_values = true)]
    database_url: Option<String>,
    #[clap(long)]
    no_progress: bool,
}

async fn run(opts: Opts) -> anyhow::Result<()> {
    let mut config = Config::load(&opts.config)
        .await
        .with_context(|| "load config")?;
    for assignment in &opts.params {
        config
            .params
            .apply_override(assignment)
            .with_context(|| format!("apply --param {assignment}"))?;
    }
    if let Some(url) = opts.database_url {
        config.database.url = url;
    }
    info!(params = ?config.params, shared_volume = %config.shared_volume.display(), "starting job");

    let reporter: Arc<dyn ProgressReporter> = if opts.no_progress {
        Arc::new(NullReporter)
    } else {
        create_reporter()
    };
    let executor = JobExecutor {
        objstore: deploy::ObjectStore::from_config(&config.object_store).await,
        database: deploy::Database::connect(&config.database.url)
            .await
            .with_context(|| "connect database")?,
        shared_volume: config.shared_volume.clone(),
        concurrency: config.concurrency,
        reporter: reporter.clone(),
    };
    let report = executor.run(&config.params).await;
    reporter.finish();
    let report = report.with_context(|| "clean export directory")?;

    info!(cleanup = %report.cleanup, written = report.written().count(), "job finished");
    if !report.is_success() {
        bail!("{} unit(s) failed", report.failure_count());
    }
    Ok(())
}

fn main() {
    let opts = Opts::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!(?e, "failed to start runtime");
            std::process::exit(1);
        }
    };
    if let Err(e) = runtime.block_on(run(opts)) {
        error!(?e, "critical error");
        std::process::exit(1);
    }
}
