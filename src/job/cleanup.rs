use std::{fmt, io, path::Path, path::PathBuf};

use tracing::info;

/// Which branch the cleanup took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Deleted(PathBuf),
    NothingToClean,
}

impl fmt::Display for CleanupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted(path) => write!(f, "Deleted directory {}", path.display()),
            Self::NothingToClean => write!(f, "Nothing to clean"),
        }
    }
}

/// Recursively remove `export_root` if it exists.
pub async fn cleanup_export_dir(export_root: &Path) -> io::Result<CleanupOutcome> {
    if !tokio::fs::try_exists(export_root).await? {
        info!(path = %export_root.display(), "nothing to clean");
        return Ok(CleanupOutcome::NothingToClean);
    }
    tokio::fs::remove_dir_all(export_root).await?;
    info!(path = %export_root.display(), "deleted previous export");
    Ok(CleanupOutcome::Deleted(export_root.to_owned()))
}
