use std::path::{Path, PathBuf};

use crate::job;

/// Object store backed by a directory: `<root>/<bucket>/<key>`.
pub struct Client {
    root: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid glob pattern: {0}")]
    Pattern(glob::PatternError),
    #[error("failed to walk bucket: {0}")]
    Walk(glob::GlobError),
    #[error("listing task failed: {0}")]
    Join(tokio::task::JoinError),
    #[error("failed to copy {key}: {error}")]
    Copy { key: String, error: std::io::Error },
}

impl Client {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        self.root.join(bucket)
    }
}

fn to_key(bucket_dir: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(bucket_dir).ok()?;
    let parts = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Some(parts.join("/"))
}

/// Sorted keys of the regular files under `bucket_dir` starting with `prefix`.
fn walk_bucket(bucket_dir: &Path, prefix: &str) -> Result<Vec<String>, Error> {
    let pattern = format!(
        "{}/**/*",
        glob::Pattern::escape(&bucket_dir.to_string_lossy())
    );
    let mut keys = Vec::new();
    for path in glob::glob(&pattern).map_err(Error::Pattern)? {
        let path = path.map_err(Error::Walk)?;
        if !path.is_file() {
            continue;
        }
        if let Some(key) = to_key(bucket_dir, &path).filter(|key| key.starts_with(prefix)) {
            keys.push(key);
        }
    }
    keys.sort();
    Ok(keys)
}

impl job::storage::objstore::Client for Client {
    type Error = Error;

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, Self::Error> {
        let bucket_dir = self.bucket_dir(bucket);
        let prefix = prefix.to_owned();
        tokio::task::spawn_blocking(move || walk_bucket(&bucket_dir, &prefix))
            .await
            .map_err(Error::Join)?
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), Self::Error> {
        tokio::fs::copy(self.bucket_dir(bucket).join(key), dest)
            .await
            .map_err(|error| Error::Copy {
                key: key.to_owned(),
                error,
            })?;
        Ok(())
    }
}
