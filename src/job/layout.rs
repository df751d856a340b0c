//! Export directory layout
//!
//! Maps object keys and table names to their destination under the shared
//! volume, and creates directories that stay world-writable whatever the
//! process umask is.

use std::{
    io,
    path::{Component, Path, PathBuf},
};

use crate::config::JobParams;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum InvalidName {
    #[error("invalid object key: {0:?}")]
    Key(String),
    #[error("invalid table name: {0:?}")]
    Table(String),
    #[error("{param} must be a relative path without `..`: {value:?}")]
    Dir { param: &'static str, value: String },
}

/// Destinations for one run.
///
/// ```text
/// <shared>/<result>/<objects>/<key dir>/<key file>
/// <shared>/<result>/<tables>/<table>.csv
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportLayout {
    shared_volume: PathBuf,
    root: PathBuf,
    objects: PathBuf,
    tables: PathBuf,
}

impl ExportLayout {
    /// Fails when a directory parameter could point outside the shared volume.
    /// The result directory must also name something below it, since cleanup
    /// deletes it recursively.
    pub fn new(
        shared_volume: impl Into<PathBuf>,
        params: &JobParams,
    ) -> Result<Self, InvalidName> {
        let shared_volume = shared_volume.into();
        let result = relative_dir(
            "result_path_in_shared_volume",
            &params.result_path_in_shared_volume,
        )?;
        if result.as_os_str().is_empty() {
            return Err(InvalidName::Dir {
                param: "result_path_in_shared_volume",
                value: params.result_path_in_shared_volume.clone(),
            });
        }
        let root = shared_volume.join(result);
        Ok(Self {
            objects: root.join(relative_dir("result_path_prefix_s3", &params.result_path_prefix_s3)?),
            tables: root.join(relative_dir(
                "result_path_prefix_mysql",
                &params.result_path_prefix_mysql,
            )?),
            root,
            shared_volume,
        })
    }

    pub fn shared_volume(&self) -> &Path {
        &self.shared_volume
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn tables_dir(&self) -> &Path {
        &self.tables
    }

    /// Local file for `key`, keeping the key's directories and its base name.
    pub fn object_path(&self, key: &str) -> Result<PathBuf, InvalidName> {
        let invalid = || InvalidName::Key(key.to_owned());
        if key.starts_with('/') {
            return Err(invalid());
        }
        let (dir, name) = key.rsplit_once('/').unwrap_or(("", key));
        if matches!(name, "" | "." | "..") {
            return Err(invalid());
        }
        let mut path = self.objects.clone();
        for component in dir.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(invalid()),
                component => path.push(component),
            }
        }
        path.push(name);
        Ok(path)
    }

    pub fn table_path(&self, table: &str) -> Result<PathBuf, InvalidName> {
        if matches!(table, "" | "." | "..") || table.contains(['/', '\\']) {
            return Err(InvalidName::Table(table.to_owned()));
        }
        Ok(self.tables.join(format!("{table}.csv")))
    }
}

/// Normal components of `value`, `.` dropped.
fn relative_dir(param: &'static str, value: &str) -> Result<PathBuf, InvalidName> {
    let mut dir = PathBuf::new();
    for component in Path::new(value).components() {
        match component {
            Component::Normal(part) => dir.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(InvalidName::Dir {
                    param,
                    value: value.to_owned(),
                });
            }
        }
    }
    Ok(dir)
}

/// Sibling of `dest` that receives the contents until they are complete.
pub fn partial_path(dest: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(dest.file_name().unwrap_or_default());
    name.push(".part");
    dest.with_file_name(name)
}

#[cfg(unix)]
pub async fn make_world_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777)).await
}

#[cfg(not(unix))]
pub async fn make_world_writable(_path: &Path) -> io::Result<()> {
    Ok(())
}

/// Create `dir` and its missing ancestors below `base`.
///
/// `base` itself is created if missing but its mode is left alone; every
/// directory created below it is set to `0o777`. Concurrent callers may race
/// on the same ancestors.
pub async fn create_world_writable_dir(base: &Path, dir: &Path) -> io::Result<()> {
    let relative = dir.strip_prefix(base).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is not below {}", dir.display(), base.display()),
        )
    })?;
    tokio::fs::create_dir_all(base).await?;
    let mut current = base.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match tokio::fs::create_dir(&current).await {
            Ok(()) => make_world_writable(&current).await?,
            Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
            Err(error) => return Err(error),
        }
    }
    Ok(())
}
