use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read config {path}: {error}")]
    Read {
        path: PathBuf,
        error: std::io::Error,
    },
    #[error("Failed to parse config {path}: {error}")]
    Parse {
        path: PathBuf,
        error: serde_yaml::Error,
    },
    #[error("Unknown job parameter: {0} (expected one of {keys})", keys = JobParams::KEYS.join(", "))]
    UnknownParam(String),
    #[error("Malformed parameter override (expected KEY=VALUE): {0}")]
    MalformedOverride(String),
}

/// Values supplied at job invocation. Immutable once the run starts.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct JobParams {
    pub s3_bucket_name: String,
    pub s3_files_prefix: String,
    pub result_path_in_shared_volume: String,
    pub result_path_prefix_s3: String,
    pub mysql_tables_list: String,
    pub result_path_prefix_mysql: String,
}

impl JobParams {
    pub const KEYS: [&'static str; 6] = [
        "s3_bucket_name",
        "s3_files_prefix",
        "result_path_in_shared_volume",
        "result_path_prefix_s3",
        "mysql_tables_list",
        "result_path_prefix_mysql",
    ];

    /// Defaults that embed `today` (formatted as `YYYY-MM-DD`).
    pub fn for_date(today: chrono::NaiveDate) -> Self {
        let today = today.format("%Y-%m-%d");
        Self {
            s3_bucket_name: "bank".into(),
            s3_files_prefix: format!("bank{today}.csv"),
            result_path_in_shared_volume: "exported_by_airflow".into(),
            result_path_prefix_s3: "from_minio".into(),
            mysql_tables_list: format!("`bank{today}`"),
            result_path_prefix_mysql: "from_mysql".into(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) -> Result<(), Error> {
        let slot = match key {
            "s3_bucket_name" => &mut self.s3_bucket_name,
            "s3_files_prefix" => &mut self.s3_files_prefix,
            "result_path_in_shared_volume" => &mut self.result_path_in_shared_volume,
            "result_path_prefix_s3" => &mut self.result_path_prefix_s3,
            "mysql_tables_list" => &mut self.mysql_tables_list,
            "result_path_prefix_mysql" => &mut self.result_path_prefix_mysql,
            _ => return Err(Error::UnknownParam(key.to_owned())),
        };
        *slot = value.into();
        Ok(())
    }

    /// Apply a `KEY=VALUE` override. Only the first `=` separates; the value may contain more.
    pub fn apply_override(&mut self, assignment: &str) -> Result<(), Error> {
        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| Error::MalformedOverride(assignment.to_owned()))?;
        self.set(key, value)
    }
}

impl Default for JobParams {
    fn default() -> Self {
        Self::for_date(chrono::Local::now().date_naive())
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectStore {
    S3 {
        endpoint: Option<String>,
        #[serde(default = "default_region")]
        region: String,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        #[serde(default)]
        force_path_style: bool,
    },
    Local {
        root: PathBuf,
    },
}

fn default_region() -> String {
    "us-east-1".into()
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::S3 {
            endpoint: None,
            region: default_region(),
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct Database {
    pub url: String,
}

fn default_shared_volume() -> PathBuf {
    PathBuf::from("/mnt/shared")
}

fn default_concurrency() -> usize {
    num_cpus::get()
}

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_shared_volume")]
    pub shared_volume: PathBuf,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub params: JobParams,
    #[serde(default)]
    pub object_store: ObjectStore,
    pub database: Database,
}

impl Config {
    pub fn parse(path: &Path, source: &str) -> Result<Self, Error> {
        serde_yaml::from_str(source).map_err(|error| Error::Parse {
            path: path.to_owned(),
            error,
        })
    }

    pub async fn load(path: &Path) -> Result<Self, Error> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|error| Error::Read {
                path: path.to_owned(),
                error,
            })?;
        Self::parse(path, &source)
    }
}
