//! Concrete object-store and database backends

use std::path::Path;

use tracing::info;

use crate::{
    config,
    job::storage::{
        database::{self, Table},
        objstore,
    },
};

pub mod local;
pub mod mysql;
pub mod s3;

/// Backend selected by the `object_store` config section.
pub enum ObjectStore {
    S3(s3::Client),
    Local(local::objstore::Client),
}

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error(transparent)]
    S3(s3::Error),
    #[error(transparent)]
    Local(local::objstore::Error),
}

impl ObjectStore {
    pub async fn from_config(config: &config::ObjectStore) -> Self {
        match config {
            config::ObjectStore::S3 {
                endpoint,
                region,
                access_key_id,
                secret_access_key,
                force_path_style,
            } => {
                let credentials = access_key_id.as_deref().zip(secret_access_key.as_deref()).map(
                    |(access_key_id, secret_access_key)| s3::Credentials {
                        access_key_id,
                        secret_access_key,
                    },
                );
                info!(?endpoint, region, "using s3 object store");
                Self::S3(
                    s3::Client::new(endpoint.as_deref(), region, credentials, *force_path_style)
                        .await,
                )
            }
            config::ObjectStore::Local { root } => {
                info!(root = %root.display(), "using local object store");
                Self::Local(local::objstore::Client::new(root))
            }
        }
    }
}

impl objstore::Client for ObjectStore {
    type Error = ObjectStoreError;

    async fn list_keys(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, Self::Error> {
        match self {
            Self::S3(client) => objstore::Client::list_keys(client, bucket, prefix)
                .await
                .map_err(ObjectStoreError::S3),
            Self::Local(client) => objstore::Client::list_keys(client, bucket, prefix)
                .await
                .map_err(ObjectStoreError::Local),
        }
    }

    async fn download(&self, bucket: &str, key: &str, dest: &Path) -> Result<(), Self::Error> {
        match self {
            Self::S3(client) => objstore::Client::download(client, bucket, key, dest)
                .await
                .map_err(ObjectStoreError::S3),
            Self::Local(client) => objstore::Client::download(client, bucket, key, dest)
                .await
                .map_err(ObjectStoreError::Local),
        }
    }
}

/// Backend selected by the scheme of the database URL.
pub enum Database {
    MySql(mysql::Client),
    Sqlite(local::db::Client),
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    MySql(mysql::Error),
    #[error(transparent)]
    Sqlite(local::db::Error),
}

impl Database {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        if url.starts_with("sqlite:") {
            info!("using sqlite database");
            Ok(Self::Sqlite(local::db::LocalDatabase::open(url).await?.client()))
        } else {
            info!("using mysql database");
            Ok(Self::MySql(mysql::MySqlDatabase::connect(url).await?.client()))
        }
    }
}

impl database::Client for Database {
    type Error = DatabaseError;

    async fn fetch_all(&self, statement: &str) -> Result<Table, Self::Error> {
        match self {
            Self::MySql(client) => database::Client::fetch_all(client, statement)
                .await
                .map_err(DatabaseError::MySql),
            Self::Sqlite(client) => database::Client::fetch_all(client, statement)
                .await
                .map_err(DatabaseError::Sqlite),
        }
    }
}
