use std::str::FromStr;

use sqlx::{Column as _, Executor as _, Row as _, Statement as _};
use tracing::error;

use crate::job::{self, storage::database::Table};

pub struct MySqlDatabase {
    pool: sqlx::MySqlPool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("mysql error: {0}")]
    MySql(sqlx::Error),
}

pub struct Client {
    pool: sqlx::MySqlPool,
}

impl MySqlDatabase {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let options = sqlx::mysql::MySqlConnectOptions::from_str(url)?;
        let pool = sqlx::mysql::MySqlPoolOptions::new()
            .connect_with(options)
            .await
            .inspect_err(|error| error!(%error, "Failed to connect to mysql"))?;
        Ok(Self { pool })
    }

    pub fn client(&self) -> Client {
        Client {
            pool: self.pool.clone(),
        }
    }
}

impl job::storage::database::Client for Client {
    type Error = Error;

    // Runs over the text protocol (no bind parameters), so every value
    // arrives as its textual rendering and can be read as bytes whatever the
    // column type is.
    async fn fetch_all(&self, statement: &str) -> Result<Table, Self::Error> {
        let rows = sqlx::raw_sql(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::MySql)?;
        let columns = match rows.first() {
            Some(row) => row
                .columns()
                .iter()
                .map(|column| column.name().to_owned())
                .collect(),
            None => self
                .pool
                .prepare(statement)
                .await
                .map_err(Error::MySql)?
                .columns()
                .iter()
                .map(|column| column.name().to_owned())
                .collect(),
        };
        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| {
                        row.try_get_unchecked::<Option<Vec<u8>>, _>(index)
                            .map(|cell| {
                                cell.map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::MySql)?;
        Ok(Table { columns, rows })
    }
}
