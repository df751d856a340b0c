use std::str::FromStr;

use sqlx::{
    Column as _, Decode, Executor as _, Row as _, Sqlite, Statement as _, TypeInfo as _,
    ValueRef as _, sqlite::SqliteRow,
};

use crate::job::{self, storage::database::Table};

pub struct LocalDatabase {
    pool: sqlx::SqlitePool,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sqlite error: {0}")]
    Sqlite(sqlx::Error),
}

pub struct Client {
    pool: sqlx::SqlitePool,
}

impl LocalDatabase {
    pub async fn open(url: &str) -> Result<Self, sqlx::Error> {
        let options = sqlx::sqlite::SqliteConnectOptions::from_str(url)?;
        // A single connection keeps `sqlite::memory:` databases shared.
        let pool = sqlx::pool::PoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &sqlx::SqlitePool {
        &self.pool
    }

    pub fn client(&self) -> Client {
        Client {
            pool: self.pool.clone(),
        }
    }
}

fn render_cell(row: &SqliteRow, index: usize) -> Result<Option<String>, sqlx::Error> {
    let value = row.try_get_raw(index)?;
    if value.is_null() {
        return Ok(None);
    }
    let type_name = value.type_info().name().to_owned();
    let decoded = match type_name.as_str() {
        "INTEGER" => <i64 as Decode<Sqlite>>::decode(value).map(|v| v.to_string()),
        "REAL" => <f64 as Decode<Sqlite>>::decode(value).map(|v| v.to_string()),
        "BLOB" => <Vec<u8> as Decode<Sqlite>>::decode(value)
            .map(|v| String::from_utf8_lossy(&v).into_owned()),
        _ => <String as Decode<Sqlite>>::decode(value),
    };
    decoded.map(Some).map_err(sqlx::Error::Decode)
}

impl job::storage::database::Client for Client {
    type Error = Error;

    async fn fetch_all(&self, statement: &str) -> Result<Table, Self::Error> {
        let rows = sqlx::raw_sql(statement)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Sqlite)?;
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
                .map_err(Error::Sqlite)?
                .columns()
                .iter()
                .map(|column| column.name().to_owned())
                .collect(),
        };
        let rows = rows
            .iter()
            .map(|row| {
                (0..row.len())
                    .map(|index| render_cell(row, index))
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(Error::Sqlite)?;
        Ok(Table { columns, rows })
    }
}
