use crate::connection::SqliteConnection;
use async_trait::async_trait;
use sqlkit_driver::Error::IoError;
use sqlkit_driver::{Connection, Datasource, Result};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

#[derive(Clone, Debug)]
enum Target {
    File(PathBuf),
    /// Named shared-cache in-memory database; all connections acquired from
    /// the same datasource see the same data while at least one is open.
    Memory(String),
}

/// A SQLite datasource handing out one connection per acquire.
#[derive(Clone, Debug)]
pub struct SqliteDatasource {
    target: Target,
}

impl SqliteDatasource {
    /// Datasource over a database file, created on first acquire.
    #[must_use]
    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            target: Target::File(path.into()),
        }
    }

    /// Datasource over a named in-memory database.
    #[must_use]
    pub fn memory<S: Into<String>>(name: S) -> Self {
        Self {
            target: Target::Memory(name.into()),
        }
    }

    fn open(&self) -> Result<rusqlite::Connection> {
        let connection = match &self.target {
            Target::File(path) => rusqlite::Connection::open(path),
            Target::Memory(name) => {
                rusqlite::Connection::open(format!("file:{name}?mode=memory&cache=shared"))
            }
        };
        connection.map_err(|error| IoError(error.to_string()))
    }
}

#[async_trait]
impl Datasource for SqliteDatasource {
    async fn acquire(&self, auto_commit: bool) -> Result<Box<dyn Connection>> {
        let connection = self.open()?;
        if !auto_commit {
            connection
                .execute_batch("BEGIN")
                .map_err(|error| IoError(error.to_string()))?;
        }
        Ok(Box::new(SqliteConnection::new(
            Arc::new(Mutex::new(connection)),
            auto_commit,
        )))
    }
}
