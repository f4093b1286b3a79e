use crate::statement::SqlitePrepared;
use async_trait::async_trait;
use sqlkit_driver::Error::IoError;
use sqlkit_driver::{Connection, KeyMode, Prepared, Result};
use std::sync::{Arc, Mutex};

/// Connection to a SQLite database.
///
/// The underlying handle is shared with every statement prepared on it, so a
/// statement stays usable for the lifetime of the wrapper that owns it.
#[derive(Debug)]
pub struct SqliteConnection {
    connection: Arc<Mutex<rusqlite::Connection>>,
    auto_commit: bool,
}

impl SqliteConnection {
    pub(crate) fn new(connection: Arc<Mutex<rusqlite::Connection>>, auto_commit: bool) -> Self {
        Self {
            connection,
            auto_commit,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.connection
            .lock()
            .map_err(|error| IoError(error.to_string()))
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn prepare(&mut self, sql: &str, keys: KeyMode) -> Result<Box<dyn Prepared>> {
        let sql = sql.trim();
        {
            // Compile now so malformed SQL surfaces at prepare time; the
            // compiled statement stays in the connection's statement cache
            // for reuse by every later execution.
            let connection = self.lock()?;
            let _ = connection
                .prepare_cached(sql)
                .map_err(|error| IoError(error.to_string()))?;
        }
        Ok(Box::new(SqlitePrepared::new(
            Arc::clone(&self.connection),
            sql.to_string(),
            keys,
        )))
    }

    async fn commit(&mut self) -> Result<()> {
        let connection = self.lock()?;
        if !connection.is_autocommit() {
            connection
                .execute_batch("COMMIT")
                .map_err(|error| IoError(error.to_string()))?;
        }
        if !self.auto_commit {
            connection
                .execute_batch("BEGIN")
                .map_err(|error| IoError(error.to_string()))?;
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        let connection = self.lock()?;
        if !connection.is_autocommit() {
            connection
                .execute_batch("ROLLBACK")
                .map_err(|error| IoError(error.to_string()))?;
        }
        if !self.auto_commit {
            connection
                .execute_batch("BEGIN")
                .map_err(|error| IoError(error.to_string()))?;
        }
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let connection = self.lock()?;
        // An open transaction must not leak back to the datasource.
        if !connection.is_autocommit() {
            connection
                .execute_batch("ROLLBACK")
                .map_err(|error| IoError(error.to_string()))?;
        }
        Ok(())
    }
}
