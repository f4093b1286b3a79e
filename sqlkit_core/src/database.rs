use crate::injection::find_suspect;
use crate::results::{ExecutionResult, InsertResult};
use crate::statement::Statement;
use crate::table::{self, Table};
use sqlkit_driver::{
    Connection, Datasource, DatasourceRegistry, Error, KeyMode, Record, Result, Value,
};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Facade over one datasource.
///
/// Each operation comes in two forms: the plain form acquires a connection
/// from the datasource and closes it on every exit path; the `*_on` form
/// runs against a caller-supplied connection whose ownership (and closing)
/// stays with the caller.
#[derive(Clone, Debug)]
pub struct Database {
    datasource: Option<Arc<dyn Datasource>>,
}

impl Database {
    #[must_use]
    pub fn new(datasource: Arc<dyn Datasource>) -> Self {
        Self {
            datasource: Some(datasource),
        }
    }

    /// A facade with no datasource; every operation fails with
    /// [`DatasourceUnavailable`](Error::DatasourceUnavailable).
    #[must_use]
    pub fn unconfigured() -> Self {
        Self { datasource: None }
    }

    /// Resolve `name` against the registry. An unregistered name yields an
    /// unconfigured facade; callers must be prepared for the datasource to
    /// be absent.
    ///
    /// # Errors
    /// * If the registry lock cannot be acquired
    pub fn from_registry(registry: &DatasourceRegistry, name: &str) -> Result<Self> {
        match registry.get(name)? {
            Some(datasource) => Ok(Self::new(datasource)),
            None => {
                warn!("datasource not configured: {name}");
                Ok(Self::unconfigured())
            }
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.datasource.is_some()
    }

    /// Acquire a connection from the datasource.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    pub async fn acquire(&self, auto_commit: bool) -> Result<Box<dyn Connection>> {
        match &self.datasource {
            Some(datasource) => datasource.acquire(auto_commit).await,
            None => Err(Error::DatasourceUnavailable),
        }
    }

    /// Execute one SQL statement with positional arguments.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    #[instrument(level = "debug", skip(self, args))]
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<ExecutionResult> {
        if let Some(found) = find_suspect(sql) {
            warn!("statement refused, suspect fragment: {found:?}");
            return Ok(ExecutionResult::rejected());
        }
        let mut connection = self.acquire(true).await?;
        let result = self.execute_on(connection.as_mut(), sql, args).await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`execute`](Database::execute) against a caller-owned connection.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn execute_on(
        &self,
        connection: &mut dyn Connection,
        sql: &str,
        args: &[Value],
    ) -> Result<ExecutionResult> {
        if let Some(found) = find_suspect(sql) {
            warn!("statement refused, suspect fragment: {found:?}");
            return Ok(ExecutionResult::rejected());
        }
        let mut statement = Statement::prepare(connection, sql, KeyMode::Return).await?;
        let result = statement.execute(args).await;
        let closed = statement.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// Insert one or more records. A single record reports its generated
    /// key; several records report one outcome each, in input order.
    ///
    /// # Errors
    /// * If the payload is empty or mismatched, no datasource is configured,
    ///   or the provider fails
    #[instrument(level = "debug", skip_all)]
    pub async fn insert<T: Into<Table>>(
        &self,
        table: T,
        records: &[Record],
    ) -> Result<InsertResult> {
        let table = table.into();
        let mut connection = self.acquire(true).await?;
        let result = self.insert_on(connection.as_mut(), &table, records).await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`insert`](Database::insert) against a caller-owned connection.
    ///
    /// # Errors
    /// * If the payload is empty or mismatched, or the provider fails
    pub async fn insert_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        records: &[Record],
    ) -> Result<InsertResult> {
        let table = table.into();
        let (sql, rows) = table::insert_sql(table.name(), records)?;
        if let Some(found) = find_suspect(&sql) {
            warn!("statement refused, suspect fragment: {found:?}");
            return Ok(if rows.len() > 1 {
                InsertResult::Many(vec![ExecutionResult::rejected()])
            } else {
                InsertResult::One(ExecutionResult::rejected())
            });
        }

        let mut statement = Statement::prepare(connection, &sql, KeyMode::Return).await?;
        let result = if rows.len() > 1 {
            statement
                .execute_rows(&rows)
                .await
                .map(InsertResult::Many)
        } else {
            statement.execute(&rows[0]).await.map(InsertResult::One)
        };
        let closed = statement.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// Update `row` in `table`. Without a condition the table's declared key
    /// columns are used, with their values bound from the row.
    ///
    /// # Errors
    /// * If the payload is empty, no datasource is configured, or the
    ///   provider fails
    #[instrument(level = "debug", skip_all)]
    pub async fn update<T: Into<Table>>(
        &self,
        table: T,
        row: &Record,
        condition: Option<&Record>,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let mut connection = self.acquire(true).await?;
        let result = self
            .update_on(connection.as_mut(), &table, row, condition)
            .await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`update`](Database::update) against a caller-owned connection.
    ///
    /// # Errors
    /// * If the payload is empty or the provider fails
    pub async fn update_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        row: &Record,
        condition: Option<&Record>,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let (sql, params) = table::update_sql(&table, row, condition)?;
        run_built(connection, &sql, &params, KeyMode::Return).await
    }

    /// Delete every row matching the example record.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    #[instrument(level = "debug", skip_all)]
    pub async fn delete_by_example<T: Into<Table>>(
        &self,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let mut connection = self.acquire(true).await?;
        let result = self
            .delete_by_example_on(connection.as_mut(), &table, example)
            .await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`delete_by_example`](Database::delete_by_example) against a
    /// caller-owned connection.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn delete_by_example_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let (sql, params) = table::delete_sql(table.name(), example);
        run_built(connection, &sql, &params, KeyMode::Ignore).await
    }

    /// Delete the row identified by the record's key columns.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    #[instrument(level = "debug", skip_all)]
    pub async fn delete_by_key<T: Into<Table>>(
        &self,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let example = table.key_example(record);
        self.delete_by_example(&table, &example).await
    }

    /// [`delete_by_key`](Database::delete_by_key) against a caller-owned
    /// connection.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn delete_by_key_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let example = table.key_example(record);
        self.delete_by_example_on(connection, &table, &example).await
    }

    /// Select rows matching the example record (`=`, `LIKE` for wildcard
    /// strings, `IS NULL` for nulls).
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    #[instrument(level = "debug", skip_all)]
    pub async fn select_by_example<T: Into<Table>>(
        &self,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let mut connection = self.acquire(true).await?;
        let result = self
            .select_by_example_on(connection.as_mut(), &table, example)
            .await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`select_by_example`](Database::select_by_example) against a
    /// caller-owned connection.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn select_by_example_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let (sql, params) = table::select_sql(table.name(), example);
        run_built(connection, &sql, &params, KeyMode::Ignore).await
    }

    /// Select the row identified by the record's key columns.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    pub async fn select_by_key<T: Into<Table>>(
        &self,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let example = table.key_example(record);
        self.select_by_example(&table, &example).await
    }

    /// Select every row of the table.
    ///
    /// # Errors
    /// * If no datasource is configured or the provider fails
    pub async fn all<T: Into<Table>>(&self, table: T) -> Result<ExecutionResult> {
        let table = table.into();
        let sql = format!("SELECT * FROM {}", table.name());
        self.execute(&sql, &[]).await
    }

    /// Replace one record (`REPLACE INTO`), keyed by the engine's primary
    /// key or unique constraints.
    ///
    /// # Errors
    /// * If the record is empty, no datasource is configured, or the
    ///   provider fails
    pub async fn replace<T: Into<Table>>(
        &self,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let mut connection = self.acquire(true).await?;
        let result = self.replace_on(connection.as_mut(), &table, record).await;
        let closed = connection.close().await;
        let result = result?;
        closed?;
        Ok(result)
    }

    /// [`replace`](Database::replace) against a caller-owned connection.
    ///
    /// # Errors
    /// * If the record is empty or the provider fails
    pub async fn replace_on<T: Into<Table>>(
        &self,
        connection: &mut dyn Connection,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        let table = table.into();
        let (sql, params) = table::replace_sql(table.name(), record)?;
        run_built(connection, &sql, &params, KeyMode::Return).await
    }
}

/// Prepare, execute and close one generated statement.
async fn run_built(
    connection: &mut dyn Connection,
    sql: &str,
    params: &[Value],
    keys: KeyMode,
) -> Result<ExecutionResult> {
    if let Some(found) = find_suspect(sql) {
        warn!("statement refused, suspect fragment: {found:?}");
        return Ok(ExecutionResult::rejected());
    }
    let mut statement = Statement::prepare(connection, sql, keys).await?;
    let result = statement.execute(params).await;
    let closed = statement.close().await;
    let result = result?;
    closed?;
    Ok(result)
}
