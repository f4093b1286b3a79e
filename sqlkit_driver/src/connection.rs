use crate::error::Result;
use crate::{Error, Value};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

/// A single row of raw result values, in column order.
pub type Row = Vec<Value>;

/// Whether a prepared statement should capture server-generated keys.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum KeyMode {
    /// Capture generated keys after an update (the default, used by inserts).
    #[default]
    Return,
    /// Do not ask the engine for generated keys.
    Ignore,
}

/// Engine column kinds that change how a result cell is decoded.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColumnKind {
    Date,
    Time,
    Timestamp,
    /// Engine-specific payloads carried as text, e.g. JSON columns.
    Json,
    Bytes,
    #[default]
    Plain,
}

/// Result-set column metadata: label plus the engine's declared kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Column {
    pub label: String,
    pub kind: ColumnKind,
}

impl Column {
    pub fn new<S: Into<String>>(label: S, kind: ColumnKind) -> Self {
        Self {
            label: label.into(),
            kind,
        }
    }
}

/// Raw output of a query: column metadata read once, plus all rows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryOutput {
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
}

impl QueryOutput {
    #[must_use]
    pub fn new(columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }
}

/// Per-row outcome of a batch execution.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BatchOutcome {
    /// Row applied with a known affected-row count.
    Affected(u64),
    /// Driver reported success without a count.
    SuccessNoInfo,
    /// Driver reported the row as failed.
    Failed,
}

/// A prepared statement owned by one connection, compiled from one immutable
/// SQL string. Re-execution with new parameters reuses the compiled
/// statement.
#[async_trait]
pub trait Prepared: Debug + Send {
    /// The trimmed SQL text this statement was compiled from.
    fn sql(&self) -> &str;

    /// Bind `params` positionally and run the statement as a query.
    async fn query(&mut self, params: &[Value]) -> Result<QueryOutput>;

    /// Bind `params` positionally and run the statement as an update,
    /// returning the affected-row count.
    async fn update(&mut self, params: &[Value]) -> Result<u64>;

    /// Drain the keys generated by the most recent update.
    async fn generated_keys(&mut self) -> Result<Vec<Value>>;

    /// Queue one parameter row for batch execution.
    async fn add_batch(&mut self, params: &[Value]) -> Result<()>;

    /// Execute and clear the queued batch, reporting one outcome per row in
    /// queue order.
    async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>>;

    /// Release the statement.
    async fn close(&mut self) -> Result<()>;
}

/// Connection to a database
#[async_trait]
pub trait Connection: Debug + Send {
    async fn prepare(&mut self, sql: &str, keys: KeyMode) -> Result<Box<dyn Prepared>>;
    async fn commit(&mut self) -> Result<()>;
    async fn rollback(&mut self) -> Result<()>;

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A named, pre-configured source of database connections.
#[async_trait]
pub trait Datasource: Debug + Send + Sync {
    /// Acquire a connection. With `auto_commit` disabled the connection is
    /// opened inside a transaction scope that [`Connection::commit`] and
    /// [`Connection::rollback`] control.
    async fn acquire(&self, auto_commit: bool) -> Result<Box<dyn Connection>>;
}

/// Calls observed by the mock provider, shared across the datasource and
/// every connection and statement it hands out.
#[derive(Clone, Debug, Default)]
pub struct MockCalls {
    /// `(sql, key mode)` per [`Connection::prepare`].
    pub prepared: Vec<(String, KeyMode)>,
    /// `(sql, params)` per [`Prepared::query`] / [`Prepared::update`].
    pub executions: Vec<(String, Vec<Value>)>,
    /// Row count of each [`Prepared::execute_batch`] flush.
    pub flushes: Vec<usize>,
    pub acquires: Vec<bool>,
    pub commits: usize,
    pub rollbacks: usize,
    pub closed_connections: usize,
    pub closed_statements: usize,
}

/// Canned behavior shared by every statement a mock provider hands out.
#[derive(Clone, Debug, Default)]
struct MockScript {
    query_output: QueryOutput,
    update_result: u64,
    update_error: Option<String>,
    keys: Vec<Value>,
    batch_overrides: BTreeMap<usize, BatchOutcome>,
}

/// A scripted [`Datasource`] implementation for tests.
///
/// Canned outputs are set up front with the `with_*` methods; every call made
/// through any acquired connection is recorded and can be inspected with
/// [`MockDatasource::calls`].
#[derive(Clone, Debug, Default)]
pub struct MockDatasource {
    script: MockScript,
    calls: Arc<Mutex<MockCalls>>,
}

impl MockDatasource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the output returned by every query.
    #[must_use]
    pub fn with_query_output(mut self, output: QueryOutput) -> Self {
        self.script.query_output = output;
        self
    }

    /// Set the affected-row count returned by every update.
    #[must_use]
    pub fn with_update_result(mut self, affected: u64) -> Self {
        self.script.update_result = affected;
        self
    }

    /// Make every update fail with the given message.
    #[must_use]
    pub fn with_update_error<S: Into<String>>(mut self, message: S) -> Self {
        self.script.update_error = Some(message.into());
        self
    }

    /// Set the generated keys drained after each update.
    #[must_use]
    pub fn with_keys(mut self, keys: Vec<Value>) -> Self {
        self.script.keys = keys;
        self
    }

    /// Override the outcome of the batch row at `index` (counted across all
    /// flushes of one statement).
    #[must_use]
    pub fn with_batch_outcome(mut self, index: usize, outcome: BatchOutcome) -> Self {
        self.script.batch_overrides.insert(index, outcome);
        self
    }

    /// Snapshot of everything the provider has observed so far.
    ///
    /// # Panics
    /// If the internal lock is poisoned.
    #[must_use]
    pub fn calls(&self) -> MockCalls {
        self.calls.lock().expect("mock calls lock").clone()
    }

    /// A connection sharing this datasource's script and call log, for tests
    /// that drive a caller-supplied connection directly.
    #[must_use]
    pub fn connection(&self) -> MockConnection {
        MockConnection {
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
        }
    }
}

#[async_trait]
impl Datasource for MockDatasource {
    async fn acquire(&self, auto_commit: bool) -> Result<Box<dyn Connection>> {
        let mut calls = lock(&self.calls)?;
        calls.acquires.push(auto_commit);
        drop(calls);
        Ok(Box::new(self.connection()))
    }
}

/// A scripted [`Connection`] handed out by [`MockDatasource`].
#[derive(Debug)]
pub struct MockConnection {
    script: MockScript,
    calls: Arc<Mutex<MockCalls>>,
}

#[async_trait]
impl Connection for MockConnection {
    async fn prepare(&mut self, sql: &str, keys: KeyMode) -> Result<Box<dyn Prepared>> {
        let mut calls = lock(&self.calls)?;
        calls.prepared.push((sql.to_string(), keys));
        drop(calls);
        Ok(Box::new(MockPrepared {
            sql: sql.to_string(),
            script: self.script.clone(),
            calls: Arc::clone(&self.calls),
            batch: Vec::new(),
            batch_index: 0,
        }))
    }

    async fn commit(&mut self) -> Result<()> {
        lock(&self.calls)?.commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        lock(&self.calls)?.rollbacks += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        lock(&self.calls)?.closed_connections += 1;
        Ok(())
    }
}

/// A scripted [`Prepared`] handed out by [`MockConnection`].
#[derive(Debug)]
pub struct MockPrepared {
    sql: String,
    script: MockScript,
    calls: Arc<Mutex<MockCalls>>,
    batch: Vec<Vec<Value>>,
    batch_index: usize,
}

#[async_trait]
impl Prepared for MockPrepared {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn query(&mut self, params: &[Value]) -> Result<QueryOutput> {
        let mut calls = lock(&self.calls)?;
        calls.executions.push((self.sql.clone(), params.to_vec()));
        Ok(self.script.query_output.clone())
    }

    async fn update(&mut self, params: &[Value]) -> Result<u64> {
        let mut calls = lock(&self.calls)?;
        calls.executions.push((self.sql.clone(), params.to_vec()));
        drop(calls);
        if let Some(message) = &self.script.update_error {
            return Err(Error::IoError(message.clone()));
        }
        Ok(self.script.update_result)
    }

    async fn generated_keys(&mut self) -> Result<Vec<Value>> {
        Ok(std::mem::take(&mut self.script.keys))
    }

    async fn add_batch(&mut self, params: &[Value]) -> Result<()> {
        self.batch.push(params.to_vec());
        Ok(())
    }

    async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>> {
        let rows = std::mem::take(&mut self.batch);
        let mut calls = lock(&self.calls)?;
        calls.flushes.push(rows.len());
        drop(calls);

        let mut outcomes = Vec::with_capacity(rows.len());
        for _row in rows {
            let outcome = self
                .script
                .batch_overrides
                .get(&self.batch_index)
                .copied()
                .unwrap_or(BatchOutcome::Affected(self.script.update_result));
            outcomes.push(outcome);
            self.batch_index += 1;
        }
        Ok(outcomes)
    }

    async fn close(&mut self) -> Result<()> {
        lock(&self.calls)?.closed_statements += 1;
        Ok(())
    }
}

fn lock(calls: &Arc<Mutex<MockCalls>>) -> Result<std::sync::MutexGuard<'_, MockCalls>> {
    calls.lock().map_err(|error| Error::IoError(error.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn test_mock_datasource_records_calls() -> Result<()> {
        let datasource = MockDatasource::new().with_update_result(3);
        let mut connection = datasource.acquire(true).await?;

        let mut statement = connection.prepare("DELETE FROM t", KeyMode::Ignore).await?;
        let affected = statement.update(&[Value::I64(1)]).await?;
        assert_eq!(affected, 3);

        statement.close().await?;
        connection.close().await?;

        let calls = datasource.calls();
        assert_eq!(calls.acquires, vec![true]);
        assert_eq!(
            calls.prepared,
            vec![("DELETE FROM t".to_string(), KeyMode::Ignore)]
        );
        assert_eq!(
            calls.executions,
            vec![("DELETE FROM t".to_string(), vec![Value::I64(1)])]
        );
        assert_eq!(calls.closed_statements, 1);
        assert_eq!(calls.closed_connections, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_batch_outcomes_and_overrides() -> Result<()> {
        let datasource = MockDatasource::new()
            .with_update_result(1)
            .with_batch_outcome(1, BatchOutcome::SuccessNoInfo)
            .with_batch_outcome(2, BatchOutcome::Failed);
        let mut connection = datasource.acquire(true).await?;
        let mut statement = connection.prepare("UPDATE t SET a = ?", KeyMode::Ignore).await?;

        for value in 0..3i64 {
            statement.add_batch(&[Value::I64(value)]).await?;
        }
        let outcomes = statement.execute_batch().await?;
        assert_eq!(
            outcomes,
            vec![
                BatchOutcome::Affected(1),
                BatchOutcome::SuccessNoInfo,
                BatchOutcome::Failed,
            ]
        );
        assert_eq!(datasource.calls().flushes, vec![3]);
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_query_output() -> Result<()> {
        let output = QueryOutput::new(
            vec![Column::new("id", ColumnKind::Plain)],
            vec![vec![Value::I64(42)]],
        );
        let datasource = MockDatasource::new().with_query_output(output.clone());
        let mut connection = datasource.acquire(true).await?;
        let mut statement = connection.prepare("SELECT id FROM t", KeyMode::Ignore).await?;

        assert_eq!(statement.query(&[]).await?, output);
        Ok(())
    }

    #[tokio::test]
    async fn test_mock_update_error() -> Result<()> {
        let datasource = MockDatasource::new().with_update_error("disk full");
        let mut connection = datasource.acquire(true).await?;
        let mut statement = connection.prepare("DELETE FROM t", KeyMode::Ignore).await?;

        let error = statement.update(&[]).await.expect_err("update should fail");
        assert_eq!(error.to_string(), "disk full");
        Ok(())
    }
}
