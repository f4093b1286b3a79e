use crate::database::Database;
use crate::results::{ExecutionResult, InsertResult};
use crate::table::Table;
use sqlkit_driver::{Connection, Record, Result, Value};
use std::future::Future;
use std::pin::Pin;
use tracing::error;

/// Boxed future returned by a transaction closure.
pub type TxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Capability surface handed to a transaction closure: the same operations
/// as [`Database`], pre-bound to one connection with auto-commit disabled.
/// The scope never closes the connection itself;
/// [`Database::run_in_transaction`] commits, rolls back and closes.
#[derive(Debug)]
pub struct TransactionScope {
    database: Database,
    connection: Box<dyn Connection>,
}

impl TransactionScope {
    /// Execute one SQL statement inside the transaction.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn execute(&mut self, sql: &str, args: &[Value]) -> Result<ExecutionResult> {
        self.database
            .execute_on(self.connection.as_mut(), sql, args)
            .await
    }

    /// Insert records inside the transaction.
    ///
    /// # Errors
    /// * If the payload is empty or mismatched, or the provider fails
    pub async fn insert<T: Into<Table>>(
        &mut self,
        table: T,
        records: &[Record],
    ) -> Result<InsertResult> {
        self.database
            .insert_on(self.connection.as_mut(), table, records)
            .await
    }

    /// Update rows inside the transaction.
    ///
    /// # Errors
    /// * If the payload is empty or the provider fails
    pub async fn update<T: Into<Table>>(
        &mut self,
        table: T,
        row: &Record,
        condition: Option<&Record>,
    ) -> Result<ExecutionResult> {
        self.database
            .update_on(self.connection.as_mut(), table, row, condition)
            .await
    }

    /// Delete the row identified by the record's key columns.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn delete<T: Into<Table>>(
        &mut self,
        table: T,
        record: &Record,
    ) -> Result<ExecutionResult> {
        self.database
            .delete_by_key_on(self.connection.as_mut(), table, record)
            .await
    }

    /// Delete every row matching the example record.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn delete_by_example<T: Into<Table>>(
        &mut self,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        self.database
            .delete_by_example_on(self.connection.as_mut(), table, example)
            .await
    }

    /// Select rows matching the example record.
    ///
    /// # Errors
    /// * If the provider fails
    pub async fn select_by_example<T: Into<Table>>(
        &mut self,
        table: T,
        example: &Record,
    ) -> Result<ExecutionResult> {
        self.database
            .select_by_example_on(self.connection.as_mut(), table, example)
            .await
    }
}

impl Database {
    /// Run `function` inside a single transaction.
    ///
    /// A connection is acquired with auto-commit disabled and wrapped in a
    /// [`TransactionScope`] passed to the closure together with the opaque
    /// `context` value. A closure returning `Ok` commits; a closure
    /// returning `Err` rolls back and the cause is reported to the caller.
    /// The connection is closed on every path; a rollback failure is logged
    /// and the original cause still wins.
    ///
    /// ```no_run
    /// # use sqlkit_core::{Database, InsertResult, TxFuture, record};
    /// # async fn demo(database: Database) -> sqlkit_core::Result<()> {
    /// let inserted = database
    ///     .run_in_transaction(
    ///         |tx, age: i64| {
    ///             Box::pin(async move {
    ///                 tx.insert("users", &[record! { "name" => "Ana", "age" => age }])
    ///                     .await
    ///             }) as TxFuture<'_, InsertResult>
    ///         },
    ///         30,
    ///     )
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// * If no datasource is configured, the closure fails, or commit fails
    pub async fn run_in_transaction<T, C, F>(&self, function: F, context: C) -> Result<T>
    where
        T: Send,
        C: Send,
        F: for<'t> FnOnce(&'t mut TransactionScope, C) -> TxFuture<'t, T> + Send,
    {
        let connection = self.acquire(false).await?;
        let mut scope = TransactionScope {
            database: self.clone(),
            connection,
        };

        let outcome = function(&mut scope, context).await;
        let mut connection = scope.connection;

        match outcome {
            Ok(value) => {
                let committed = connection.commit().await;
                let closed = connection.close().await;
                committed?;
                closed?;
                Ok(value)
            }
            Err(cause) => {
                if let Err(rollback_error) = connection.rollback().await {
                    error!("rollback failed: {rollback_error}");
                }
                if let Err(close_error) = connection.close().await {
                    error!("connection close failed: {close_error}");
                }
                Err(cause)
            }
        }
    }
}
