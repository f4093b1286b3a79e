use crate::injection::find_suspect;
use crate::results::ExecutionResult;
use sqlkit_driver::{
    BatchOutcome, ColumnKind, Connection, Error, KeyMode, Prepared, QueryOutput, Record, Result,
    Value,
};
use tracing::{debug, warn};

/// Rows per batch flush.
const BATCH_FLUSH_ROWS: usize = 100;

/// Wraps one prepared statement bound to one immutable, trimmed SQL string
/// and the connection it was prepared on. Re-execution with new parameters
/// reuses the compiled statement; [`Statement::close`] releases it and makes
/// the wrapper unusable.
#[derive(Debug)]
pub struct Statement {
    sql: String,
    prepared: Option<Box<dyn Prepared>>,
}

impl Statement {
    /// Prepare `sql` on `connection`.
    ///
    /// # Errors
    /// * If the provider fails to compile the statement
    pub async fn prepare(connection: &mut dyn Connection, sql: &str, keys: KeyMode) -> Result<Self> {
        let sql = sql.trim().to_string();
        let prepared = connection.prepare(&sql, keys).await?;
        Ok(Self {
            sql,
            prepared: Some(prepared),
        })
    }

    /// The trimmed SQL text this wrapper executes.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    fn prepared(&mut self) -> Result<&mut Box<dyn Prepared>> {
        let sql = &self.sql;
        self.prepared
            .as_mut()
            .ok_or_else(|| Error::StatementClosed(sql.clone()))
    }

    /// Bind `values` positionally and execute, dispatching on the leading
    /// keyword: SELECT materializes and decodes all rows, INSERT drains the
    /// generated keys, anything else reports the affected-row count.
    ///
    /// # Errors
    /// * If the wrapper is closed or the driver fails
    pub async fn execute(&mut self, values: &[Value]) -> Result<ExecutionResult> {
        if let Some(found) = find_suspect(&self.sql) {
            warn!("statement refused, suspect fragment: {found:?}");
            return Ok(ExecutionResult::rejected());
        }

        let sql = self.sql.to_uppercase();
        let prepared = self.prepared()?;
        debug!("executing: {}", prepared.sql());

        if sql.starts_with("SELECT") {
            let output = prepared.query(values).await?;
            Ok(ExecutionResult::Rows(decode_output(output)))
        } else if sql.starts_with("INSERT") {
            let _ = prepared.update(values).await?;
            let keys = prepared.generated_keys().await?;
            Ok(ExecutionResult::Keys(keys))
        } else {
            let affected = prepared.update(values).await?;
            Ok(ExecutionResult::Affected(affected))
        }
    }

    /// Execute once per parameter row.
    ///
    /// SELECT text runs [`Statement::execute`] per row and collects the
    /// results. Anything else is batched, flushed every
    /// 100 rows, and every flush's per-row outcomes are kept, so results
    /// match the input rows in order and count.
    ///
    /// # Errors
    /// * If the wrapper is closed, the rows disagree on parameter count, or
    ///   the driver fails
    pub async fn execute_rows(&mut self, rows: &[Vec<Value>]) -> Result<Vec<ExecutionResult>> {
        if let Some(found) = find_suspect(&self.sql) {
            warn!("statement refused, suspect fragment: {found:?}");
            return Ok(vec![ExecutionResult::rejected()]);
        }

        if self.sql.to_uppercase().starts_with("SELECT") {
            let mut results = Vec::with_capacity(rows.len());
            for row in rows {
                results.push(self.execute(row).await?);
            }
            return Ok(results);
        }

        if let Some(first) = rows.first() {
            if let Some(row) = rows.iter().find(|row| row.len() != first.len()) {
                return Err(Error::InvalidBatch(format!(
                    "batch rows disagree on parameter count: {} vs {}",
                    first.len(),
                    row.len()
                )));
            }
        }

        let prepared = self.prepared()?;
        let mut outcomes = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            prepared.add_batch(row).await?;
            if (index + 1) % BATCH_FLUSH_ROWS == 0 {
                outcomes.extend(prepared.execute_batch().await?);
            }
        }
        if rows.len() % BATCH_FLUSH_ROWS != 0 {
            outcomes.extend(prepared.execute_batch().await?);
        }

        Ok(outcomes.into_iter().map(outcome_result).collect())
    }

    /// Release the prepared statement. Every later call on this wrapper,
    /// including a second `close`, fails with
    /// [`StatementClosed`](Error::StatementClosed).
    ///
    /// # Errors
    /// * If the wrapper is already closed or the driver fails to release
    pub async fn close(&mut self) -> Result<()> {
        match self.prepared.take() {
            Some(mut prepared) => prepared.close().await,
            None => Err(Error::StatementClosed(self.sql.clone())),
        }
    }
}

fn outcome_result(outcome: BatchOutcome) -> ExecutionResult {
    match outcome {
        BatchOutcome::Affected(count) => ExecutionResult::Affected(count),
        BatchOutcome::SuccessNoInfo => ExecutionResult::AffectedUnknown,
        BatchOutcome::Failed => ExecutionResult::Failed,
    }
}

/// Decode raw query output into records, one per row, keyed by column label
/// in result-set order.
fn decode_output(output: QueryOutput) -> Vec<Record> {
    let QueryOutput { columns, rows } = output;
    rows.into_iter()
        .map(|row| {
            columns
                .iter()
                .zip(row)
                .map(|(column, value)| (column.label.clone(), decode_cell(column.kind, value)))
                .collect()
        })
        .collect()
}

/// Decode one result cell: nulls stay null regardless of declared kind,
/// date/time kinds render as strings, JSON kinds are parsed from text and
/// fall back to the raw value when parsing fails.
fn decode_cell(kind: ColumnKind, value: Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }
    match kind {
        ColumnKind::Date | ColumnKind::Time | ColumnKind::Timestamp => {
            Value::String(value.to_string())
        }
        ColumnKind::Json => match value {
            Value::String(text) => match serde_json::from_str(&text) {
                Ok(json) => Value::Json(json),
                Err(_) => Value::String(text),
            },
            other => other,
        },
        _ => value,
    }
}
