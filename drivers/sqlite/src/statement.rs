use async_trait::async_trait;
use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{ToSql, params_from_iter};
use sqlkit_driver::Error::IoError;
use sqlkit_driver::{BatchOutcome, Column, ColumnKind, KeyMode, Prepared, QueryOutput, Result, Value};
use std::sync::{Arc, Mutex};

/// A prepared SQLite statement.
///
/// The compiled statement lives in the connection's statement cache keyed by
/// the SQL text, so repeated executions with new parameters reuse it.
#[derive(Debug)]
pub struct SqlitePrepared {
    connection: Arc<Mutex<rusqlite::Connection>>,
    sql: String,
    keys: KeyMode,
    generated: Vec<Value>,
    batch: Vec<Vec<Value>>,
}

impl SqlitePrepared {
    pub(crate) fn new(
        connection: Arc<Mutex<rusqlite::Connection>>,
        sql: String,
        keys: KeyMode,
    ) -> Self {
        Self {
            connection,
            sql,
            keys,
            generated: Vec::new(),
            batch: Vec::new(),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, rusqlite::Connection>> {
        self.connection
            .lock()
            .map_err(|error| IoError(error.to_string()))
    }

    fn captures_keys(&self) -> bool {
        self.keys == KeyMode::Return && self.sql.to_uppercase().starts_with("INSERT")
    }
}

#[async_trait]
impl Prepared for SqlitePrepared {
    fn sql(&self) -> &str {
        &self.sql
    }

    async fn query(&mut self, params: &[Value]) -> Result<QueryOutput> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(&self.sql)
            .map_err(|error| IoError(error.to_string()))?;

        let columns: Vec<Column> = statement
            .columns()
            .iter()
            .map(|column| Column::new(column.name(), kind_from_decl(column.decl_type())))
            .collect();

        let mut query_rows = statement
            .query(params_from_iter(params.iter().map(BindValue)))
            .map_err(|error| IoError(error.to_string()))?;
        let mut rows = Vec::new();
        while let Some(query_row) = query_rows
            .next()
            .map_err(|error| IoError(error.to_string()))?
        {
            let mut row = Vec::with_capacity(columns.len());
            for index in 0..columns.len() {
                row.push(convert_to_value(query_row, index)?);
            }
            rows.push(row);
        }

        Ok(QueryOutput::new(columns, rows))
    }

    async fn update(&mut self, params: &[Value]) -> Result<u64> {
        let (affected, rowid) = {
            let connection = self.lock()?;
            let mut statement = connection
                .prepare_cached(&self.sql)
                .map_err(|error| IoError(error.to_string()))?;
            let affected = statement
                .execute(params_from_iter(params.iter().map(BindValue)))
                .map_err(|error| IoError(error.to_string()))?;
            drop(statement);
            (affected, connection.last_insert_rowid())
        };

        self.generated = if self.captures_keys() && affected > 0 {
            vec![Value::I64(rowid)]
        } else {
            Vec::new()
        };
        Ok(affected as u64)
    }

    async fn generated_keys(&mut self) -> Result<Vec<Value>> {
        Ok(std::mem::take(&mut self.generated))
    }

    async fn add_batch(&mut self, params: &[Value]) -> Result<()> {
        self.batch.push(params.to_vec());
        Ok(())
    }

    async fn execute_batch(&mut self) -> Result<Vec<BatchOutcome>> {
        let rows = std::mem::take(&mut self.batch);
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(&self.sql)
            .map_err(|error| IoError(error.to_string()))?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            match statement.execute(params_from_iter(row.iter().map(BindValue))) {
                Ok(affected) => outcomes.push(BatchOutcome::Affected(affected as u64)),
                Err(_) => outcomes.push(BatchOutcome::Failed),
            }
        }
        Ok(outcomes)
    }

    async fn close(&mut self) -> Result<()> {
        self.batch.clear();
        self.generated.clear();
        Ok(())
    }
}

/// Bind adapter from a sqlkit [`Value`] to a rusqlite parameter.
struct BindValue<'a>(&'a Value);

impl ToSql for BindValue<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self.0 {
            Value::Null => Ok(ToSqlOutput::Owned(rusqlite::types::Value::Null)),
            Value::Bool(value) => value.to_sql(),
            Value::Bytes(value) => Ok(ToSqlOutput::Borrowed(ValueRef::Blob(value))),
            Value::I32(value) => value.to_sql(),
            Value::I64(value) => value.to_sql(),
            Value::F64(value) => value.to_sql(),
            Value::String(value) => Ok(ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes()))),
            Value::Date(value) => value.to_sql(),
            Value::Time(value) => value.to_sql(),
            Value::DateTime(value) => value.to_sql(),
            Value::Json(value) => value.to_sql(),
        }
    }
}

/// Map a declared column type to the kind that drives result decoding.
fn kind_from_decl(decl_type: Option<&str>) -> ColumnKind {
    let Some(decl_type) = decl_type else {
        return ColumnKind::Plain;
    };
    let decl_type = decl_type.to_ascii_uppercase();
    if decl_type.contains("TIMESTAMP") || decl_type.contains("DATETIME") {
        ColumnKind::Timestamp
    } else if decl_type.contains("DATE") {
        ColumnKind::Date
    } else if decl_type.contains("TIME") {
        ColumnKind::Time
    } else if decl_type.contains("JSON") {
        ColumnKind::Json
    } else if decl_type.contains("BLOB") || decl_type.contains("BINARY") {
        ColumnKind::Bytes
    } else {
        ColumnKind::Plain
    }
}

/// Convert the cell at `column_index` to a sqlkit [`Value`].
fn convert_to_value(row: &rusqlite::Row, column_index: usize) -> Result<Value> {
    let value = match row
        .get_ref(column_index)
        .map_err(|error| IoError(error.to_string()))?
    {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(value) => Value::I64(value),
        ValueRef::Real(value) => Value::F64(value),
        ValueRef::Text(value) => {
            let value = String::from_utf8(value.to_vec())?;
            Value::String(value)
        }
        ValueRef::Blob(value) => Value::Bytes(value.to_vec()),
    };

    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SqliteDatasource;
    use sqlkit_driver::{Connection, Datasource};

    async fn connection_with_table(name: &str) -> Result<Box<dyn Connection>> {
        let datasource = SqliteDatasource::memory(name);
        let mut connection = datasource.acquire(true).await?;
        let mut statement = connection
            .prepare(
                "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, age INTEGER, born DATE, profile JSON)",
                KeyMode::Ignore,
            )
            .await?;
        statement.update(&[]).await?;
        statement.close().await?;
        Ok(connection)
    }

    #[tokio::test]
    async fn test_insert_reports_generated_key() -> Result<()> {
        let mut connection = connection_with_table("statement_keys").await?;
        let mut statement = connection
            .prepare("INSERT INTO users (name, age) VALUES (?, ?)", KeyMode::Return)
            .await?;

        let affected = statement
            .update(&[Value::from("Ana"), Value::I64(30)])
            .await?;
        assert_eq!(affected, 1);
        assert_eq!(statement.generated_keys().await?, vec![Value::I64(1)]);
        // Keys are drained once.
        assert!(statement.generated_keys().await?.is_empty());

        statement.close().await?;
        connection.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_update_without_key_mode_reports_no_keys() -> Result<()> {
        let mut connection = connection_with_table("statement_nokeys").await?;
        let mut statement = connection
            .prepare("INSERT INTO users (name) VALUES (?)", KeyMode::Ignore)
            .await?;
        statement.update(&[Value::from("Ana")]).await?;
        assert!(statement.generated_keys().await?.is_empty());
        statement.close().await?;
        connection.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_query_reports_column_kinds() -> Result<()> {
        let mut connection = connection_with_table("statement_kinds").await?;
        let mut statement = connection
            .prepare("INSERT INTO users (name, age, born, profile) VALUES (?, ?, ?, ?)", KeyMode::Return)
            .await?;
        statement
            .update(&[
                Value::from("Ana"),
                Value::I64(30),
                Value::from("2000-12-31"),
                Value::from(r#"{"tags":["a"]}"#),
            ])
            .await?;
        statement.close().await?;

        let mut statement = connection
            .prepare("SELECT name, age, born, profile FROM users", KeyMode::Ignore)
            .await?;
        let output = statement.query(&[]).await?;
        assert_eq!(
            output.columns,
            vec![
                Column::new("name", ColumnKind::Plain),
                Column::new("age", ColumnKind::Plain),
                Column::new("born", ColumnKind::Date),
                Column::new("profile", ColumnKind::Json),
            ]
        );
        assert_eq!(
            output.rows,
            vec![vec![
                Value::from("Ana"),
                Value::I64(30),
                Value::from("2000-12-31"),
                Value::from(r#"{"tags":["a"]}"#),
            ]]
        );
        statement.close().await?;
        connection.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_null_cells_stay_null() -> Result<()> {
        let mut connection = connection_with_table("statement_null").await?;
        let mut statement = connection
            .prepare("INSERT INTO users (name, age) VALUES (?, ?)", KeyMode::Return)
            .await?;
        statement.update(&[Value::Null, Value::Null]).await?;
        statement.close().await?;

        let mut statement = connection
            .prepare("SELECT name, age, born FROM users", KeyMode::Ignore)
            .await?;
        let output = statement.query(&[]).await?;
        assert_eq!(output.rows, vec![vec![Value::Null, Value::Null, Value::Null]]);
        statement.close().await?;
        connection.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_batch_outcomes_in_input_order() -> Result<()> {
        let mut connection = connection_with_table("statement_batch").await?;
        let mut statement = connection
            .prepare(
                "INSERT INTO users (id, name) VALUES (?, ?)",
                KeyMode::Return,
            )
            .await?;

        statement.add_batch(&[Value::I64(1), Value::from("a")]).await?;
        // Duplicate primary key: this row fails, the rest proceed.
        statement.add_batch(&[Value::I64(1), Value::from("b")]).await?;
        statement.add_batch(&[Value::I64(2), Value::from("c")]).await?;

        let outcomes = statement.execute_batch().await?;
        assert_eq!(
            outcomes,
            vec![
                BatchOutcome::Affected(1),
                BatchOutcome::Failed,
                BatchOutcome::Affected(1),
            ]
        );

        // The batch is cleared by execution.
        assert!(statement.execute_batch().await?.is_empty());
        statement.close().await?;
        connection.close().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_bind_kinds_round_trip() -> Result<()> {
        let datasource = SqliteDatasource::memory("statement_binds");
        let mut connection = datasource.acquire(true).await?;
        let mut statement = connection
            .prepare(
                "CREATE TABLE t (b BOOLEAN, blob BLOB, i INTEGER, f REAL, s TEXT, d DATE)",
                KeyMode::Ignore,
            )
            .await?;
        statement.update(&[]).await?;
        statement.close().await?;

        let born = chrono::NaiveDate::from_ymd_opt(2000, 12, 31).expect("date");
        let mut statement = connection
            .prepare("INSERT INTO t VALUES (?, ?, ?, ?, ?, ?)", KeyMode::Ignore)
            .await?;
        statement
            .update(&[
                Value::Bool(true),
                Value::Bytes(vec![42]),
                Value::I32(7),
                Value::F64(1.5),
                Value::from("foo"),
                Value::Date(born),
            ])
            .await?;
        statement.close().await?;

        let mut statement = connection.prepare("SELECT * FROM t", KeyMode::Ignore).await?;
        let output = statement.query(&[]).await?;
        assert_eq!(
            output.rows,
            vec![vec![
                Value::I64(1),
                Value::Bytes(vec![42]),
                Value::I64(7),
                Value::F64(1.5),
                Value::from("foo"),
                Value::from("2000-12-31"),
            ]]
        );
        statement.close().await?;
        connection.close().await?;
        Ok(())
    }
}
