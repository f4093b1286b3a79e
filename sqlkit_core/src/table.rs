use sqlkit_driver::{Error, Record, Result, Value};

/// A table name plus its declared key columns (default `id`), enough to
/// resolve by-key operations and the update fallback when no explicit
/// condition is supplied.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Table {
    name: String,
    keys: Vec<String>,
}

impl Table {
    /// A table keyed by the `id` column.
    #[must_use]
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self::with_keys(name, vec!["id".to_string()])
    }

    /// A table with explicit key columns.
    #[must_use]
    pub fn with_keys<S: Into<String>>(name: S, keys: Vec<String>) -> Self {
        Self {
            name: name.into(),
            keys,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Project `record` onto the declared key columns; a key the record does
    /// not carry becomes null.
    #[must_use]
    pub fn key_example(&self, record: &Record) -> Record {
        self.keys
            .iter()
            .map(|key| {
                let value = record.get(key).cloned().unwrap_or(Value::Null);
                (key.clone(), value)
            })
            .collect()
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table::new(name)
    }
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table::new(name)
    }
}

impl From<&Table> for Table {
    fn from(table: &Table) -> Self {
        table.clone()
    }
}

/// Build `INSERT INTO <table> (<cols>) VALUES (<marks>)` from the key set of
/// the first record, plus one parameter row per record in the first record's
/// key order. Every record must share that key set and order.
pub(crate) fn insert_sql(table: &str, records: &[Record]) -> Result<(String, Vec<Vec<Value>>)> {
    let Some(first) = records.first() else {
        return Err(Error::EmptyPayload(format!(
            "no records to insert into {table}"
        )));
    };
    if first.is_empty() {
        return Err(Error::EmptyPayload(format!(
            "empty record inserted into {table}"
        )));
    }

    let columns: Vec<&str> = first.keys().map(String::as_str).collect();
    let marks = vec!["?"; columns.len()].join(",");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES ({marks})",
        columns.join(",")
    );

    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        if !record.keys().eq(first.keys()) {
            return Err(Error::InvalidBatch(format!(
                "records inserted into {table} disagree on columns"
            )));
        }
        rows.push(record.values().cloned().collect());
    }

    Ok((sql, rows))
}

/// Build `REPLACE INTO <table> (<cols>) VALUES (<marks>)` for one record.
pub(crate) fn replace_sql(table: &str, record: &Record) -> Result<(String, Vec<Value>)> {
    if record.is_empty() {
        return Err(Error::EmptyPayload(format!(
            "empty record replaced into {table}"
        )));
    }
    let columns: Vec<&str> = record.keys().map(String::as_str).collect();
    let marks = vec!["?"; columns.len()].join(",");
    let sql = format!(
        "REPLACE INTO {table} ({}) VALUES ({marks})",
        columns.join(",")
    );
    Ok((sql, record.values().cloned().collect()))
}

/// Build `UPDATE <table> SET <col> = ?, ... WHERE ...` with parameters in
/// row order followed by condition order.
///
/// Without an explicit condition the declared key columns are used, with the
/// key values taken from the row and bound as parameters like any other
/// condition (a key the row does not carry binds null).
pub(crate) fn update_sql(
    table: &Table,
    row: &Record,
    condition: Option<&Record>,
) -> Result<(String, Vec<Value>)> {
    if row.is_empty() {
        return Err(Error::EmptyPayload(format!(
            "nothing to update in {}",
            table.name()
        )));
    }

    let assignments: Vec<String> = row.keys().map(|key| format!("{key} = ?")).collect();
    let mut params: Vec<Value> = row.values().cloned().collect();
    let mut sql = format!("UPDATE {} SET {}", table.name(), assignments.join(", "));

    match condition {
        Some(condition) => {
            if condition.is_empty() {
                return Err(Error::EmptyPayload(format!(
                    "empty update condition for {}",
                    table.name()
                )));
            }
            let clauses: Vec<String> = condition.keys().map(|key| format!("{key} = ?")).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            params.extend(condition.values().cloned());
        }
        None => {
            let fallback = table.key_example(row);
            let clauses: Vec<String> = fallback.keys().map(|key| format!("{key} = ?")).collect();
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
            params.extend(fallback.values().cloned());
        }
    }

    Ok((sql, params))
}

/// Build `DELETE FROM <table> WHERE 1=1 AND <col> = ? ...` from every key of
/// the example record. An empty example deletes every row.
pub(crate) fn delete_sql(table: &str, example: &Record) -> (String, Vec<Value>) {
    let mut sql = format!("DELETE FROM {table} WHERE 1=1");
    for key in example.keys() {
        sql.push_str(&format!(" AND {key} = ?"));
    }
    (sql, example.values().cloned().collect())
}

/// Build `SELECT * FROM <table> WHERE 1=1 AND <col> <op> ...` from every key
/// of the example record: `= ?` normally, `LIKE ?` for a string containing a
/// wildcard, `IS NULL` (nothing bound) for a null value.
pub(crate) fn select_sql(table: &str, example: &Record) -> (String, Vec<Value>) {
    let mut sql = format!("SELECT * FROM {table} WHERE 1=1");
    let mut params = Vec::new();
    for (key, value) in example {
        if value.is_null() {
            sql.push_str(&format!(" AND {key} IS NULL"));
        } else if value.has_wildcard() {
            sql.push_str(&format!(" AND {key} LIKE ?"));
            params.push(value.clone());
        } else {
            sql.push_str(&format!(" AND {key} = ?"));
            params.push(value.clone());
        }
    }
    (sql, params)
}
