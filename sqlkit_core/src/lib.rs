//! # sqlkit core
//!
//! Record-oriented convenience API over SQL connections: a statement wrapper
//! that binds positional parameters and decodes result rows into records,
//! SQL builders that generate INSERT/UPDATE/DELETE/SELECT text from
//! record-shaped inputs, a database facade with per-call connection
//! handling, and a transaction helper.

#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod configuration;
mod database;
mod injection;
mod results;
mod statement;
mod table;
mod transaction;

pub use configuration::{Configuration, ConfigurationBuilder};
pub use database::Database;
pub use injection::find_suspect;
pub use results::{ExecutionResult, InsertResult};
pub use sqlkit_driver::{
    Column, ColumnKind, Connection, Datasource, DatasourceRegistry, Error, KeyMode, Record, Result,
    Row, Value, record,
};
pub use statement::Statement;
pub use table::Table;
pub use transaction::{TransactionScope, TxFuture};
