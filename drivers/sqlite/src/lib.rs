//! # sqlkit sqlite provider
//!
//! Implements the sqlkit provider interfaces on top of `rusqlite`.

#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod connection;
mod datasource;
mod statement;

pub use connection::SqliteConnection;
pub use datasource::SqliteDatasource;
pub use statement::SqlitePrepared;
