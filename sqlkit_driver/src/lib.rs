//! # sqlkit driver
//!
//! Provider interfaces for sqlkit: the value and record data model, the
//! datasource/connection/prepared-statement traits a database provider
//! implements, and a named datasource registry.

#![forbid(unsafe_code)]
#![forbid(clippy::allow_attributes)]
#![deny(clippy::pedantic)]

mod connection;
mod error;
mod record;
mod registry;
mod value;

pub use connection::{
    BatchOutcome, Column, ColumnKind, Connection, Datasource, KeyMode, MockCalls, MockConnection,
    MockDatasource, MockPrepared, Prepared, QueryOutput, Row,
};
pub use error::{Error, Result};
pub use record::Record;
pub use registry::DatasourceRegistry;
pub use value::Value;
