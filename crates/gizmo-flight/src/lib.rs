//! Gizmo Flight - Arrow Flight SQL client adapter
//!
//! This crate owns everything that talks to a remote Flight SQL server:
//! channel construction (TLS, optional verification bypass, basic-auth
//! handshake), statement execution, and decoding of the protocol's
//! metadata result sets (catalogs, schemas, tables, columns) into typed
//! entries. The rest of the system only sees the [`SqlBackend`] trait.

pub mod client;
pub mod config;
pub mod error;
mod tls;

pub use client::FlightSqlBackend;
pub use config::{ConnectConfig, DEFAULT_PORT};
pub use error::ClientError;

use arrow::datatypes::{DataType, SchemaRef};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;

/// One statement's worth of results. The schema is carried separately so
/// that zero-row results still describe their columns.
#[derive(Debug, Clone)]
pub struct QueryData {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
}

/// One row of a `GetDbSchemas` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub catalog: Option<String>,
    pub schema: String,
}

/// One row of a `GetTables` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableEntry {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub name: String,
    pub table_type: String,
}

/// One column of a table, derived from the IPC-encoded table schema that
/// `GetTables` returns when `include_schema` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEntry {
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub table: String,
    pub name: String,
    pub data_type: DataType,
    /// 1-based ordinal position within the table.
    pub position: usize,
}

/// A live connection to one remote SQL server.
///
/// The production implementation is [`FlightSqlBackend`]; tests substitute
/// their own. Methods take `&mut self` because the underlying Flight SQL
/// client serializes use of its channel — callers hold the session's mutex
/// while invoking these.
#[async_trait]
pub trait SqlBackend: Send {
    /// Execute a SQL statement and collect all result batches.
    async fn execute(&mut self, sql: &str) -> Result<QueryData, ClientError>;

    /// List catalog names.
    async fn list_catalogs(&mut self) -> Result<Vec<String>, ClientError>;

    /// List schemas, optionally restricted to one catalog.
    async fn list_schemas(
        &mut self,
        catalog: Option<&str>,
    ) -> Result<Vec<SchemaEntry>, ClientError>;

    /// List tables, optionally restricted by catalog and schema.
    async fn list_tables(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<TableEntry>, ClientError>;

    /// List columns, optionally restricted by catalog, schema and table.
    async fn list_columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Vec<ColumnEntry>, ClientError>;

    /// Tear down the connection.
    async fn close(&mut self) -> Result<(), ClientError>;
}

/// Factory seam for establishing new backends, so the HTTP layer can be
/// exercised against a fake in tests.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    async fn connect(&self, config: &ConnectConfig) -> Result<Box<dyn SqlBackend>, ClientError>;
}

/// Connects real [`FlightSqlBackend`]s.
pub struct FlightConnector;

#[async_trait]
impl BackendConnector for FlightConnector {
    async fn connect(&self, config: &ConnectConfig) -> Result<Box<dyn SqlBackend>, ClientError> {
        let backend = FlightSqlBackend::connect(config).await?;
        Ok(Box::new(backend))
    }
}
