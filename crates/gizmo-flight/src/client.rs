//! Production [`SqlBackend`] over `FlightSqlServiceClient`.

use std::sync::Arc;

use arrow::array::{Array, BinaryArray, StringArray};
use arrow::datatypes::Schema;
use arrow::ipc::convert::{try_schema_from_flatbuffer_bytes, try_schema_from_ipc_buffer};
use arrow::record_batch::RecordBatch;
use arrow_flight::sql::client::FlightSqlServiceClient;
use arrow_flight::sql::{CommandGetDbSchemas, CommandGetTables};
use arrow_flight::FlightInfo;
use async_trait::async_trait;
use futures::TryStreamExt;
use tonic::transport::Channel;
use tracing::{debug, info};

use crate::config::ConnectConfig;
use crate::error::ClientError;
use crate::{tls, ColumnEntry, QueryData, SchemaEntry, SqlBackend, TableEntry};

/// A live Flight SQL connection.
pub struct FlightSqlBackend {
    inner: FlightSqlServiceClient<Channel>,
}

impl FlightSqlBackend {
    /// Open a channel, authenticate if credentials were given, and verify
    /// the connection with a catalog listing round trip. A failure at any
    /// step surfaces the transport/auth message unmodified.
    pub async fn connect(config: &ConnectConfig) -> Result<Self, ClientError> {
        info!(endpoint = %config.endpoint(), use_tls = config.use_tls, "connecting");
        let channel = tls::build_channel(config).await?;
        let mut inner = FlightSqlServiceClient::new(channel);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            inner
                .handshake(username, password)
                .await
                .map_err(|e| ClientError::Connect(e.to_string()))?;
        }

        let mut backend = Self { inner };
        // Cheap round trip: proves the server is reachable and the
        // credentials are accepted before a session is handed out.
        backend.list_catalogs().await?;
        info!(endpoint = %config.endpoint(), "connected");
        Ok(backend)
    }

    /// Collect every endpoint's result stream for a `FlightInfo`.
    async fn fetch_all(&mut self, info: FlightInfo) -> Result<QueryData, ClientError> {
        // `try_decode_schema` consumes the info, so decode from a clone and
        // keep the original for its endpoints.
        let declared_schema = info.clone().try_decode_schema().ok().map(Arc::new);

        let mut batches: Vec<RecordBatch> = Vec::new();
        for endpoint in info.endpoint {
            let Some(ticket) = endpoint.ticket else {
                continue;
            };
            let stream = self.inner.do_get(ticket).await?;
            let mut collected: Vec<RecordBatch> = stream.try_collect().await?;
            batches.append(&mut collected);
        }

        // Prefer the info-level schema; some servers omit it, in which case
        // the first batch carries it.
        let schema = declared_schema
            .or_else(|| batches.first().map(|b| b.schema()))
            .unwrap_or_else(|| Arc::new(Schema::empty()));

        debug!(rows = batches.iter().map(|b| b.num_rows()).sum::<usize>(), "fetched result set");
        Ok(QueryData { schema, batches })
    }
}

#[async_trait]
impl SqlBackend for FlightSqlBackend {
    async fn execute(&mut self, sql: &str) -> Result<QueryData, ClientError> {
        let info = self.inner.execute(sql.to_string(), None).await?;
        self.fetch_all(info).await
    }

    async fn list_catalogs(&mut self) -> Result<Vec<String>, ClientError> {
        let info = self.inner.get_catalogs().await?;
        let data = self.fetch_all(info).await?;
        catalogs_from(&data.batches)
    }

    async fn list_schemas(
        &mut self,
        catalog: Option<&str>,
    ) -> Result<Vec<SchemaEntry>, ClientError> {
        let command = CommandGetDbSchemas {
            catalog: catalog.map(str::to_string),
            db_schema_filter_pattern: None,
        };
        let info = self.inner.get_db_schemas(command).await?;
        let data = self.fetch_all(info).await?;
        schemas_from(&data.batches)
    }

    async fn list_tables(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
    ) -> Result<Vec<TableEntry>, ClientError> {
        let command = CommandGetTables {
            catalog: catalog.map(str::to_string),
            db_schema_filter_pattern: schema.map(str::to_string),
            table_name_filter_pattern: None,
            table_types: vec![],
            include_schema: false,
        };
        let info = self.inner.get_tables(command).await?;
        let data = self.fetch_all(info).await?;
        tables_from(&data.batches)
    }

    async fn list_columns(
        &mut self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Vec<ColumnEntry>, ClientError> {
        let command = CommandGetTables {
            catalog: catalog.map(str::to_string),
            db_schema_filter_pattern: schema.map(str::to_string),
            table_name_filter_pattern: table.map(str::to_string),
            table_types: vec![],
            include_schema: true,
        };
        let info = self.inner.get_tables(command).await?;
        let data = self.fetch_all(info).await?;
        columns_from(&data.batches)
    }

    async fn close(&mut self) -> Result<(), ClientError> {
        // Dropping the client closes the channel; nothing to flush.
        debug!("closing flight sql connection");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Metadata result-set decoding
// ---------------------------------------------------------------------------

fn str_col<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray, ClientError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| ClientError::Decode(format!("metadata result missing column '{}'", name)))
}

fn opt_str(array: &StringArray, row: usize) -> Option<String> {
    if array.is_null(row) {
        None
    } else {
        Some(array.value(row).to_string())
    }
}

pub(crate) fn catalogs_from(batches: &[RecordBatch]) -> Result<Vec<String>, ClientError> {
    let mut catalogs = Vec::new();
    for batch in batches {
        let names = str_col(batch, "catalog_name")?;
        for row in 0..batch.num_rows() {
            if let Some(name) = opt_str(names, row) {
                catalogs.push(name);
            }
        }
    }
    Ok(catalogs)
}

pub(crate) fn schemas_from(batches: &[RecordBatch]) -> Result<Vec<SchemaEntry>, ClientError> {
    let mut schemas = Vec::new();
    for batch in batches {
        let catalogs = str_col(batch, "catalog_name")?;
        let names = str_col(batch, "db_schema_name")?;
        for row in 0..batch.num_rows() {
            schemas.push(SchemaEntry {
                catalog: opt_str(catalogs, row),
                schema: names.value(row).to_string(),
            });
        }
    }
    Ok(schemas)
}

pub(crate) fn tables_from(batches: &[RecordBatch]) -> Result<Vec<TableEntry>, ClientError> {
    let mut tables = Vec::new();
    for batch in batches {
        let catalogs = str_col(batch, "catalog_name")?;
        let schemas = str_col(batch, "db_schema_name")?;
        let names = str_col(batch, "table_name")?;
        let types = str_col(batch, "table_type")?;
        for row in 0..batch.num_rows() {
            tables.push(TableEntry {
                catalog: opt_str(catalogs, row),
                schema: opt_str(schemas, row),
                name: names.value(row).to_string(),
                table_type: types.value(row).to_string(),
            });
        }
    }
    Ok(tables)
}

pub(crate) fn columns_from(batches: &[RecordBatch]) -> Result<Vec<ColumnEntry>, ClientError> {
    let mut columns = Vec::new();
    for batch in batches {
        let catalogs = str_col(batch, "catalog_name")?;
        let schemas = str_col(batch, "db_schema_name")?;
        let names = str_col(batch, "table_name")?;
        let table_schemas = batch
            .column_by_name("table_schema")
            .and_then(|c| c.as_any().downcast_ref::<BinaryArray>())
            .ok_or_else(|| {
                ClientError::Decode("table listing did not include table schemas".to_string())
            })?;

        for row in 0..batch.num_rows() {
            let table = names.value(row).to_string();
            let schema = decode_table_schema(table_schemas.value(row))?;
            for (idx, field) in schema.fields().iter().enumerate() {
                columns.push(ColumnEntry {
                    catalog: opt_str(catalogs, row),
                    schema: opt_str(schemas, row),
                    table: table.clone(),
                    name: field.name().clone(),
                    data_type: field.data_type().clone(),
                    position: idx + 1,
                });
            }
        }
    }
    Ok(columns)
}

/// Servers encode `table_schema` either as an IPC stream fragment (with a
/// length prefix) or as a bare flatbuffer message. Accept both.
fn decode_table_schema(bytes: &[u8]) -> Result<Schema, ClientError> {
    try_schema_from_ipc_buffer(bytes)
        .or_else(|_| try_schema_from_flatbuffer_bytes(bytes))
        .map_err(|e| ClientError::Decode(format!("invalid table schema: {}", e)))
}
