//! Statement execution with bounded pagination.

use std::time::Instant;

use gizmo_flight::{ClientError, SqlBackend};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::normalize::{batch_rows, sql_type_name};
use crate::paginate::{can_paginate, wrap_paginated};

/// Rows returned per page when the request does not say otherwise.
pub const DEFAULT_LIMIT: usize = 1000;

/// One column of a result set.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub sql_type: String,
}

/// A fully normalized result set, ready to serialize for the browser.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryOutcome {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Map<String, Value>>,
    pub row_count: usize,
    pub execution_time_ms: u64,
    pub has_more: bool,
}

/// Execute one statement. Paginatable statements are wrapped in a bounded
/// outer SELECT requesting `limit + 1` rows; the surplus row, if present,
/// is trimmed off and recorded as `has_more`. Everything else runs
/// unmodified with `has_more` always false.
pub async fn run_query(
    backend: &mut dyn SqlBackend,
    sql: &str,
    limit: usize,
    offset: usize,
) -> Result<QueryOutcome, ClientError> {
    let paginatable = can_paginate(sql);
    let effective_sql = if paginatable {
        wrap_paginated(sql, limit.saturating_add(1), offset)
    } else {
        sql.to_string()
    };
    debug!(paginatable, limit, offset, "executing statement");

    let started = Instant::now();
    let data = backend.execute(&effective_sql).await?;
    let execution_time_ms = started.elapsed().as_millis() as u64;

    let columns = data
        .schema
        .fields()
        .iter()
        .map(|field| ColumnInfo {
            name: field.name().clone(),
            sql_type: sql_type_name(field.data_type()),
        })
        .collect();

    let mut rows: Vec<Map<String, Value>> = Vec::new();
    for batch in &data.batches {
        rows.extend(batch_rows(batch));
    }

    let mut has_more = false;
    if paginatable && rows.len() > limit {
        rows.truncate(limit);
        has_more = true;
    }

    let row_count = rows.len();
    Ok(QueryOutcome {
        columns,
        rows,
        row_count,
        execution_time_ms,
        has_more,
    })
}
