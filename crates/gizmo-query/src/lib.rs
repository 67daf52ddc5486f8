//! Gizmo Query - statement classification, pagination and result shaping
//!
//! Sits between the HTTP API and the Flight SQL adapter: decides whether a
//! statement can be wrapped in a bounded outer SELECT, executes it through
//! a [`gizmo_flight::SqlBackend`], and normalizes the Arrow result into
//! JSON-safe rows with a `has_more` flag.

pub mod executor;
pub mod normalize;
pub mod paginate;

pub use executor::{run_query, ColumnInfo, QueryOutcome, DEFAULT_LIMIT};
pub use normalize::{batch_rows, cell_value, normalize_type_name, sql_type_name};
pub use paginate::{can_paginate, strip_comments, wrap_paginated};
