//! Gizmo Session - registry of live connections
//!
//! An injected, task-safe keyed store from opaque session id to one live
//! [`SqlBackend`] handle. The registry guarantees atomic insert/lookup/
//! remove; each session's own mutex serializes statement execution within
//! that session, so two concurrent requests on one session id queue up
//! instead of sharing the connection.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gizmo_flight::SqlBackend;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Unknown or already disconnected session id. Surfaced as a
    /// "please reconnect" condition rather than a generic failure.
    #[error("session not found: {0}")]
    NotFound(String),
}

/// One authenticated connection to a remote server.
pub struct Session {
    id: String,
    created_at: DateTime<Utc>,
    backend: Mutex<Box<dyn SqlBackend>>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Single-flight guard for the connection handle. Hold the lock for
    /// the duration of each backend call.
    pub fn backend(&self) -> &Mutex<Box<dyn SqlBackend>> {
        &self.backend
    }
}

/// Process-wide map from session id to live connection.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a connected backend under a fresh random id.
    pub async fn insert(&self, backend: Box<dyn SqlBackend>) -> Arc<Session> {
        let session = Arc::new(Session {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            backend: Mutex::new(backend),
        });
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        info!(session_id = %session.id, live = sessions.len(), "session created");
        session
    }

    pub async fn lookup(&self, id: &str) -> Result<Arc<Session>, SessionError> {
        self.sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))
    }

    /// Remove a session, returning it if it existed. Removing an unknown
    /// id is not an error.
    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let mut sessions = self.sessions.write().await;
        let removed = sessions.remove(id);
        if removed.is_some() {
            info!(session_id = %id, live = sessions.len(), "session removed");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::Schema;
    use async_trait::async_trait;
    use gizmo_flight::{ClientError, ColumnEntry, QueryData, SchemaEntry, TableEntry};

    struct NullBackend;

    #[async_trait]
    impl SqlBackend for NullBackend {
        async fn execute(&mut self, _sql: &str) -> Result<QueryData, ClientError> {
            Ok(QueryData {
                schema: Arc::new(Schema::empty()),
                batches: vec![],
            })
        }

        async fn list_catalogs(&mut self) -> Result<Vec<String>, ClientError> {
            Ok(vec![])
        }

        async fn list_schemas(
            &mut self,
            _catalog: Option<&str>,
        ) -> Result<Vec<SchemaEntry>, ClientError> {
            Ok(vec![])
        }

        async fn list_tables(
            &mut self,
            _catalog: Option<&str>,
            _schema: Option<&str>,
        ) -> Result<Vec<TableEntry>, ClientError> {
            Ok(vec![])
        }

        async fn list_columns(
            &mut self,
            _catalog: Option<&str>,
            _schema: Option<&str>,
            _table: Option<&str>,
        ) -> Result<Vec<ColumnEntry>, ClientError> {
            Ok(vec![])
        }

        async fn close(&mut self) -> Result<(), ClientError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn insert_then_lookup() {
        let registry = SessionRegistry::new();
        let session = registry.insert(Box::new(NullBackend)).await;
        let found = registry.lookup(session.id()).await.unwrap();
        assert_eq!(found.id(), session.id());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn ids_are_unique() {
        let registry = SessionRegistry::new();
        let a = registry.insert(Box::new(NullBackend)).await;
        let b = registry.insert(Box::new(NullBackend)).await;
        assert_ne!(a.id(), b.id());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn lookup_unknown_is_not_found() {
        let registry = SessionRegistry::new();
        let err = registry.lookup("nope").await.err().unwrap();
        assert!(matches!(err, SessionError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let registry = SessionRegistry::new();
        let session = registry.insert(Box::new(NullBackend)).await;
        assert!(registry.remove(session.id()).await.is_some());
        assert!(registry.remove(session.id()).await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn lookup_after_remove_is_not_found() {
        let registry = SessionRegistry::new();
        let session = registry.insert(Box::new(NullBackend)).await;
        registry.remove(session.id()).await;
        assert!(registry.lookup(session.id()).await.is_err());
    }

    #[tokio::test]
    async fn backend_is_usable_through_session() {
        let registry = SessionRegistry::new();
        let session = registry.insert(Box::new(NullBackend)).await;
        let mut backend = session.backend().lock().await;
        let data = backend.execute("SELECT 1").await.unwrap();
        assert!(data.batches.is_empty());
    }
}
