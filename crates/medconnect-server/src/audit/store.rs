//! Audit storage seam

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use thiserror::Error;

use super::models::{AuditEntry, AuditQuery, CreateAuditEntry, ResourceType};

/// Errors raised by an audit store
///
/// These never reach the caller of [`Auditor::record`](super::Auditor::record);
/// they are logged and dropped there.
#[derive(Debug, Error)]
pub enum AuditStoreError {
    #[error("Audit database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Audit store unavailable: {0}")]
    Unavailable(String),
}

/// Append-only persistence for audit entries (dependency injection)
#[async_trait]
pub trait AuditStore: Send + Sync {
    /// Append one entry, returning it with its id and timestamp
    async fn insert(&self, entry: CreateAuditEntry) -> Result<AuditEntry, AuditStoreError>;

    /// Entries matching every set filter, newest first
    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError>;

    /// Audit trail for one resource, newest first
    async fn get_audit_trail(
        &self,
        resource_type: ResourceType,
        resource_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let mut query = AuditQuery {
            resource_type: Some(resource_type),
            resource_id: Some(resource_id.to_string()),
            ..AuditQuery::default()
        };
        if let Some(limit) = limit {
            query.limit = limit;
        }
        self.query(query).await
    }

    /// Most recent entries for one user
    async fn get_user_audit_logs(
        &self,
        user_id: i64,
        limit: Option<i64>,
    ) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let mut query = AuditQuery {
            user_id: Some(user_id),
            ..AuditQuery::default()
        };
        if let Some(limit) = limit {
            query.limit = limit;
        }
        self.query(query).await
    }
}

/// Mutex-guarded in-process store, for tests and running without a database
#[derive(Debug, Default)]
pub struct InMemoryAuditStore {
    entries: Mutex<Vec<AuditEntry>>,
}

impl InMemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries in insertion order
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditStore for InMemoryAuditStore {
    async fn insert(&self, entry: CreateAuditEntry) -> Result<AuditEntry, AuditStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| AuditStoreError::Unavailable(format!("audit store lock poisoned: {}", e)))?;

        let record = AuditEntry {
            id: entries.len() as i64 + 1,
            user_id: entry.user_id,
            action: entry.action.as_str().to_string(),
            resource_type: entry.resource_type.as_str().to_string(),
            resource_id: entry.resource_id,
            ip_address: entry.ip_address,
            user_agent: entry.user_agent,
            details: entry.details,
            timestamp: Utc::now(),
        };
        entries.push(record.clone());

        Ok(record)
    }

    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| AuditStoreError::Unavailable(format!("audit store lock poisoned: {}", e)))?;

        let mut matching: Vec<AuditEntry> =
            entries.iter().filter(|e| query.matches(e)).cloned().collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));

        Ok(matching
            .into_iter()
            .skip(query.effective_offset() as usize)
            .take(query.effective_limit() as usize)
            .collect())
    }
}
