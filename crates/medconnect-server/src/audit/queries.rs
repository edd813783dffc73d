//! Database queries for audit logs

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::debug;

use super::models::{AuditEntry, AuditQuery, CreateAuditEntry};
use super::store::{AuditStore, AuditStoreError};

const AUDIT_COLUMNS: &str =
    "id, user_id, action, resource_type, resource_id, ip_address, user_agent, details, timestamp";

/// Postgres-backed audit store over the `audit_log` table
#[derive(Debug, Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    /// Insert a new audit record, returning it with generated id and timestamp
    async fn insert(&self, entry: CreateAuditEntry) -> Result<AuditEntry, AuditStoreError> {
        let record = sqlx::query_as::<_, AuditEntry>(
            r#"
            INSERT INTO audit_log (
                user_id, action, resource_type, resource_id,
                ip_address, user_agent, details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, action, resource_type, resource_id,
                      ip_address, user_agent, details, timestamp
            "#,
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type.as_str())
        .bind(&entry.resource_id)
        .bind(&entry.ip_address)
        .bind(&entry.user_agent)
        .bind(&entry.details)
        .fetch_one(&self.pool)
        .await?;

        debug!(
            audit_id = record.id,
            action = %entry.action,
            resource_type = %entry.resource_type,
            "Created audit log entry"
        );

        Ok(record)
    }

    /// Query audit logs with filters, newest first
    async fn query(&self, query: AuditQuery) -> Result<Vec<AuditEntry>, AuditStoreError> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {} FROM audit_log WHERE 1=1", AUDIT_COLUMNS));

        if let Some(user_id) = query.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = query.action {
            builder.push(" AND action = ").push_bind(action.as_str());
        }
        if let Some(resource_type) = query.resource_type {
            builder
                .push(" AND resource_type = ")
                .push_bind(resource_type.as_str());
        }
        if let Some(ref resource_id) = query.resource_id {
            builder.push(" AND resource_id = ").push_bind(resource_id.clone());
        }
        if let Some(start_time) = query.start_time {
            builder.push(" AND timestamp >= ").push_bind(start_time);
        }
        if let Some(end_time) = query.end_time {
            builder.push(" AND timestamp <= ").push_bind(end_time);
        }

        builder
            .push(" ORDER BY timestamp DESC, id DESC LIMIT ")
            .push_bind(query.effective_limit())
            .push(" OFFSET ")
            .push_bind(query.effective_offset());

        let records = builder
            .build_query_as::<AuditEntry>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = records.len(), "Queried audit logs");

        Ok(records)
    }
}
