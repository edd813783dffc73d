//! Audit data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

// ============================================================================
// Audit Query Constants
// ============================================================================

/// Default number of audit entries returned per query
pub const DEFAULT_AUDIT_QUERY_LIMIT: i64 = 100;

/// Maximum number of audit entries that can be returned in a single query.
pub const MAX_AUDIT_QUERY_LIMIT: i64 = 1000;

/// Maximum stored length of the client user agent, in characters
pub const MAX_USER_AGENT_CHARS: usize = 500;

/// Resource id used when an access touches a collection rather than one row
pub const MULTIPLE_RESOURCES: &str = "multiple";

/// Audit log entry from the database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuditEntry {
    /// Insertion-ordered identifier
    pub id: i64,
    /// User who performed the action (nullable for anonymous actions)
    pub user_id: Option<i64>,
    /// Action performed
    pub action: String,
    /// Type of resource affected
    pub resource_type: String,
    /// Identifier of the affected resource: numeric, composite or `multiple`
    pub resource_id: String,
    /// Client IP address (IPv4 or IPv6)
    pub ip_address: Option<String>,
    /// Client user agent string
    pub user_agent: Option<String>,
    /// Structured context, `{}` when nothing was supplied
    pub details: JsonValue,
    /// Timestamp when the action occurred
    pub timestamp: DateTime<Utc>,
}

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    View,
    Create,
    Update,
    Delete,
    Export,
    Access,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Export => "export",
            Self::Access => "access",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Resource types that carry PHI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    PatientProfile,
    Appointment,
    MedicalHistory,
    Report,
    Scan,
    Conversation,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PatientProfile => "patient_profile",
            Self::Appointment => "appointment",
            Self::MedicalHistory => "medical_history",
            Self::Report => "report",
            Self::Scan => "scan",
            Self::Conversation => "conversation",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Query parameters for audit logs
#[derive(Debug, Clone, Deserialize)]
pub struct AuditQuery {
    /// Filter by user ID
    pub user_id: Option<i64>,
    /// Filter by action
    pub action: Option<AuditAction>,
    /// Filter by resource type
    pub resource_type: Option<ResourceType>,
    /// Filter by resource ID
    pub resource_id: Option<String>,
    /// Start timestamp for range query (inclusive)
    pub start_time: Option<DateTime<Utc>>,
    /// End timestamp for range query (inclusive)
    pub end_time: Option<DateTime<Utc>>,
    /// Maximum number of results to return
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Offset for pagination
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_AUDIT_QUERY_LIMIT
}

impl Default for AuditQuery {
    fn default() -> Self {
        Self {
            user_id: None,
            action: None,
            resource_type: None,
            resource_id: None,
            start_time: None,
            end_time: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

impl AuditQuery {
    /// Limit clamped to `1..=MAX_AUDIT_QUERY_LIMIT`
    pub fn effective_limit(&self) -> i64 {
        self.limit.clamp(1, MAX_AUDIT_QUERY_LIMIT)
    }

    pub fn effective_offset(&self) -> i64 {
        self.offset.max(0)
    }

    /// Whether an entry satisfies every filter that is set
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        self.user_id.map_or(true, |id| entry.user_id == Some(id))
            && self.action.map_or(true, |a| entry.action == a.as_str())
            && self.resource_type.map_or(true, |r| entry.resource_type == r.as_str())
            && self
                .resource_id
                .as_deref()
                .map_or(true, |id| entry.resource_id == id)
            && self.start_time.map_or(true, |t| entry.timestamp >= t)
            && self.end_time.map_or(true, |t| entry.timestamp <= t)
    }
}

/// Input for creating an audit entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateAuditEntry {
    /// User who performed the action (nullable for anonymous actions)
    pub user_id: Option<i64>,
    /// Action performed
    pub action: AuditAction,
    /// Type of resource affected
    pub resource_type: ResourceType,
    /// Identifier of the affected resource
    pub resource_id: String,
    /// Structured context
    pub details: JsonValue,
    /// Client IP address
    pub ip_address: Option<String>,
    /// Client user agent string
    pub user_agent: Option<String>,
}

impl CreateAuditEntry {
    /// Create a builder for constructing audit entries
    pub fn builder() -> AuditEntryBuilder {
        AuditEntryBuilder::default()
    }
}

/// Normalize a detail value into a JSON object.
///
/// `null` becomes `{}`, objects are kept, and any other value is wrapped as
/// `{"value": ...}`.
pub fn normalize_details(details: Option<JsonValue>) -> JsonValue {
    match details {
        None | Some(JsonValue::Null) => json!({}),
        Some(JsonValue::Object(map)) => JsonValue::Object(map),
        Some(other) => json!({ "value": other }),
    }
}

/// Truncate a user agent to `MAX_USER_AGENT_CHARS` on a char boundary
pub fn truncate_user_agent(user_agent: &str) -> String {
    match user_agent.char_indices().nth(MAX_USER_AGENT_CHARS) {
        Some((idx, _)) => user_agent[..idx].to_string(),
        None => user_agent.to_string(),
    }
}

/// Errors returned by [`AuditEntryBuilder::try_build`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuditEntryBuildError {
    #[error("action is required")]
    MissingAction,
    #[error("resource_type is required")]
    MissingResourceType,
}

/// Builder for creating audit entries
#[derive(Debug, Clone, Default)]
pub struct AuditEntryBuilder {
    user_id: Option<i64>,
    action: Option<AuditAction>,
    resource_type: Option<ResourceType>,
    resource_id: Option<String>,
    details: Option<JsonValue>,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl AuditEntryBuilder {
    pub fn user_id(mut self, user_id: Option<i64>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn resource_type(mut self, resource_type: ResourceType) -> Self {
        self.resource_type = Some(resource_type);
        self
    }

    pub fn resource_id(mut self, resource_id: impl ToString) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn ip_address(mut self, ip_address: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self
    }

    pub fn user_agent(mut self, user_agent: impl AsRef<str>) -> Self {
        self.user_agent = Some(truncate_user_agent(user_agent.as_ref()));
        self
    }

    /// Build the entry, failing if action or resource type is missing.
    ///
    /// A missing resource id is stored as the empty string.
    pub fn try_build(self) -> Result<CreateAuditEntry, AuditEntryBuildError> {
        let action = self.action.ok_or(AuditEntryBuildError::MissingAction)?;
        let resource_type = self
            .resource_type
            .ok_or(AuditEntryBuildError::MissingResourceType)?;

        Ok(CreateAuditEntry {
            user_id: self.user_id,
            action,
            resource_type,
            resource_id: self.resource_id.unwrap_or_default(),
            details: normalize_details(self.details),
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        })
    }
}
