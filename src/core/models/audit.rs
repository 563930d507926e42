use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Application-level log line kept by the `LoggingService`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AppLog {
    pub id: String,
    pub action: String,
    pub actor: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Per-group audit record, written through storage alongside the mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupAudit {
    pub id: String,
    pub group_id: String,
    pub action: String,
    pub actor: Option<String>,
    pub details: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}
