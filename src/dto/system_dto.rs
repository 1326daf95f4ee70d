use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupResultDto {
    pub deleted_count: u64,
    pub execution_time_ms: u128,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupStatusDto {
    pub total_tokens: i64,
    pub expired_tokens: i64,
    pub revoked_tokens: i64,
    pub last_cleanup_time: Option<DateTime<Utc>>,
}
