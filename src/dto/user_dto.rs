use crate::entity::user::{User, UserStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current-user profile returned by `/auth/me`
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileDto {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub nickname: Option<String>,
    pub status: UserStatus,
    pub roles: Vec<String>,
    pub login_count: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_login_ip: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfileDto {
    pub fn from(model: User, roles: Vec<String>) -> UserProfileDto {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            nickname: model.nickname,
            status: model.status,
            roles,
            login_count: model.login_count,
            last_login_at: model.last_login_at,
            last_login_ip: model.last_login_ip,
            created_at: model.created_at,
        }
    }
}
