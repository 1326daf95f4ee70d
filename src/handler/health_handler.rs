use crate::config::logging::secure_log;
use crate::response::app_response::SuccessResponse;
use crate::state::health_state::HealthState;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Instant;
use tracing::debug;

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub store: StoreHealth,
    pub tokens: Option<TokenHealth>,
    pub memory: Option<MemoryUsage>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct StoreHealth {
    pub backend: String,
    pub status: String,
    pub response_time_ms: Option<u128>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TokenHealth {
    pub total_tokens: i64,
    pub expired_tokens: i64,
    pub revoked_tokens: i64,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub total_kb: u64,
    pub free_kb: u64,
    pub available_kb: u64,
}

static START_TIME: OnceLock<Instant> = OnceLock::new();

pub fn init_start_time() {
    START_TIME.set(Instant::now()).ok();
}

pub fn get_uptime_seconds() -> u64 {
    START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Liveness plus a store round-trip; always 200, the verdict is in `status`
pub async fn health_check(State(state): State<HealthState>) -> SuccessResponse<HealthStatus> {
    let store = check_store(&state).await;

    let tokens = match state.tokens.stats().await {
        Ok(stats) => Some(TokenHealth {
            total_tokens: stats.total_tokens,
            expired_tokens: stats.expired_tokens,
            revoked_tokens: stats.revoked_tokens,
        }),
        Err(e) => {
            secure_log::secure_error!("Token statistics unavailable for health check", e);
            None
        }
    };

    let status = if store.status == "healthy" { "healthy" } else { "unhealthy" };

    SuccessResponse::send(HealthStatus {
        status: status.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        uptime_seconds: get_uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
        tokens,
        memory: memory_usage(),
    })
}

async fn check_store(state: &HealthState) -> StoreHealth {
    let started = Instant::now();
    match state.credentials.ping().await {
        Ok(()) => {
            let response_time = started.elapsed().as_millis();
            debug!("Store health check passed in {}ms", response_time);
            StoreHealth {
                backend: state.backend.to_string(),
                status: "healthy".to_string(),
                response_time_ms: Some(response_time),
            }
        }
        Err(e) => {
            secure_log::secure_error!("Store health check failed", e);
            StoreHealth {
                backend: state.backend.to_string(),
                status: "unhealthy".to_string(),
                response_time_ms: None,
            }
        }
    }
}

fn memory_usage() -> Option<MemoryUsage> {
    // sys-info reports kilobytes already
    sys_info::mem_info().ok().map(|mem| MemoryUsage {
        total_kb: mem.total,
        free_kb: mem.free,
        available_kb: mem.avail,
    })
}
