use crate::dto::system_dto::{CleanupResultDto, CleanupStatusDto};
use crate::error::store_error::StoreError;
use crate::service::token_store::TokenStore;
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Expired token sweeps, run on demand by an operator or on a timer.
#[derive(Clone)]
pub struct CleanupService {
    tokens: TokenStore,
    last_cleanup: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl CleanupService {
    pub fn new(tokens: TokenStore) -> Self {
        Self {
            tokens,
            last_cleanup: Arc::new(RwLock::new(None)),
        }
    }

    /// Delete every pair whose access and refresh lifetimes have both ended
    pub async fn cleanup_expired_tokens(&self) -> Result<CleanupResultDto, StoreError> {
        let started = Instant::now();
        let deleted_count = self.tokens.cleanup_expired().await?;
        let timestamp = Utc::now();

        if let Ok(mut last) = self.last_cleanup.write() {
            *last = Some(timestamp);
        }

        let execution_time_ms = started.elapsed().as_millis();
        info!(
            "SECURITY: Token cleanup removed {} expired pair(s) in {}ms",
            deleted_count, execution_time_ms
        );

        Ok(CleanupResultDto {
            deleted_count,
            execution_time_ms,
            timestamp,
        })
    }

    pub async fn status(&self) -> Result<CleanupStatusDto, StoreError> {
        let stats = self.tokens.stats().await?;
        Ok(CleanupStatusDto {
            total_tokens: stats.total_tokens,
            expired_tokens: stats.expired_tokens,
            revoked_tokens: stats.revoked_tokens,
            last_cleanup_time: self.last_cleanup_time(),
        })
    }

    pub fn last_cleanup_time(&self) -> Option<DateTime<Utc>> {
        self.last_cleanup.read().ok().and_then(|last| *last)
    }
}

/// Background token cleanup with graceful shutdown
pub fn start_cleanup_task(
    service: CleanupService,
    interval_minutes: u64,
    shutdown_token: CancellationToken,
) -> JoinHandle<()> {
    let interval_duration = Duration::from_secs(interval_minutes.max(1) * 60);

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval_duration);
        // The first tick completes immediately; skip it so startup is not a sweep
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = service.cleanup_expired_tokens().await {
                        error!("Error during token cleanup: {}", e);
                    }
                }
                _ = shutdown_token.cancelled() => {
                    info!("Token cleanup task received shutdown signal, stopping gracefully");
                    break;
                }
            }
        }

        info!("Token cleanup task stopped");
    })
}
