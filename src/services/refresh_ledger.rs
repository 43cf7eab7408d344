// src/services/refresh_ledger.rs

use chrono::Utc;
use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::{common::error::AppError, models::auth::TokenPair};

enum Entry {
    // First use seen; every caller in the grace window shares this pair
    Rotating {
        pair: Arc<OnceCell<TokenPair>>,
        started: Instant,
        expires_at: i64,
    },
    Revoked {
        expires_at: i64,
    },
}

impl Entry {
    fn expires_at(&self) -> i64 {
        match self {
            Entry::Rotating { expires_at, .. } | Entry::Revoked { expires_at } => *expires_at,
        }
    }
}

/// Tracks used refresh tokens by `jti` so a token rotates exactly once.
pub struct RefreshLedger {
    entries: Mutex<HashMap<Uuid, Entry>>,
    grace: Duration,
}

impl RefreshLedger {
    pub fn new(grace: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            grace,
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Entry>>, AppError> {
        self.entries
            .lock()
            .map_err(|_| AppError::InternalServerError(anyhow::anyhow!("refresh ledger poisoned")))
    }

    /// Runs `issue` at most once per `jti`. Concurrent and repeated callers inside the
    /// grace window get the same pair; later callers are refused.
    pub async fn rotate<F, Fut>(&self, jti: Uuid, expires_at: i64, issue: F) -> Result<TokenPair, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenPair, AppError>>,
    {
        let pair = {
            let mut entries = self.lock()?;
            let now = Utc::now().timestamp();
            entries.retain(|_, entry| entry.expires_at() >= now);

            match entries.get(&jti) {
                Some(Entry::Revoked { .. }) => return Err(AppError::InvalidRefreshToken),
                Some(Entry::Rotating { started, .. }) if started.elapsed() > self.grace => {
                    tracing::warn!(%jti, "Refresh token reused after rotation");
                    return Err(AppError::InvalidRefreshToken);
                }
                Some(Entry::Rotating { pair, .. }) => pair.clone(),
                None => {
                    let pair = Arc::new(OnceCell::new());
                    entries.insert(
                        jti,
                        Entry::Rotating {
                            pair: pair.clone(),
                            started: Instant::now(),
                            expires_at,
                        },
                    );
                    pair
                }
            }
        };

        pair.get_or_try_init(issue).await.cloned()
    }

    pub fn revoke(&self, jti: Uuid, expires_at: i64) -> Result<(), AppError> {
        self.lock()?.insert(jti, Entry::Revoked { expires_at });
        Ok(())
    }
}
