// src/services/auth.rs

use bcrypt::verify;
use std::sync::Arc;

use crate::{
    common::error::AppError,
    db::WorkerDirectory,
    models::{
        auth::{Principal, TokenPair},
        worker::Worker,
    },
    services::{refresh_ledger::RefreshLedger, tokens::TokenIssuer},
};

#[derive(Clone)]
pub struct AuthService {
    workers: Arc<dyn WorkerDirectory>,
    issuer: TokenIssuer,
    ledger: Arc<RefreshLedger>,
}

impl AuthService {
    pub fn new(workers: Arc<dyn WorkerDirectory>, issuer: TokenIssuer, ledger: Arc<RefreshLedger>) -> Self {
        Self { workers, issuer, ledger }
    }

    /// Both failure causes surface as the same `InvalidCredentials`; only the logs differ.
    pub async fn login(&self, employee_id: &str, password: &str) -> Result<(Worker, TokenPair), AppError> {
        // 1. Look the worker up
        let worker = match self.workers.find_by_employee_id(employee_id).await? {
            Some(worker) => worker,
            None => {
                tracing::warn!(employee_id, "Login failed: unknown employee id");
                return Err(AppError::InvalidCredentials);
            }
        };

        // 2. Check the password off the async runtime
        let password = password.to_owned();
        let password_hash = worker.password_hash.clone();
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
            .await
            .map_err(|e| anyhow::anyhow!("Password verification task failed: {}", e))??;

        if !is_password_valid {
            tracing::warn!(employee_id, worker_id = worker.id, "Login failed: wrong password");
            return Err(AppError::InvalidCredentials);
        }

        // 3. Issue the session
        let pair = self.issuer.issue_pair(&Principal::from(&worker))?;

        // 4. Best effort; a failed stamp never fails the login
        if let Err(e) = self.workers.record_login(worker.id).await {
            tracing::warn!(worker_id = worker.id, error = %e, "Could not record last login");
        }

        tracing::info!(worker_id = worker.id, role = worker.role_code.code(), "Worker logged in");
        Ok((worker, pair))
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let claims = self.issuer.decode_refresh(refresh_token)?;

        let worker = self
            .workers
            .find_by_id(claims.worker_id)
            .await?
            .ok_or(AppError::InvalidRefreshToken)?;

        if worker.role_code.code() != claims.role_code {
            tracing::warn!(worker_id = worker.id, "Refresh refused: role changed since login");
            return Err(AppError::InvalidRefreshToken);
        }

        let principal = Principal::from(&worker);
        let issuer = self.issuer.clone();
        self.ledger
            .rotate(claims.jti, claims.exp, move || async move { issuer.issue_pair(&principal) })
            .await
    }

    pub fn authenticate(&self, access_token: &str) -> Result<Principal, AppError> {
        let claims = self.issuer.decode_access(access_token)?;
        Ok(Principal::try_from(&claims)?)
    }

    /// Revokes the refresh token when one is supplied and still verifiable.
    pub fn logout(&self, refresh_token: Option<&str>) -> Result<(), AppError> {
        if let Some(claims) = refresh_token.and_then(|token| self.issuer.decode_refresh(token).ok()) {
            self.ledger.revoke(claims.jti, claims.exp)?;
            tracing::info!(worker_id = claims.worker_id, "Refresh token revoked");
        }
        Ok(())
    }

    pub async fn current_worker(&self, principal: &Principal) -> Result<Worker, AppError> {
        self.workers
            .find_by_id(principal.worker_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Worker not found".into()))
    }
}
