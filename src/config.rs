// src/config.rs

use anyhow::{Context, anyhow, bail};
use sqlx::{PgPool, postgres::PgPoolOptions};
use std::{env, sync::Arc, time::{Duration, Instant}};

use crate::{
    db::{ProgramRepository, ReferenceRepository, SettingsRepository, WorkerRepository},
    middleware::rate_limit::RateLimiter,
    services::{
        auth::AuthService, program_service::ProgramService, refresh_ledger::RefreshLedger,
        tokens::TokenIssuer, worker_service::WorkerService,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn name(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub jwt_secret: String,
    pub refresh_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub refresh_reuse_grace: Duration,
    pub port: u16,
    pub cors_origin: String,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub bcrypt_cost: u32,
    pub environment: Environment,
}

/// `15m`, `7d`, `3600s`, `2h`. A bare number is seconds.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw.find(|c: char| !c.is_ascii_digit()).unwrap_or(raw.len());
    let (number, unit) = raw.split_at(split);
    let value: u64 = number
        .parse()
        .with_context(|| format!("invalid duration '{}'", raw))?;
    let multiplier: u64 = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        other => bail!("unknown duration unit '{}' in '{}'", other, raw),
    };
    let seconds = value
        .checked_mul(multiplier)
        .filter(|s| i64::try_from(*s).is_ok())
        .ok_or_else(|| anyhow!("duration '{}' is out of range", raw))?;
    Ok(Duration::from_secs(seconds))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| lookup(key).ok_or_else(|| anyhow!("{} must be set", key));
        let parsed = |key: &str, default: &str| -> anyhow::Result<u64> {
            let raw = lookup(key).unwrap_or_else(|| default.to_string());
            raw.trim()
                .parse()
                .with_context(|| format!("{} must be a number, got '{}'", key, raw))
        };

        let environment = match lookup("APP_ENV").or_else(|| lookup("NODE_ENV")).as_deref() {
            Some("production") => Environment::Production,
            _ => Environment::Development,
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections: parsed("DATABASE_MAX_CONNECTIONS", "5")? as u32,
            jwt_secret: required("JWT_SECRET")?,
            refresh_secret: required("REFRESH_SECRET")?,
            access_token_ttl: parse_duration(
                &lookup("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|| "15m".into()),
            )
            .context("ACCESS_TOKEN_EXPIRY")?,
            refresh_token_ttl: parse_duration(
                &lookup("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|| "7d".into()),
            )
            .context("REFRESH_TOKEN_EXPIRY")?,
            refresh_reuse_grace: Duration::from_secs(parsed("REFRESH_REUSE_GRACE_SECS", "30")?),
            port: parsed("PORT", "4000")? as u16,
            cors_origin: lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:8080".into()),
            rate_limit_window: Duration::from_millis(parsed("RATE_LIMIT_WINDOW_MS", "900000")?),
            rate_limit_max_requests: parsed("RATE_LIMIT_MAX_REQUESTS", "100")? as u32,
            bcrypt_cost: parsed("BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())? as u32,
            environment,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    pub auth_service: AuthService,
    pub worker_service: WorkerService,
    pub program_service: ProgramService,
    pub settings_repo: SettingsRepository,
    pub reference_repo: ReferenceRepository,
    pub rate_limiter: Arc<RateLimiter>,
    pub started_at: Instant,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.database_url)
            .await?;

        tracing::info!("Database connection established");

        Ok(Self::from_parts(config, db_pool))
    }

    /// Wires repositories and services around an existing pool.
    pub fn from_parts(config: Config, db_pool: PgPool) -> Self {
        let worker_repo = WorkerRepository::new(db_pool.clone());
        let program_repo = ProgramRepository::new(db_pool.clone());
        let settings_repo = SettingsRepository::new(db_pool.clone());
        let reference_repo = ReferenceRepository::new(db_pool.clone());

        let issuer = TokenIssuer::new(
            &config.jwt_secret,
            &config.refresh_secret,
            config.access_token_ttl,
            config.refresh_token_ttl,
        );
        let ledger = Arc::new(RefreshLedger::new(config.refresh_reuse_grace));

        let auth_service = AuthService::new(Arc::new(worker_repo.clone()), issuer, ledger);
        let worker_service = WorkerService::new(Arc::new(worker_repo.clone()), config.bcrypt_cost);
        let program_service = ProgramService::new(
            Arc::new(program_repo),
            Arc::new(settings_repo.clone()),
            Arc::new(worker_repo),
        );
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate_limit_window,
            config.rate_limit_max_requests,
        ));

        Self {
            db_pool,
            config: Arc::new(config),
            auth_service,
            worker_service,
            program_service,
            settings_repo,
            reference_repo,
            rate_limiter,
            started_at: Instant::now(),
        }
    }
}
