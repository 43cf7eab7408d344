pub mod auth;
pub mod authorization;
pub mod lifecycle;
pub mod program_filter;
pub mod program_service;
pub mod refresh_ledger;
pub mod tokens;
pub mod worker_service;
