pub mod auth;
pub mod correlation;
pub mod rate_limit;
pub mod rbac;
