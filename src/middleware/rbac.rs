// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    middleware::auth::AuthenticatedUser,
    models::{auth::Principal, role::Role},
    services::authorization::PROGRAM_CREATORS,
};

/// 1. A named set of roles allowed through a route
pub trait RoleSet: Send + Sync + 'static {
    const ROLES: &'static [Role];
    fn label() -> &'static str;
}

/// 2. The extractor. Yields the principal when its role is in `T::ROLES`.
pub struct RequireRole<T>(pub Principal, pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleSet,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(principal) = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !T::ROLES.contains(&principal.role) {
            tracing::warn!(
                worker_id = principal.worker_id,
                role = principal.role.code(),
                required = T::label(),
                "Role check failed"
            );
            return Err(AppError::Forbidden(format!(
                "This action requires the '{}' role set",
                T::label()
            )));
        }

        Ok(RequireRole(principal, PhantomData))
    }
}

// ---
// ROLE SETS
// ---

pub struct WorkerReaders;
impl RoleSet for WorkerReaders {
    const ROLES: &'static [Role] = &[
        Role::SystemAdministrator,
        Role::ProcurementManager,
        Role::TechnicalOperator,
    ];
    fn label() -> &'static str { "workers:read" }
}

pub struct WorkerEditors;
impl RoleSet for WorkerEditors {
    const ROLES: &'static [Role] = &[Role::SystemAdministrator, Role::ProcurementManager];
    fn label() -> &'static str { "workers:write" }
}

pub struct ProgramCreators;
impl RoleSet for ProgramCreators {
    const ROLES: &'static [Role] = PROGRAM_CREATORS;
    fn label() -> &'static str { "programs:create" }
}

pub struct InfrastructureAdmins;
impl RoleSet for InfrastructureAdmins {
    const ROLES: &'static [Role] = &[Role::SystemAdministrator, Role::TechnicalOperator];
    fn label() -> &'static str { "infrastructure:write" }
}
