// src/routes.rs

use anyhow::Context;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    config::AppState,
    handlers,
    middleware::{
        auth::auth_guard,
        correlation::{CORRELATION_HEADER, correlation_id},
        rate_limit::rate_limit,
    },
};

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin).context("CORS_ORIGIN is not a valid header value")?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, CORRELATION_HEADER])
        .expose_headers([CORRELATION_HEADER]))
}

pub fn build_router(app_state: AppState) -> anyhow::Result<Router> {
    // Session routes (public), under both prefixes clients use
    let session_routes = Router::new()
        .route("/login", post(handlers::auth::login))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .nest("/auth", session_routes.clone())
        .nest("/workers", session_routes);

    // Everything below needs a valid access token
    let worker_routes = Router::new()
        .route("/workers/me", get(handlers::auth::me))
        .route(
            "/workers",
            get(handlers::workers::list_workers).post(handlers::workers::create_worker),
        )
        .route(
            "/workers/{id}",
            put(handlers::workers::update_worker).delete(handlers::workers::delete_worker),
        );

    let program_routes = Router::new()
        .route(
            "/programs",
            get(handlers::programs::list_programs).post(handlers::programs::create_program),
        )
        .route(
            "/programs/{id}",
            get(handlers::programs::get_program).put(handlers::programs::update_program),
        )
        .route("/programs/{id}/status", post(handlers::programs::change_program_status))
        .route(
            "/programs/{task_id}/stations/{station_id}",
            put(handlers::programs::update_station),
        );

    let settings_routes = Router::new()
        .route(
            "/settings/permissions",
            get(handlers::settings::get_permissions).put(handlers::settings::update_permissions),
        )
        .route(
            "/settings/labels",
            get(handlers::settings::get_labels).put(handlers::settings::update_labels),
        );

    let reference_routes = Router::new()
        .route(
            "/divisions",
            get(handlers::reference::list_divisions).post(handlers::reference::create_division),
        )
        .route(
            "/departments",
            get(handlers::reference::list_departments).post(handlers::reference::create_department),
        )
        .route(
            "/domains",
            get(handlers::reference::list_domains).post(handlers::reference::create_domain),
        )
        .route(
            "/activities",
            get(handlers::reference::list_activities).post(handlers::reference::create_activity),
        )
        .route(
            "/engagement-types",
            get(handlers::reference::list_engagement_types)
                .post(handlers::reference::create_engagement_type),
        )
        .route(
            "/engagement-types/{id}/processes",
            put(handlers::reference::replace_processes),
        );

    let protected_routes = Router::new()
        .merge(worker_routes)
        .merge(program_routes)
        .merge(settings_routes)
        .merge(reference_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let cors = cors_layer(&app_state.config.cors_origin)?;

    // Outermost last: correlation id wraps CORS, tracing and rate limiting
    Ok(Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(handlers::health::not_found)
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum_middleware::from_fn(correlation_id))
        .with_state(app_state))
}
