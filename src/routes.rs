//! Router assembly.
//!
//! Each component contributes its own route group. A process serves one
//! group (or all three in standalone mode) behind the shared audit,
//! tracing and CORS layers.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{self, health::HealthState},
    middleware::audit::audit_middleware,
    services::{
        account_ledger::AccountLedger, aggregation::AggregationGateway, log_publisher::AuditLog,
        transfer_coordinator::TransferCoordinator,
    },
};

pub fn accounts_routes(ledger: Arc<AccountLedger>) -> Router {
    Router::new()
        .route("/accounts", post(handlers::accounts::create_account))
        .route("/accounts/transfer", put(handlers::accounts::apply_transfer))
        .route("/accounts/{id}", get(handlers::accounts::get_account))
        .route(
            "/accounts/users/{user_id}/accounts",
            get(handlers::accounts::list_user_accounts),
        )
        .with_state(ledger)
}

pub fn transactions_routes(coordinator: Arc<TransferCoordinator>) -> Router {
    Router::new()
        .route(
            "/transactions/transfer/initiation",
            post(handlers::transactions::initiate_transfer),
        )
        .route(
            "/transactions/transfer/execution",
            post(handlers::transactions::execute_transfer),
        )
        .route(
            "/transactions/accounts/{id}",
            get(handlers::transactions::account_history),
        )
        .with_state(coordinator)
}

pub fn bff_routes(gateway: Arc<AggregationGateway>) -> Router {
    Router::new()
        .route(
            "/bff/dashboard/{user_id}",
            get(handlers::dashboard::get_dashboard),
        )
        .with_state(gateway)
}

/// Wrap component routes with the audit layer, then add the public
/// health route and the outer tracing and CORS layers.
pub fn app(routes: Router, audit: AuditLog, health: HealthState) -> Router {
    let health_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .with_state(health);

    routes
        // Applies only to the component routes registered so far
        .route_layer(axum_middleware::from_fn_with_state(audit, audit_middleware))
        .merge(health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
