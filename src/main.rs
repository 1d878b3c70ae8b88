//! Transfer Ledger - Main Application Entry Point
//!
//! One binary, three services. `SERVICE_ROLE` picks which one this process
//! runs; `standalone` runs all three in-process on in-memory storage.
//!
//! # Architecture
//!
//! - **accounts**: AccountLedger, owner of balances (PostgreSQL)
//! - **transactions**: TransferCoordinator, owner of transfer records (PostgreSQL),
//!   drives the ledger over HTTP
//! - **bff**: AggregationGateway, stateless dashboard fan-out over HTTP
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations (database roles)
//! 3. Wire services to their stores and peer clients
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod clients;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod repository;
mod routes;
mod services;
#[cfg(test)]
mod test_support;

use axum::Router;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use crate::{
    clients::{
        http::{
            HttpAccountService, HttpTransactionService, HttpUserService, ServiceEndpoint,
            build_client,
        },
        local::{LocalHistory, LocalLedger},
    },
    config::{Config, ServiceRole},
    handlers::health::HealthState,
    repository::{
        memory::{InMemoryAccountStore, InMemoryTransactionStore},
        postgres::{PgAccountStore, PgTransactionStore},
    },
    services::{
        account_ledger::AccountLedger,
        aggregation::AggregationGateway,
        inactivation::spawn_inactivation_sweep,
        log_publisher::{AuditLog, HttpLogPublisher, LogPublisher, TracingLogPublisher},
        transfer_coordinator::TransferCoordinator,
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG (defaults to "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(role = config.service_role.as_str(), "Configuration loaded");

    let publisher: Arc<dyn LogPublisher> = match &config.log_sink_url {
        Some(url) => Arc::new(HttpLogPublisher::new(url)?),
        None => Arc::new(TracingLogPublisher),
    };
    let audit = AuditLog::new(publisher, config.log_topic.clone());

    let (routes, health) = match config.service_role {
        ServiceRole::Accounts => accounts_service(&config).await?,
        ServiceRole::Transactions => transactions_service(&config).await?,
        ServiceRole::Bff => bff_service(&config)?,
        ServiceRole::Standalone => standalone(&config)?,
    };

    let app = routes::app(routes, audit, health);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn accounts_service(config: &Config) -> anyhow::Result<(Router, HealthState)> {
    let pool = db::create_pool(config.require_database_url()?, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_account_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let http = build_client(config.upstream_timeout())?;
    let users = HttpUserService::new(ServiceEndpoint::new(http, &config.user_service_url, "user")?);

    let ledger = Arc::new(AccountLedger::new(
        Arc::new(PgAccountStore::new(pool.clone())),
        Arc::new(users),
    ));
    spawn_inactivation_sweep(Arc::clone(&ledger), config.sweep_interval(), config.stale_after());

    Ok((
        routes::accounts_routes(ledger),
        HealthState {
            service: ServiceRole::Accounts.as_str(),
            pool: Some(pool),
        },
    ))
}

async fn transactions_service(config: &Config) -> anyhow::Result<(Router, HealthState)> {
    let pool = db::create_pool(config.require_database_url()?, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    db::run_transaction_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let http = build_client(config.upstream_timeout())?;
    let ledger = HttpAccountService::new(ServiceEndpoint::new(
        http,
        &config.account_service_url,
        "accounts",
    )?);

    let coordinator = Arc::new(TransferCoordinator::new(
        Arc::new(PgTransactionStore::new(pool.clone())),
        Arc::new(ledger),
    ));

    Ok((
        routes::transactions_routes(coordinator),
        HealthState {
            service: ServiceRole::Transactions.as_str(),
            pool: Some(pool),
        },
    ))
}

fn bff_service(config: &Config) -> anyhow::Result<(Router, HealthState)> {
    let http = build_client(config.upstream_timeout())?;

    let gateway = Arc::new(AggregationGateway::new(
        Arc::new(HttpUserService::new(ServiceEndpoint::new(
            http.clone(),
            &config.user_service_url,
            "user",
        )?)),
        Arc::new(HttpAccountService::new(ServiceEndpoint::new(
            http.clone(),
            &config.account_service_url,
            "accounts",
        )?)),
        Arc::new(HttpTransactionService::new(ServiceEndpoint::new(
            http,
            &config.transaction_service_url,
            "transactions",
        )?)),
        config.upstream_timeout(),
    ));

    Ok((
        routes::bff_routes(gateway),
        HealthState {
            service: ServiceRole::Bff.as_str(),
            pool: None,
        },
    ))
}

/// All three components in one process on in-memory stores. Only the
/// user-identity service stays remote.
fn standalone(config: &Config) -> anyhow::Result<(Router, HealthState)> {
    tracing::warn!("Standalone mode: balances and transfers are kept in memory only");

    let http = build_client(config.upstream_timeout())?;
    let users = Arc::new(HttpUserService::new(ServiceEndpoint::new(
        http,
        &config.user_service_url,
        "user",
    )?));

    let ledger = Arc::new(AccountLedger::new(
        Arc::new(InMemoryAccountStore::new()),
        users.clone(),
    ));
    let coordinator = Arc::new(TransferCoordinator::new(
        Arc::new(InMemoryTransactionStore::new()),
        Arc::new(LocalLedger(Arc::clone(&ledger))),
    ));
    let gateway = Arc::new(AggregationGateway::new(
        users,
        Arc::new(LocalLedger(Arc::clone(&ledger))),
        Arc::new(LocalHistory(Arc::clone(&coordinator))),
        config.upstream_timeout(),
    ));

    spawn_inactivation_sweep(Arc::clone(&ledger), config.sweep_interval(), config.stale_after());

    let routes = routes::accounts_routes(ledger)
        .merge(routes::transactions_routes(coordinator))
        .merge(routes::bff_routes(gateway));

    Ok((
        routes,
        HealthState {
            service: ServiceRole::Standalone.as_str(),
            pool: None,
        },
    ))
}
