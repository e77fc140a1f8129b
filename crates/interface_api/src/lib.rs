//! HTTP API Layer
//!
//! This crate provides the REST API for the clinic billing ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for bills, payments, and the dashboard
//! - **Middleware**: JWT authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent `{error, message}` error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(ledger, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;

use axum::{
    Router,
    routing::{get, post, put},
    middleware as axum_middleware,
};
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_billing::BillingLedger;

use crate::config::ApiConfig;
use crate::error::ApiError;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{billing, health};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: BillingLedger,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `ledger` - Billing ledger over the configured store
/// * `config` - API configuration
pub fn create_router(ledger: BillingLedger, config: ApiConfig) -> Router {
    let state = AppState { ledger, config };

    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let bill_routes = Router::new()
        .route("/", post(billing::create_bill).get(billing::list_bills))
        .route("/:id", get(billing::get_bill).delete(billing::delete_bill))
        .route("/:id/items", post(billing::add_item))
        .route("/:id/discount", put(billing::apply_discount))
        .route("/:id/payments", post(billing::record_payment))
        .route("/:id/finalize", post(billing::finalize_bill));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/bills", bill_routes)
        .route("/patients/:id/bills", get(billing::patient_bills))
        .route("/dashboard/billing", get(billing::dashboard))
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .fallback(|| async { ApiError::NotFound("no such route".to_string()) })
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
