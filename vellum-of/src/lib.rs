//! vellum-of library interface
//!
//! Exposes the order fulfillment service's public APIs for integration
//! testing: application state, router construction, the pipeline and its
//! adapters.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use vellum_common::events::EventBus;

use crate::db::OrderStore;
use crate::services::{ContentProvider, FulfillmentPipeline, Notifier};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Order persistence; may run degraded without a database
    pub store: OrderStore,
    /// Generative content backend
    pub provider: Arc<dyn ContentProvider>,
    /// Best-effort marketing notifications
    pub notifier: Arc<Notifier>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Orders with a generation task running in this process
    pub active_generations: Arc<RwLock<HashSet<String>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        store: OrderStore,
        provider: Arc<dyn ContentProvider>,
        notifier: Arc<Notifier>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            provider,
            notifier,
            event_bus,
            active_generations: Arc::new(RwLock::new(HashSet::new())),
            startup_time: Utc::now(),
        }
    }

    /// Pipeline instance wired to this state's adapters
    pub fn pipeline(&self) -> FulfillmentPipeline {
        FulfillmentPipeline::new(
            self.store.clone(),
            self.provider.clone(),
            self.notifier.clone(),
            self.event_bus.clone(),
        )
    }

    /// Reserve an order for a generation run
    ///
    /// Returns `false` when a run is already active for the order; the
    /// caller must answer 409 without touching the store.
    pub async fn try_begin_run(&self, order_id: &str) -> bool {
        self.active_generations
            .write()
            .await
            .insert(order_id.to_string())
    }

    /// Release an order's run reservation
    pub async fn end_run(&self, order_id: &str) {
        self.active_generations.write().await.remove(order_id);
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::order_routes())
        .merge(api::generator_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state)
        // Enable CORS for the hosted front-end
        .layer(CorsLayer::permissive())
}
