//! Standalone generator API handlers
//!
//! Thin, stateless pass-throughs to the content provider: a complete sales
//! landing page and a community launch kit. Nothing here touches the order
//! store.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use vellum_common::model::CommunityStrategy;

use crate::error::ApiResult;
use crate::services::provider::LandingPageRequest;
use crate::AppState;

const DEFAULT_TARGET_AUDIENCE: &str = "High-performance entrepreneurs in the US";

/// POST /generators/landing-page response
#[derive(Debug, Serialize)]
pub struct LandingPageResponse {
    /// Complete standalone HTML document
    pub html: String,
}

/// POST /generators/community-strategy request
#[derive(Debug, Deserialize)]
pub struct StrategyRequest {
    pub niche: String,
    pub target_audience: Option<String>,
}

/// POST /generators/landing-page
///
/// One-shot sales page generation for the three-tier offer.
pub async fn generate_landing_page(
    State(state): State<AppState>,
    Json(request): Json<LandingPageRequest>,
) -> ApiResult<Json<LandingPageResponse>> {
    tracing::info!(title = %request.title, niche = %request.niche, "Landing page requested");
    let html = state.provider.landing_page_for(&request).await?;
    Ok(Json(LandingPageResponse { html }))
}

/// POST /generators/community-strategy
///
/// Structured community launch kit for a niche.
pub async fn generate_community_strategy(
    State(state): State<AppState>,
    Json(request): Json<StrategyRequest>,
) -> ApiResult<Json<CommunityStrategy>> {
    let target_audience = request
        .target_audience
        .as_deref()
        .unwrap_or(DEFAULT_TARGET_AUDIENCE);
    tracing::info!(niche = %request.niche, target = %target_audience, "Community strategy requested");
    let strategy = state
        .provider
        .strategy_for(&request.niche, target_audience)
        .await?;
    Ok(Json(strategy))
}

/// Build generator routes
pub fn generator_routes() -> Router<AppState> {
    Router::new()
        .route("/generators/landing-page", post(generate_landing_page))
        .route(
            "/generators/community-strategy",
            post(generate_community_strategy),
        )
}
