//! Order API handlers
//!
//! The sale webhook that creates orders, the operator listing, and the
//! per-order fulfillment entry points (questions, generate, resume).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use vellum_common::model::{Language, Order, OrderStatus, Tier};

use crate::db::NewOrder;
use crate::error::{ApiError, ApiResult};
use crate::services::notifier::TAG_PURCHASE_COMPLETE;
use crate::services::INITIAL_PROGRESS;
use crate::AppState;

/// Niche recorded when the sale event does not carry one
const DEFAULT_NICHE: &str = "Business";

/// POST /webhooks/sale request
#[derive(Debug, Deserialize)]
pub struct SaleWebhookRequest {
    /// Payment platform's order reference; a fresh UUID when absent
    pub order_id: Option<String>,
    pub email: String,
    pub name: String,
    pub tier: Tier,
    pub niche: Option<String>,
    /// Platform payment state; anything but approved/complete is ignored
    pub payment_status: Option<String>,
}

/// POST /orders/{id}/questions request
#[derive(Debug, Default, Deserialize)]
pub struct QuestionsRequest {
    #[serde(default)]
    pub language: Language,
}

/// POST /orders/{id}/questions response
#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
}

/// POST /orders/{id}/generate request
#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    /// Diagnostic answers keyed by question text
    pub answers: HashMap<String, String>,
    #[serde(default)]
    pub language: Language,
}

/// POST /orders/{id}/generate and /orders/{id}/resume response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub order_id: String,
    pub status: OrderStatus,
    pub progress: u8,
}

/// POST /webhooks/sale
///
/// Entry trigger from the payment platform. Creates the order in
/// `pending_form` and fires the form-invitation email. Non-final payment
/// states are acknowledged without creating anything.
pub async fn sale_webhook(
    State(state): State<AppState>,
    Json(request): Json<SaleWebhookRequest>,
) -> ApiResult<Response> {
    if let Some(payment_status) = &request.payment_status {
        if payment_status != "approved" && payment_status != "complete" {
            tracing::info!(
                payment_status = %payment_status,
                "Ignoring sale webhook with non-final payment status"
            );
            return Ok(Json(serde_json::json!({ "processed": false })).into_response());
        }
    }

    let new = NewOrder {
        id: request
            .order_id
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        customer_name: request.name,
        customer_email: request.email,
        tier: request.tier,
        niche: request.niche.unwrap_or_else(|| DEFAULT_NICHE.to_string()),
    };

    let order = state.store.create(new).await?;

    tracing::info!(
        order_id = %order.id,
        tier = order.tier.as_str(),
        niche = %order.niche,
        "Order created from sale webhook"
    );

    // Best-effort: the order exists regardless of whether the email fires
    state
        .notifier
        .notify(&order.customer_email, &order.customer_name, TAG_PURCHASE_COMPLETE)
        .await;

    Ok((StatusCode::CREATED, Json(order)).into_response())
}

/// GET /orders
///
/// All orders, newest first. Backs the operator dashboard.
pub async fn list_orders(State(state): State<AppState>) -> ApiResult<Json<Vec<Order>>> {
    let orders = state.store.list_all().await?;
    Ok(Json(orders))
}

/// GET /orders/{order_id}
///
/// The persisted record, including the finished ebook once completed. The
/// reader UI polls this while the order is `generating`.
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Json<Order>> {
    let order = state.store.get_by_id(&order_id).await?;
    Ok(Json(order))
}

/// POST /orders/{order_id}/questions
///
/// Diagnostic intake questions for the order's niche and tier. Leaves the
/// order untouched.
pub async fn order_questions(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<QuestionsRequest>,
) -> ApiResult<Json<QuestionsResponse>> {
    let order = state.store.get_by_id(&order_id).await?;
    let questions = state
        .pipeline()
        .begin_diagnosis(&order, request.language)
        .await?;
    Ok(Json(QuestionsResponse { questions }))
}

/// POST /orders/{order_id}/generate
///
/// Accept the customer's answers and start generation. The transition to
/// `generating` happens before the response; the chapter loop and
/// finalization run on a background task. Returns 202 Accepted.
pub async fn generate_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
    Json(request): Json<GenerateRequest>,
) -> ApiResult<Response> {
    if !state.try_begin_run(&order_id).await {
        return Err(ApiError::Conflict(format!(
            "generation already running for order {}",
            order_id
        )));
    }

    let prepared = async {
        let order = state.store.get_by_id(&order_id).await?;
        let pair = state
            .pipeline()
            .prepare_generation(&order, &request.answers, request.language)
            .await?;
        Ok::<_, ApiError>(pair)
    }
    .await;

    let (order, draft) = match prepared {
        Ok(pair) => pair,
        Err(e) => {
            state.end_run(&order_id).await;
            return Err(e);
        }
    };

    let task_state = state.clone();
    tokio::spawn(async move {
        let pipeline = task_state.pipeline();
        if let Err(e) = pipeline.run(&order, draft).await {
            tracing::error!(order_id = %order.id, error = %e, "Generation run failed");
        }
        task_state.end_run(&order.id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            order_id,
            status: OrderStatus::Generating,
            progress: INITIAL_PROGRESS,
        }),
    )
        .into_response())
}

/// POST /orders/{order_id}/resume
///
/// Restart an interrupted `generating` order from its persisted draft.
/// Completed chapters are not regenerated. Returns 202 Accepted.
pub async fn resume_order(
    State(state): State<AppState>,
    Path(order_id): Path<String>,
) -> ApiResult<Response> {
    if !state.try_begin_run(&order_id).await {
        return Err(ApiError::Conflict(format!(
            "generation already running for order {}",
            order_id
        )));
    }

    let prepared = state.pipeline().prepare_resume(&order_id).await;
    let (order, draft) = match prepared {
        Ok(pair) => pair,
        Err(e) => {
            state.end_run(&order_id).await;
            return Err(e.into());
        }
    };

    let progress = order.progress;
    let task_state = state.clone();
    tokio::spawn(async move {
        let pipeline = task_state.pipeline();
        if let Err(e) = pipeline.run(&order, draft).await {
            tracing::error!(order_id = %order.id, error = %e, "Resumed run failed");
        }
        task_state.end_run(&order.id).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            order_id,
            status: OrderStatus::Generating,
            progress,
        }),
    )
        .into_response())
}

/// Build order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/webhooks/sale", post(sale_webhook))
        .route("/orders", get(list_orders))
        .route("/orders/:order_id", get(get_order))
        .route("/orders/:order_id/questions", post(order_questions))
        .route("/orders/:order_id/generate", post(generate_order))
        .route("/orders/:order_id/resume", post(resume_order))
}
