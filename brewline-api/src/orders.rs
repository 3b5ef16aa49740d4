use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Extension, Json, Router,
};
use brewline_core::{NewReview, OrderDetail, OrderHistoryEntry, OrderId, OrderTotals, Paged};
use brewline_order::Cart;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{auth_middleware, require_user, AuthSession},
    response::ApiResponse,
    state::AppState,
};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct PlaceOrderResponse {
    pub order_id: OrderId,
    #[serde(flatten)]
    pub totals: OrderTotals,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub order_line_id: i32,
    pub rating: i16,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/orders", post(place_order))
        .route("/orders/history", get(order_history))
        .route("/orders/review", post(add_review))
        .route("/orders/{id}", get(order_detail))
        .route_layer(from_fn(require_user))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn place_order(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    payload: Result<Json<Cart>, JsonRejection>,
) -> Result<ApiResponse<PlaceOrderResponse>, AppError> {
    let Json(cart) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    match state.placement.place_order(&cart, session.claims.user_id).await {
        Ok(placed) => {
            state.metrics.orders_placed.inc();
            Ok(ApiResponse::success(
                "Order Created Successfully",
                PlaceOrderResponse {
                    order_id: placed.order_id,
                    totals: placed.totals,
                },
            ))
        }
        Err(err) => {
            state.metrics.orders_rejected.with_label_values(&[err.kind()]).inc();
            Err(err.into())
        }
    }
}

pub async fn order_history(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Query(query): Query<PageQuery>,
) -> Result<ApiResponse<Paged<OrderHistoryEntry>>, AppError> {
    let page = state
        .orders
        .history(session.claims.user_id, query.page.unwrap_or(1))
        .await?;
    Ok(ApiResponse::success("Success", page))
}

pub async fn order_detail(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    Path(id): Path<Uuid>,
) -> Result<ApiResponse<OrderDetail>, AppError> {
    let detail = state.orders.detail(id, session.claims.user_id).await?;
    Ok(ApiResponse::success("Success", detail))
}

pub async fn add_review(
    State(state): State<AppState>,
    Extension(session): Extension<AuthSession>,
    payload: Result<Json<ReviewRequest>, JsonRejection>,
) -> Result<ApiResponse<()>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    state
        .orders
        .add_review(
            session.claims.user_id,
            &session.token,
            NewReview {
                order_line_id: req.order_line_id,
                rating: req.rating,
            },
        )
        .await?;
    Ok(ApiResponse::success("Review Added Successfully", ()))
}
