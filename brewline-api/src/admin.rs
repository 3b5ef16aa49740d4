use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Json, Router,
};
use brewline_core::{OrderFilter, OrderId, OrderStatus, OrderSummary, Paged};
use serde::{Deserialize, Serialize};

use crate::{
    error::AppError,
    middleware::{auth_middleware, require_admin},
    response::ApiResponse,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListOrdersQuery {
    pub page: Option<u32>,
    pub status: Option<String>,
    pub order_id: Option<OrderId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub order_id: OrderId,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    pub order_id: OrderId,
    pub status: OrderStatus,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/orders", get(list_orders).patch(update_status))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state, auth_middleware))
}

pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<ListOrdersQuery>,
) -> Result<ApiResponse<Paged<OrderSummary>>, AppError> {
    // An empty `status=` means no filter
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            OrderStatus::from_str(raw)
                .map_err(|_| AppError::UnprocessableError("Status Is Not Appropriate".to_string()))?,
        ),
        None => None,
    };

    let filter = OrderFilter {
        status,
        order_id: query.order_id,
    };
    let page = state.orders.list_orders(&filter, query.page.unwrap_or(1)).await?;
    Ok(ApiResponse::success("Success", page))
}

pub async fn update_status(
    State(state): State<AppState>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<ApiResponse<UpdateStatusResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::ValidationError(e.body_text()))?;

    let status = state.orders.update_status(req.order_id, &req.status).await?;

    Ok(ApiResponse::success(
        "Order Status Updated Successfully",
        UpdateStatusResponse {
            order_id: req.order_id,
            status,
        },
    ))
}
