use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use menu::{
    catalog::{sanitize, Product},
    events::ServerFrame,
    orders::{Order, OrderStatus, OrderSubmission},
};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

pub async fn menu_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Product>> {
    Json(state.catalog.products())
}

pub async fn create_order_handler(
    State(state): State<Arc<AppState>>,
    Json(submission): Json<OrderSubmission>,
) -> Result<impl IntoResponse, AppError> {
    let order = Order::from_submission(submission, &state.catalog, state.config.delivery_fee_cents)?;

    state
        .orders
        .lock()
        .unwrap()
        .insert(order.id, order.clone());

    let delivered = state
        .registry
        .broadcast(&ServerFrame::order_created(order.clone()));

    info!(order = %order.id, total_cents = order.total_cents, delivered, "order created");

    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state.orders.lock().unwrap().values().cloned().collect();
    orders.sort_by_key(|order| order.created_at);

    Json(orders)
}

pub async fn get_order_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    state
        .orders
        .lock()
        .unwrap()
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound)
}

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

pub async fn update_status_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<Order>, AppError> {
    let order = {
        let mut orders = state.orders.lock().unwrap();
        let order = orders.get_mut(&id).ok_or(AppError::NotFound)?;
        order.set_status(update.status);

        order.clone()
    };

    let delivered = state
        .registry
        .broadcast(&ServerFrame::order_status_changed(order.id, order.status));

    info!(order = %order.id, status = ?order.status, delivered, "order status changed");

    Ok(Json(order))
}

#[derive(Deserialize)]
pub struct CouponQuery {
    pub code: String,
}

#[derive(Serialize)]
pub struct CouponReply {
    pub valid: bool,
    pub discount_cents: i64,
}

pub async fn validate_coupon_handler(
    State(state): State<Arc<AppState>>,
    Json(query): Json<CouponQuery>,
) -> Json<CouponReply> {
    let code = sanitize(&query.code);

    let reply = match state.coupons.get(&code) {
        Some(&discount_cents) => CouponReply {
            valid: true,
            discount_cents,
        },
        None => CouponReply {
            valid: false,
            discount_cents: 0,
        },
    };

    Json(reply)
}
