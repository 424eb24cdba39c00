use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::checkout::{self, CancelOrder, NewOrder};
use crate::engine::dispatch::{self, PendingOrder};
use crate::engine::issues::{self, ReportIssue, ResolveIssue};
use crate::engine::lifecycle::{self, AdvanceOrder, AttachReceipt, ConfirmLoadSafety};
use crate::engine::notify;
use crate::engine::till_funding::{self, TillFundsDisbursement, TillFundsRequest};
use crate::error::AppError;
use crate::geo;
use crate::models::actor::Actor;
use crate::models::driver::DriverLocation;
use crate::models::issue::ItemIssue;
use crate::models::message::OrderMessage;
use crate::models::order::{Order, OrderStatus};
use crate::models::payout::PayoutRecord;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/payment", post(confirm_payment))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/claim", post(claim_order))
        .route("/orders/:id/advance", post(advance_order))
        .route("/orders/:id/receipt", post(attach_receipt))
        .route("/orders/:id/load-safety", post(confirm_load_safety))
        .route("/orders/:id/till-funds", post(request_till_funds))
        .route("/orders/:id/complete", post(complete_delivery))
        .route("/orders/:id/items/:item_id/issue", post(report_item_issue))
        .route("/orders/:id/issues", get(list_order_issues))
        .route("/orders/:id/messages", post(post_message).get(list_messages))
        .route("/orders/:id/tracking", get(order_tracking))
        .route("/dispatch/pending", get(pending_orders))
        .route("/issues/:id/resolve", post(resolve_issue))
}

#[derive(Deserialize)]
pub struct PostMessageRequest {
    pub body: String,
}

#[derive(Serialize)]
pub struct TrackingResponse {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub driver_location: DriverLocation,
    pub distance_to_dropoff_km: Option<f64>,
    pub eta_minutes: Option<u32>,
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<NewOrder>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(checkout::create_order(&state, &actor, payload)?))
}

async fn list_orders(State(state): State<Arc<AppState>>, actor: Actor) -> Json<Vec<Order>> {
    let mut orders: Vec<Order> = state
        .orders
        .iter()
        .filter(|entry| entry.value().can_be_viewed_by(&actor))
        .map(|entry| entry.value().clone())
        .collect();

    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Json(orders)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    let order = state
        .orders
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    if !order.can_be_viewed_by(&actor) {
        return Err(AppError::Unauthorized("no access to this order".to_string()));
    }

    Ok(Json(order.value().clone()))
}

async fn confirm_payment(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(checkout::confirm_payment(&state, &actor, id)?))
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CancelOrder>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(checkout::cancel_order(&state, &actor, id, payload)?))
}

async fn claim_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(dispatch::claim_order(&state, &actor, id)?))
}

async fn advance_order(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AdvanceOrder>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::advance_order(&state, &actor, id, payload)?))
}

async fn attach_receipt(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<AttachReceipt>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::attach_receipt(&state, &actor, id, payload)?))
}

async fn confirm_load_safety(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ConfirmLoadSafety>,
) -> Result<Json<Order>, AppError> {
    Ok(Json(lifecycle::confirm_load_safety(
        &state, &actor, id, payload,
    )?))
}

async fn request_till_funds(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<TillFundsRequest>,
) -> Result<Json<TillFundsDisbursement>, AppError> {
    Ok(Json(till_funding::request_till_funds(
        &state, &actor, id, payload,
    )?))
}

async fn complete_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<PayoutRecord>, AppError> {
    Ok(Json(dispatch::complete_delivery(&state, &actor, id)?))
}

async fn report_item_issue(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<ReportIssue>,
) -> Result<Json<ItemIssue>, AppError> {
    Ok(Json(issues::report_item_unavailable(
        &state, &actor, id, item_id, payload,
    )?))
}

async fn list_order_issues(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ItemIssue>>, AppError> {
    Ok(Json(issues::order_issues(&state, &actor, id)?))
}

async fn resolve_issue(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveIssue>,
) -> Result<Json<ItemIssue>, AppError> {
    Ok(Json(issues::resolve_issue(&state, &actor, id, payload)?))
}

async fn post_message(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<OrderMessage>, AppError> {
    Ok(Json(notify::post_user_message(
        &state,
        &actor,
        id,
        payload.body,
    )?))
}

async fn list_messages(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<OrderMessage>>, AppError> {
    Ok(Json(notify::order_messages(&state, &actor, id)?))
}

async fn pending_orders(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<PendingOrder>>, AppError> {
    Ok(Json(dispatch::pending_orders(&state, &actor)?))
}

async fn order_tracking(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<TrackingResponse>, AppError> {
    let (status, driver_id, delivery_point) = {
        let order = state
            .orders
            .get(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
        if !order.can_be_viewed_by(&actor) {
            return Err(AppError::Unauthorized("no access to this order".to_string()));
        }
        (order.status, order.driver_id, order.delivery_point)
    };

    let driver_id = driver_id
        .ok_or_else(|| AppError::NotFound("no driver assigned to this order yet".to_string()))?;

    let driver_location = state
        .locations
        .get(&driver_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound("driver has not reported a location yet".to_string()))?;

    let speed_kmh = state
        .drivers
        .get(&driver_id)
        .map(|driver| driver.vehicle.average_speed_kmh())
        .unwrap_or(geo::DEFAULT_SPEED_KMH);

    let (distance_to_dropoff_km, eta_minutes) = match delivery_point {
        Some(point) => {
            let km = geo::haversine_km(&driver_location.location, &point);
            (Some(km), Some(geo::eta_minutes(km, speed_kmh)))
        }
        None => (None, None),
    };

    Ok(Json(TrackingResponse {
        order_id: id,
        status,
        driver_location,
        distance_to_dropoff_km,
        eta_minutes,
    }))
}
