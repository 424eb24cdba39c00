use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::driver::{Driver, DriverLocation, VehicleType};
use crate::models::event::OrderEvent;
use crate::models::payout::PayoutRecord;
use crate::models::store::GeoPoint;
use crate::pricing;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/drivers", post(register_driver).get(list_drivers))
        .route("/drivers/me", get(my_profile))
        .route("/drivers/availability", patch(update_availability))
        .route("/drivers/location", post(update_location))
        .route("/drivers/:id/payouts", get(list_payouts))
}

#[derive(Deserialize)]
pub struct RegisterDriverRequest {
    pub name: String,
    pub phone: Option<String>,
    pub vehicle: VehicleType,
}

#[derive(Deserialize)]
pub struct UpdateAvailabilityRequest {
    pub is_available: bool,
}

#[derive(Deserialize)]
pub struct UpdateLocationRequest {
    pub location: GeoPoint,
    pub order_id: Option<Uuid>,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
}

async fn register_driver(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<RegisterDriverRequest>,
) -> Result<Json<Driver>, AppError> {
    actor.require_role(Role::Driver)?;

    if payload.name.trim().is_empty() {
        return Err(AppError::BadRequest("name cannot be empty".to_string()));
    }
    if state.drivers.contains_key(&actor.user_id) {
        return Err(AppError::Conflict("driver already registered".to_string()));
    }

    let driver = Driver {
        id: actor.user_id,
        name: payload.name,
        phone: payload.phone,
        vehicle: payload.vehicle,
        is_available: true,
        wallet_balance: pricing::round_money(Decimal::ZERO),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    state.drivers.insert(driver.id, driver.clone());
    Ok(Json(driver))
}

async fn list_drivers(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Vec<Driver>>, AppError> {
    actor.require_role(Role::Admin)?;

    let drivers = state
        .drivers
        .iter()
        .map(|entry| entry.value().clone())
        .collect();
    Ok(Json(drivers))
}

async fn my_profile(
    State(state): State<Arc<AppState>>,
    actor: Actor,
) -> Result<Json<Driver>, AppError> {
    actor.require_role(Role::Driver)?;

    let driver = state
        .drivers
        .get(&actor.user_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    Ok(Json(driver.value().clone()))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<UpdateAvailabilityRequest>,
) -> Result<Json<Driver>, AppError> {
    actor.require_role(Role::Driver)?;

    let mut driver = state
        .drivers
        .get_mut(&actor.user_id)
        .ok_or_else(|| AppError::NotFound("driver profile not found".to_string()))?;

    driver.is_available = payload.is_available;
    driver.updated_at = Utc::now();

    Ok(Json(driver.clone()))
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Json(payload): Json<UpdateLocationRequest>,
) -> Result<Json<DriverLocation>, AppError> {
    actor.require_role(Role::Driver)?;

    if !payload.location.is_valid() {
        return Err(AppError::BadRequest(
            "coordinates are out of range".to_string(),
        ));
    }
    if !state.drivers.contains_key(&actor.user_id) {
        return Err(AppError::Unauthorized(
            "driver profile not registered".to_string(),
        ));
    }

    if let Some(order_id) = payload.order_id {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if !order.is_assigned_driver(actor.user_id) {
            return Err(AppError::Unauthorized(
                "not assigned to this order".to_string(),
            ));
        }
        if !order.status.is_driver_active() {
            return Err(AppError::Conflict(
                "order is not in an active delivery state".to_string(),
            ));
        }
    }

    let location = DriverLocation {
        driver_id: actor.user_id,
        order_id: payload.order_id,
        location: payload.location,
        accuracy: payload.accuracy,
        heading: payload.heading,
        speed: payload.speed,
        updated_at: Utc::now(),
    };

    // Last write wins; the driver app reports on a timer.
    state.locations.insert(actor.user_id, location.clone());

    if let Some(order_id) = payload.order_id {
        notify::emit(
            &state,
            OrderEvent::LocationUpdated {
                order_id,
                driver_id: actor.user_id,
                location: payload.location,
            },
        );
    }

    Ok(Json(location))
}

async fn list_payouts(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PayoutRecord>>, AppError> {
    if actor.role != Role::Admin && !(actor.role == Role::Driver && actor.user_id == id) {
        return Err(AppError::Unauthorized(
            "drivers may only view their own payouts".to_string(),
        ));
    }

    let mut payouts: Vec<_> = state
        .payouts
        .iter()
        .filter(|entry| entry.value().driver_id == id)
        .map(|entry| entry.value().clone())
        .collect();

    payouts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(payouts))
}
