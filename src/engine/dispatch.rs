use std::time::Instant;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::order::{Order, OrderStatus, PackageSize};
use crate::models::payout::PayoutRecord;
use crate::models::store::GeoPoint;
use crate::pricing;
use crate::state::AppState;

/// What a browsing driver is allowed to see: store and money facts only,
/// never the customer or the destination.
#[derive(Debug, Clone, Serialize)]
pub struct PendingOrder {
    pub id: Uuid,
    pub store_id: Uuid,
    pub store_name: String,
    pub store_branch: Option<String>,
    pub store_address: Option<String>,
    pub store_location: GeoPoint,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub estimated_payout: Decimal,
    pub package_size: PackageSize,
    pub requires_car: bool,
    pub created_at: DateTime<Utc>,
}

pub fn pending_orders(state: &AppState, actor: &Actor) -> Result<Vec<PendingOrder>, AppError> {
    actor.require_role(Role::Driver)?;

    let mut pending: Vec<PendingOrder> = state
        .orders
        .iter()
        .filter(|entry| entry.value().status == OrderStatus::Pending)
        .map(|entry| redacted_view(state, entry.value()))
        .collect();

    pending.sort_by_key(|order| order.created_at);
    Ok(pending)
}

fn redacted_view(state: &AppState, order: &Order) -> PendingOrder {
    let (store_name, store_branch, store_address, store_location) = state
        .stores
        .get(&order.store_id)
        .map(|store| {
            (
                store.name.clone(),
                store.branch.clone(),
                store.address.clone(),
                store.location,
            )
        })
        .unwrap_or_else(|| {
            (
                "unknown store".to_string(),
                None,
                None,
                GeoPoint { lat: 0.0, lng: 0.0 },
            )
        });

    PendingOrder {
        id: order.id,
        store_id: order.store_id,
        store_name,
        store_branch,
        store_address,
        store_location,
        subtotal: order.subtotal,
        delivery_fee: order.delivery_fee,
        estimated_payout: order
            .driver_payout
            .unwrap_or_else(|| pricing::driver_payout(order.delivery_fee)),
        package_size: order.package_size,
        requires_car: order.requires_car,
        created_at: order.created_at,
    }
}

pub fn claim_order(state: &AppState, actor: &Actor, order_id: Uuid) -> Result<Order, AppError> {
    actor.require_role(Role::Driver)?;
    if !state.drivers.contains_key(&actor.user_id) {
        return Err(AppError::Unauthorized(
            "driver profile not registered".to_string(),
        ));
    }

    let start = Instant::now();

    // The entry guard is the whole claim lock: checks and the write happen
    // under it, so two drivers can never both pass the checks.
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if order.status.is_terminal() {
        claim_metrics(state, start, "lost");
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Accepted,
        });
    }
    if let Some(existing) = order.driver_id {
        if existing != actor.user_id {
            claim_metrics(state, start, "lost");
            return Err(AppError::AlreadyClaimed);
        }
    }
    if order.status != OrderStatus::Pending {
        claim_metrics(state, start, "lost");
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Accepted,
        });
    }

    order.driver_id = Some(actor.user_id);
    order.status = OrderStatus::Accepted;
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    claim_metrics(state, start, "won");
    state
        .metrics
        .status_transitions_total
        .with_label_values(&["accepted"])
        .inc();
    notify::emit(
        state,
        OrderEvent::DriverAssigned {
            order_id,
            driver_id: actor.user_id,
        },
    );
    notify::emit(
        state,
        OrderEvent::StatusChanged {
            order_id,
            status: OrderStatus::Accepted,
        },
    );

    info!(order_id = %order_id, driver_id = %actor.user_id, "order claimed");
    Ok(snapshot)
}

fn claim_metrics(state: &AppState, start: Instant, outcome: &str) {
    let elapsed = start.elapsed().as_secs_f64();
    state
        .metrics
        .claim_latency_seconds
        .with_label_values(&[outcome])
        .observe(elapsed);
    state
        .metrics
        .claims_total
        .with_label_values(&[outcome])
        .inc();
}

pub fn complete_delivery(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
) -> Result<PayoutRecord, AppError> {
    actor.require_role(Role::Driver)?;

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may complete this delivery".to_string(),
        ));
    }

    if order.status == OrderStatus::Delivered {
        // Replay of a completed delivery returns the recorded payout unchanged.
        let record = state
            .payouts
            .get(&order_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                AppError::Internal(format!("delivered order {order_id} has no payout record"))
            })?;
        return Ok(record);
    }

    if order.status != OrderStatus::InTransit {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Delivered,
        });
    }

    let amount = pricing::driver_payout(order.delivery_fee);

    {
        let mut driver = state.drivers.get_mut(&actor.user_id).ok_or_else(|| {
            AppError::Internal(format!("driver {} has no profile", actor.user_id))
        })?;
        driver.wallet_balance += amount;
        driver.updated_at = Utc::now();
    }

    let record = PayoutRecord {
        id: Uuid::new_v4(),
        order_id,
        driver_id: actor.user_id,
        amount,
        created_at: Utc::now(),
    };
    state.payouts.insert(order_id, record.clone());

    order.status = OrderStatus::Delivered;
    order.driver_payout = Some(amount);
    order.touch();
    drop(entry);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&["delivered"])
        .inc();
    state
        .metrics
        .payouts_disbursed_total
        .inc_by(amount.to_f64().unwrap_or(0.0));
    state.metrics.active_orders.dec();
    notify::emit(
        state,
        OrderEvent::StatusChanged {
            order_id,
            status: OrderStatus::Delivered,
        },
    );
    notify::emit(
        state,
        OrderEvent::PayoutRecorded {
            order_id,
            driver_id: actor.user_id,
            amount,
        },
    );

    info!(
        order_id = %order_id,
        driver_id = %actor.user_id,
        amount = %amount,
        "delivery completed and payout recorded"
    );

    Ok(record)
}
