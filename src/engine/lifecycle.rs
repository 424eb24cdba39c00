use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::{AppError, Gate};
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::order::{Order, OrderStatus};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AdvanceOrder {
    pub target_status: OrderStatus,
}

#[derive(Debug, Deserialize)]
pub struct AttachReceipt {
    pub receipt_ref: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmLoadSafety {
    pub confirmed: bool,
}

pub fn advance_order(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    req: AdvanceOrder,
) -> Result<Order, AppError> {
    let target = req.target_status;

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    let expected = order.status.successor().ok_or(AppError::InvalidTransition {
        from: order.status,
        to: target,
    })?;
    if target != expected {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: target,
        });
    }

    // Three transitions have dedicated operations and cannot be reached here.
    match target {
        OrderStatus::Pending => {
            return Err(AppError::Unauthorized(
                "payment confirmation moves an order to pending".to_string(),
            ));
        }
        OrderStatus::Accepted => {
            return Err(AppError::Unauthorized(
                "claim the order to accept it".to_string(),
            ));
        }
        OrderStatus::Delivered => {
            return Err(AppError::Unauthorized(
                "delivery completion finalizes an order".to_string(),
            ));
        }
        _ => {}
    }

    if actor.role != Role::Driver || !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may advance this order".to_string(),
        ));
    }

    let requires_till = state
        .stores
        .get(&order.store_id)
        .map(|store| store.requires_till_funding)
        .unwrap_or(false);

    if target == OrderStatus::ShoppingCompleted && requires_till && !order.funds_confirmed {
        return Err(AppError::GateUnmet(Gate::FundsNotConfirmed));
    }
    if target == OrderStatus::InTransit {
        if order.receipt_ref.is_none() {
            return Err(AppError::GateUnmet(Gate::ReceiptMissing));
        }
        if !order.load_safety_confirmed {
            return Err(AppError::GateUnmet(Gate::SafetyNotConfirmed));
        }
        if requires_till && !order.funds_confirmed {
            return Err(AppError::GateUnmet(Gate::FundsNotConfirmed));
        }
    }

    order.status = target;
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&[target.as_str()])
        .inc();
    notify::emit(
        state,
        OrderEvent::StatusChanged {
            order_id,
            status: target,
        },
    );

    info!(order_id = %order_id, status = %target, "order advanced");
    Ok(snapshot)
}

pub fn attach_receipt(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    req: AttachReceipt,
) -> Result<Order, AppError> {
    let receipt_ref = req.receipt_ref.trim().to_string();
    if receipt_ref.is_empty() {
        return Err(AppError::BadRequest(
            "receipt reference cannot be empty".to_string(),
        ));
    }

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if actor.role != Role::Driver || !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may attach a receipt".to_string(),
        ));
    }
    if !matches!(
        order.status,
        OrderStatus::Shopping | OrderStatus::ShoppingCompleted
    ) {
        return Err(AppError::Conflict(
            "receipts are attached while shopping or right after checkout".to_string(),
        ));
    }

    let requires_till = state
        .stores
        .get(&order.store_id)
        .map(|store| store.requires_till_funding)
        .unwrap_or(false);
    if requires_till && !order.funds_confirmed {
        return Err(AppError::GateUnmet(Gate::FundsNotConfirmed));
    }

    order.receipt_ref = Some(receipt_ref);
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    info!(order_id = %order_id, "receipt attached");
    Ok(snapshot)
}

pub fn confirm_load_safety(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    req: ConfirmLoadSafety,
) -> Result<Order, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if actor.role != Role::Driver || !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may confirm load safety".to_string(),
        ));
    }
    if order.status != OrderStatus::ShoppingCompleted {
        return Err(AppError::Conflict(
            "load safety is confirmed after shopping is completed".to_string(),
        ));
    }
    if req.confirmed && order.receipt_ref.is_none() {
        return Err(AppError::GateUnmet(Gate::ReceiptMissing));
    }

    order.load_safety_confirmed = req.confirmed;
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    info!(order_id = %order_id, confirmed = req.confirmed, "load safety updated");
    Ok(snapshot)
}
