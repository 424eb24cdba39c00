use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::message::SenderRole;
use crate::models::order::OrderStatus;
use crate::pricing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TillFundsRequest {
    pub till_amount: Decimal,
    #[serde(default)]
    pub bag_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TillFundsDisbursement {
    pub order_id: Uuid,
    pub till_amount: Decimal,
    pub carrier_bag_count: u32,
    pub carrier_bag_total: Decimal,
    pub till_total_needed: Decimal,
}

pub fn request_till_funds(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    req: TillFundsRequest,
) -> Result<TillFundsDisbursement, AppError> {
    if req.till_amount <= Decimal::ZERO {
        return Err(AppError::BadRequest(
            "till amount must be greater than zero".to_string(),
        ));
    }

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if actor.role != Role::Driver || !order.is_assigned_driver(actor.user_id) {
        return Err(AppError::Unauthorized(
            "only the assigned driver may request till funds".to_string(),
        ));
    }

    let requires_till = state
        .stores
        .get(&order.store_id)
        .map(|store| store.requires_till_funding)
        .unwrap_or(false);
    if !requires_till {
        return Err(AppError::BadRequest(
            "this store does not use till funding".to_string(),
        ));
    }
    if order.funds_confirmed {
        return Err(AppError::AlreadyConfirmed);
    }
    if order.status != OrderStatus::Shopping {
        return Err(AppError::Conflict(
            "till funds are requested while shopping".to_string(),
        ));
    }

    // The amounts reported at the till replace whatever checkout estimated.
    let till_amount = pricing::round_money(req.till_amount);
    let carrier_bag_total = pricing::bags_total(req.bag_count);
    let till_total_needed = pricing::till_total_needed(till_amount, carrier_bag_total);

    order.till_amount = Some(till_amount);
    order.carrier_bag_count = req.bag_count;
    order.carrier_bag_total = carrier_bag_total;
    order.funds_confirmed = true;
    order.recompute_total();
    order.touch();
    drop(entry);

    notify::emit(
        state,
        OrderEvent::FundsConfirmed {
            order_id,
            till_total: till_total_needed,
        },
    );
    notify::post_message(
        state,
        order_id,
        None,
        SenderRole::System,
        format!("Till funds disbursed: {till_total_needed} sent to the driver."),
    );

    info!(order_id = %order_id, till_total = %till_total_needed, "till funds disbursed");

    Ok(TillFundsDisbursement {
        order_id,
        till_amount,
        carrier_bag_count: req.bag_count,
        carrier_bag_total,
        till_total_needed,
    })
}
