use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::notify;
use crate::error::AppError;
use crate::geo::haversine_km;
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::message::SenderRole;
use crate::models::order::{DeliveryFeeBasis, Order, OrderItem, OrderStatus, PackageSize};
use crate::models::store::GeoPoint;
use crate::pricing;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct NewOrderItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct NewOrder {
    pub store_id: Uuid,
    pub items: Vec<NewOrderItem>,
    pub delivery_address: String,
    pub delivery_point: Option<GeoPoint>,
    pub zone_id: Option<Uuid>,
    #[serde(default)]
    pub carrier_bag_count: u32,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CancelOrder {
    pub reason: String,
}

pub fn create_order(state: &AppState, actor: &Actor, req: NewOrder) -> Result<Order, AppError> {
    actor.require_role(Role::Customer)?;

    if req.items.is_empty() {
        return Err(AppError::BadRequest(
            "order must contain at least one item".to_string(),
        ));
    }
    if req.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest(
            "delivery address cannot be empty".to_string(),
        ));
    }

    let store_location = {
        let store = state
            .stores
            .get(&req.store_id)
            .ok_or_else(|| AppError::NotFound(format!("store {} not found", req.store_id)))?;
        if !store.is_active {
            return Err(AppError::BadRequest(
                "store is not accepting orders".to_string(),
            ));
        }
        store.location
    };

    let mut items = Vec::with_capacity(req.items.len());
    let mut subtotal = Decimal::ZERO;

    for line in &req.items {
        if line.quantity == 0 {
            return Err(AppError::BadRequest(
                "item quantity must be greater than zero".to_string(),
            ));
        }

        let product = state
            .products
            .get(&line.product_id)
            .ok_or_else(|| AppError::NotFound(format!("product {} not found", line.product_id)))?;
        if product.store_id != req.store_id {
            return Err(AppError::BadRequest(format!(
                "product {} belongs to a different store",
                product.id
            )));
        }
        if !product.in_stock {
            return Err(AppError::BadRequest(format!(
                "product {} is out of stock",
                product.name
            )));
        }

        // Catalog price is frozen into the line at checkout.
        let total_price = pricing::round_money(product.price * Decimal::from(line.quantity));
        subtotal += total_price;

        items.push(OrderItem {
            id: Uuid::new_v4(),
            product_id: product.id,
            name: product.name.clone(),
            quantity: line.quantity,
            unit_price: product.price,
            total_price,
            flagged_unavailable: false,
        });
    }

    let (fee_basis, delivery_fee) = match (req.zone_id, req.delivery_point) {
        (Some(zone_id), _) => {
            let zone = state
                .zones
                .get(&zone_id)
                .ok_or_else(|| AppError::NotFound(format!("delivery zone {zone_id} not found")))?;
            (DeliveryFeeBasis::Zone { zone_id }, zone.fee)
        }
        (None, Some(point)) => {
            if !point.is_valid() {
                return Err(AppError::BadRequest(
                    "delivery coordinates are out of range".to_string(),
                ));
            }
            let km = haversine_km(&store_location, &point);
            (DeliveryFeeBasis::Distance { km }, pricing::distance_fee(km))
        }
        (None, None) => {
            return Err(AppError::BadRequest(
                "either delivery coordinates or a delivery zone is required".to_string(),
            ));
        }
    };

    let service_fee = pricing::service_fee(subtotal);
    let carrier_bag_total = pricing::bags_total(req.carrier_bag_count);
    let package_size = PackageSize::from_line_count(items.len());

    let mut order = Order {
        id: Uuid::new_v4(),
        customer_id: actor.user_id,
        driver_id: None,
        store_id: req.store_id,
        status: OrderStatus::AwaitingPayment,
        items,
        delivery_address: req.delivery_address,
        delivery_point: req.delivery_point,
        fee_basis,
        subtotal,
        service_fee,
        delivery_fee,
        carrier_bag_count: req.carrier_bag_count,
        carrier_bag_total,
        till_amount: None,
        funds_confirmed: false,
        total: Decimal::ZERO,
        driver_payout: Some(pricing::driver_payout(delivery_fee)),
        receipt_ref: None,
        load_safety_confirmed: false,
        package_size,
        requires_car: package_size.car_recommended(),
        notes: req.notes,
        scheduled_for: req.scheduled_for,
        cancellation_reason: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    order.recompute_total();

    state.orders.insert(order.id, order.clone());
    state.metrics.orders_created_total.inc();
    state.metrics.active_orders.inc();

    info!(
        order_id = %order.id,
        store_id = %order.store_id,
        total = %order.total,
        "order created"
    );

    Ok(order)
}

pub fn confirm_payment(state: &AppState, actor: &Actor, order_id: Uuid) -> Result<Order, AppError> {
    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    if actor.role != Role::Customer || order.customer_id != actor.user_id {
        return Err(AppError::Unauthorized(
            "only the ordering customer may confirm payment".to_string(),
        ));
    }
    if order.status != OrderStatus::AwaitingPayment {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Pending,
        });
    }

    order.status = OrderStatus::Pending;
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&["pending"])
        .inc();
    notify::emit(
        state,
        OrderEvent::StatusChanged {
            order_id,
            status: OrderStatus::Pending,
        },
    );

    info!(order_id = %order_id, "payment confirmed; order visible to drivers");
    Ok(snapshot)
}

pub fn cancel_order(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    req: CancelOrder,
) -> Result<Order, AppError> {
    let reason = req.reason.trim().to_string();
    if reason.is_empty() {
        return Err(AppError::BadRequest(
            "a cancellation reason is required".to_string(),
        ));
    }

    let mut entry = state
        .orders
        .get_mut(&order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
    let order = entry.value_mut();

    let is_owner = actor.role == Role::Customer && order.customer_id == actor.user_id;
    if !is_owner && !actor.is_admin() {
        return Err(AppError::Unauthorized(
            "only the ordering customer or an admin may cancel this order".to_string(),
        ));
    }
    if order.status.is_terminal() {
        return Err(AppError::InvalidTransition {
            from: order.status,
            to: OrderStatus::Cancelled,
        });
    }

    order.status = OrderStatus::Cancelled;
    // A cancelled order carries no driver binding; the claim is released.
    order.driver_id = None;
    order.cancellation_reason = Some(reason.clone());
    order.touch();
    let snapshot = order.clone();
    drop(entry);

    state
        .metrics
        .status_transitions_total
        .with_label_values(&["cancelled"])
        .inc();
    state.metrics.active_orders.dec();
    notify::emit(
        state,
        OrderEvent::StatusChanged {
            order_id,
            status: OrderStatus::Cancelled,
        },
    );
    notify::post_message(
        state,
        order_id,
        None,
        SenderRole::System,
        format!("Order cancelled: {reason}"),
    );

    info!(order_id = %order_id, "order cancelled");
    Ok(snapshot)
}
