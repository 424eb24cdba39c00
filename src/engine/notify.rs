use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::{Actor, Role};
use crate::models::event::OrderEvent;
use crate::models::message::{OrderMessage, SenderRole};
use crate::models::order::Order;
use crate::state::AppState;

/// Best effort fan-out; an event is dropped when nobody is subscribed.
pub fn emit(state: &AppState, event: OrderEvent) {
    let _ = state.events_tx.send(event);
}

pub fn post_message(
    state: &AppState,
    order_id: Uuid,
    sender_id: Option<Uuid>,
    sender: SenderRole,
    body: String,
) -> OrderMessage {
    let message = OrderMessage {
        id: Uuid::new_v4(),
        order_id,
        sender_id,
        sender,
        body,
        created_at: Utc::now(),
    };

    state
        .messages
        .entry(order_id)
        .or_default()
        .push(message.clone());

    emit(
        state,
        OrderEvent::MessagePosted {
            order_id,
            message: message.clone(),
        },
    );

    message
}

pub fn post_user_message(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
    body: String,
) -> Result<OrderMessage, AppError> {
    if body.trim().is_empty() {
        return Err(AppError::BadRequest(
            "message body cannot be empty".to_string(),
        ));
    }

    let sender = {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        message_sender(actor, order.value())?
    };

    Ok(post_message(
        state,
        order_id,
        Some(actor.user_id),
        sender,
        body,
    ))
}

fn message_sender(actor: &Actor, order: &Order) -> Result<SenderRole, AppError> {
    match actor.role {
        Role::Customer if order.customer_id == actor.user_id => Ok(SenderRole::Customer),
        Role::Driver if order.is_assigned_driver(actor.user_id) => Ok(SenderRole::Driver),
        _ => Err(AppError::Unauthorized(
            "only the ordering customer and the assigned driver may chat on this order".to_string(),
        )),
    }
}

pub fn order_messages(
    state: &AppState,
    actor: &Actor,
    order_id: Uuid,
) -> Result<Vec<OrderMessage>, AppError> {
    {
        let order = state
            .orders
            .get(&order_id)
            .ok_or_else(|| AppError::NotFound(format!("order {order_id} not found")))?;
        if !order.can_be_viewed_by(actor) {
            return Err(AppError::Unauthorized(
                "no access to this order".to_string(),
            ));
        }
    }

    let messages = state
        .messages
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default();

    Ok(messages)
}
