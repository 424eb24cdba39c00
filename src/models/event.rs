use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::issue::CustomerChoice;
use crate::models::message::OrderMessage;
use crate::models::order::OrderStatus;
use crate::models::store::GeoPoint;

/// Pushed to every live subscriber; consumers filter by order id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    StatusChanged {
        order_id: Uuid,
        status: OrderStatus,
    },
    DriverAssigned {
        order_id: Uuid,
        driver_id: Uuid,
    },
    FundsConfirmed {
        order_id: Uuid,
        till_total: Decimal,
    },
    IssueRaised {
        order_id: Uuid,
        issue_id: Uuid,
        order_item_id: Uuid,
    },
    IssueResolved {
        order_id: Uuid,
        issue_id: Uuid,
        choice: CustomerChoice,
    },
    PayoutRecorded {
        order_id: Uuid,
        driver_id: Uuid,
        amount: Decimal,
    },
    MessagePosted {
        order_id: Uuid,
        message: OrderMessage,
    },
    LocationUpdated {
        order_id: Uuid,
        driver_id: Uuid,
        location: GeoPoint,
    },
}

impl OrderEvent {
    pub fn order_id(&self) -> Uuid {
        match self {
            OrderEvent::StatusChanged { order_id, .. }
            | OrderEvent::DriverAssigned { order_id, .. }
            | OrderEvent::FundsConfirmed { order_id, .. }
            | OrderEvent::IssueRaised { order_id, .. }
            | OrderEvent::IssueResolved { order_id, .. }
            | OrderEvent::PayoutRecorded { order_id, .. }
            | OrderEvent::MessagePosted { order_id, .. }
            | OrderEvent::LocationUpdated { order_id, .. } => *order_id,
        }
    }
}
