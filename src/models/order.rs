use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actor::{Actor, Role};
use crate::models::store::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    AwaitingPayment,
    Pending,
    Accepted,
    ArrivedAtStore,
    Shopping,
    ShoppingCompleted,
    InTransit,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::AwaitingPayment => "awaiting_payment",
            OrderStatus::Pending => "pending",
            OrderStatus::Accepted => "accepted",
            OrderStatus::ArrivedAtStore => "arrived_at_store",
            OrderStatus::Shopping => "shopping",
            OrderStatus::ShoppingCompleted => "shopping_completed",
            OrderStatus::InTransit => "in_transit",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// The single status that may follow this one, `None` for terminal states.
    pub fn successor(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::AwaitingPayment => Some(OrderStatus::Pending),
            OrderStatus::Pending => Some(OrderStatus::Accepted),
            OrderStatus::Accepted => Some(OrderStatus::ArrivedAtStore),
            OrderStatus::ArrivedAtStore => Some(OrderStatus::Shopping),
            OrderStatus::Shopping => Some(OrderStatus::ShoppingCompleted),
            OrderStatus::ShoppingCompleted => Some(OrderStatus::InTransit),
            OrderStatus::InTransit => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Statuses in which the assigned driver is actively working the order.
    pub fn is_driver_active(self) -> bool {
        matches!(
            self,
            OrderStatus::Accepted
                | OrderStatus::ArrivedAtStore
                | OrderStatus::Shopping
                | OrderStatus::ShoppingCompleted
                | OrderStatus::InTransit
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PackageSize {
    Small,
    Medium,
    Large,
}

impl PackageSize {
    pub fn from_line_count(lines: usize) -> Self {
        if lines <= 5 {
            PackageSize::Small
        } else if lines <= 15 {
            PackageSize::Medium
        } else {
            PackageSize::Large
        }
    }

    pub fn car_recommended(self) -> bool {
        matches!(self, PackageSize::Large)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DeliveryFeeBasis {
    Distance { km: f64 },
    Zone { zone_id: Uuid },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub flagged_unavailable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub store_id: Uuid,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub delivery_address: String,
    pub delivery_point: Option<GeoPoint>,
    pub fee_basis: DeliveryFeeBasis,
    pub subtotal: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
    pub carrier_bag_count: u32,
    pub carrier_bag_total: Decimal,
    pub till_amount: Option<Decimal>,
    pub funds_confirmed: bool,
    pub total: Decimal,
    pub driver_payout: Option<Decimal>,
    pub receipt_ref: Option<String>,
    pub load_safety_confirmed: bool,
    pub package_size: PackageSize,
    pub requires_car: bool,
    pub notes: Option<String>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub cancellation_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// The total is always derived from its parts, never adjusted directly.
    pub fn recompute_total(&mut self) {
        self.total = self.subtotal + self.service_fee + self.delivery_fee + self.carrier_bag_total;
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn is_assigned_driver(&self, driver_id: Uuid) -> bool {
        self.driver_id == Some(driver_id)
    }

    pub fn can_be_viewed_by(&self, actor: &Actor) -> bool {
        match actor.role {
            Role::Admin => true,
            Role::Customer => self.customer_id == actor.user_id,
            Role::Driver => self.is_assigned_driver(actor.user_id),
        }
    }

    pub fn item_mut(&mut self, item_id: Uuid) -> Option<&mut OrderItem> {
        self.items.iter_mut().find(|item| item.id == item_id)
    }

    pub fn item(&self, item_id: Uuid) -> Option<&OrderItem> {
        self.items.iter().find(|item| item.id == item_id)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::{DeliveryFeeBasis, Order, OrderStatus, PackageSize};

    #[test]
    fn forward_flow_walks_every_working_status() {
        let mut status = OrderStatus::AwaitingPayment;
        let mut walked = vec![status];

        while let Some(next) = status.successor() {
            walked.push(next);
            status = next;
        }

        assert_eq!(
            walked,
            vec![
                OrderStatus::AwaitingPayment,
                OrderStatus::Pending,
                OrderStatus::Accepted,
                OrderStatus::ArrivedAtStore,
                OrderStatus::Shopping,
                OrderStatus::ShoppingCompleted,
                OrderStatus::InTransit,
                OrderStatus::Delivered,
            ]
        );
    }

    #[test]
    fn terminal_statuses_have_no_successor() {
        assert!(OrderStatus::Delivered.successor().is_none());
        assert!(OrderStatus::Cancelled.successor().is_none());
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Shopping.is_terminal());
    }

    #[test]
    fn package_size_follows_line_count() {
        assert_eq!(PackageSize::from_line_count(1), PackageSize::Small);
        assert_eq!(PackageSize::from_line_count(5), PackageSize::Small);
        assert_eq!(PackageSize::from_line_count(6), PackageSize::Medium);
        assert_eq!(PackageSize::from_line_count(15), PackageSize::Medium);
        assert_eq!(PackageSize::from_line_count(16), PackageSize::Large);

        assert!(PackageSize::Large.car_recommended());
        assert!(!PackageSize::Medium.car_recommended());
    }

    #[test]
    fn recompute_total_sums_all_components() {
        let mut order = Order {
            id: Uuid::from_u128(1),
            customer_id: Uuid::from_u128(2),
            driver_id: None,
            store_id: Uuid::from_u128(3),
            status: OrderStatus::AwaitingPayment,
            items: vec![],
            delivery_address: "12 Acacia Road".to_string(),
            delivery_point: None,
            fee_basis: DeliveryFeeBasis::Distance { km: 5.0 },
            subtotal: dec!(200.00),
            service_fee: dec!(20.00),
            delivery_fee: dec!(50.00),
            carrier_bag_count: 2,
            carrier_bag_total: dec!(7.00),
            till_amount: None,
            funds_confirmed: false,
            total: dec!(0),
            driver_payout: None,
            receipt_ref: None,
            load_safety_confirmed: false,
            package_size: PackageSize::Small,
            requires_car: false,
            notes: None,
            scheduled_for: None,
            cancellation_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        order.recompute_total();
        assert_eq!(order.total, dec!(277.00));
    }
}
