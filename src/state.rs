use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::models::driver::{Driver, DriverLocation};
use crate::models::event::OrderEvent;
use crate::models::issue::ItemIssue;
use crate::models::message::OrderMessage;
use crate::models::order::Order;
use crate::models::payout::PayoutRecord;
use crate::models::store::{DeliveryZone, Product, Store};
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub stores: DashMap<Uuid, Store>,
    pub products: DashMap<Uuid, Product>,
    pub zones: DashMap<Uuid, DeliveryZone>,
    pub drivers: DashMap<Uuid, Driver>,
    pub orders: DashMap<Uuid, Order>,
    pub issues: DashMap<Uuid, ItemIssue>,
    pub messages: DashMap<Uuid, Vec<OrderMessage>>,
    /// Keyed by order id so each delivery can be paid out at most once.
    pub payouts: DashMap<Uuid, PayoutRecord>,
    pub locations: DashMap<Uuid, DriverLocation>,
    pub events_tx: broadcast::Sender<OrderEvent>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(event_buffer_size: usize) -> Self {
        let (events_tx, _unused_rx) = broadcast::channel(event_buffer_size);

        Self {
            stores: DashMap::new(),
            products: DashMap::new(),
            zones: DashMap::new(),
            drivers: DashMap::new(),
            orders: DashMap::new(),
            issues: DashMap::new(),
            messages: DashMap::new(),
            payouts: DashMap::new(),
            locations: DashMap::new(),
            events_tx,
            metrics: Metrics::new(),
        }
    }
}
