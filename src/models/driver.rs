use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::store::GeoPoint;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Bicycle,
    Motorcycle,
    Car,
}

impl VehicleType {
    /// Assumed average city speed, used for arrival estimates.
    pub fn average_speed_kmh(self) -> f64 {
        match self {
            VehicleType::Bicycle => 15.0,
            VehicleType::Motorcycle => 35.0,
            VehicleType::Car => 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub name: String,
    pub phone: Option<String>,
    pub vehicle: VehicleType,
    pub is_available: bool,
    pub wallet_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverLocation {
    pub driver_id: Uuid,
    pub order_id: Option<Uuid>,
    pub location: GeoPoint,
    pub accuracy: Option<f64>,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    pub updated_at: DateTime<Utc>,
}
