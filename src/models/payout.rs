use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub driver_id: Uuid,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}
