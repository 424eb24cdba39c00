use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Customer,
    Driver,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderMessage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub sender_id: Option<Uuid>,
    pub sender: SenderRole,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
