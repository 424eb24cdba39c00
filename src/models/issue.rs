use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Unavailable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CustomerChoice {
    Replacement,
    Refund,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemIssue {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_item_id: Uuid,
    pub issue_type: IssueType,
    pub driver_notes: Option<String>,
    pub customer_choice: Option<CustomerChoice>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
