pub mod actor;
pub mod driver;
pub mod event;
pub mod issue;
pub mod message;
pub mod order;
pub mod payout;
pub mod store;
