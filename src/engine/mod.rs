pub mod checkout;
pub mod dispatch;
pub mod issues;
pub mod lifecycle;
pub mod notify;
pub mod till_funding;
