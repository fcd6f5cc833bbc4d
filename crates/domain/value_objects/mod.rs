pub mod discounts;
pub mod enums;
pub mod esim_access_webhook;
pub mod esim_purchase;
pub mod events;
