pub mod discount_usages;
pub mod esim_orders;
pub mod subscriptions;
pub mod user_events;
