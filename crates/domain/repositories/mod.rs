pub mod app_events;
pub mod esim_orders;
pub mod subscriptions;
