pub mod esim_order_statuses;
pub mod notify_types;
pub mod subscription_plans;
pub mod subscription_statuses;
