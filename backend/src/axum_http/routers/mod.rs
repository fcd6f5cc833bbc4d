pub mod esim_access_webhook;
pub mod esim_purchase;
