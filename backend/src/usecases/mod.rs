pub mod esim_access_webhook;
pub mod esim_purchase;
pub mod event_dispatcher;
pub mod retry_policy;
pub mod subscription_discounts;

#[cfg(test)]
pub(crate) mod test_support;
