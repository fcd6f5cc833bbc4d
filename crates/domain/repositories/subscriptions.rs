use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{
    discount_usages::InsertDiscountUsageEntity, subscriptions::SubscriptionEntity,
};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn record_discount_usage(&self, usage: InsertDiscountUsageEntity) -> Result<Uuid>;

    /// Adds one to `discounts_used_this_period`. Period rollover resets it elsewhere.
    async fn increment_discounts_used(&self, subscription_id: Uuid) -> Result<()>;
}
