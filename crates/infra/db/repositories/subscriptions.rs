use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{discount_usages, subscriptions},
    },
};
use domain::{
    entities::{discount_usages::InsertDiscountUsageEntity, subscriptions::SubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::subscription_statuses::SubscriptionStatus,
};

pub struct SubscriptionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl SubscriptionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionPostgres {
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        let db_pool = Arc::clone(&self.db_pool);
        let now = Utc::now();

        Ok(task::spawn_blocking(move || -> Result<Option<SubscriptionEntity>> {
            let mut conn = db_pool.get()?;

            let result = subscriptions::table
                .filter(subscriptions::user_id.eq(user_id))
                .filter(subscriptions::status.eq(SubscriptionStatus::Active.to_string()))
                .filter(subscriptions::current_period_end.gt(now))
                .order(subscriptions::created_at.desc())
                .select(SubscriptionEntity::as_select())
                .first::<SubscriptionEntity>(&mut conn)
                .optional()?;

            Ok(result)
        })
        .await??)
    }

    async fn record_discount_usage(&self, usage: InsertDiscountUsageEntity) -> Result<Uuid> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Uuid> {
            let mut conn = db_pool.get()?;

            let result = insert_into(discount_usages::table)
                .values(&usage)
                .returning(discount_usages::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(result)
        })
        .await??)
    }

    async fn increment_discounts_used(&self, subscription_id: Uuid) -> Result<()> {
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            // Single statement so concurrent purchases cannot lose an increment.
            update(subscriptions::table)
                .filter(subscriptions::id.eq(subscription_id))
                .set(
                    subscriptions::discounts_used_this_period
                        .eq(subscriptions::discounts_used_this_period + 1),
                )
                .execute(&mut conn)?;

            Ok(())
        })
        .await?
    }
}
