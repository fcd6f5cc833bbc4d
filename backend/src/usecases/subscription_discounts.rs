use std::sync::Arc;

use chrono::Utc;
use crates::domain::{
    entities::discount_usages::InsertDiscountUsageEntity,
    repositories::subscriptions::SubscriptionRepository,
    value_objects::discounts::{DiscountDecision, evaluate_discount},
};
use tracing::{error, info};
use uuid::Uuid;

/// Best-effort discount bookkeeping run after an order is placed. Every failure is
/// logged and swallowed; a failed lookup means no discount is reported.
pub struct SubscriptionDiscounts<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
}

impl<S> SubscriptionDiscounts<S>
where
    S: SubscriptionRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>) -> Self {
        Self { subscription_repo }
    }

    pub async fn apply(&self, user_id: Uuid, order_no: &str) -> Option<DiscountDecision> {
        let subscription = match self.subscription_repo.find_active_for_user(user_id).await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                info!(%user_id, "subscription_discounts: no active subscription");
                return None;
            }
            Err(err) => {
                error!(
                    %user_id,
                    db_error = ?err,
                    "subscription_discounts: failed to load active subscription"
                );
                return None;
            }
        };

        let decision = evaluate_discount(&subscription);
        info!(
            %user_id,
            subscription_id = %subscription.id,
            plan = %decision.plan,
            percent = decision.percent,
            capped = decision.capped,
            "subscription_discounts: discount applied"
        );

        let usage = InsertDiscountUsageEntity {
            user_id,
            subscription_id: subscription.id,
            order_no: order_no.to_string(),
            plan: decision.plan.to_string(),
            discount_percent: decision.percent,
            capped: decision.capped,
            created_at: Utc::now(),
        };
        if let Err(err) = self.subscription_repo.record_discount_usage(usage).await {
            error!(
                %user_id,
                order_no,
                db_error = ?err,
                "subscription_discounts: failed to record discount usage"
            );
        }

        if decision.consumes_usage {
            if let Err(err) = self
                .subscription_repo
                .increment_discounts_used(subscription.id)
                .await
            {
                error!(
                    %user_id,
                    subscription_id = %subscription.id,
                    db_error = ?err,
                    "subscription_discounts: failed to increment usage counter"
                );
            }
        }

        Some(decision)
    }
}
