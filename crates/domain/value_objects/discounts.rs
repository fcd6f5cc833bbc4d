use serde::Serialize;

use crate::domain::{
    entities::subscriptions::SubscriptionEntity,
    value_objects::enums::subscription_plans::SubscriptionPlan,
};

/// Purchases per billing period that get the full Black-tier percent.
pub const BLACK_FULL_DISCOUNT_USES: i32 = 1;
/// Ceiling applied to Black-tier purchases once the full-percent uses are spent.
pub const BLACK_REDUCED_DISCOUNT_PERCENT: i32 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscountDecision {
    pub plan: SubscriptionPlan,
    pub percent: i32,
    /// The reduced percent was applied because the period cap is exhausted.
    pub capped: bool,
    /// Whether `discounts_used_this_period` should be incremented.
    pub consumes_usage: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DiscountDto {
    pub percent: i32,
    pub plan: String,
}

impl From<&DiscountDecision> for DiscountDto {
    fn from(value: &DiscountDecision) -> Self {
        Self {
            percent: value.percent,
            plan: value.plan.to_string(),
        }
    }
}

pub fn evaluate_discount(subscription: &SubscriptionEntity) -> DiscountDecision {
    let plan = SubscriptionPlan::parse(&subscription.plan);
    let base_percent = subscription.discount_percent.clamp(0, 100);

    match plan {
        SubscriptionPlan::Black
            if subscription.discounts_used_this_period >= BLACK_FULL_DISCOUNT_USES =>
        {
            DiscountDecision {
                plan,
                percent: base_percent.min(BLACK_REDUCED_DISCOUNT_PERCENT),
                capped: true,
                consumes_usage: false,
            }
        }
        plan => DiscountDecision {
            plan,
            percent: base_percent,
            capped: false,
            consumes_usage: true,
        },
    }
}
