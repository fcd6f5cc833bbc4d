use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::discount_usages;

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = discount_usages)]
pub struct InsertDiscountUsageEntity {
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub order_no: String,
    pub plan: String,
    pub discount_percent: i32,
    pub capped: bool,
    pub created_at: DateTime<Utc>,
}
