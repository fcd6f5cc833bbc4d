use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::user_events;

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = user_events)]
pub struct InsertUserEventEntity {
    pub user_id: Option<Uuid>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
