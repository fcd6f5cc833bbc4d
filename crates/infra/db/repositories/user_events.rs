use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use diesel::{RunQueryDsl, insert_into};
use std::sync::Arc;
use tokio::task;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::user_events},
};
use domain::{
    entities::user_events::InsertUserEventEntity, repositories::app_events::AppEventSink,
    value_objects::events::AppEvent,
};

/// Writes events to `user_events`, which the gamification and customer
/// notification services consume.
pub struct UserEventPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserEventPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AppEventSink for UserEventPostgres {
    async fn handle(&self, event: AppEvent) -> Result<()> {
        let row = InsertUserEventEntity {
            user_id: Some(event.user_id()),
            event_type: event.event_type().to_string(),
            payload: serde_json::to_value(&event).context("failed to serialize app event")?,
            created_at: Utc::now(),
        };
        let db_pool = Arc::clone(&self.db_pool);

        task::spawn_blocking(move || -> Result<()> {
            let mut conn = db_pool.get()?;

            insert_into(user_events::table)
                .values(&row)
                .execute(&mut conn)?;

            Ok(())
        })
        .await?
    }

    fn sink_name(&self) -> &'static str {
        "user_events_postgres"
    }
}
