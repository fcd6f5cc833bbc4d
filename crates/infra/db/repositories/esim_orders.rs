use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use tokio::task;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::esim_orders},
};
use domain::{
    entities::esim_orders::{EsimOrderChangeset, EsimOrderEntity, InsertEsimOrderEntity},
    repositories::esim_orders::EsimOrderRepository,
};

pub struct EsimOrderPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EsimOrderPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

// Diesel is synchronous; every query runs on the blocking threadpool.
#[async_trait]
impl EsimOrderRepository for EsimOrderPostgres {
    async fn find_recent(
        &self,
        user_id: Uuid,
        package_code: String,
        since: DateTime<Utc>,
    ) -> Result<Option<EsimOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<EsimOrderEntity>> {
            let mut conn = db_pool.get()?;

            let result = esim_orders::table
                .filter(esim_orders::user_id.eq(user_id))
                .filter(esim_orders::package_code.eq(package_code))
                .filter(esim_orders::created_at.ge(since))
                .order(esim_orders::created_at.desc())
                .select(EsimOrderEntity::as_select())
                .first::<EsimOrderEntity>(&mut conn)
                .optional()?;

            Ok(result)
        })
        .await??)
    }

    async fn find_by_order_no_for_user(
        &self,
        user_id: Uuid,
        order_no: String,
    ) -> Result<Option<EsimOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Option<EsimOrderEntity>> {
            let mut conn = db_pool.get()?;

            let result = esim_orders::table
                .filter(esim_orders::user_id.eq(user_id))
                .filter(esim_orders::order_no.eq(order_no))
                .order(esim_orders::created_at.desc())
                .select(EsimOrderEntity::as_select())
                .first::<EsimOrderEntity>(&mut conn)
                .optional()?;

            Ok(result)
        })
        .await??)
    }

    async fn insert(&self, insert_order_entity: InsertEsimOrderEntity) -> Result<Uuid> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Uuid> {
            let mut conn = db_pool.get()?;

            let result = insert_into(esim_orders::table)
                .values(&insert_order_entity)
                .returning(esim_orders::id)
                .get_result::<Uuid>(&mut conn)?;

            Ok(result)
        })
        .await??)
    }

    async fn update_by_order_no(
        &self,
        order_no: String,
        changeset: EsimOrderChangeset,
    ) -> Result<Vec<EsimOrderEntity>> {
        let db_pool = Arc::clone(&self.db_pool);

        Ok(task::spawn_blocking(move || -> Result<Vec<EsimOrderEntity>> {
            let mut conn = db_pool.get()?;

            let updated = update(esim_orders::table)
                .filter(esim_orders::order_no.eq(order_no))
                .set(&changeset)
                .returning(EsimOrderEntity::as_select())
                .get_results::<EsimOrderEntity>(&mut conn)?;

            Ok(updated)
        })
        .await??)
    }
}
