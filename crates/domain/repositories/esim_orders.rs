use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::esim_orders::{
    EsimOrderChangeset, EsimOrderEntity, InsertEsimOrderEntity,
};

#[automock]
#[async_trait]
pub trait EsimOrderRepository {
    /// Most recent order for the pair created at or after `since`.
    async fn find_recent(
        &self,
        user_id: Uuid,
        package_code: String,
        since: DateTime<Utc>,
    ) -> Result<Option<EsimOrderEntity>>;

    async fn find_by_order_no_for_user(
        &self,
        user_id: Uuid,
        order_no: String,
    ) -> Result<Option<EsimOrderEntity>>;

    async fn insert(&self, insert_order_entity: InsertEsimOrderEntity) -> Result<Uuid>;

    /// Update-where on `order_no`, never an upsert. Returns the rows that matched.
    async fn update_by_order_no(
        &self,
        order_no: String,
        changeset: EsimOrderChangeset,
    ) -> Result<Vec<EsimOrderEntity>>;
}
