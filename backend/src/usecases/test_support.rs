use std::sync::Mutex;

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crates::domain::{
    entities::esim_orders::{EsimOrderChangeset, EsimOrderEntity, InsertEsimOrderEntity},
    repositories::{app_events::AppEventSink, esim_orders::EsimOrderRepository},
    value_objects::events::AppEvent,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Order table double with the same matching rules as the Postgres implementation.
#[derive(Default)]
pub(crate) struct InMemoryEsimOrders {
    rows: Mutex<Vec<EsimOrderEntity>>,
    fail_inserts: bool,
}

impl InMemoryEsimOrders {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_inserts() -> Self {
        Self {
            fail_inserts: true,
            ..Self::default()
        }
    }

    pub(crate) fn rows(&self) -> Vec<EsimOrderEntity> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn seed(&self, order: InsertEsimOrderEntity) -> EsimOrderEntity {
        let entity = order.into_entity(Uuid::new_v4());
        self.rows.lock().unwrap().push(entity.clone());
        entity
    }
}

#[async_trait]
impl EsimOrderRepository for InMemoryEsimOrders {
    async fn find_recent(
        &self,
        user_id: Uuid,
        package_code: String,
        since: DateTime<Utc>,
    ) -> Result<Option<EsimOrderEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| {
                row.user_id == user_id
                    && row.package_code == package_code
                    && row.created_at >= since
            })
            .max_by_key(|row| row.created_at)
            .cloned())
    }

    async fn find_by_order_no_for_user(
        &self,
        user_id: Uuid,
        order_no: String,
    ) -> Result<Option<EsimOrderEntity>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|row| row.user_id == user_id && row.order_no == order_no)
            .cloned())
    }

    async fn insert(&self, insert_order_entity: InsertEsimOrderEntity) -> Result<Uuid> {
        if self.fail_inserts {
            bail!("insert failed: connection reset");
        }
        let id = Uuid::new_v4();
        self.rows
            .lock()
            .unwrap()
            .push(insert_order_entity.into_entity(id));
        Ok(id)
    }

    async fn update_by_order_no(
        &self,
        order_no: String,
        changeset: EsimOrderChangeset,
    ) -> Result<Vec<EsimOrderEntity>> {
        let mut rows = self.rows.lock().unwrap();
        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| row.order_no == order_no) {
            row.apply(&changeset);
            updated.push(row.clone());
        }
        Ok(updated)
    }
}

pub(crate) fn pending_order(
    user_id: Uuid,
    order_no: &str,
    package_code: &str,
) -> InsertEsimOrderEntity {
    let now = Utc::now();
    InsertEsimOrderEntity {
        user_id,
        order_no: order_no.to_string(),
        transaction_id: format!("{user_id}-{}", now.timestamp_millis()),
        package_code: package_code.to_string(),
        quantity: 1,
        iccid: None,
        lpa_code: None,
        qr_code_url: None,
        smdp_status: None,
        esim_status: None,
        status: "PENDING".to_string(),
        total_volume: None,
        expired_time: None,
        created_at: now,
        updated_at: now,
    }
}

enum SinkMode {
    Healthy,
    Failing,
    Blocked,
}

/// Forwards every event it receives to a channel the test can read.
pub(crate) struct CapturingSink {
    tx: mpsc::UnboundedSender<AppEvent>,
    mode: SinkMode,
}

impl CapturingSink {
    fn with_mode(mode: SinkMode) -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx, mode }, rx)
    }

    pub(crate) fn new() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        Self::with_mode(SinkMode::Healthy)
    }

    pub(crate) fn failing() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        Self::with_mode(SinkMode::Failing)
    }

    /// Never returns from `handle`, so the dispatch queue backs up.
    pub(crate) fn blocked() -> (Self, mpsc::UnboundedReceiver<AppEvent>) {
        Self::with_mode(SinkMode::Blocked)
    }
}

#[async_trait]
impl AppEventSink for CapturingSink {
    async fn handle(&self, event: AppEvent) -> Result<()> {
        let _ = self.tx.send(event);
        match self.mode {
            SinkMode::Healthy => Ok(()),
            SinkMode::Failing => bail!("sink unavailable"),
            SinkMode::Blocked => std::future::pending().await,
        }
    }

    fn sink_name(&self) -> &'static str {
        "capturing"
    }
}
