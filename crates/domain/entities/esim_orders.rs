use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::esim_orders;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = esim_orders)]
pub struct EsimOrderEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_no: String,
    pub transaction_id: String,
    pub package_code: String,
    pub quantity: i32,
    pub iccid: Option<String>,
    pub lpa_code: Option<String>,
    pub qr_code_url: Option<String>,
    pub smdp_status: Option<String>,
    pub esim_status: Option<String>,
    pub status: String,
    pub total_volume: Option<i64>,
    pub remaining_volume: Option<i64>,
    pub expired_time: Option<DateTime<Utc>>,
    pub last_notify_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = esim_orders)]
pub struct InsertEsimOrderEntity {
    pub user_id: Uuid,
    pub order_no: String,
    pub transaction_id: String,
    pub package_code: String,
    pub quantity: i32,
    pub iccid: Option<String>,
    pub lpa_code: Option<String>,
    pub qr_code_url: Option<String>,
    pub smdp_status: Option<String>,
    pub esim_status: Option<String>,
    pub status: String,
    pub total_volume: Option<i64>,
    pub expired_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update applied by webhook deliveries. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = esim_orders)]
pub struct EsimOrderChangeset {
    pub status: Option<String>,
    pub iccid: Option<String>,
    pub smdp_status: Option<String>,
    pub esim_status: Option<String>,
    pub total_volume: Option<i64>,
    pub remaining_volume: Option<i64>,
    pub expired_time: Option<DateTime<Utc>>,
    pub last_notify_type: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl EsimOrderEntity {
    /// Applies a changeset in memory with the same skip-`None` rules diesel uses.
    pub fn apply(&mut self, changeset: &EsimOrderChangeset) {
        if let Some(status) = &changeset.status {
            self.status = status.clone();
        }
        if let Some(iccid) = &changeset.iccid {
            self.iccid = Some(iccid.clone());
        }
        if let Some(smdp_status) = &changeset.smdp_status {
            self.smdp_status = Some(smdp_status.clone());
        }
        if let Some(esim_status) = &changeset.esim_status {
            self.esim_status = Some(esim_status.clone());
        }
        if let Some(total_volume) = changeset.total_volume {
            self.total_volume = Some(total_volume);
        }
        if let Some(remaining_volume) = changeset.remaining_volume {
            self.remaining_volume = Some(remaining_volume);
        }
        if let Some(expired_time) = changeset.expired_time {
            self.expired_time = Some(expired_time);
        }
        if let Some(last_notify_type) = &changeset.last_notify_type {
            self.last_notify_type = Some(last_notify_type.clone());
        }
        if let Some(updated_at) = changeset.updated_at {
            self.updated_at = updated_at;
        }
    }
}

impl InsertEsimOrderEntity {
    pub fn into_entity(self, id: Uuid) -> EsimOrderEntity {
        EsimOrderEntity {
            id,
            user_id: self.user_id,
            order_no: self.order_no,
            transaction_id: self.transaction_id,
            package_code: self.package_code,
            quantity: self.quantity,
            iccid: self.iccid,
            lpa_code: self.lpa_code,
            qr_code_url: self.qr_code_url,
            smdp_status: self.smdp_status,
            esim_status: self.esim_status,
            status: self.status,
            total_volume: self.total_volume,
            remaining_volume: None,
            expired_time: self.expired_time,
            last_notify_type: None,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
