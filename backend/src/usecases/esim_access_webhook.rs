use std::sync::Arc;

use axum::http::StatusCode;
use chrono::Utc;
use crates::domain::{
    entities::esim_orders::{EsimOrderChangeset, EsimOrderEntity},
    repositories::esim_orders::EsimOrderRepository,
    value_objects::{
        enums::{esim_order_statuses::EsimOrderStatus, notify_types::NotifyType},
        esim_access_webhook::{
            EsimAccessNotification, NotificationParseError, parse_provider_timestamp,
        },
        events::AppEvent,
    },
};
use thiserror::Error;
use tracing::{error, info, warn};

use super::event_dispatcher::EventDispatcher;
use crate::config::stage::Stage;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("unauthorized webhook request")]
    Unauthorized,
    #[error(transparent)]
    InvalidPayload(#[from] NotificationParseError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WebhookError::Unauthorized => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) => StatusCode::BAD_REQUEST,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookOutcome {
    pub received: String,
    pub matched_rows: usize,
}

pub struct EsimAccessWebhookUseCase<O>
where
    O: EsimOrderRepository + Send + Sync + 'static,
{
    order_repo: Arc<O>,
    events: EventDispatcher,
    secret: Option<String>,
    stage: Stage,
}

impl<O> EsimAccessWebhookUseCase<O>
where
    O: EsimOrderRepository + Send + Sync + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        events: EventDispatcher,
        secret: Option<String>,
        stage: Stage,
    ) -> Self {
        Self {
            order_repo,
            events,
            secret: secret.filter(|secret| !secret.is_empty()),
            stage,
        }
    }

    /// Without a configured secret the endpoint is open everywhere except production.
    pub fn authorize(&self, presented: Option<&str>) -> Result<(), WebhookError> {
        match (self.secret.as_deref(), presented) {
            (Some(expected), Some(presented)) if secrets_match(presented, expected) => Ok(()),
            (Some(_), _) => {
                warn!(
                    credential_present = presented.is_some(),
                    "esim_webhook: rejected request with missing or wrong secret"
                );
                Err(WebhookError::Unauthorized)
            }
            (None, _) if self.stage.is_production() => {
                error!(
                    stage = %self.stage,
                    "esim_webhook: ESIM_WEBHOOK_SECRET is not configured; refusing request"
                );
                Err(WebhookError::Unauthorized)
            }
            (None, _) => {
                warn!(
                    stage = %self.stage,
                    "esim_webhook: no secret configured; accepting unauthenticated request"
                );
                Ok(())
            }
        }
    }

    pub async fn handle(
        &self,
        notification: EsimAccessNotification,
    ) -> Result<WebhookOutcome, WebhookError> {
        let received = notification.notify_type.to_string();
        let order_no = notification.order_no.clone();
        info!(
            notify_type = %received,
            order_no = %order_no,
            "esim_webhook: notification received"
        );

        let Some(changeset) = changeset_for(&notification) else {
            warn!(
                notify_type = %received,
                order_no = %order_no,
                "esim_webhook: unknown notification type ignored"
            );
            return Ok(WebhookOutcome {
                received,
                matched_rows: 0,
            });
        };

        let updated = self
            .order_repo
            .update_by_order_no(order_no.clone(), changeset)
            .await
            .map_err(|err| {
                error!(
                    notify_type = %received,
                    order_no = %order_no,
                    db_error = ?err,
                    "esim_webhook: failed to apply notification"
                );
                WebhookError::Internal(err)
            })?;

        if updated.is_empty() {
            // Possibly the purchase insert has not landed yet; the update is dropped.
            warn!(
                notify_type = %received,
                order_no = %order_no,
                "esim_webhook: no order matches notification"
            );
        }

        for order in &updated {
            info!(
                notify_type = %received,
                order_no = %order.order_no,
                status = %order.status,
                "esim_webhook: order updated"
            );
            if let Some(event) = customer_event(&notification.notify_type, order) {
                self.events.try_dispatch(event);
            }
        }

        Ok(WebhookOutcome {
            received,
            matched_rows: updated.len(),
        })
    }
}

fn changeset_for(notification: &EsimAccessNotification) -> Option<EsimOrderChangeset> {
    let content = &notification.content;
    let base = EsimOrderChangeset {
        last_notify_type: Some(notification.notify_type.to_string()),
        updated_at: Some(Utc::now()),
        ..Default::default()
    };

    let changeset = match &notification.notify_type {
        NotifyType::OrderStatus => EsimOrderChangeset {
            status: Some(
                content
                    .order_status
                    .clone()
                    .unwrap_or_else(|| EsimOrderStatus::GotResource.to_string()),
            ),
            ..base
        },
        NotifyType::EsimStatus => EsimOrderChangeset {
            status: content
                .esim_status
                .clone()
                .or_else(|| content.smdp_status.clone()),
            esim_status: content.esim_status.clone(),
            smdp_status: content.smdp_status.clone(),
            iccid: content.iccid.clone(),
            ..base
        },
        NotifyType::DataUsage => EsimOrderChangeset {
            status: Some(EsimOrderStatus::LowData.to_string()),
            total_volume: content.total_volume,
            remaining_volume: content.remain,
            ..base
        },
        NotifyType::ValidityUsage => EsimOrderChangeset {
            status: Some(EsimOrderStatus::ExpiringSoon.to_string()),
            expired_time: content
                .expired_time
                .as_deref()
                .and_then(parse_provider_timestamp),
            ..base
        },
        NotifyType::Unknown(_) => return None,
    };

    Some(changeset)
}

fn customer_event(notify_type: &NotifyType, order: &EsimOrderEntity) -> Option<AppEvent> {
    match notify_type {
        NotifyType::DataUsage => Some(AppEvent::EsimLowData {
            user_id: order.user_id,
            order_no: order.order_no.clone(),
            iccid: order.iccid.clone(),
            remaining_volume: order.remaining_volume,
            total_volume: order.total_volume,
        }),
        NotifyType::ValidityUsage => Some(AppEvent::EsimExpiringSoon {
            user_id: order.user_id,
            order_no: order.order_no.clone(),
            iccid: order.iccid.clone(),
            expired_time: order.expired_time,
        }),
        _ => None,
    }
}

fn secrets_match(presented: &str, expected: &str) -> bool {
    presented.len() == expected.len()
        && presented
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
}
