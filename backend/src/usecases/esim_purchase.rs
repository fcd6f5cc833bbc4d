use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use crates::{
    domain::{
        entities::esim_orders::{EsimOrderEntity, InsertEsimOrderEntity},
        repositories::{
            esim_orders::EsimOrderRepository, subscriptions::SubscriptionRepository,
        },
        value_objects::{
            discounts::DiscountDto,
            enums::esim_order_statuses::EsimOrderStatus,
            esim_access_webhook::parse_provider_timestamp,
            esim_purchase::{
                EsimProfileDto, EsimPurchaseObj, FieldError, PackageDto, PurchaseEsimModel,
                ValidatedPurchase,
            },
            events::AppEvent,
        },
    },
    providers::esim_access::{
        EsimAccessClient, EsimAccessError, EsimAccessOrderObj, EsimAccessPackage,
        EsimAccessProfile, OrderPackage,
    },
};
use thiserror::Error;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::{
    event_dispatcher::EventDispatcher, retry_policy::RetryPolicy,
    subscription_discounts::SubscriptionDiscounts,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EsimProvider: Send + Sync {
    async fn create_order(
        &self,
        transaction_id: &str,
        packages: Vec<OrderPackage>,
    ) -> Result<EsimAccessOrderObj, EsimAccessError>;

    async fn query_order(&self, order_no: &str) -> Result<EsimAccessOrderObj, EsimAccessError>;
}

#[async_trait]
impl EsimProvider for EsimAccessClient {
    async fn create_order(
        &self,
        transaction_id: &str,
        packages: Vec<OrderPackage>,
    ) -> Result<EsimAccessOrderObj, EsimAccessError> {
        EsimAccessClient::create_order(self, transaction_id, &packages).await
    }

    async fn query_order(&self, order_no: &str) -> Result<EsimAccessOrderObj, EsimAccessError> {
        EsimAccessClient::query_order(self, order_no).await
    }
}

#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("invalid purchase request")]
    Validation(Vec<FieldError>),
    #[error("eSIM provisioning failed")]
    Provider { status: Option<u16> },
    #[error("order not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl PurchaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PurchaseError::Validation(_) => StatusCode::BAD_REQUEST,
            PurchaseError::Provider { status } => status
                .filter(|status| (400..=599).contains(status))
                .and_then(|status| StatusCode::from_u16(status).ok())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            PurchaseError::NotFound => StatusCode::NOT_FOUND,
            PurchaseError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, PurchaseError>;

#[derive(Debug, Clone, Copy)]
pub struct PurchaseSettings {
    pub idempotency_window: Duration,
    pub retry_policy: RetryPolicy,
}

pub struct EsimPurchaseUseCase<O, S, P>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    order_repo: Arc<O>,
    provider: Arc<P>,
    fulfillment: Arc<OrderFulfillment<O, S, P>>,
    idempotency_window: Duration,
}

/// Everything that happens after the provider accepted an order.
struct OrderFulfillment<O, S, P>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    order_repo: Arc<O>,
    discounts: SubscriptionDiscounts<S>,
    provider: Arc<P>,
    events: EventDispatcher,
    retry_policy: RetryPolicy,
}

struct ProvisionedOrder {
    user_id: Uuid,
    order_no: String,
    transaction_id: String,
    package_code: String,
    quantity: i32,
    created: EsimAccessOrderObj,
}

impl<O, S, P> EsimPurchaseUseCase<O, S, P>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    pub fn new(
        order_repo: Arc<O>,
        subscription_repo: Arc<S>,
        provider: Arc<P>,
        events: EventDispatcher,
        settings: PurchaseSettings,
    ) -> Self {
        let fulfillment = OrderFulfillment {
            order_repo: Arc::clone(&order_repo),
            discounts: SubscriptionDiscounts::new(subscription_repo),
            provider: Arc::clone(&provider),
            events,
            retry_policy: settings.retry_policy,
        };

        Self {
            order_repo,
            provider,
            fulfillment: Arc::new(fulfillment),
            idempotency_window: settings.idempotency_window,
        }
    }

    /// Once the provider has accepted the order this never fails: local persistence,
    /// discount bookkeeping and events are best effort from that point on. That tail
    /// runs on its own task, so it completes even when the request is dropped.
    pub async fn purchase(
        &self,
        user_id: Uuid,
        model: PurchaseEsimModel,
    ) -> UseCaseResult<EsimPurchaseObj> {
        let ValidatedPurchase {
            package_code,
            quantity,
        } = model.validate().map_err(|errors| {
            warn!(%user_id, ?errors, "esim_purchase: invalid request");
            PurchaseError::Validation(errors)
        })?;

        info!(
            %user_id,
            package_code = %package_code,
            quantity,
            "esim_purchase: purchase requested"
        );

        if let Some(recent) = self.find_recent_order(user_id, &package_code).await {
            info!(
                %user_id,
                order_no = %recent.order_no,
                package_code = %package_code,
                "esim_purchase: returning order created inside the idempotency window"
            );
            return Ok(EsimPurchaseObj::from(&recent));
        }

        let transaction_id = format!("{}-{}", user_id, Utc::now().timestamp_millis());
        let created = self
            .provider
            .create_order(
                &transaction_id,
                vec![OrderPackage {
                    package_code: package_code.clone(),
                    count: quantity,
                }],
            )
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    transaction_id = %transaction_id,
                    package_code = %package_code,
                    status = ?err.status(),
                    error = %err,
                    "esim_purchase: provider order creation failed"
                );
                PurchaseError::Provider {
                    status: err.status(),
                }
            })?;

        let order_no = match created
            .order_no
            .as_deref()
            .map(str::trim)
            .filter(|order_no| !order_no.is_empty())
        {
            Some(order_no) => order_no.to_string(),
            None => {
                error!(
                    %user_id,
                    transaction_id = %transaction_id,
                    package_code = %package_code,
                    "esim_purchase: provider response is missing orderNo"
                );
                return Err(PurchaseError::Provider { status: None });
            }
        };
        info!(
            %user_id,
            order_no = %order_no,
            transaction_id = %transaction_id,
            "esim_purchase: provider order created"
        );

        let fulfillment = Arc::clone(&self.fulfillment);
        let provisioned = ProvisionedOrder {
            user_id,
            order_no: order_no.clone(),
            transaction_id,
            package_code,
            quantity,
            created,
        };

        tokio::spawn(async move { fulfillment.complete(provisioned).await })
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    order_no = %order_no,
                    error = %err,
                    "esim_purchase: fulfillment task did not finish"
                );
                PurchaseError::Internal(anyhow::anyhow!("fulfillment task failed: {err}"))
            })
    }

    pub async fn get_order(
        &self,
        user_id: Uuid,
        order_no: String,
    ) -> UseCaseResult<EsimPurchaseObj> {
        let order = self
            .order_repo
            .find_by_order_no_for_user(user_id, order_no.clone())
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    order_no = %order_no,
                    db_error = ?err,
                    "esim_purchase: failed to load order"
                );
                PurchaseError::Internal(err)
            })?
            .ok_or_else(|| {
                info!(%user_id, order_no = %order_no, "esim_purchase: order not found for user");
                PurchaseError::NotFound
            })?;

        Ok(EsimPurchaseObj::from(&order))
    }

    async fn find_recent_order(
        &self,
        user_id: Uuid,
        package_code: &str,
    ) -> Option<EsimOrderEntity> {
        let since = Utc::now() - self.idempotency_window;
        match self
            .order_repo
            .find_recent(user_id, package_code.to_string(), since)
            .await
        {
            Ok(recent) => recent,
            Err(err) => {
                warn!(
                    %user_id,
                    package_code = %package_code,
                    db_error = ?err,
                    "esim_purchase: idempotency lookup failed; continuing without it"
                );
                None
            }
        }
    }
}

impl<O, S, P> OrderFulfillment<O, S, P>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    async fn complete(&self, provisioned: ProvisionedOrder) -> EsimPurchaseObj {
        let ProvisionedOrder {
            user_id,
            order_no,
            transaction_id,
            package_code,
            quantity,
            created,
        } = provisioned;

        let resolved = self.resolve_details(&order_no, created).await;
        let profile = resolved.allocated_profile().cloned();

        let order = build_order_entity(
            user_id,
            &order_no,
            &transaction_id,
            &package_code,
            quantity,
            &resolved,
            profile.as_ref(),
        );
        let status = order.status.clone();
        match self.order_repo.insert(order).await {
            Ok(order_id) => info!(
                %user_id,
                %order_id,
                order_no = %order_no,
                status = %status,
                "esim_purchase: order persisted"
            ),
            Err(err) => {
                // The provider already provisioned the eSIM; reconciliation happens via webhook.
                error!(
                    %user_id,
                    order_no = %order_no,
                    transaction_id = %transaction_id,
                    package_code = %package_code,
                    db_error = ?err,
                    "esim_purchase: failed to persist provisioned order"
                );
            }
        }

        let discount = self.discounts.apply(user_id, &order_no).await;

        self.events.try_dispatch(AppEvent::PurchaseCompleted {
            user_id,
            order_no: order_no.clone(),
            package_code: package_code.clone(),
            quantity,
            discount_percent: discount.as_ref().map(|decision| decision.percent),
        });

        EsimPurchaseObj {
            esim_list: profile_dtos(&resolved),
            package_list: package_dtos(&resolved, profile.as_ref(), &package_code),
            discount: discount.as_ref().map(DiscountDto::from),
            order_no,
        }
    }

    /// Returns the first response carrying an ICCID, or `created` when polling runs dry.
    async fn resolve_details(
        &self,
        order_no: &str,
        created: EsimAccessOrderObj,
    ) -> EsimAccessOrderObj {
        if created.allocated_profile().is_some() {
            debug!(order_no = %order_no, "esim_purchase: create response already carries an ICCID");
            return created;
        }

        let outcome = self
            .retry_policy
            .poll(|attempt| {
                let provider = Arc::clone(&self.provider);
                let order_no = order_no.to_string();
                async move {
                    match provider.query_order(&order_no).await {
                        Ok(obj) if obj.allocated_profile().is_some() => Some(obj),
                        Ok(_) => {
                            debug!(
                                order_no = %order_no,
                                attempt,
                                "esim_purchase: ICCID not allocated yet"
                            );
                            None
                        }
                        Err(err) => {
                            warn!(
                                order_no = %order_no,
                                attempt,
                                status = ?err.status(),
                                error = %err,
                                "esim_purchase: order query failed"
                            );
                            None
                        }
                    }
                }
            })
            .await;

        match outcome.value {
            Some(resolved) => {
                info!(
                    order_no = %order_no,
                    attempts = outcome.attempts,
                    "esim_purchase: activation details resolved"
                );
                resolved
            }
            None => {
                warn!(
                    order_no = %order_no,
                    attempts = outcome.attempts,
                    "esim_purchase: no ICCID after polling; storing as pending"
                );
                created
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn packages_of<'a>(
    resolved: &'a EsimAccessOrderObj,
    profile: Option<&'a EsimAccessProfile>,
) -> &'a [EsimAccessPackage] {
    if !resolved.package_list.is_empty() {
        &resolved.package_list
    } else {
        profile.map(|profile| profile.package_list.as_slice()).unwrap_or_default()
    }
}

fn build_order_entity(
    user_id: Uuid,
    order_no: &str,
    transaction_id: &str,
    package_code: &str,
    quantity: i32,
    resolved: &EsimAccessOrderObj,
    profile: Option<&EsimAccessProfile>,
) -> InsertEsimOrderEntity {
    let now = Utc::now();
    let first_package = packages_of(resolved, profile).first();

    let status = match profile {
        Some(profile) => non_empty(&profile.esim_status)
            .unwrap_or_else(|| EsimOrderStatus::GotResource.to_string()),
        None => EsimOrderStatus::Pending.to_string(),
    };

    InsertEsimOrderEntity {
        user_id,
        order_no: order_no.to_string(),
        transaction_id: transaction_id.to_string(),
        package_code: package_code.to_string(),
        quantity,
        iccid: profile.and_then(|profile| non_empty(&profile.iccid)),
        lpa_code: profile.and_then(|profile| non_empty(&profile.ac)),
        qr_code_url: profile.and_then(|profile| non_empty(&profile.qr_code_url)),
        smdp_status: profile.and_then(|profile| non_empty(&profile.smdp_status)),
        esim_status: profile.and_then(|profile| non_empty(&profile.esim_status)),
        status,
        total_volume: profile
            .and_then(|profile| profile.total_volume)
            .or_else(|| first_package.and_then(|package| package.total_volume)),
        expired_time: profile
            .and_then(|profile| profile.expired_time.as_deref())
            .or_else(|| first_package.and_then(|package| package.expired_time.as_deref()))
            .and_then(parse_provider_timestamp),
        created_at: now,
        updated_at: now,
    }
}

fn profile_dtos(resolved: &EsimAccessOrderObj) -> Vec<EsimProfileDto> {
    resolved
        .esim_list
        .iter()
        .filter(|profile| non_empty(&profile.iccid).is_some())
        .map(|profile| EsimProfileDto {
            iccid: non_empty(&profile.iccid),
            ac: non_empty(&profile.ac),
            qr_code_url: non_empty(&profile.qr_code_url),
            smdp_status: non_empty(&profile.smdp_status),
        })
        .collect()
}

fn package_dtos(
    resolved: &EsimAccessOrderObj,
    profile: Option<&EsimAccessProfile>,
    package_code: &str,
) -> Vec<PackageDto> {
    let packages = packages_of(resolved, profile);
    if packages.is_empty() {
        return vec![PackageDto {
            package_code: package_code.to_string(),
            package_name: None,
            total_volume: profile.and_then(|profile| profile.total_volume),
            expired_time: profile.and_then(|profile| non_empty(&profile.expired_time)),
        }];
    }

    packages
        .iter()
        .map(|package| PackageDto {
            package_code: non_empty(&package.package_code)
                .unwrap_or_else(|| package_code.to_string()),
            package_name: non_empty(&package.package_name),
            total_volume: package
                .total_volume
                .or_else(|| profile.and_then(|profile| profile.total_volume)),
            expired_time: non_empty(&package.expired_time)
                .or_else(|| profile.and_then(|profile| non_empty(&profile.expired_time))),
        })
        .collect()
}
