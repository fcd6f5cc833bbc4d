use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
    routing::{get, post},
};
use crates::domain::{
    repositories::{esim_orders::EsimOrderRepository, subscriptions::SubscriptionRepository},
    value_objects::esim_purchase::{EsimPurchaseResponse, PurchaseEsimModel},
};
use tracing::warn;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::esim_purchase::{EsimProvider, EsimPurchaseUseCase, PurchaseError},
};

// Run example
//   curl -X POST "http://localhost:$SERVER_PORT_BACKEND/api/v1/esim/purchase" \
//     -H "Authorization: Bearer $SUPABASE_ACCESS_TOKEN" \
//     -H "Content-Type: application/json" \
//     -d '{"packageCode":"esim_ae_7d_5gb","quantity":1}'

pub fn routes<O, S, P>(usecase: Arc<EsimPurchaseUseCase<O, S, P>>) -> Router
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    Router::new()
        .route("/purchase", post(purchase::<O, S, P>))
        .route("/orders/:order_no", get(get_order::<O, S, P>))
        .with_state(usecase)
}

impl From<PurchaseError> for AppError {
    fn from(err: PurchaseError) -> Self {
        let status = err.status_code();
        match err {
            PurchaseError::Validation(errors) => AppError::Validation(errors),
            PurchaseError::Provider { .. } => AppError::Upstream {
                status,
                message: "Failed to provision eSIM".to_string(),
            },
            PurchaseError::NotFound => AppError::NotFound("Order not found".to_string()),
            PurchaseError::Internal(err) => AppError::Internal(err),
        }
    }
}

pub async fn purchase<O, S, P>(
    State(usecase): State<Arc<EsimPurchaseUseCase<O, S, P>>>,
    auth: AuthUser,
    payload: Result<Json<PurchaseEsimModel>, JsonRejection>,
) -> Result<impl IntoResponse, AppError>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    let Json(model) = payload.map_err(|rejection| {
        warn!(
            user_id = %auth.user_id,
            error = %rejection,
            "esim_purchase: unreadable request body"
        );
        AppError::BadRequest(rejection.body_text())
    })?;

    let obj = usecase.purchase(auth.user_id, model).await?;
    Ok(Json(EsimPurchaseResponse::from(obj)))
}

pub async fn get_order<O, S, P>(
    State(usecase): State<Arc<EsimPurchaseUseCase<O, S, P>>>,
    auth: AuthUser,
    Path(order_no): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    let obj = usecase.get_order(auth.user_id, order_no).await?;
    Ok(Json(EsimPurchaseResponse::from(obj)))
}
