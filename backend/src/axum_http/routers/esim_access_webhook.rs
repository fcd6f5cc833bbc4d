use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{RawQuery, State},
    http::{
        HeaderMap,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    routing::post,
};
use crates::domain::{
    repositories::esim_orders::EsimOrderRepository,
    value_objects::esim_access_webhook::parse_notification,
};
use serde::Serialize;
use tracing::warn;

use crate::{
    axum_http::error_responses::AppError,
    usecases::esim_access_webhook::{EsimAccessWebhookUseCase, WebhookError},
};

const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

pub fn routes<O>(usecase: Arc<EsimAccessWebhookUseCase<O>>) -> Router
where
    O: EsimOrderRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/esim-access", post(esim_access_notification::<O>))
        .with_state(usecase)
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
    pub received: String,
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        match err {
            WebhookError::Unauthorized => AppError::Unauthorized,
            WebhookError::InvalidPayload(err) => AppError::BadRequest(err.to_string()),
            WebhookError::Internal(err) => AppError::Internal(err),
        }
    }
}

/// Body is taken raw because eSIM Access sends JSON or form encoding under varying
/// content types, sometimes with the payload only in the query string.
pub async fn esim_access_notification<O>(
    State(usecase): State<Arc<EsimAccessWebhookUseCase<O>>>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: Bytes,
) -> Result<Json<WebhookAck>, AppError>
where
    O: EsimOrderRepository + Send + Sync + 'static,
{
    usecase.authorize(presented_secret(&headers))?;

    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let notification =
        parse_notification(content_type, &body, query.as_deref()).map_err(|err| {
            warn!(
                error = %err,
                content_type = ?content_type,
                body_len = body.len(),
                "esim_webhook: rejected malformed notification"
            );
            WebhookError::InvalidPayload(err)
        })?;

    let outcome = usecase.handle(notification).await?;

    Ok(Json(WebhookAck {
        success: true,
        received: outcome.received,
    }))
}

fn presented_secret(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|auth| auth.strip_prefix("Bearer "))
        })
        .map(str::trim)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::stage::Stage,
        usecases::{
            event_dispatcher::EventDispatcher,
            test_support::{InMemoryEsimOrders, pending_order},
        },
    };

    const SECRET: &str = "whsec_esim_test";
    const DATA_USAGE: &str =
        r#"{"notifyType":"DATA_USAGE","content":{"orderNo":"ORD123","remain":50000000}}"#;

    fn app(orders: Arc<InMemoryEsimOrders>, secret: Option<&str>, stage: Stage) -> Router {
        let usecase = EsimAccessWebhookUseCase::new(
            orders,
            EventDispatcher::new(Vec::new()),
            secret.map(str::to_string),
            stage,
        );
        routes(Arc::new(usecase))
    }

    fn seeded() -> Arc<InMemoryEsimOrders> {
        let orders = Arc::new(InMemoryEsimOrders::new());
        orders.seed(pending_order(Uuid::new_v4(), "ORD123", "esim_ae_7d_5gb"));
        orders
    }

    fn json_request(headers: &[(&str, &str)], body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/esim-access")
            .header("content-type", "application/json");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_secret_is_rejected_when_configured() {
        let orders = seeded();
        let response = app(Arc::clone(&orders), Some(SECRET), Stage::Local)
            .oneshot(json_request(&[], DATA_USAGE))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(orders.rows()[0].status, "PENDING");
    }

    #[tokio::test]
    async fn secret_header_and_bearer_are_both_accepted() {
        let orders = seeded();

        let response = app(Arc::clone(&orders), Some(SECRET), Stage::Production)
            .oneshot(json_request(&[("x-webhook-secret", SECRET)], DATA_USAGE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json_body(response).await,
            json!({ "success": true, "received": "DATA_USAGE" })
        );
        assert_eq!(orders.rows()[0].status, "LOW_DATA");

        let bearer = format!("Bearer {SECRET}");
        let response = app(Arc::clone(&orders), Some(SECRET), Stage::Production)
            .oneshot(json_request(
                &[("authorization", bearer.as_str())],
                r#"{"notifyType":"ORDER_STATUS","content":{"orderNo":"ORD123"}}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(orders.rows()[0].status, "GOT_RESOURCE");
    }

    #[tokio::test]
    async fn unconfigured_secret_depends_on_stage() {
        let response = app(seeded(), None, Stage::Development)
            .oneshot(json_request(&[], DATA_USAGE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(seeded(), None, Stage::Production)
            .oneshot(json_request(&[("x-webhook-secret", "guess")], DATA_USAGE))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn form_encoded_notification_is_applied() {
        let orders = seeded();
        let request = Request::builder()
            .method("POST")
            .uri("/esim-access")
            .header("content-type", "application/x-www-form-urlencoded")
            .header("x-webhook-secret", SECRET)
            .body(Body::from(
                "notifyType=ESIM_STATUS&content[orderNo]=ORD123&content[esimStatus]=IN_USE",
            ))
            .unwrap();

        let response = app(Arc::clone(&orders), Some(SECRET), Stage::Local)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let row = &orders.rows()[0];
        assert_eq!(row.status, "IN_USE");
        assert_eq!(row.esim_status.as_deref(), Some("IN_USE"));
    }

    #[tokio::test]
    async fn query_string_notification_is_applied() {
        let orders = seeded();
        let request = Request::builder()
            .method("POST")
            .uri("/esim-access?notifyType=ORDER_STATUS&content%5BorderNo%5D=ORD123&content%5BorderStatus%5D=GOT_RESOURCE")
            .body(Body::empty())
            .unwrap();

        let response = app(Arc::clone(&orders), None, Stage::Local)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(orders.rows()[0].status, "GOT_RESOURCE");
    }

    #[tokio::test]
    async fn missing_identifiers_are_bad_requests() {
        for body in [
            r#"{"content":{"orderNo":"ORD123"}}"#,
            r#"{"notifyType":"DATA_USAGE","content":{}}"#,
            "{not json",
        ] {
            let response = app(seeded(), None, Stage::Local)
                .oneshot(json_request(&[], body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn unknown_order_is_still_acknowledged() {
        let orders = seeded();
        let before = orders.rows();

        let response = app(Arc::clone(&orders), None, Stage::Local)
            .oneshot(json_request(
                &[],
                r#"{"notifyType":"DATA_USAGE","content":{"orderNo":"ORD404","remain":1}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(orders.rows(), before);
    }

    #[tokio::test]
    async fn unknown_notify_type_is_acknowledged() {
        let response = app(seeded(), None, Stage::Local)
            .oneshot(json_request(
                &[],
                r#"{"notifyType":"CHECK_HEALTH","content":{"orderNo":"ORD123"}}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["received"], json!("CHECK_HEALTH"));
    }
}
