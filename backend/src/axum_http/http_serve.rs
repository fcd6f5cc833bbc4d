use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::{
    Extension, Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE, HeaderName},
    },
    routing::get,
};
use crates::{
    domain::repositories::{
        app_events::AppEventSink, esim_orders::EsimOrderRepository,
        subscriptions::SubscriptionRepository,
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            esim_orders::EsimOrderPostgres, subscriptions::SubscriptionPostgres,
            user_events::UserEventPostgres,
        },
    },
    providers::esim_access::{EsimAccessClient, EsimAccessConfig},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::{
    auth::AuthConfig,
    axum_http::{default_routers, routers},
    config::config_model::{BackendServer, DotEnvyConfig},
    usecases::{
        esim_access_webhook::EsimAccessWebhookUseCase,
        esim_purchase::{EsimProvider, EsimPurchaseUseCase, PurchaseSettings},
        event_dispatcher::EventDispatcher,
        retry_policy::RetryPolicy,
    },
};

pub async fn start(config: Arc<DotEnvyConfig>, db_pool: Arc<PgPoolSquad>) -> Result<()> {
    let order_repository = Arc::new(EsimOrderPostgres::new(Arc::clone(&db_pool)));
    let subscription_repository = Arc::new(SubscriptionPostgres::new(Arc::clone(&db_pool)));
    let event_sinks: Vec<Arc<dyn AppEventSink + Send + Sync>> =
        vec![Arc::new(UserEventPostgres::new(Arc::clone(&db_pool)))];
    let events = EventDispatcher::new(event_sinks);

    let esim_access_client = EsimAccessClient::new(EsimAccessConfig {
        base_url: config.esim_access.base_url.clone(),
        access_code: config.esim_access.access_code.clone(),
        secret_key: config.esim_access.secret_key.clone(),
        timeout: config.esim_access.timeout,
    })
    .context("failed to build eSIM Access client")?;

    let purchase_settings = PurchaseSettings {
        idempotency_window: chrono::Duration::from_std(config.purchase.idempotency_window)
            .context("PURCHASE_IDEMPOTENCY_WINDOW_SECS is out of range")?,
        retry_policy: RetryPolicy::new(
            config.purchase.poll_max_attempts,
            config.purchase.poll_base_delay,
        ),
    };
    let purchase_usecase = EsimPurchaseUseCase::new(
        Arc::clone(&order_repository),
        subscription_repository,
        Arc::new(esim_access_client),
        events.clone(),
        purchase_settings,
    );

    if config.esim_webhook.secret.is_none() {
        warn!(
            stage = %config.stage,
            "ESIM_WEBHOOK_SECRET is not set; webhook is {}",
            if config.stage.is_production() {
                "refusing every request"
            } else {
                "accepting unauthenticated requests"
            }
        );
    }
    let webhook_usecase = EsimAccessWebhookUseCase::new(
        order_repository,
        events,
        config.esim_webhook.secret.clone(),
        config.stage,
    );

    let app = build_router(
        Arc::new(purchase_usecase),
        Arc::new(webhook_usecase),
        AuthConfig::new(config.supabase.jwt_secret.clone()),
        &config.backend_server,
    )?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(stage = %config.stage, "Server is running on port {}", config.backend_server.port);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// `/api/v1/esim` is not under `TimeoutLayer`; purchase latency is bounded by the
/// provider client timeout and the polling retry policy instead.
pub fn build_router<O, S, P>(
    purchase_usecase: Arc<EsimPurchaseUseCase<O, S, P>>,
    webhook_usecase: Arc<EsimAccessWebhookUseCase<O>>,
    auth_config: AuthConfig,
    server: &BackendServer,
) -> Result<Router>
where
    O: EsimOrderRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    P: EsimProvider + 'static,
{
    let timed = Router::new()
        .nest(
            "/api/v1/webhooks",
            routers::esim_access_webhook::routes(webhook_usecase),
        )
        .route("/api/v1/health-check", get(default_routers::health_check))
        .layer(TimeoutLayer::new(Duration::from_secs(server.timeout)));

    let app = Router::new()
        .nest(
            "/api/v1/esim",
            routers::esim_purchase::routes(purchase_usecase),
        )
        .merge(timed)
        .fallback(default_routers::not_found)
        .layer(Extension(auth_config))
        .layer(RequestBodyLimitLayer::new(
            (server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static("x-webhook-secret"),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    Ok(app)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use crates::{
        domain::repositories::subscriptions::MockSubscriptionRepository,
        providers::esim_access::EsimAccessOrderObj,
    };
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::SupabaseClaims,
        config::stage::Stage,
        usecases::{esim_purchase::MockEsimProvider, test_support::InMemoryEsimOrders},
    };

    const JWT_SECRET: &str = "http-serve-test-secret";

    fn server(timeout: u64) -> BackendServer {
        BackendServer {
            port: 0,
            body_limit: 1,
            timeout,
        }
    }

    fn pending_provider(order_no: &'static str) -> MockEsimProvider {
        let mut provider = MockEsimProvider::new();
        provider.expect_create_order().returning(move |_, _| {
            Ok(EsimAccessOrderObj {
                order_no: Some(order_no.to_string()),
                ..Default::default()
            })
        });
        provider.expect_query_order().returning(move |_| {
            Ok(EsimAccessOrderObj {
                order_no: Some(order_no.to_string()),
                ..Default::default()
            })
        });
        provider
    }

    fn app(orders: Arc<InMemoryEsimOrders>, provider: MockEsimProvider, timeout: u64) -> Router {
        let mut subscriptions = MockSubscriptionRepository::new();
        subscriptions
            .expect_find_active_for_user()
            .returning(|_| Ok(None));
        let events = EventDispatcher::new(Vec::new());

        let purchase = EsimPurchaseUseCase::new(
            Arc::clone(&orders),
            Arc::new(subscriptions),
            Arc::new(provider),
            events.clone(),
            PurchaseSettings {
                idempotency_window: chrono::Duration::seconds(30),
                retry_policy: RetryPolicy::new(3, Duration::from_secs(1)),
            },
        );
        let webhook = EsimAccessWebhookUseCase::new(orders, events, None, Stage::Local);

        build_router(
            Arc::new(purchase),
            Arc::new(webhook),
            AuthConfig::new(JWT_SECRET),
            &server(timeout),
        )
        .unwrap()
    }

    fn bearer() -> String {
        let claims = SupabaseClaims {
            sub: Uuid::new_v4().to_string(),
            role: "authenticated".to_string(),
            email: None,
            aud: Some("authenticated".to_string()),
            exp: 9999999999,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test(start_paused = true)]
    async fn slow_purchase_outlives_the_server_timeout() {
        let orders = Arc::new(InMemoryEsimOrders::new());
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/esim/purchase")
            .header("content-type", "application/json")
            .header("authorization", bearer())
            .body(Body::from(json!({ "packageCode": "esim_ae_7d_5gb" }).to_string()))
            .unwrap();

        let response = app(Arc::clone(&orders), pending_provider("ORD123"), 5)
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["obj"]["orderNo"], json!("ORD123"));

        let rows = orders.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, "PENDING");
    }

    #[tokio::test]
    async fn health_check_and_fallback_are_routed() {
        let orders = Arc::new(InMemoryEsimOrders::new());

        let response = app(Arc::clone(&orders), MockEsimProvider::new(), 5)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/health-check")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app(orders, MockEsimProvider::new(), 5)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/unknown")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
