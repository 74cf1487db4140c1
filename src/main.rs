//! Marketplace Core server.
//!
//! `marketplace-core` serves the HTTP API; `marketplace-core maintenance`
//! runs the scheduled sweeps once and exits, for use from cron.

use std::error::Error;
use std::sync::Arc;

use axum::http::HeaderValue;
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use marketplace_core::adapters::encryption::{EncryptingContactRepository, FieldCipher};
use marketplace_core::adapters::gateways::{
    CinetPayConfig, CinetPayGateway, MockGateway, NotchPayConfig, NotchPayGateway,
};
use marketplace_core::adapters::http::{api_router, AppState};
use marketplace_core::adapters::notifications::{
    RecordingNotificationSender, ResendConfig, ResendEmailSender,
};
use marketplace_core::adapters::postgres::{
    PostgresContactRepository, PostgresPaymentRepository, PostgresProviderDirectory,
    PostgresSubscriptionRepository, PostgresUnlockedContactRepository,
};
use marketplace_core::application::{Repositories, ServiceSettings, Services};
use marketplace_core::config::{AppConfig, PaymentConfig, ServerConfig};
use marketplace_core::domain::payment::GatewayKind;
use marketplace_core::ports::{GatewayRegistry, NotificationSender};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    config.validate()?;

    init_tracing(&config.server)?;

    let pool = connect(&config).await?;
    let services = build_services(&config, pool)?;

    match std::env::args().nth(1).as_deref() {
        Some("maintenance") => {
            let report = services.maintenance.run_all().await?;
            tracing::info!(
                expired_subscriptions = report.expired_subscriptions,
                expired_payments = report.expired_payments,
                reminders_sent = report.reminders.sent,
                reminders_failed = report.reminders.failed,
                "Maintenance run complete"
            );
            Ok(())
        }
        Some(other) => Err(format!("unknown command '{}'", other).into()),
        None => serve(&config.server, &services).await,
    }
}

fn init_tracing(server: &ServerConfig) -> Result<(), BoxError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&server.log_level)?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if server.is_production() {
        builder.json().try_init()?;
    } else {
        builder.compact().try_init()?;
    }
    Ok(())
}

async fn connect(config: &AppConfig) -> Result<PgPool, BoxError> {
    let database = &config.database;
    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .connect(&database.url)
        .await?;

    if database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }
    Ok(pool)
}

fn build_services(config: &AppConfig, pool: PgPool) -> Result<Services, BoxError> {
    let index_key = config.encryption.index_key.clone().map(SecretString::new);
    let cipher = Arc::new(FieldCipher::from_hex(
        &SecretString::new(config.encryption.key.clone()),
        index_key.as_ref(),
    )?);

    let repositories = Repositories {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
        contacts: Arc::new(EncryptingContactRepository::new(
            Arc::new(PostgresContactRepository::new(pool.clone())),
            cipher.clone(),
        )),
        unlocks: Arc::new(PostgresUnlockedContactRepository::new(pool.clone())),
        directory: Arc::new(PostgresProviderDirectory::new(pool, cipher)),
    };

    let settings = ServiceSettings {
        currency: config.payment.currency.clone(),
        contact_unlock_price: config.payment.contact_unlock_price,
        pending_expiry_minutes: config.payment.pending_expiry_minutes,
    };

    Ok(Services::wire(
        repositories,
        build_gateways(&config.payment)?,
        build_notifier(config)?,
        settings,
    ))
}

fn build_gateways(payment: &PaymentConfig) -> Result<GatewayRegistry, BoxError> {
    let mut registry = GatewayRegistry::new(payment.default_gateway);

    if payment.use_mock_gateway {
        tracing::warn!("Using the mock payment gateway; no real charges are made");
        return Ok(registry
            .with(Arc::new(MockGateway::new(GatewayKind::CinetPay)))
            .with(Arc::new(MockGateway::new(GatewayKind::NotchPay))));
    }

    if let Some(settings) = &payment.cinetpay {
        let mut gateway_config = CinetPayConfig::new(
            SecretString::new(settings.api_key.clone()),
            settings.site_id.clone(),
            SecretString::new(settings.secret_key.clone()),
        )
        .with_urls(settings.notify_url.clone(), settings.return_url.clone())
        .with_timeout(payment.request_timeout());
        if let Some(base_url) = &settings.base_url {
            gateway_config = gateway_config.with_base_url(base_url.clone());
        }
        registry = registry.with(Arc::new(CinetPayGateway::new(gateway_config)?));
    }

    if let Some(settings) = &payment.notchpay {
        let mut gateway_config = NotchPayConfig::new(
            SecretString::new(settings.public_key.clone()),
            SecretString::new(settings.hash_key.clone()),
        )
        .with_timeout(payment.request_timeout());
        if let Some(base_url) = &settings.base_url {
            gateway_config = gateway_config.with_base_url(base_url.clone());
        }
        if let Some(callback_url) = &settings.callback_url {
            gateway_config = gateway_config.with_callback_url(callback_url.clone());
        }
        registry = registry.with(Arc::new(NotchPayGateway::new(gateway_config)?));
    }

    Ok(registry)
}

fn build_notifier(config: &AppConfig) -> Result<Arc<dyn NotificationSender>, BoxError> {
    match &config.email.resend_api_key {
        Some(api_key) => {
            let sender = ResendEmailSender::new(ResendConfig::new(
                SecretString::new(api_key.clone()),
                config.email.from_header(),
            ))?;
            Ok(Arc::new(sender))
        }
        None => {
            tracing::warn!("No Resend API key configured; emails are recorded, not sent");
            Ok(Arc::new(RecordingNotificationSender::new()))
        }
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn serve(server: &ServerConfig, services: &Services) -> Result<(), BoxError> {
    let app = api_router(AppState::from(services))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(cors_layer(server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, environment = ?server.environment, "Marketplace core listening");

    axum::serve(listener, app).await?;
    Ok(())
}
