use actix_web::{middleware, web, App, HttpServer};
use broadcast_service::db::{PgRecordingStore, PgSessionStore, PgWebhookAuditLog};
use broadcast_service::services::provider::HttpStreamingProvider;
use broadcast_service::services::recordings::start_stuck_recording_sweeper;
use broadcast_service::services::streaming::RedisViewerCounter;
use broadcast_service::services::{RecordingCoordinator, SessionManager, WebhookProcessor};
use broadcast_service::{handlers, metrics, AppState, Config};
use sqlx::postgres::PgPoolOptions;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = Config::from_env().map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("configuration error: {e}"))
    })?;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,actix_web=info".into());
    if config.app.json_logs {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!("Starting broadcast service");

    let db_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            io::Error::new(io::ErrorKind::Other, "Database connection failed")
        })?;
    tracing::info!("Successfully connected to database");

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("migration failed: {e}")))?;

    let redis_client = redis::Client::open(config.redis.url.as_str())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to Redis");
            io::Error::new(io::ErrorKind::Other, "Redis connection failed")
        })?;

    let provider = Arc::new(
        HttpStreamingProvider::new(config.provider.clone())
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?,
    );

    let recording_store = Arc::new(PgRecordingStore::new(db_pool.clone()));
    let session_store = Arc::new(PgSessionStore::new(db_pool.clone()));
    let audit_log = Arc::new(PgWebhookAuditLog::new(db_pool));
    let counters = Arc::new(RedisViewerCounter::new(redis_conn));

    let recordings = Arc::new(RecordingCoordinator::new(
        recording_store,
        provider.clone(),
        config.provider.clone(),
        config.policy.clone(),
    ));
    let sessions = Arc::new(SessionManager::new(
        session_store,
        counters,
        provider,
        recordings.clone(),
        config.provider.clone(),
        config.policy.clone(),
    ));
    let webhooks = Arc::new(WebhookProcessor::new(
        recordings.clone(),
        sessions.clone(),
        audit_log,
    ));

    match config.policy.stuck_recording_timeout_secs {
        Some(timeout_secs) => {
            tokio::spawn(start_stuck_recording_sweeper(
                recordings.clone(),
                Duration::from_secs(config.policy.sweep_interval_secs),
                timeout_secs,
            ));
        }
        None => tracing::info!("Stuck recording sweep disabled"),
    }

    let state = AppState {
        sessions,
        recordings,
        webhooks,
        webhook_secret: config.provider.webhook_secret.clone(),
    };

    let addr = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server on {}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(metrics::MetricsMiddleware)
            .configure(handlers::configure_routes)
    })
    .bind(&addr)?
    .run()
    .await
}
