/// Orders Service
///
/// Accepts create-order and update-order-status commands over HTTP, persists
/// the Order aggregate, runs the outbox drainer (C3) and fan-out relay (C8)
/// as background tasks, consumes `users.status-changed` from the Users
/// service (C5) to drive the inactivation reaction (C6), and periodically
/// expires orders past their deadline (C7).
use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::Utc;
use db_pool::{create_pool, DbConfig};
use idempotent_consumer::IdempotencyGuard;
use rdkafka::producer::FutureProducer;
use rdkafka::ClientConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use transactional_outbox::{
    KafkaOutboxPublisher, OutboxProcessor, OutboxProcessorConfig, RelayRecord, SqlxOutboxRepository,
};

use orders_service::consumers::StatusConsumer;
use orders_service::db::SqlxOrderRepository;
use orders_service::jobs::run_expiry_scanner;
use orders_service::reactions::UserInactivatedReaction;
use orders_service::services::{OrderService, PeerUserClient};
use orders_service::{handlers, relay, Config};

/// Retention for idempotency keys recorded by the C6 reaction handler.
const PROCESSED_EVENTS_RETENTION: Duration = Duration::from_secs(7 * 24 * 60 * 60);

struct HealthState {
    db_pool: sqlx::PgPool,
}

#[derive(Serialize, Clone)]
#[serde(rename_all = "lowercase")]
enum ComponentStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize)]
struct ComponentCheck {
    status: ComponentStatus,
    message: String,
    latency_ms: u64,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

impl HealthState {
    async fn check_postgres(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_one(&self.db_pool).await.map(|_| ())
    }
}

async fn health_summary() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"status": "ok", "service": "orders-service"}))
}

async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let start = Instant::now();
    let pg_result = state.check_postgres().await;
    let latency_ms = start.elapsed().as_millis() as u64;

    let (status, message, ready) = match pg_result {
        Ok(_) => (ComponentStatus::Healthy, "PostgreSQL connection successful".to_string(), true),
        Err(e) => (ComponentStatus::Unhealthy, format!("PostgreSQL connection failed: {}", e), false),
    };

    let mut checks = HashMap::new();
    checks.insert("postgresql".to_string(), ComponentCheck { status, message, latency_ms });

    let response = ReadinessResponse {
        ready,
        checks,
        timestamp: Utc::now().to_rfc3339(),
    };

    if ready {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

async fn liveness_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({"alive": true}))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting orders-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let mut db_cfg = DbConfig::for_service("orders-service");
    db_cfg.database_url = config.database.url.clone();
    db_cfg.max_connections = config.database.max_connections;
    db_cfg.log_config();

    let db_pool = match create_pool(db_cfg).await {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("Database pool creation failed: {}", e);
            eprintln!("ERROR: Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("migration failed: {e}")))?;
    tracing::info!("Database migrations completed");

    let producer: FutureProducer = ClientConfig::new()
        .set("bootstrap.servers", &config.kafka.brokers)
        .set("enable.idempotence", "true")
        .set("acks", "all")
        .create()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("failed to create Kafka producer: {e}")))?;

    let order_repo = Arc::new(SqlxOrderRepository::new(db_pool.clone()));
    let outbox_repo = Arc::new(SqlxOutboxRepository::new(db_pool.clone()));
    let outbox_publisher = Arc::new(KafkaOutboxPublisher::new(
        producer,
        config.kafka.dead_letter_topic.clone(),
    ));

    let (relay_tx, _) = broadcast::channel::<RelayRecord>(1024);

    let outbox_processor_config = OutboxProcessorConfig {
        batch_size: config.outbox.batch_size,
        poll_interval: Duration::from_millis(config.outbox.poll_interval_ms),
        lock_duration: Duration::from_secs(config.outbox.lock_duration_secs),
        max_retries: config.outbox.max_retries,
    };
    let outbox_processor = OutboxProcessor::new(outbox_repo.clone(), outbox_publisher, outbox_processor_config)
        .with_metrics(transactional_outbox::metrics::OutboxMetrics::new("orders-service"))
        .with_relay(relay_tx.clone());

    let peer_client = Arc::new(PeerUserClient::new(config.peer.users_service_base_url.clone()));
    let order_service = web::Data::new(OrderService::new(
        db_pool.clone(),
        order_repo.clone(),
        outbox_repo.clone(),
        peer_client,
        config.expiry.order_expiry_default_minutes,
    ));

    let idempotency_guard = Arc::new(IdempotencyGuard::new(db_pool.clone(), PROCESSED_EVENTS_RETENTION));
    let reaction = UserInactivatedReaction::new(
        db_pool.clone(),
        order_repo.clone(),
        outbox_repo.clone(),
        idempotency_guard,
    );

    let status_consumer = match StatusConsumer::new(&config.kafka, reaction) {
        Ok(consumer) => consumer,
        Err(e) => {
            tracing::error!("Failed to create Kafka status consumer: {}", e);
            eprintln!("ERROR: Failed to create Kafka status consumer: {}", e);
            std::process::exit(1);
        }
    };
    status_consumer.ensure_topics_ready(&config.kafka.brokers).await;

    let health_state = web::Data::new(HealthState { db_pool: db_pool.clone() });
    let db_pool_data = web::Data::new(db_pool.clone());
    let relay_data = web::Data::new(relay_tx.clone());

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(db_pool_data.clone())
            .app_data(health_state.clone())
            .app_data(relay_data.clone())
            .app_data(order_service.clone())
            .wrap(cors)
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/metrics", web::get().to(serve_metrics))
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .route("/ws", web::get().to(relay::ws_relay))
            .service(
                web::scope("/api/orders")
                    .route("", web::post().to(handlers::create_order))
                    .route("/{id}", web::get().to(handlers::get_order))
                    .route("/{id}/status", web::patch().to(handlers::update_order_status)),
            )
            .service(
                web::scope("/api/outbox")
                    .route("/unsent", web::get().to(handlers::unsent))
                    .route("/mark-sent/{id}", web::post().to(handlers::mark_sent))
                    .route("/increment-retry/{id}", web::post().to(handlers::increment_retry)),
            )
    })
    .bind(&bind_address)?
    .run();

    let server_handle = server.handle();
    let (shutdown_tx, _) = broadcast::channel(1);

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    let drainer_shutdown = shutdown_tx.subscribe();
    tasks.spawn(async move {
        outbox_processor.run(drainer_shutdown).await;
        Ok(())
    });

    let consumer_shutdown = shutdown_tx.subscribe();
    tasks.spawn(async move {
        status_consumer.run(consumer_shutdown).await;
        Ok(())
    });

    let scanner_shutdown = shutdown_tx.subscribe();
    let scanner_orders = order_repo.clone();
    let scanner_outbox = outbox_repo.clone();
    let scanner_config = config.expiry.clone();
    let scanner_pool = db_pool.clone();
    tasks.spawn(async move {
        run_expiry_scanner(scanner_pool, scanner_orders, scanner_outbox, scanner_config, scanner_shutdown).await;
        Ok(())
    });

    let mut first_error: Option<io::Error> = None;
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => tracing::info!("Background task completed"),
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        if first_error.is_none() { first_error = Some(e); }
                        let _ = shutdown_tx.send(());
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        if first_error.is_none() {
                            first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        }
                        let _ = shutdown_tx.send(());
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                let _ = shutdown_tx.send(());
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("orders-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

async fn serve_metrics() -> HttpResponse {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(_) => HttpResponse::Ok().content_type(encoder.format_type()).body(buffer),
        Err(e) => HttpResponse::InternalServerError().body(e.to_string()),
    }
}
