use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use anyhow::Context;
use chrono::Utc;
use content_service::clock::{Clock, SystemClock};
use content_service::config::{Config, StorageBackend};
use content_service::db::{ContentStore, InMemoryContentStore, PgContentStore};
use content_service::handlers;
use content_service::jobs::ExpiryReconcileJob;
use content_service::openapi::ApiDoc;
use content_service::services::{ExpiryPolicy, PostService, StoriesService};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

struct HealthState {
    store: Arc<dyn ContentStore>,
    backend: StorageBackend,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    latency_ms: Option<u64>,
}

#[derive(Serialize)]
struct ReadinessResponse {
    ready: bool,
    status: ComponentStatus,
    checks: HashMap<String, ComponentCheck>,
    timestamp: String,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "content-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("Storage check failed: {}", e),
            "service": "content-service"
        })),
    }
}

async fn readiness_summary(state: web::Data<HealthState>) -> HttpResponse {
    let mut checks = HashMap::new();

    let start = Instant::now();
    let result = state.store.ping().await;
    let latency_ms = Some(start.elapsed().as_millis() as u64);
    let ready = result.is_ok();
    let check = match result {
        Ok(_) => ComponentCheck {
            status: ComponentStatus::Healthy,
            message: "Storage round trip successful".to_string(),
            latency_ms,
        },
        Err(e) => ComponentCheck {
            status: ComponentStatus::Unhealthy,
            message: format!("Storage round trip failed: {}", e),
            latency_ms,
        },
    };
    let component = match state.backend {
        StorageBackend::Postgres => "postgresql",
        StorageBackend::Memory => "memory",
    };
    checks.insert(component.to_string(), check);

    let status = if ready {
        ComponentStatus::Healthy
    } else {
        ComponentStatus::Unhealthy
    };

    let response = ReadinessResponse {
        ready,
        status,
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

async fn openapi_json(doc: web::Data<utoipa::openapi::OpenApi>) -> actix_web::Result<HttpResponse> {
    let body = serde_json::to_string(&*doc).map_err(|e| {
        tracing::error!("OpenAPI serialization failed: {}", e);
        actix_web::error::ErrorInternalServerError("OpenAPI serialization error")
    })?;

    Ok(HttpResponse::Ok()
        .content_type("application/json")
        .body(body))
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

fn init_tracing() {
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info,sqlx=warn".into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn ContentStore>> {
    match config.database.backend {
        StorageBackend::Postgres => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .acquire_timeout(Duration::from_secs(5))
                .connect(&config.database.url)
                .await
                .context("failed to connect to PostgreSQL")?;

            sqlx::migrate!("./migrations")
                .run(&pool)
                .await
                .context("failed to run database migrations")?;

            tracing::info!(
                max_connections = config.database.max_connections,
                "Connected to PostgreSQL and applied migrations"
            );
            Ok(Arc::new(PgContentStore::new(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; content is lost on restart");
            Ok(Arc::new(InMemoryContentStore::new()))
        }
    }
}

/// Content Service
///
/// Serves ephemeral posts and stories. Records carry an absolute expiry
/// stamped from the server clock and are filtered out of every read once it
/// passes; nothing is deleted.
///
/// # Routes
///
/// - `/api/v1/posts/*` - Create, read and list posts
/// - `/api/v1/stories/*` - Create, read and list stories, record views
/// - `/api/v1/health*`, `/metrics`, `/api/v1/openapi.json`, `/swagger-ui/`
///
/// # Deployment
///
/// Content-service runs on port 8081 (configurable via CONTENT_SERVICE_PORT env var)
/// behind a gateway that authenticates callers and forwards `X-User-Id`.
#[actix_web::main]
async fn main() -> io::Result<()> {
    // Container healthcheck: `content-service healthcheck` calls /api/v1/health
    {
        let mut args = std::env::args();
        let _bin = args.next();
        if let Some(cmd) = args.next() {
            if cmd == "healthcheck" {
                let port = std::env::var("CONTENT_SERVICE_PORT").unwrap_or_else(|_| "8081".into());
                let url = format!("http://127.0.0.1:{}/api/v1/health", port);
                match reqwest::Client::new().get(&url).send().await {
                    Ok(resp) if resp.status().is_success() => return Ok(()),
                    Ok(resp) => {
                        eprintln!("healthcheck HTTP status: {}", resp.status());
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck failed"));
                    }
                    Err(e) => {
                        eprintln!("healthcheck HTTP error: {}", e);
                        return Err(io::Error::new(io::ErrorKind::Other, "healthcheck error"));
                    }
                }
            }
        }
    }

    dotenvy::dotenv().ok();
    init_tracing();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!("Configuration loading failed: {:#}", e);
            eprintln!("ERROR: Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Starting content-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let store = match connect_store(&config).await {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Storage initialization failed: {:#}", e);
            eprintln!("ERROR: Failed to initialize storage: {:#}", e);
            std::process::exit(1);
        }
    };

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let policy = ExpiryPolicy::from(&config.lifecycle);
    tracing::info!(
        post_durations = ?policy.allowed_post_hours(),
        story_hours = policy.story_duration(),
        viewer_policy = ?config.lifecycle.viewer_policy,
        "Lifecycle policy loaded"
    );

    let post_service = web::Data::new(PostService::new(
        store.clone(),
        clock.clone(),
        policy.clone(),
    ));
    let stories_service = web::Data::new(StoriesService::new(
        store.clone(),
        clock.clone(),
        policy,
        config.lifecycle.viewer_policy,
    ));
    let health_state = web::Data::new(HealthState {
        store: store.clone(),
        backend: config.database.backend,
    });

    let http_bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", http_bind_address);

    let allowed_origins = config.cors.allowed_origins.clone();
    let server = HttpServer::new(move || {
        // Build CORS configuration
        let mut cors = Cors::default();
        for origin in allowed_origins.split(',') {
            let origin = origin.trim();
            if origin == "*" {
                cors = cors.allow_any_origin();
            } else if !origin.is_empty() {
                cors = cors.allowed_origin(origin);
            }
        }
        cors = cors.allow_any_method().allow_any_header().max_age(3600);

        let openapi_doc = ApiDoc::openapi();

        App::new()
            .app_data(web::Data::new(openapi_doc.clone()))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url(ApiDoc::openapi_json_path(), openapi_doc.clone()),
            )
            .route(ApiDoc::openapi_json_path(), web::get().to(openapi_json))
            .app_data(post_service.clone())
            .app_data(stories_service.clone())
            .app_data(health_state.clone())
            .wrap(cors)
            .wrap(Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route(
                "/metrics",
                web::get().to(content_service::metrics::serve_metrics),
            )
            // Health check endpoints
            .route("/api/v1/health", web::get().to(health_summary))
            .route("/api/v1/health/ready", web::get().to(readiness_summary))
            .route("/api/v1/health/live", web::get().to(liveness_check))
            .configure(handlers::configure)
    })
    .bind(&http_bind_address)?
    .workers(4)
    .run();

    let server_handle = server.handle();

    let mut tasks: JoinSet<io::Result<()>> = JoinSet::new();

    // HTTP server task
    tasks.spawn(async move {
        tracing::info!("HTTP server is running");
        server.await
    });

    // Expiry flag reconciler (optional)
    if config.lifecycle.reconcile_enabled {
        let job = ExpiryReconcileJob::new(store.clone(), clock.clone()).with_interval(
            Duration::from_secs(config.lifecycle.reconcile_interval_secs),
        );
        tasks.spawn(async move {
            job.run().await;
            Ok(())
        });
    } else {
        tracing::info!("Expiry reconcile job disabled");
    }

    let mut first_error: Option<io::Error> = None;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = tasks.join_next() => {
                match result {
                    Some(Ok(Ok(_))) => {
                        tracing::info!("Background task completed");
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Ok(Err(e))) => {
                        tracing::error!("Task returned error: {}", e);
                        first_error = Some(e);
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!("Task join error: {}", e);
                        first_error = Some(io::Error::new(io::ErrorKind::Other, e.to_string()));
                        server_handle.stop(true).await;
                        tasks.shutdown().await;
                        break;
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                tracing::info!("Shutdown signal received");
                server_handle.stop(true).await;
                tasks.shutdown().await;
                break;
            }
        }
    }

    tracing::info!("Content-service shutting down");

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
