use actix_cors::Cors;
use actix_web::{middleware::Compress, App, HttpServer};
use utoipa_swagger_ui::SwaggerUi;

use safai::assignment::AssignmentConfig;
use safai::openapi::ApiDoc;
use safai::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use safai::routes::{config, AppState};
use safai::security::SecurityHeaders;
use safai::storage::build_image_store;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi; // bring trait into scope for ApiDoc::openapi()

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Environment variables must be set externally (shell, systemd, Docker).
    // Load .env automatically only in debug builds to reduce setup overhead.
    if cfg!(debug_assertions) {
        let _ = dotenv::dotenv();
    }

    validate_env_vars();

    // Structured logging initialisation
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    info!("Bootstrapping safai server");
    info!(
        "Identity provider configured: {}",
        std::env::var("IDP_CLIENT_ID").is_ok()
    );
    info!(
        "Frontend URL: {}",
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string())
    );

    // Optional Prometheus exporter
    if let Ok(addr) = std::env::var("METRICS_ADDR") {
        match addr.parse::<std::net::SocketAddr>() {
            Ok(sock) => {
                use metrics_exporter_prometheus::PrometheusBuilder;
                match PrometheusBuilder::new().with_http_listener(sock).install() {
                    Ok(()) => info!("Prometheus exporter listening on {sock}"),
                    Err(e) => tracing::warn!("failed to install Prometheus exporter: {e}"),
                }
            }
            Err(e) => tracing::warn!("invalid METRICS_ADDR '{addr}': {e}"),
        }
    }

    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    let repo = safai::repo::inmem::InMemRepo::new();
    #[cfg(all(feature = "inmem-store", not(feature = "postgres-store")))]
    info!("Using in-memory repository backend");

    #[cfg(feature = "postgres-store")]
    let repo = {
        use sqlx::postgres::PgPoolOptions;
        let db_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for postgres-store");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&db_url)
            .expect("Failed to create Pg pool");
        info!("Using Postgres repository backend");
        safai::repo::pg::PgRepo::new(pool)
    };

    let openapi = ApiDoc::openapi();
    let image_store = build_image_store().await; // S3 or FS depending on env
    let assignment = AssignmentConfig::from_env();
    let rate_limiter = RateLimiterFacade::new(
        InMemoryRateLimiter::new(
            std::env::var("RL_ENABLED")
                .map(|v| v != "0")
                .unwrap_or(true),
        ),
        RateLimitConfig::from_env(),
    );
    info!(
        "Assignment config: claim_cap={}, {} fallback area(s)",
        assignment.claim_cap,
        assignment.fallback_areas.len()
    );

    let server = HttpServer::new(move || {
        let cors = {
            let mut c = Cors::default()
                // local Vite dev server defaults
                .allowed_origin("http://localhost:5173")
                .allowed_origin("http://127.0.0.1:5173")
                // containerized nginx frontend
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allow_any_header()
                .allowed_methods(["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
                .supports_credentials()
                .max_age(3600);
            if let Ok(front) = std::env::var("FRONTEND_URL") {
                c = c.allowed_origin(&front);
            }
            c
        };

        App::new()
            .wrap(TracingLogger::default())
            .wrap(Compress::default())
            .wrap(SecurityHeaders::from_env())
            .wrap(cors)
            .configure(config)
            .service(SwaggerUi::new("/docs").url("/docs/openapi.json", openapi.clone()))
            .app_data(actix_web::web::Data::new(AppState {
                repo: Arc::new(repo.clone()),
                image_store: image_store.clone(),
                assignment: assignment.clone(),
                rate_limiter: rate_limiter.clone(),
            }))
    })
    .bind(("0.0.0.0", 8080))?; // all interfaces so a fronting proxy can reach it

    info!("Listening on http://0.0.0.0:8080");

    server.run().await
}

/// Validate that required environment variables are set
fn validate_env_vars() {
    use std::env;

    let required = vec!["JWT_SECRET"];

    let mut missing = Vec::new();
    for var in required {
        if env::var(var).is_err() {
            missing.push(var);
        }
    }

    if !missing.is_empty() {
        eprintln!("Missing required environment variables: {:?}", missing);
        eprintln!("Please copy .env.example to .env and configure it");
        std::process::exit(1);
    }

    if let Ok(secret) = env::var("JWT_SECRET") {
        if secret.len() < 32 {
            eprintln!("JWT_SECRET must be at least 32 characters long for security");
            std::process::exit(1);
        }
    }

    if env::var("IDP_CLIENT_ID").is_err() || env::var("IDP_CLIENT_SECRET").is_err() {
        eprintln!("Warning: identity provider not configured (IDP_CLIENT_ID/IDP_CLIENT_SECRET missing)");
        eprintln!("Login will return 503 until these are set");
    }
}
