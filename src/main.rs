// PV Yield API v0.1
use axum::routing::{delete, get};
use axum::Router;
use chrono::Duration as ChronoDuration;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pv_yield_api::config::AppConfig;
use pv_yield_api::routes::{self, yield_routes::AppState};
use pv_yield_api::services::cache::{InMemoryResponseCache, ResponseCache};
use pv_yield_api::services::pvgis::PvgisClient;
use pv_yield_api::services::yield_calculator::YieldCalculator;
use pv_yield_api::{errors, models, services};

/// PV Yield API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PV Yield API",
        version = "0.1.0",
        description = "Annual and monthly photovoltaic yield estimates. \
            Fetches and caches PVGIS yield data for a location and system, \
            falls back to an offline latitude-band irradiance table when PVGIS \
            is unavailable, and reports a documented performance-ratio loss breakdown.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health and response cache"),
        (name = "Yield", description = "Yield estimation"),
        (name = "Performance ratio", description = "Loss decomposition"),
    ),
    paths(
        routes::health::health_check,
        routes::health::clear_cache,
        routes::yield_routes::get_yield,
        routes::yield_routes::post_yield,
        routes::yield_routes::get_yield_offline,
        routes::yield_routes::get_quick_yield,
        routes::yield_routes::get_performance_ratio,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::yield_routes::PerformanceRatioResponse,
            models::Location,
            models::SystemConfig,
            models::LossAssumptions,
            models::ResolvedAssumptions,
            models::LossBreakdown,
            models::YieldSource,
            models::YieldEstimate,
            models::YieldInput,
            models::YieldCalculationResult,
            models::QuickYieldEstimate,
            services::performance_ratio::PerformanceRatioResult,
            services::performance_ratio::PrQuality,
            services::performance_ratio::PrRating,
            services::pvgis::CacheStats,
            services::yield_calculator::CoveragePolicy,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

/// Restore the response cache from its snapshot, or start empty.
fn build_cache(config: &AppConfig) -> Arc<InMemoryResponseCache> {
    let ttl = ChronoDuration::days(config.cache_ttl_days);
    if let Some(path) = &config.cache_snapshot_path {
        match InMemoryResponseCache::load_snapshot(path, config.cache_max_entries, ttl) {
            Ok(cache) => {
                tracing::info!(
                    "Restored {} cached PVGIS responses from {}",
                    cache.len(),
                    path.display()
                );
                return Arc::new(cache);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No cache snapshot at {}, starting empty", path.display());
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load cache snapshot {}: {}, starting empty",
                    path.display(),
                    e
                );
            }
        }
    }
    Arc::new(InMemoryResponseCache::new(config.cache_max_entries, ttl))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pv_yield_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env();

    let cache = build_cache(&config);
    let client = PvgisClient::new(
        &config.pvgis_base_url,
        config.pvgis_timeout,
        cache.clone() as Arc<dyn ResponseCache>,
    )
    .expect("Failed to build PVGIS client");

    tracing::info!(
        "PVGIS client: {} (timeout {:?}, cache {} entries / {} days, coverage policy {:?})",
        config.pvgis_base_url,
        config.pvgis_timeout,
        config.cache_max_entries,
        config.cache_ttl_days,
        config.coverage_policy
    );

    let app_state = AppState {
        calculator: YieldCalculator::new(client, config.coverage_policy),
    };

    // CORS: GET everywhere, POST for the JSON yield body, DELETE for the cache
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::DELETE,
        ])
        .allow_headers(Any);

    let app = Router::new()
        .route("/api/v1/health", get(routes::health::health_check))
        .route("/api/v1/cache", delete(routes::health::clear_cache))
        .route(
            "/api/v1/yield",
            get(routes::yield_routes::get_yield).post(routes::yield_routes::post_yield),
        )
        .route(
            "/api/v1/yield/offline",
            get(routes::yield_routes::get_yield_offline),
        )
        .route(
            "/api/v1/yield/quick",
            get(routes::yield_routes::get_quick_yield),
        )
        .route(
            "/api/v1/performance-ratio",
            get(routes::yield_routes::get_performance_ratio),
        )
        .with_state(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind TCP listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server terminated unexpectedly");

    if let Some(path) = &config.cache_snapshot_path {
        match cache.save_snapshot(path) {
            Ok(n) => tracing::info!("Saved {} cached PVGIS responses to {}", n, path.display()),
            Err(e) => tracing::error!("Failed to save cache snapshot {}: {}", path.display(), e),
        }
    }
}
