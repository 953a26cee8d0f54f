use axum::extract::State;
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::routes::yield_routes::AppState;
use crate::services::pvgis::CacheStats;
use crate::services::yield_calculator::CoveragePolicy;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Service status (always "ok"; the engine degrades to the lookup table rather than failing)
    pub status: String,
    /// API version
    pub version: String,
    /// PVGIS response cache occupancy
    pub cache: CacheStats,
    pub coverage_policy: CoveragePolicy,
}

/// Health check endpoint.
///
/// Returns the API status, version and response-cache occupancy. Does not
/// contact PVGIS: its availability only decides between remote and lookup
/// estimates, never whether the service can answer.
#[utoipa::path(
    get,
    path = "/api/v1/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cache: state.calculator.client().cache_stats(),
        coverage_policy: state.calculator.coverage_policy(),
    })
}

/// Drop every cached PVGIS response.
///
/// The next yield request for any location goes to PVGIS again. Returns the
/// cache occupancy after clearing.
#[utoipa::path(
    delete,
    path = "/api/v1/cache",
    tag = "Health",
    responses(
        (status = 200, description = "Cache cleared", body = CacheStats),
    )
)]
pub async fn clear_cache(State(state): State<AppState>) -> Json<CacheStats> {
    let client = state.calculator.client();
    let before = client.cache_stats().entries;
    client.clear_cache();
    tracing::info!("Cleared {} cached PVGIS responses", before);
    Json(client.cache_stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::yield_routes::tests::offline_state;
    use crate::services::cache::InMemoryResponseCache;
    use crate::services::pvgis::tests::{london_params, sample_json};
    use crate::services::pvgis::{PvgisClient, PVGIS_DEFAULT_TIMEOUT};
    use crate::services::yield_calculator::YieldCalculator;
    use std::sync::Arc;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_health_reports_empty_cache() {
        let Json(body) = health_check(State(offline_state())).await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.cache.entries, 0);
        assert_eq!(body.cache.max_entries, 100);
        assert_eq!(body.coverage_policy, CoveragePolicy::Advisory);
    }

    #[tokio::test]
    async fn test_clear_cache_empties_store() {
        let mut params = london_params();
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_json(9000.0)))
            .expect(2)
            .mount(&server)
            .await;
        let client = PvgisClient::new(
            &server.uri(),
            PVGIS_DEFAULT_TIMEOUT,
            Arc::new(InMemoryResponseCache::default()),
        )
        .unwrap();
        let state = AppState {
            calculator: YieldCalculator::new(client, CoveragePolicy::Advisory),
        };

        let client = state.calculator.client();
        client.fetch_remote_yield(&params, true).await.unwrap();
        params.latitude = 48.2;
        client.fetch_remote_yield(&params, true).await.unwrap();
        assert_eq!(client.cache_stats().entries, 2);

        let Json(stats) = clear_cache(State(state.clone())).await;
        assert_eq!(stats.entries, 0);
        assert_eq!(stats.max_entries, 100);

        let Json(health) = health_check(State(state)).await;
        assert_eq!(health.cache.entries, 0);
    }
}
