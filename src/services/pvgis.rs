//! PVGIS PVcalc client.
//!
//! Fetches annual and monthly PV yield and plane-of-array irradiance for a
//! location and fixed-mount system from the JRC PVGIS API.
//! See: https://joint-research-centre.ec.europa.eu/photovoltaic-geographical-information-system-pvgis/getting-started-pvgis/api-non-interactive-service_en
//!
//! Responses are cached by a rounded parameter key; a live cache entry
//! short-circuits the HTTP call entirely.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

use crate::errors::YieldError;
use crate::helpers::f64_to_decimal_dp;
use crate::models::Location;
use crate::services::cache::ResponseCache;

/// Public PVGIS API root (v5.2).
pub const PVGIS_DEFAULT_BASE_URL: &str = "https://re.jrc.ec.europa.eu/api/v5_2";

/// Default bound on a single PVcalc request.
pub const PVGIS_DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const PVGIS_USER_AGENT: &str = concat!("pv-yield-api/", env!("CARGO_PKG_VERSION"));

/// Number of monthly entries a valid response must carry.
const MONTHS: usize = 12;

/// Client for the PVGIS PVcalc endpoint.
#[derive(Debug, Clone)]
pub struct PvgisClient {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    cache: Arc<dyn ResponseCache>,
}

/// Parameters of one PVcalc request.
#[derive(Debug, Clone, PartialEq)]
pub struct PvgisParams {
    pub latitude: f64,
    pub longitude: f64,
    pub peak_power_kwp: f64,
    pub system_loss_percent: f64,
    pub tilt_angle: f64,
    /// Engine convention: 180 = south
    pub azimuth: f64,
    /// Radiation database (`raddatabase`), service default when `None`
    pub database: Option<String>,
}

/// Cache occupancy, exposed on the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
}

// --- PVGIS JSON response types ---

/// The subset of the PVcalc JSON body the engine relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteServiceResponse {
    pub inputs: PvgisInputs,
    pub outputs: PvgisOutputs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisInputs {
    pub location: PvgisLocation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisOutputs {
    pub monthly: PvgisMonthly,
    pub totals: PvgisTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisMonthly {
    pub fixed: Vec<PvgisMonthlyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisMonthlyEntry {
    pub month: u32,
    /// Monthly energy, kWh
    #[serde(rename = "E_m")]
    pub e_m: f64,
    /// Monthly in-plane irradiation, kWh/m²
    #[serde(rename = "H(i)_m")]
    pub h_i_m: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisTotals {
    pub fixed: PvgisFixedTotals,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvgisFixedTotals {
    /// Annual energy, kWh
    #[serde(rename = "E_y")]
    pub e_y: f64,
    /// Annual in-plane irradiation, kWh/m²
    #[serde(rename = "H(i)_y")]
    pub h_i_y: f64,
}

/// Flat projection of a validated response.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedYieldData {
    pub annual_yield: f64,
    pub monthly_yield: [f64; 12],
    pub annual_irradiance: f64,
    pub monthly_irradiance: [f64; 12],
    pub location: Location,
}

impl PvgisClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self, YieldError> {
        let client = reqwest::Client::builder()
            .user_agent(PVGIS_USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| YieldError::Service(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            cache,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.len(),
            max_entries: self.cache.max_entries(),
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Fetch yield data for `params`, serving from cache when allowed.
    ///
    /// The cache is written only after the response has been fully received
    /// and validated, so dropping this future mid-flight (cancellation)
    /// leaves no partial entry behind.
    pub async fn fetch_remote_yield(
        &self,
        params: &PvgisParams,
        use_cache: bool,
    ) -> Result<RemoteServiceResponse, YieldError> {
        let key = cache_key(params);

        if use_cache {
            if let Some(cached) = self.cache.get(&key) {
                tracing::debug!("PVGIS cache hit for {}", key);
                return Ok(cached);
            }
            tracing::debug!("PVGIS cache miss for {}", key);
        }

        let response = self.request(params).await?;
        self.cache.set(&key, response.clone(), self.cache.default_ttl());
        tracing::info!(
            "PVGIS returned {:.0} kWh/year for ({:.4}, {:.4})",
            response.outputs.totals.fixed.e_y,
            params.latitude,
            params.longitude
        );
        Ok(response)
    }

    async fn request(&self, params: &PvgisParams) -> Result<RemoteServiceResponse, YieldError> {
        let url = format!("{}/PVcalc", self.base_url);
        let query = build_query(params);

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        let status = response.status();
        if status == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            return Err(YieldError::Coverage(format!(
                "PVGIS rejected ({:.4}, {:.4}): {}",
                params.latitude,
                params.longitude,
                extract_service_message(&body)
            )));
        }
        if !status.is_success() {
            return Err(YieldError::Service(format!("PVGIS returned HTTP {}", status)));
        }

        let raw_json: serde_json::Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.map_transport_error(e)
            } else {
                YieldError::MalformedResponse(format!("PVGIS JSON parse error: {}", e))
            }
        })?;

        parse_response(raw_json)
    }

    fn map_transport_error(&self, e: reqwest::Error) -> YieldError {
        if e.is_timeout() {
            YieldError::Timeout(self.timeout.as_millis() as u64)
        } else {
            YieldError::Service(format!("PVGIS request failed: {}", e))
        }
    }
}

/// Cache key from parameters rounded to the precision at which PVGIS results
/// are effectively identical: lat/lon 2 dp, capacity 1 dp, the rest integral.
pub fn cache_key(params: &PvgisParams) -> String {
    let mut key = format!(
        "pvgis_{}_{}_{}_{}_{}_{}",
        f64_to_decimal_dp(params.latitude, 2),
        f64_to_decimal_dp(params.longitude, 2),
        f64_to_decimal_dp(params.peak_power_kwp, 1),
        f64_to_decimal_dp(params.system_loss_percent, 0),
        f64_to_decimal_dp(params.tilt_angle, 0),
        f64_to_decimal_dp(params.azimuth, 0),
    );
    if let Some(db) = &params.database {
        key.push('_');
        key.push_str(db);
    }
    key
}

/// Convert the engine azimuth (180 = south) to the PVGIS aspect (0 = south, 90 = west).
pub fn azimuth_to_aspect(azimuth: f64) -> f64 {
    azimuth - 180.0
}

fn build_query(params: &PvgisParams) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("lat", format!("{:.4}", params.latitude)),
        ("lon", format!("{:.4}", params.longitude)),
        ("peakpower", params.peak_power_kwp.to_string()),
        ("loss", params.system_loss_percent.to_string()),
        ("mountingplace", "free".to_string()),
        ("angle", params.tilt_angle.to_string()),
        ("aspect", azimuth_to_aspect(params.azimuth).to_string()),
        ("outputformat", "json".to_string()),
    ];
    if let Some(db) = &params.database {
        query.push(("raddatabase", db.clone()));
    }
    query
}

/// PVGIS error bodies look like `{"message": "...", "status": 400}`.
fn extract_service_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect())
}

/// Validate the body shape and convert it into a typed response.
pub fn parse_response(raw_json: serde_json::Value) -> Result<RemoteServiceResponse, YieldError> {
    let response: RemoteServiceResponse = serde_json::from_value(raw_json).map_err(|e| {
        YieldError::MalformedResponse(format!("PVGIS response structure error: {}", e))
    })?;

    let monthly = &response.outputs.monthly.fixed;
    if monthly.len() != MONTHS {
        return Err(YieldError::MalformedResponse(format!(
            "expected {} monthly entries, got {}",
            MONTHS,
            monthly.len()
        )));
    }

    let totals = &response.outputs.totals.fixed;
    if !totals.e_y.is_finite() || totals.e_y < 0.0 {
        return Err(YieldError::MalformedResponse(format!(
            "invalid annual total {}",
            totals.e_y
        )));
    }

    let mut seen = [false; MONTHS];
    for entry in monthly {
        if !(1..=12).contains(&entry.month) || !entry.e_m.is_finite() || entry.e_m < 0.0 {
            return Err(YieldError::MalformedResponse(format!(
                "monthly entry with invalid month {} or energy {}",
                entry.month, entry.e_m
            )));
        }
        let idx = entry.month as usize - 1;
        if seen[idx] {
            return Err(YieldError::MalformedResponse(format!(
                "month {} appears more than once",
                entry.month
            )));
        }
        seen[idx] = true;
    }

    Ok(response)
}

/// Project a validated response onto flat annual/monthly figures.
///
/// No validation here: `parse_response` already guaranteed months 1..=12,
/// each exactly once.
pub fn extract_yield_data(response: &RemoteServiceResponse) -> ExtractedYieldData {
    let mut monthly_yield = [0.0; 12];
    let mut monthly_irradiance = [0.0; 12];
    for entry in &response.outputs.monthly.fixed {
        let idx = (entry.month as usize).saturating_sub(1).min(11);
        monthly_yield[idx] = entry.e_m;
        monthly_irradiance[idx] = entry.h_i_m;
    }

    ExtractedYieldData {
        annual_yield: response.outputs.totals.fixed.e_y,
        monthly_yield,
        annual_irradiance: response.outputs.totals.fixed.h_i_y,
        monthly_irradiance,
        location: Location {
            latitude: response.inputs.location.latitude,
            longitude: response.inputs.location.longitude,
        },
    }
}

// ---------------------------------------------------------------------------
// Coverage heuristic
// ---------------------------------------------------------------------------

/// (lat_min, lat_max, lon_min, lon_max)
type BoundingBox = (f64, f64, f64, f64);

const COVERAGE_BOXES: [(&str, BoundingBox); 5] = [
    ("Europe", (34.0, 72.0, -25.0, 45.0)),
    ("Africa", (-35.0, 38.0, -20.0, 55.0)),
    ("Middle East", (12.0, 42.0, 25.0, 63.0)),
    ("South Asia", (5.0, 40.0, 60.0, 100.0)),
    ("Australia", (-45.0, -10.0, 110.0, 155.0)),
];

/// Approximate test for whether PVGIS has radiation data for a location.
///
/// A hint only: it can be wrong both ways, so callers must still handle
/// `YieldError::Coverage` when it says yes.
pub fn is_pvgis_coverage_area(latitude: f64, longitude: f64) -> bool {
    COVERAGE_BOXES
        .iter()
        .any(|(_, (lat_min, lat_max, lon_min, lon_max))| {
            (*lat_min..=*lat_max).contains(&latitude) && (*lon_min..=*lon_max).contains(&longitude)
        })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::services::cache::InMemoryResponseCache;
    use tokio_test::{assert_err, assert_ok};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MONTH_SHARE: [f64; 12] = [
        0.035, 0.050, 0.080, 0.105, 0.125, 0.130, 0.132, 0.115, 0.090, 0.065, 0.040, 0.033,
    ];

    /// PVcalc-shaped JSON for a system producing `annual_kwh` per year.
    pub(crate) fn sample_json(annual_kwh: f64) -> serde_json::Value {
        let monthly: Vec<serde_json::Value> = MONTH_SHARE
            .iter()
            .enumerate()
            .map(|(i, share)| {
                serde_json::json!({
                    "month": i + 1,
                    "E_d": annual_kwh * share / 30.0,
                    "E_m": annual_kwh * share,
                    "H(i)_d": 1300.0 * share / 30.0,
                    "H(i)_m": 1300.0 * share,
                    "SD_m": 10.0
                })
            })
            .collect();

        serde_json::json!({
            "inputs": {
                "location": { "latitude": 51.5, "longitude": -0.12, "elevation": 20.0 },
                "meteo_data": { "radiation_db": "PVGIS-SARAH2" }
            },
            "outputs": {
                "monthly": { "fixed": monthly },
                "totals": {
                    "fixed": {
                        "E_d": annual_kwh / 365.0,
                        "E_m": annual_kwh / 12.0,
                        "E_y": annual_kwh,
                        "H(i)_d": 1300.0 / 365.0,
                        "H(i)_m": 1300.0 / 12.0,
                        "H(i)_y": 1300.0,
                        "SD_m": 5.0,
                        "SD_y": 40.0,
                        "l_aoi": -2.9,
                        "l_spec": "1.8",
                        "l_tg": -5.6,
                        "l_total": -19.5
                    }
                }
            },
            "meta": {}
        })
    }

    pub(crate) fn sample_response(annual_kwh: f64) -> RemoteServiceResponse {
        parse_response(sample_json(annual_kwh)).unwrap()
    }

    pub(crate) fn london_params() -> PvgisParams {
        PvgisParams {
            latitude: 51.5,
            longitude: -0.12,
            peak_power_kwp: 10.0,
            system_loss_percent: 14.0,
            tilt_angle: 51.5,
            azimuth: 180.0,
            database: None,
        }
    }

    fn client_for(server: &MockServer, timeout: Duration) -> PvgisClient {
        PvgisClient::new(
            &server.uri(),
            timeout,
            Arc::new(InMemoryResponseCache::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_cache_key_rounds_near_duplicates() {
        let a = london_params();
        let b = PvgisParams {
            latitude: 51.4987,
            longitude: -0.1212,
            tilt_angle: 51.6,
            ..london_params()
        };
        assert_eq!(cache_key(&a), cache_key(&b));
        assert_eq!(cache_key(&a), "pvgis_51.5_-0.12_10_14_52_180");
    }

    #[test]
    fn test_cache_key_distinguishes_capacity_and_database() {
        let a = london_params();
        let b = PvgisParams {
            peak_power_kwp: 12.0,
            ..london_params()
        };
        let c = PvgisParams {
            database: Some("PVGIS-ERA5".to_string()),
            ..london_params()
        };
        assert_ne!(cache_key(&a), cache_key(&b));
        assert_ne!(cache_key(&a), cache_key(&c));
    }

    #[test]
    fn test_azimuth_to_aspect() {
        assert_eq!(azimuth_to_aspect(180.0), 0.0);
        assert_eq!(azimuth_to_aspect(270.0), 90.0);
        assert_eq!(azimuth_to_aspect(0.0), -180.0);
    }

    #[test]
    fn test_coverage_heuristic() {
        assert!(is_pvgis_coverage_area(51.5, -0.12)); // London
        assert!(is_pvgis_coverage_area(-1.29, 36.82)); // Nairobi
        assert!(is_pvgis_coverage_area(25.2, 55.27)); // Dubai
        assert!(is_pvgis_coverage_area(28.6, 77.2)); // Delhi
        assert!(is_pvgis_coverage_area(-33.87, 151.21)); // Sydney
        assert!(!is_pvgis_coverage_area(40.71, -74.0)); // New York
        assert!(!is_pvgis_coverage_area(-23.55, -46.63)); // São Paulo
        assert!(!is_pvgis_coverage_area(35.68, 139.69)); // Tokyo
    }

    #[test]
    fn test_parse_response_rejects_eleven_months() {
        let mut json = sample_json(9000.0);
        json["outputs"]["monthly"]["fixed"]
            .as_array_mut()
            .unwrap()
            .pop();
        let err = assert_err!(parse_response(json));
        assert!(matches!(err, YieldError::MalformedResponse(_)));
    }

    #[test]
    fn test_parse_response_rejects_duplicate_months() {
        let mut json = sample_json(9000.0);
        for entry in json["outputs"]["monthly"]["fixed"]
            .as_array_mut()
            .unwrap()
            .iter_mut()
        {
            entry["month"] = serde_json::json!(1);
        }
        let err = assert_err!(parse_response(json));
        match err {
            YieldError::MalformedResponse(msg) => assert!(msg.contains("more than once")),
            other => panic!("expected MalformedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_response_rejects_out_of_range_month() {
        let mut json = sample_json(9000.0);
        json["outputs"]["monthly"]["fixed"][11]["month"] = serde_json::json!(13);
        assert!(matches!(
            parse_response(json),
            Err(YieldError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_missing_totals() {
        let mut json = sample_json(9000.0);
        json["outputs"].as_object_mut().unwrap().remove("totals");
        assert!(matches!(
            parse_response(json),
            Err(YieldError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_parse_response_rejects_missing_location() {
        let mut json = sample_json(9000.0);
        json["inputs"].as_object_mut().unwrap().remove("location");
        assert!(matches!(
            parse_response(json),
            Err(YieldError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_extract_yield_data() {
        let data = extract_yield_data(&sample_response(9000.0));
        assert_eq!(data.annual_yield, 9000.0);
        assert_eq!(data.annual_irradiance, 1300.0);
        assert!((data.monthly_yield[0] - 9000.0 * 0.035).abs() < 1e-9);
        assert!((data.monthly_irradiance[6] - 1300.0 * 0.132).abs() < 1e-9);
        assert_eq!(data.location.latitude, 51.5);
    }

    #[tokio::test]
    async fn test_fetch_sends_pvcalc_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PVcalc"))
            .and(query_param("lat", "51.5000"))
            .and(query_param("lon", "-0.1200"))
            .and(query_param("peakpower", "10"))
            .and(query_param("loss", "14"))
            .and(query_param("mountingplace", "free"))
            .and(query_param("angle", "51.5"))
            .and(query_param("aspect", "0"))
            .and(query_param("outputformat", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_json(9000.0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let response = assert_ok!(client.fetch_remote_yield(&london_params(), true).await);
        assert_eq!(response.outputs.totals.fixed.e_y, 9000.0);
    }

    #[tokio::test]
    async fn test_second_fetch_served_from_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PVcalc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_json(9000.0)))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let first = client.fetch_remote_yield(&london_params(), true).await.unwrap();
        let nearby = PvgisParams {
            latitude: 51.501,
            ..london_params()
        };
        let second = client.fetch_remote_yield(&nearby, true).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.cache_stats().entries, 1);
    }

    #[tokio::test]
    async fn test_use_cache_false_always_fetches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/PVcalc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sample_json(9000.0)))
            .expect(2)
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        client.fetch_remote_yield(&london_params(), false).await.unwrap();
        client.fetch_remote_yield(&london_params(), false).await.unwrap();
    }

    #[tokio::test]
    async fn test_http_400_is_coverage_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "Location over the sea. Please, select another location",
                "status": 400
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let err = client
            .fetch_remote_yield(&london_params(), true)
            .await
            .unwrap_err();
        match err {
            YieldError::Coverage(msg) => assert!(msg.contains("over the sea")),
            other => panic!("expected Coverage, got {:?}", other),
        }
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_http_500_is_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let err = client
            .fetch_remote_yield(&london_params(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, YieldError::Service(_)));
    }

    #[tokio::test]
    async fn test_malformed_body_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "outputs": {} })),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let err = client
            .fetch_remote_yield(&london_params(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, YieldError::MalformedResponse(_)));
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let err = client
            .fetch_remote_yield(&london_params(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, YieldError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_json(9000.0))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(200));
        let err = client
            .fetch_remote_yield(&london_params(), true)
            .await
            .unwrap_err();
        assert_eq!(err, YieldError::Timeout(200));
        assert_eq!(client.cache_stats().entries, 0);
    }

    #[tokio::test]
    async fn test_cancelled_fetch_leaves_no_cache_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(sample_json(9000.0))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, PVGIS_DEFAULT_TIMEOUT);
        let params = london_params();
        let aborted = tokio::time::timeout(
            Duration::from_millis(100),
            client.fetch_remote_yield(&params, true),
        )
        .await;
        assert!(aborted.is_err(), "fetch should have been cancelled");
        assert_eq!(client.cache_stats().entries, 0);
    }
}
