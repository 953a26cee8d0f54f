//! Yield estimation HTTP endpoints.
//!
//! - GET  /api/v1/yield?latitude=..&longitude=..&capacity_kwp=..
//! - POST /api/v1/yield (JSON `YieldInput`)
//! - GET  /api/v1/yield/offline?latitude=..&longitude=..&capacity_kwp=..
//! - GET  /api/v1/yield/quick?latitude=..&longitude=..&capacity_kwp=..
//! - GET  /api/v1/performance-ratio?ambient_temp_c=..

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::models::{LossAssumptions, QuickYieldEstimate, YieldCalculationResult, YieldInput};
use crate::services::ghi_lookup::lookup_ambient_temperature;
use crate::services::performance_ratio::{
    calculate_performance_ratio_resolved, get_pr_quality_description, resolve_assumptions,
    PerformanceRatioResult, PrQuality, DEFAULT_AMBIENT_TEMP_C,
};
use crate::services::validation;
use crate::services::yield_calculator::YieldCalculator;

/// Shared application state for yield endpoints.
#[derive(Debug, Clone)]
pub struct AppState {
    pub calculator: YieldCalculator,
}

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

fn default_use_cache() -> bool {
    true
}

/// Flat query form of `YieldInput` (query strings cannot nest).
#[derive(Debug, Deserialize, IntoParams)]
pub struct YieldQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Nominal DC capacity in kWp
    pub capacity_kwp: f64,
    pub tilt_angle: Option<f64>,
    /// 180 = south
    pub azimuth: Option<f64>,
    pub system_losses_percent: Option<f64>,
    /// PVGIS radiation database, e.g. "PVGIS-SARAH2"
    pub database: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
    pub temp_coeff_pmax_percent_per_c: Option<f64>,
    pub noct_c: Option<f64>,
    pub inverter_efficiency_percent: Option<f64>,
    pub ambient_temp_c: Option<f64>,
    pub irradiance_w_m2: Option<f64>,
    pub soiling_percent: Option<f64>,
    pub shading_percent: Option<f64>,
    pub wiring_percent: Option<f64>,
    pub mismatch_percent: Option<f64>,
    pub availability_percent: Option<f64>,
    pub other_percent: Option<f64>,
}

impl From<YieldQuery> for YieldInput {
    fn from(q: YieldQuery) -> Self {
        YieldInput {
            latitude: q.latitude,
            longitude: q.longitude,
            capacity_kwp: q.capacity_kwp,
            tilt_angle: q.tilt_angle,
            azimuth: q.azimuth,
            system_losses_percent: q.system_losses_percent,
            loss_assumptions: LossAssumptions {
                temp_coeff_pmax_percent_per_c: q.temp_coeff_pmax_percent_per_c,
                noct_c: q.noct_c,
                inverter_efficiency_percent: q.inverter_efficiency_percent,
                ambient_temp_c: q.ambient_temp_c,
                irradiance_w_m2: q.irradiance_w_m2,
                soiling_percent: q.soiling_percent,
                shading_percent: q.shading_percent,
                wiring_percent: q.wiring_percent,
                mismatch_percent: q.mismatch_percent,
                availability_percent: q.availability_percent,
                other_percent: q.other_percent,
            },
            database: q.database,
            use_cache: q.use_cache,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct QuickYieldQuery {
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_kwp: f64,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct PerformanceRatioQuery {
    /// Site latitude; selects the ambient temperature default when given
    pub latitude: Option<f64>,
    pub temp_coeff_pmax_percent_per_c: Option<f64>,
    pub noct_c: Option<f64>,
    pub inverter_efficiency_percent: Option<f64>,
    pub ambient_temp_c: Option<f64>,
    pub irradiance_w_m2: Option<f64>,
    pub soiling_percent: Option<f64>,
    pub shading_percent: Option<f64>,
    pub wiring_percent: Option<f64>,
    pub mismatch_percent: Option<f64>,
    pub availability_percent: Option<f64>,
    pub other_percent: Option<f64>,
}

/// Performance ratio with its quality band.
#[derive(Debug, Serialize, ToSchema)]
pub struct PerformanceRatioResponse {
    #[serde(flatten)]
    pub result: PerformanceRatioResult,
    pub quality: PrQuality,
}

fn envelope_response(result: YieldCalculationResult) -> (StatusCode, Json<YieldCalculationResult>) {
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(result))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Estimate yield, trying PVGIS first and falling back to the lookup table.
#[utoipa::path(
    get,
    path = "/api/v1/yield",
    tag = "Yield",
    params(YieldQuery),
    responses(
        (status = 200, description = "Yield estimate", body = YieldCalculationResult),
        (status = 422, description = "Invalid input", body = YieldCalculationResult),
    )
)]
pub async fn get_yield(
    State(state): State<AppState>,
    Query(query): Query<YieldQuery>,
) -> (StatusCode, Json<YieldCalculationResult>) {
    let input = YieldInput::from(query);
    envelope_response(state.calculator.calculate_yield(&input).await)
}

/// Same as `GET /api/v1/yield` with a JSON body.
#[utoipa::path(
    post,
    path = "/api/v1/yield",
    tag = "Yield",
    request_body = YieldInput,
    responses(
        (status = 200, description = "Yield estimate", body = YieldCalculationResult),
        (status = 422, description = "Invalid input", body = YieldCalculationResult),
    )
)]
pub async fn post_yield(
    State(state): State<AppState>,
    Json(input): Json<YieldInput>,
) -> (StatusCode, Json<YieldCalculationResult>) {
    envelope_response(state.calculator.calculate_yield(&input).await)
}

/// Estimate yield from the offline lookup table only (no network).
#[utoipa::path(
    get,
    path = "/api/v1/yield/offline",
    tag = "Yield",
    params(YieldQuery),
    responses(
        (status = 200, description = "Lookup-based estimate", body = YieldCalculationResult),
        (status = 422, description = "Invalid input", body = YieldCalculationResult),
    )
)]
pub async fn get_yield_offline(
    State(state): State<AppState>,
    Query(query): Query<YieldQuery>,
) -> (StatusCode, Json<YieldCalculationResult>) {
    let input = YieldInput::from(query);
    envelope_response(state.calculator.calculate_yield_offline(&input))
}

/// Annual yield and capacity factor at a fixed PR of 0.80; `null` on any error.
#[utoipa::path(
    get,
    path = "/api/v1/yield/quick",
    tag = "Yield",
    params(QuickYieldQuery),
    responses(
        (
            status = 200,
            description = "Quick estimate, or null when the input is invalid",
            body = QuickYieldEstimate
        ),
    )
)]
pub async fn get_quick_yield(
    Query(query): Query<QuickYieldQuery>,
) -> Json<Option<QuickYieldEstimate>> {
    Json(crate::services::yield_calculator::get_quick_yield_estimate(
        query.latitude,
        query.longitude,
        query.capacity_kwp,
    ))
}

/// Performance ratio and loss breakdown for the given assumptions.
#[utoipa::path(
    get,
    path = "/api/v1/performance-ratio",
    tag = "Performance ratio",
    params(PerformanceRatioQuery),
    responses(
        (status = 200, description = "Performance ratio", body = PerformanceRatioResponse),
        (status = 400, description = "Invalid assumptions", body = ErrorResponse),
    )
)]
pub async fn get_performance_ratio(
    Query(query): Query<PerformanceRatioQuery>,
) -> Result<Json<PerformanceRatioResponse>, AppError> {
    let assumptions = LossAssumptions {
        temp_coeff_pmax_percent_per_c: query.temp_coeff_pmax_percent_per_c,
        noct_c: query.noct_c,
        inverter_efficiency_percent: query.inverter_efficiency_percent,
        ambient_temp_c: query.ambient_temp_c,
        irradiance_w_m2: query.irradiance_w_m2,
        soiling_percent: query.soiling_percent,
        shading_percent: query.shading_percent,
        wiring_percent: query.wiring_percent,
        mismatch_percent: query.mismatch_percent,
        availability_percent: query.availability_percent,
        other_percent: query.other_percent,
    };
    validation::validate_loss_assumptions(&assumptions)?;

    let ambient_default = match query.latitude {
        Some(lat) => {
            validation::validate_location(lat, 0.0)?;
            lookup_ambient_temperature(lat)
        }
        None => DEFAULT_AMBIENT_TEMP_C,
    };

    let result =
        calculate_performance_ratio_resolved(resolve_assumptions(&assumptions, ambient_default));
    let quality = get_pr_quality_description(result.performance_ratio);
    Ok(Json(PerformanceRatioResponse { result, quality }))
}
