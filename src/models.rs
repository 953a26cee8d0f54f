//! Records exchanged between the yield engine and its callers.
//!
//! Inputs (`YieldInput`, `LossAssumptions`) keep every optional field as
//! `Option` so callers can omit them; the engine resolves them once into
//! fully populated records (`SystemConfig`, `ResolvedAssumptions`) before any
//! computation starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Geographic position of the installation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    /// Latitude in degrees, [-90, 90]
    pub latitude: f64,
    /// Longitude in degrees, [-180, 180]
    pub longitude: f64,
}

/// Fully resolved system configuration echoed in every estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SystemConfig {
    /// Nominal DC capacity in kWp
    pub capacity_kwp: f64,
    /// Module tilt from horizontal in degrees
    pub tilt_angle: f64,
    /// Module azimuth in degrees, 180 = south
    pub azimuth: f64,
    /// Lumped system losses passed to the remote service, percent
    pub system_losses_percent: f64,
}

/// Optional module, inverter and environment assumptions.
///
/// Every field left as `None` is replaced by the documented default in
/// `services::performance_ratio`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossAssumptions {
    /// Pmax temperature coefficient, %/°C (negative)
    pub temp_coeff_pmax_percent_per_c: Option<f64>,
    /// Nominal operating cell temperature, °C
    pub noct_c: Option<f64>,
    /// Inverter (euro/CEC) efficiency, percent
    pub inverter_efficiency_percent: Option<f64>,
    /// Average ambient temperature, °C
    pub ambient_temp_c: Option<f64>,
    /// Representative irradiance for the cell-temperature model, W/m²
    pub irradiance_w_m2: Option<f64>,
    pub soiling_percent: Option<f64>,
    pub shading_percent: Option<f64>,
    pub wiring_percent: Option<f64>,
    pub mismatch_percent: Option<f64>,
    /// Energy lost to downtime, percent
    pub availability_percent: Option<f64>,
    pub other_percent: Option<f64>,
}

/// `LossAssumptions` with every default applied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ResolvedAssumptions {
    pub temp_coeff_pmax_percent_per_c: f64,
    pub noct_c: f64,
    pub inverter_efficiency_percent: f64,
    pub ambient_temp_c: f64,
    pub irradiance_w_m2: f64,
    pub soiling_percent: f64,
    pub shading_percent: f64,
    pub wiring_percent: f64,
    pub mismatch_percent: f64,
    pub availability_percent: f64,
    pub other_percent: f64,
}

/// Individual loss mechanisms, each in percent of the power remaining before it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LossBreakdown {
    pub temperature: f64,
    pub inverter: f64,
    pub soiling: f64,
    pub shading: f64,
    pub wiring: f64,
    pub mismatch: f64,
    pub availability: f64,
    pub other: f64,
    /// Combined loss, equal to (1 - performance_ratio) * 100
    pub total_loss_percent: f64,
}

/// Where the yield figures of an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum YieldSource {
    Remote,
    Lookup,
    Manual,
}

impl std::fmt::Display for YieldSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YieldSource::Remote => write!(f, "remote"),
            YieldSource::Lookup => write!(f, "lookup"),
            YieldSource::Manual => write!(f, "manual"),
        }
    }
}

/// Annual and monthly yield estimate for one installation.
///
/// Built once per calculation and handed to the caller; the engine keeps no
/// reference to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YieldEstimate {
    pub source: YieldSource,
    pub calculated_at: DateTime<Utc>,
    pub location: Location,
    pub system_config: SystemConfig,
    pub annual_yield_kwh: f64,
    /// Annual global horizontal irradiance, kWh/m²
    pub annual_ghi_kwh_per_m2: f64,
    /// Annual plane-of-array irradiance, kWh/m² (remote source only)
    pub annual_poa_kwh_per_m2: Option<f64>,
    pub monthly_yield_kwh: [f64; 12],
    /// Share of the annual yield per month, sums to 1
    pub monthly_factors: [f64; 12],
    pub performance_ratio: f64,
    pub losses: LossBreakdown,
    /// Annual yield per installed kWp, kWh/kWp
    pub specific_yield_kwh_per_kwp: f64,
    /// Annual yield / (capacity × 8760 h)
    pub capacity_factor: f64,
}

/// Uniform result envelope returned by `calculate_yield`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YieldCalculationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<YieldSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate: Option<YieldEstimate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl YieldCalculationResult {
    pub fn ok(estimate: YieldEstimate) -> Self {
        Self {
            success: true,
            source: Some(estimate.source),
            estimate: Some(estimate),
            error: None,
        }
    }

    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            success: false,
            source: None,
            estimate: None,
            error: Some(error.to_string()),
        }
    }
}

/// Reduced estimate for display-only contexts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuickYieldEstimate {
    pub annual_yield_kwh: f64,
    pub capacity_factor: f64,
}

fn default_use_cache() -> bool {
    true
}

/// Caller-facing request for a yield calculation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct YieldInput {
    pub latitude: f64,
    pub longitude: f64,
    pub capacity_kwp: f64,
    /// Defaults to |latitude|
    pub tilt_angle: Option<f64>,
    /// Defaults to the equator-facing direction (180 north of the equator, 0 south of it)
    pub azimuth: Option<f64>,
    pub system_losses_percent: Option<f64>,
    #[serde(default)]
    pub loss_assumptions: LossAssumptions,
    /// Radiation database name forwarded to the remote service
    pub database: Option<String>,
    #[serde(default = "default_use_cache")]
    pub use_cache: bool,
}

impl YieldInput {
    /// Minimal input: location and capacity, everything else defaulted.
    pub fn new(latitude: f64, longitude: f64, capacity_kwp: f64) -> Self {
        Self {
            latitude,
            longitude,
            capacity_kwp,
            tilt_angle: None,
            azimuth: None,
            system_losses_percent: None,
            loss_assumptions: LossAssumptions::default(),
            database: None,
            use_cache: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&YieldSource::Lookup).unwrap(), "\"lookup\"");
        assert_eq!(YieldSource::Remote.to_string(), "remote");
    }

    #[test]
    fn test_failed_envelope_omits_estimate() {
        let result = YieldCalculationResult::failed("Validation error: latitude out of range");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("estimate").is_none());
        assert!(json["error"].as_str().unwrap().contains("Validation"));
    }

    #[test]
    fn test_input_deserializes_with_defaults() {
        let input: YieldInput = serde_json::from_value(serde_json::json!({
            "latitude": 51.5,
            "longitude": -0.12,
            "capacity_kwp": 10.0
        }))
        .unwrap();
        assert!(input.use_cache);
        assert_eq!(input.tilt_angle, None);
        assert_eq!(input.loss_assumptions, LossAssumptions::default());
    }
}
