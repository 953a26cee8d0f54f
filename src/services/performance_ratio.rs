//! Performance-ratio loss decomposition.
//!
//! Converts module, inverter and site assumptions into a single performance
//! ratio (PR) plus a per-mechanism loss breakdown. The eight loss mechanisms
//! are treated as independent and applied one after another to the power
//! left over by the previous ones:
//!
//! ```text
//! PR = Π (1 - loss_i / 100)
//! total_loss_percent = (1 - PR) * 100
//! ```
//!
//! Pure functions, no I/O.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{LossAssumptions, LossBreakdown, ResolvedAssumptions};

// ---------------------------------------------------------------------------
// Defaults (business assumptions for crystalline-silicon fixed-tilt systems)
// ---------------------------------------------------------------------------

/// Pmax temperature coefficient, %/°C.
pub const DEFAULT_TEMP_COEFF_PERCENT_PER_C: f64 = -0.35;

/// Nominal operating cell temperature, °C.
pub const DEFAULT_NOCT_C: f64 = 45.0;

pub const DEFAULT_INVERTER_EFFICIENCY_PERCENT: f64 = 97.5;

/// Ambient temperature used when no location context is available, °C.
pub const DEFAULT_AMBIENT_TEMP_C: f64 = 25.0;

/// Representative irradiance for the cell-temperature model (NOCT conditions), W/m².
pub const DEFAULT_IRRADIANCE_W_M2: f64 = 800.0;

pub const DEFAULT_SOILING_PERCENT: f64 = 2.0;
pub const DEFAULT_SHADING_PERCENT: f64 = 3.0;
pub const DEFAULT_WIRING_PERCENT: f64 = 2.0;
pub const DEFAULT_MISMATCH_PERCENT: f64 = 2.0;
pub const DEFAULT_AVAILABILITY_PERCENT: f64 = 1.0;
pub const DEFAULT_OTHER_PERCENT: f64 = 1.0;

/// STC cell temperature, °C.
const STC_TEMPERATURE_C: f64 = 25.0;

/// Upper bound for the temperature loss so PR stays strictly positive.
const MAX_TEMPERATURE_LOSS_PERCENT: f64 = 99.0;

// Quality bands (fixed business thresholds)
const PR_EXCELLENT: f64 = 0.82;
const PR_GOOD: f64 = 0.78;
const PR_AVERAGE: f64 = 0.74;

/// Output of `calculate_performance_ratio`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PerformanceRatioResult {
    /// Overall efficiency multiplier, (0, 1]
    pub performance_ratio: f64,
    pub losses: LossBreakdown,
    /// Modelled operating cell temperature, °C
    pub cell_temperature_c: f64,
    pub assumptions_used: ResolvedAssumptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PrRating {
    Excellent,
    Good,
    Average,
    Poor,
}

/// Human-readable classification of a performance ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrQuality {
    pub rating: PrRating,
    pub description: String,
}

/// NOCT cell-temperature model: T_cell = T_amb + (NOCT - 20) * G / 800.
pub fn calculate_cell_temperature(ambient_temp_c: f64, irradiance_w_m2: f64, noct_c: f64) -> f64 {
    ambient_temp_c + (noct_c - 20.0) * irradiance_w_m2 / 800.0
}

/// Power loss from operating above STC temperature, in percent.
///
/// Cells at or below 25 °C get no credit: the loss floors at 0.
pub fn calculate_temperature_loss(cell_temp_c: f64, temp_coeff_percent_per_c: f64) -> f64 {
    ((cell_temp_c - STC_TEMPERATURE_C) * temp_coeff_percent_per_c.abs())
        .clamp(0.0, MAX_TEMPERATURE_LOSS_PERCENT)
}

/// Fill every absent assumption with its default.
///
/// `ambient_default` is the location-derived ambient temperature when the
/// caller knows the site, otherwise `DEFAULT_AMBIENT_TEMP_C`.
pub fn resolve_assumptions(input: &LossAssumptions, ambient_default: f64) -> ResolvedAssumptions {
    ResolvedAssumptions {
        temp_coeff_pmax_percent_per_c: input
            .temp_coeff_pmax_percent_per_c
            .unwrap_or(DEFAULT_TEMP_COEFF_PERCENT_PER_C),
        noct_c: input.noct_c.unwrap_or(DEFAULT_NOCT_C),
        inverter_efficiency_percent: input
            .inverter_efficiency_percent
            .unwrap_or(DEFAULT_INVERTER_EFFICIENCY_PERCENT),
        ambient_temp_c: input.ambient_temp_c.unwrap_or(ambient_default),
        irradiance_w_m2: input.irradiance_w_m2.unwrap_or(DEFAULT_IRRADIANCE_W_M2),
        soiling_percent: input.soiling_percent.unwrap_or(DEFAULT_SOILING_PERCENT),
        shading_percent: input.shading_percent.unwrap_or(DEFAULT_SHADING_PERCENT),
        wiring_percent: input.wiring_percent.unwrap_or(DEFAULT_WIRING_PERCENT),
        mismatch_percent: input.mismatch_percent.unwrap_or(DEFAULT_MISMATCH_PERCENT),
        availability_percent: input
            .availability_percent
            .unwrap_or(DEFAULT_AVAILABILITY_PERCENT),
        other_percent: input.other_percent.unwrap_or(DEFAULT_OTHER_PERCENT),
    }
}

/// Compute PR and loss breakdown, applying defaults for absent fields.
pub fn calculate_performance_ratio(input: &LossAssumptions) -> PerformanceRatioResult {
    calculate_performance_ratio_resolved(resolve_assumptions(input, DEFAULT_AMBIENT_TEMP_C))
}

/// Compute PR and loss breakdown from fully resolved assumptions.
pub fn calculate_performance_ratio_resolved(
    assumptions: ResolvedAssumptions,
) -> PerformanceRatioResult {
    let cell_temperature_c = calculate_cell_temperature(
        assumptions.ambient_temp_c,
        assumptions.irradiance_w_m2,
        assumptions.noct_c,
    );
    let temperature = calculate_temperature_loss(
        cell_temperature_c,
        assumptions.temp_coeff_pmax_percent_per_c,
    );
    let inverter = 100.0 - assumptions.inverter_efficiency_percent;

    let terms = [
        temperature,
        inverter,
        assumptions.soiling_percent,
        assumptions.shading_percent,
        assumptions.wiring_percent,
        assumptions.mismatch_percent,
        assumptions.availability_percent,
        assumptions.other_percent,
    ];
    let performance_ratio: f64 = terms.iter().map(|loss| 1.0 - loss / 100.0).product();

    PerformanceRatioResult {
        performance_ratio,
        losses: LossBreakdown {
            temperature,
            inverter,
            soiling: assumptions.soiling_percent,
            shading: assumptions.shading_percent,
            wiring: assumptions.wiring_percent,
            mismatch: assumptions.mismatch_percent,
            availability: assumptions.availability_percent,
            other: assumptions.other_percent,
            total_loss_percent: (1.0 - performance_ratio) * 100.0,
        },
        cell_temperature_c,
        assumptions_used: assumptions,
    }
}

/// Classify a PR into a quality band.
pub fn get_pr_quality_description(performance_ratio: f64) -> PrQuality {
    let (rating, description) = if performance_ratio >= PR_EXCELLENT {
        (
            PrRating::Excellent,
            "Excellent: well-ventilated modules, low losses and a high-efficiency inverter",
        )
    } else if performance_ratio >= PR_GOOD {
        (
            PrRating::Good,
            "Good: typical of a well-designed modern installation",
        )
    } else if performance_ratio >= PR_AVERAGE {
        (
            PrRating::Average,
            "Average: review shading, soiling and cabling assumptions",
        )
    } else {
        (
            PrRating::Poor,
            "Poor: significant losses, check temperature, shading and component choices",
        )
    };

    PrQuality {
        rating,
        description: description.to_string(),
    }
}
