//! Yield calculation orchestrator.
//!
//! Resolution flow for `calculate_yield`:
//!   1. Validate coordinates, capacity and any supplied assumptions
//!   2. Resolve tilt/azimuth/system losses and loss assumptions into one
//!      fully populated record
//!   3. Compute the performance ratio locally (independent of data source)
//!   4. Try PVGIS (subject to `CoveragePolicy`); on success merge its yield
//!      and irradiance with the local PR → `source = remote`
//!   5. On any remote failure, or when the attempt was skipped, use the
//!      latitude lookup table → `source = lookup`
//!
//! The public entry points never return `Err`: failures become a
//! `YieldCalculationResult` with `success = false`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::errors::YieldError;
use crate::models::{
    Location, QuickYieldEstimate, ResolvedAssumptions, SystemConfig, YieldCalculationResult,
    YieldEstimate, YieldInput, YieldSource,
};
use crate::services::ghi_lookup::{
    distribute_monthly, estimate_yield_from_lookup, get_optimal_azimuth, get_optimal_tilt,
    lookup_ambient_temperature, lookup_ghi, validate_table, GHI_LOOKUP_TABLE,
};
use crate::services::performance_ratio::{
    calculate_performance_ratio_resolved, resolve_assumptions, PerformanceRatioResult,
};
use crate::services::pvgis::{
    extract_yield_data, is_pvgis_coverage_area, PvgisClient, PvgisParams,
};
use crate::services::validation;

/// Lumped system loss sent to PVGIS when the caller gives none (PVGIS default), percent.
pub const DEFAULT_SYSTEM_LOSS_PERCENT: f64 = 14.0;

/// Fixed PR assumed by `get_quick_yield_estimate`.
pub const QUICK_ESTIMATE_PERFORMANCE_RATIO: f64 = 0.80;

const HOURS_PER_YEAR: f64 = 8760.0;

/// How the coverage heuristic influences the remote attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CoveragePolicy {
    /// Always try the remote service; rely on its coverage error for correctness.
    #[default]
    Advisory,
    /// Skip the remote call when the heuristic says the location is not covered.
    SkipUncovered,
}

impl std::str::FromStr for CoveragePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(CoveragePolicy::Advisory),
            "skip_uncovered" => Ok(CoveragePolicy::SkipUncovered),
            other => Err(format!("unknown coverage policy '{}'", other)),
        }
    }
}

/// Input after validation and default resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedInput {
    pub location: Location,
    pub system_config: SystemConfig,
    pub assumptions: ResolvedAssumptions,
    pub database: Option<String>,
    pub use_cache: bool,
}

/// Validate `input` and fill every absent field with its default.
pub fn resolve_input(input: &YieldInput) -> Result<ResolvedInput, YieldError> {
    validation::validate_location(input.latitude, input.longitude)?;
    validation::validate_capacity(input.capacity_kwp)?;
    validation::validate_loss_assumptions(&input.loss_assumptions)?;

    let tilt_angle = input
        .tilt_angle
        .unwrap_or_else(|| get_optimal_tilt(input.latitude));
    let azimuth = input
        .azimuth
        .unwrap_or_else(|| get_optimal_azimuth(input.latitude));
    let system_losses_percent = input
        .system_losses_percent
        .unwrap_or(DEFAULT_SYSTEM_LOSS_PERCENT);

    validation::validate_tilt(tilt_angle)?;
    validation::validate_azimuth(azimuth)?;
    validation::validate_loss_percent("system_losses_percent", system_losses_percent)?;

    Ok(ResolvedInput {
        location: Location {
            latitude: input.latitude,
            longitude: input.longitude,
        },
        system_config: SystemConfig {
            capacity_kwp: input.capacity_kwp,
            tilt_angle,
            azimuth,
            system_losses_percent,
        },
        assumptions: resolve_assumptions(
            &input.loss_assumptions,
            lookup_ambient_temperature(input.latitude),
        ),
        database: input.database.clone(),
        use_cache: input.use_cache,
    })
}

/// Annual yield / (capacity × 8760 h).
pub fn capacity_factor(annual_yield_kwh: f64, capacity_kwp: f64) -> f64 {
    if capacity_kwp <= 0.0 {
        return 0.0;
    }
    annual_yield_kwh / (capacity_kwp * HOURS_PER_YEAR)
}

/// Annual yield per installed kWp.
pub fn specific_yield(annual_yield_kwh: f64, capacity_kwp: f64) -> f64 {
    if capacity_kwp <= 0.0 {
        return 0.0;
    }
    annual_yield_kwh / capacity_kwp
}

/// Monthly shares of the annual total; `None` if the total is not positive.
fn normalize_monthly(monthly: &[f64; 12]) -> Option<[f64; 12]> {
    let total: f64 = monthly.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return None;
    }
    Some(monthly.map(|m| m / total))
}

/// Yield figures from one source, before they are merged with the PR.
struct SourceYield {
    source: YieldSource,
    annual_yield_kwh: f64,
    annual_ghi_kwh_per_m2: f64,
    annual_poa_kwh_per_m2: Option<f64>,
    monthly_yield_kwh: [f64; 12],
    monthly_factors: [f64; 12],
}

fn build_estimate(
    resolved: &ResolvedInput,
    pr: &PerformanceRatioResult,
    source: SourceYield,
) -> YieldEstimate {
    let capacity = resolved.system_config.capacity_kwp;
    YieldEstimate {
        source: source.source,
        calculated_at: Utc::now(),
        location: resolved.location,
        system_config: resolved.system_config,
        annual_yield_kwh: source.annual_yield_kwh,
        annual_ghi_kwh_per_m2: source.annual_ghi_kwh_per_m2,
        annual_poa_kwh_per_m2: source.annual_poa_kwh_per_m2,
        monthly_yield_kwh: source.monthly_yield_kwh,
        monthly_factors: source.monthly_factors,
        performance_ratio: pr.performance_ratio,
        losses: pr.losses,
        specific_yield_kwh_per_kwp: specific_yield(source.annual_yield_kwh, capacity),
        capacity_factor: capacity_factor(source.annual_yield_kwh, capacity),
    }
}

fn lookup_source(
    resolved: &ResolvedInput,
    pr: &PerformanceRatioResult,
) -> Result<SourceYield, YieldError> {
    // Only fails if the static table itself is broken.
    validate_table(&GHI_LOOKUP_TABLE)?;

    let lookup = estimate_yield_from_lookup(
        resolved.location.latitude,
        resolved.system_config.capacity_kwp,
        pr.performance_ratio,
    );
    Ok(SourceYield {
        source: YieldSource::Lookup,
        annual_yield_kwh: lookup.annual_yield_kwh,
        annual_ghi_kwh_per_m2: lookup.annual_ghi,
        annual_poa_kwh_per_m2: None,
        monthly_yield_kwh: lookup.monthly_yield_kwh,
        monthly_factors: lookup.monthly_factors,
    })
}

/// Composes validation, PR model, PVGIS client and lookup table.
#[derive(Debug, Clone)]
pub struct YieldCalculator {
    client: PvgisClient,
    coverage_policy: CoveragePolicy,
}

impl YieldCalculator {
    pub fn new(client: PvgisClient, coverage_policy: CoveragePolicy) -> Self {
        Self {
            client,
            coverage_policy,
        }
    }

    pub fn client(&self) -> &PvgisClient {
        &self.client
    }

    pub fn coverage_policy(&self) -> CoveragePolicy {
        self.coverage_policy
    }

    /// Full calculation: remote service first, lookup table as fallback.
    pub async fn calculate_yield(&self, input: &YieldInput) -> YieldCalculationResult {
        match self.try_calculate_yield(input).await {
            Ok(estimate) => YieldCalculationResult::ok(estimate),
            Err(e @ YieldError::LookupInvariant(_)) => {
                tracing::error!("Yield calculation failed: {}", e);
                YieldCalculationResult::failed(e)
            }
            Err(e) => {
                tracing::warn!("Yield calculation rejected: {}", e);
                YieldCalculationResult::failed(e)
            }
        }
    }

    async fn try_calculate_yield(&self, input: &YieldInput) -> Result<YieldEstimate, YieldError> {
        let resolved = resolve_input(input)?;
        let pr = calculate_performance_ratio_resolved(resolved.assumptions);

        let remote_error = match self.attempt_remote(&resolved).await {
            Some(Ok(source)) => return Ok(build_estimate(&resolved, &pr, source)),
            Some(Err(e)) if !e.is_fallback_eligible() => return Err(e),
            Some(Err(e)) => {
                tracing::warn!(
                    "PVGIS unavailable for ({:.4}, {:.4}), falling back to lookup table: {}",
                    resolved.location.latitude,
                    resolved.location.longitude,
                    e
                );
                Some(e)
            }
            None => None,
        };

        match lookup_source(&resolved, &pr) {
            Ok(source) => Ok(build_estimate(&resolved, &pr, source)),
            // Prefer the remote error when both failed: it is the more specific one.
            Err(lookup_error) => Err(remote_error.unwrap_or(lookup_error)),
        }
    }

    /// `None` when the policy skipped the remote attempt.
    async fn attempt_remote(
        &self,
        resolved: &ResolvedInput,
    ) -> Option<Result<SourceYield, YieldError>> {
        let Location {
            latitude,
            longitude,
        } = resolved.location;

        if self.coverage_policy == CoveragePolicy::SkipUncovered
            && !is_pvgis_coverage_area(latitude, longitude)
        {
            tracing::debug!(
                "({:.4}, {:.4}) outside PVGIS coverage hint, skipping remote attempt",
                latitude,
                longitude
            );
            return None;
        }

        let params = PvgisParams {
            latitude,
            longitude,
            peak_power_kwp: resolved.system_config.capacity_kwp,
            system_loss_percent: resolved.system_config.system_losses_percent,
            tilt_angle: resolved.system_config.tilt_angle,
            azimuth: resolved.system_config.azimuth,
            database: resolved.database.clone(),
        };

        let result = self
            .client
            .fetch_remote_yield(&params, resolved.use_cache)
            .await
            .and_then(|response| {
                let data = extract_yield_data(&response);
                let monthly_factors = normalize_monthly(&data.monthly_yield).ok_or_else(|| {
                    YieldError::MalformedResponse("monthly yields sum to zero".to_string())
                })?;
                Ok(SourceYield {
                    source: YieldSource::Remote,
                    annual_yield_kwh: data.annual_yield,
                    // PVcalc reports in-plane irradiation only; horizontal comes from the table.
                    annual_ghi_kwh_per_m2: lookup_ghi(latitude).annual_ghi,
                    annual_poa_kwh_per_m2: Some(data.annual_irradiance),
                    monthly_yield_kwh: data.monthly_yield,
                    monthly_factors,
                })
            });
        Some(result)
    }

    /// Lookup-only calculation; synchronous and free of network I/O.
    pub fn calculate_yield_offline(&self, input: &YieldInput) -> YieldCalculationResult {
        calculate_yield_offline(input)
    }
}

/// Lookup-only calculation; synchronous and free of network I/O.
pub fn calculate_yield_offline(input: &YieldInput) -> YieldCalculationResult {
    let result = resolve_input(input).and_then(|resolved| {
        let pr = calculate_performance_ratio_resolved(resolved.assumptions);
        let source = lookup_source(&resolved, &pr)?;
        Ok(build_estimate(&resolved, &pr, source))
    });

    match result {
        Ok(estimate) => YieldCalculationResult::ok(estimate),
        Err(e) => YieldCalculationResult::failed(e),
    }
}

/// Build an estimate from a user-entered annual yield.
///
/// The figure is distributed over months by the latitude band's profile and
/// reported alongside the locally modelled PR.
pub fn calculate_yield_manual(input: &YieldInput, annual_yield_kwh: f64) -> YieldCalculationResult {
    let result = resolve_input(input).and_then(|resolved| {
        if !(annual_yield_kwh.is_finite() && annual_yield_kwh >= 0.0) {
            return Err(YieldError::Validation(format!(
                "annual_yield_kwh must be a finite value >= 0, got {}",
                annual_yield_kwh
            )));
        }
        let pr = calculate_performance_ratio_resolved(resolved.assumptions);
        let entry = lookup_ghi(resolved.location.latitude);
        let source = SourceYield {
            source: YieldSource::Manual,
            annual_yield_kwh,
            annual_ghi_kwh_per_m2: entry.annual_ghi,
            annual_poa_kwh_per_m2: None,
            monthly_yield_kwh: distribute_monthly(annual_yield_kwh, &entry.monthly_factors),
            monthly_factors: entry.monthly_factors,
        };
        Ok(build_estimate(&resolved, &pr, source))
    });

    match result {
        Ok(estimate) => YieldCalculationResult::ok(estimate),
        Err(e) => YieldCalculationResult::failed(e),
    }
}

/// Degraded-mode estimate for display-only contexts.
///
/// Uses the lookup table with a fixed PR of 0.80 and discards every error
/// detail: any failure yields `None`.
pub fn get_quick_yield_estimate(
    latitude: f64,
    longitude: f64,
    capacity_kwp: f64,
) -> Option<QuickYieldEstimate> {
    if !validation::is_valid_coordinates(latitude, longitude)
        || !validation::is_valid_capacity(capacity_kwp)
    {
        return None;
    }
    let lookup =
        estimate_yield_from_lookup(latitude, capacity_kwp, QUICK_ESTIMATE_PERFORMANCE_RATIO);
    Some(QuickYieldEstimate {
        annual_yield_kwh: lookup.annual_yield_kwh,
        capacity_factor: capacity_factor(lookup.annual_yield_kwh, capacity_kwp),
    })
}
