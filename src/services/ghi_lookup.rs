//! Offline latitude-band irradiance table.
//!
//! Used when the remote yield service is unreachable or does not cover a
//! location. Each band carries a typical annual global horizontal irradiance,
//! the share of that energy falling in each calendar month, and an average
//! ambient temperature.
//!
//! The bands partition [-90, 90]: each covers `[latitude_min, latitude_max)`
//! except the last, which is closed at 90. Southern-hemisphere monthly
//! profiles are the northern ones shifted by six months.

use serde::Serialize;

use crate::errors::YieldError;

/// One static latitude band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GhiLookupEntry {
    pub latitude_min: f64,
    pub latitude_max: f64,
    /// Annual global horizontal irradiance, kWh/m²
    pub annual_ghi: f64,
    pub monthly_factors: [f64; 12],
    pub avg_temperature_c: f64,
    pub climate_zone: &'static str,
}

/// Yield figures derived from a lookup band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LookupYield {
    pub annual_yield_kwh: f64,
    pub annual_ghi: f64,
    pub monthly_yield_kwh: [f64; 12],
    pub monthly_factors: [f64; 12],
}

// ---------------------------------------------------------------------------
// Monthly distribution profiles (Jan..Dec)
// ---------------------------------------------------------------------------

const POLAR_NORTH: [f64; 12] = [
    0.005, 0.025, 0.075, 0.125, 0.175, 0.185, 0.170, 0.125, 0.070, 0.030, 0.010, 0.005,
];
const SUBPOLAR_NORTH: [f64; 12] = [
    0.020, 0.040, 0.075, 0.110, 0.140, 0.150, 0.145, 0.115, 0.085, 0.055, 0.035, 0.030,
];
const TEMPERATE_NORTH: [f64; 12] = [
    0.035, 0.050, 0.080, 0.105, 0.125, 0.130, 0.132, 0.115, 0.090, 0.065, 0.040, 0.033,
];
const SUBTROPICAL_NORTH: [f64; 12] = [
    0.060, 0.066, 0.083, 0.092, 0.101, 0.103, 0.104, 0.099, 0.087, 0.077, 0.065, 0.063,
];
const TROPICAL_NORTH: [f64; 12] = [
    0.078, 0.079, 0.089, 0.088, 0.087, 0.081, 0.080, 0.083, 0.083, 0.086, 0.082, 0.084,
];
const EQUATORIAL: [f64; 12] = [
    0.083, 0.082, 0.086, 0.084, 0.083, 0.079, 0.081, 0.085, 0.086, 0.087, 0.081, 0.083,
];
const TROPICAL_SOUTH: [f64; 12] = [
    0.080, 0.083, 0.083, 0.086, 0.082, 0.084, 0.078, 0.079, 0.089, 0.088, 0.087, 0.081,
];
const SUBTROPICAL_SOUTH: [f64; 12] = [
    0.104, 0.099, 0.087, 0.077, 0.065, 0.063, 0.060, 0.066, 0.083, 0.092, 0.101, 0.103,
];
const TEMPERATE_SOUTH: [f64; 12] = [
    0.132, 0.115, 0.090, 0.065, 0.040, 0.033, 0.035, 0.050, 0.080, 0.105, 0.125, 0.130,
];
const SUBPOLAR_SOUTH: [f64; 12] = [
    0.145, 0.115, 0.085, 0.055, 0.035, 0.030, 0.020, 0.040, 0.075, 0.110, 0.140, 0.150,
];
const POLAR_SOUTH: [f64; 12] = [
    0.170, 0.125, 0.070, 0.030, 0.010, 0.005, 0.005, 0.025, 0.075, 0.125, 0.175, 0.185,
];

const fn band(
    latitude_min: f64,
    latitude_max: f64,
    annual_ghi: f64,
    monthly_factors: [f64; 12],
    avg_temperature_c: f64,
    climate_zone: &'static str,
) -> GhiLookupEntry {
    GhiLookupEntry {
        latitude_min,
        latitude_max,
        annual_ghi,
        monthly_factors,
        avg_temperature_c,
        climate_zone,
    }
}

/// Latitude bands ordered south to north.
pub static GHI_LOOKUP_TABLE: [GhiLookupEntry; 12] = [
    band(-90.0, -65.0, 700.0, POLAR_SOUTH, -15.0, "polar"),
    band(-65.0, -55.0, 950.0, SUBPOLAR_SOUTH, 3.0, "subpolar"),
    band(-55.0, -35.0, 1300.0, TEMPERATE_SOUTH, 12.0, "temperate"),
    band(-35.0, -20.0, 1900.0, SUBTROPICAL_SOUTH, 19.0, "subtropical"),
    band(-20.0, -10.0, 2000.0, TROPICAL_SOUTH, 24.0, "tropical"),
    band(-10.0, 10.0, 1800.0, EQUATORIAL, 26.0, "equatorial"),
    band(10.0, 20.0, 2050.0, TROPICAL_NORTH, 27.0, "tropical"),
    band(20.0, 35.0, 1950.0, SUBTROPICAL_NORTH, 21.0, "subtropical"),
    band(35.0, 45.0, 1500.0, TEMPERATE_NORTH, 14.0, "warm temperate"),
    band(45.0, 55.0, 1100.0, TEMPERATE_NORTH, 9.0, "temperate"),
    band(55.0, 65.0, 900.0, SUBPOLAR_NORTH, 4.0, "subpolar"),
    band(65.0, 90.0, 700.0, POLAR_NORTH, -8.0, "polar"),
];

/// Tolerance for the monthly-factor sum invariant.
const FACTOR_SUM_EPSILON: f64 = 1e-6;

/// Select the band containing `latitude`.
///
/// Latitudes outside [-90, 90] never get here (the validator rejects them
/// first); they are clamped onto the nearest edge band.
pub fn lookup_ghi(latitude: f64) -> &'static GhiLookupEntry {
    let last = GHI_LOOKUP_TABLE.len() - 1;
    GHI_LOOKUP_TABLE
        .iter()
        .position(|entry| latitude < entry.latitude_max)
        .map(|i| &GHI_LOOKUP_TABLE[i])
        .unwrap_or(&GHI_LOOKUP_TABLE[last])
}

/// Average ambient temperature of the band containing `latitude`, °C.
pub fn lookup_ambient_temperature(latitude: f64) -> f64 {
    lookup_ghi(latitude).avg_temperature_c
}

/// Estimate annual and monthly yield from the band's horizontal irradiance.
///
/// annual = GHI × kWp × PR. The flat table has no plane-of-array data, so
/// GHI (kWh/m²) stands in for POA peak-sun-hours.
pub fn estimate_yield_from_lookup(
    latitude: f64,
    capacity_kwp: f64,
    performance_ratio: f64,
) -> LookupYield {
    let entry = lookup_ghi(latitude);
    let annual_yield_kwh = entry.annual_ghi * capacity_kwp * performance_ratio;

    LookupYield {
        annual_yield_kwh,
        annual_ghi: entry.annual_ghi,
        monthly_yield_kwh: distribute_monthly(annual_yield_kwh, &entry.monthly_factors),
        monthly_factors: entry.monthly_factors,
    }
}

/// Split an annual figure across months by `factors`.
pub fn distribute_monthly(annual: f64, factors: &[f64; 12]) -> [f64; 12] {
    factors.map(|f| annual * f)
}

/// Fixed-tilt heuristic: tilt equal to the absolute latitude.
pub fn get_optimal_tilt(latitude: f64) -> f64 {
    latitude.abs()
}

/// Equator-facing azimuth in the engine's convention (180 = south).
pub fn get_optimal_azimuth(latitude: f64) -> f64 {
    if latitude >= 0.0 {
        180.0
    } else {
        0.0
    }
}

/// Check that the bands partition [-90, 90] and every factor set sums to 1.
pub fn validate_table(table: &[GhiLookupEntry]) -> Result<(), YieldError> {
    let first = table
        .first()
        .ok_or_else(|| YieldError::LookupInvariant("lookup table is empty".to_string()))?;
    if first.latitude_min != -90.0 {
        return Err(YieldError::LookupInvariant(format!(
            "first band starts at {} instead of -90",
            first.latitude_min
        )));
    }

    for pair in table.windows(2) {
        if pair[0].latitude_max != pair[1].latitude_min {
            return Err(YieldError::LookupInvariant(format!(
                "bands [{}, {}) and [{}, {}) are not contiguous",
                pair[0].latitude_min,
                pair[0].latitude_max,
                pair[1].latitude_min,
                pair[1].latitude_max
            )));
        }
    }

    if let Some(last) = table.last() {
        if last.latitude_max != 90.0 {
            return Err(YieldError::LookupInvariant(format!(
                "last band ends at {} instead of 90",
                last.latitude_max
            )));
        }
    }

    for entry in table {
        if entry.latitude_min >= entry.latitude_max {
            return Err(YieldError::LookupInvariant(format!(
                "band [{}, {}) is empty",
                entry.latitude_min, entry.latitude_max
            )));
        }
        let sum: f64 = entry.monthly_factors.iter().sum();
        if (sum - 1.0).abs() > FACTOR_SUM_EPSILON {
            return Err(YieldError::LookupInvariant(format!(
                "monthly factors of band [{}, {}) sum to {}",
                entry.latitude_min, entry.latitude_max, sum
            )));
        }
        if entry.annual_ghi <= 0.0 {
            return Err(YieldError::LookupInvariant(format!(
                "band [{}, {}) has non-positive GHI {}",
                entry.latitude_min, entry.latitude_max, entry.annual_ghi
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_table_is_valid() {
        assert!(validate_table(&GHI_LOOKUP_TABLE).is_ok());
    }

    #[test]
    fn test_every_latitude_hits_exactly_one_band() {
        let mut lat = -90.0;
        while lat <= 90.0 {
            let hits = GHI_LOOKUP_TABLE
                .iter()
                .filter(|e| {
                    (lat >= e.latitude_min && lat < e.latitude_max)
                        || (e.latitude_max == 90.0 && lat == 90.0)
                })
                .count();
            assert_eq!(hits, 1, "latitude {} matched {} bands", lat, hits);

            let entry = lookup_ghi(lat);
            assert!(lat >= entry.latitude_min);
            assert!(lat < entry.latitude_max || lat == 90.0);
            lat += 0.25;
        }
    }

    #[test]
    fn test_band_edges() {
        assert_eq!(lookup_ghi(-90.0).latitude_min, -90.0);
        assert_eq!(lookup_ghi(90.0).latitude_max, 90.0);
        // Lower edge is inclusive, upper edge exclusive
        assert_eq!(lookup_ghi(45.0).latitude_min, 45.0);
        assert_eq!(lookup_ghi(44.999).latitude_max, 45.0);
    }

    #[test]
    fn test_london_band() {
        let entry = lookup_ghi(51.5);
        assert_eq!(entry.annual_ghi, 1100.0);
        assert_eq!(entry.climate_zone, "temperate");
    }

    #[test]
    fn test_estimate_yield_from_lookup() {
        let result = estimate_yield_from_lookup(51.5, 10.0, 0.8);
        assert!((result.annual_yield_kwh - 8800.0).abs() < 1e-9);
        let monthly_sum: f64 = result.monthly_yield_kwh.iter().sum();
        assert!((monthly_sum - result.annual_yield_kwh).abs() < 1e-6);
        let factor_sum: f64 = result.monthly_factors.iter().sum();
        assert!((factor_sum - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let a = estimate_yield_from_lookup(-33.9, 250.0, 0.81);
        let b = estimate_yield_from_lookup(-33.9, 250.0, 0.81);
        assert_eq!(a, b);
    }

    #[test]
    fn test_southern_summer_peaks_in_december_january() {
        let south = lookup_ghi(-40.0);
        let north = lookup_ghi(40.0);
        assert!(south.monthly_factors[0] > south.monthly_factors[6]);
        assert!(north.monthly_factors[6] > north.monthly_factors[0]);
    }

    #[test]
    fn test_optimal_orientation() {
        assert_eq!(get_optimal_tilt(-33.9), 33.9);
        assert_eq!(get_optimal_azimuth(51.5), 180.0);
        assert_eq!(get_optimal_azimuth(0.0), 180.0);
        assert_eq!(get_optimal_azimuth(-0.1), 0.0);
    }

    #[test]
    fn test_validate_table_detects_gap() {
        let mut table = GHI_LOOKUP_TABLE;
        table[3].latitude_max = -21.0;
        let err = validate_table(&table).unwrap_err();
        assert!(matches!(err, YieldError::LookupInvariant(_)));
    }

    #[test]
    fn test_validate_table_detects_bad_factor_sum() {
        let mut table = GHI_LOOKUP_TABLE;
        table[5].monthly_factors[0] += 0.01;
        assert!(validate_table(&table).is_err());
    }
}
