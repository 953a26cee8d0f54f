//! Input guards for every engine entry point.
//!
//! All checks run before any lookup or network work and report a
//! `YieldError::Validation` with a message naming the offending field.

use crate::errors::YieldError;
use crate::models::LossAssumptions;

/// True iff both values are finite and inside the geographic domain.
pub fn is_valid_coordinates(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude)
}

pub fn is_valid_capacity(capacity_kwp: f64) -> bool {
    capacity_kwp.is_finite() && capacity_kwp > 0.0
}

pub fn validate_location(latitude: f64, longitude: f64) -> Result<(), YieldError> {
    if is_valid_coordinates(latitude, longitude) {
        Ok(())
    } else {
        Err(YieldError::Validation(format!(
            "invalid coordinates ({}, {}): latitude must be in [-90, 90] and longitude in [-180, 180]",
            latitude, longitude
        )))
    }
}

pub fn validate_capacity(capacity_kwp: f64) -> Result<(), YieldError> {
    if is_valid_capacity(capacity_kwp) {
        Ok(())
    } else {
        Err(YieldError::Validation(format!(
            "invalid capacity {} kWp: must be a finite number greater than 0",
            capacity_kwp
        )))
    }
}

/// Loss percentages must lie in [0, 100).
pub fn validate_loss_percent(name: &str, value: f64) -> Result<(), YieldError> {
    if value.is_finite() && (0.0..100.0).contains(&value) {
        Ok(())
    } else {
        Err(YieldError::Validation(format!(
            "{} must be in [0, 100), got {}",
            name, value
        )))
    }
}

pub fn validate_tilt(tilt_angle: f64) -> Result<(), YieldError> {
    if tilt_angle.is_finite() && (0.0..=90.0).contains(&tilt_angle) {
        Ok(())
    } else {
        Err(YieldError::Validation(format!(
            "tilt_angle must be in [0, 90] degrees, got {}",
            tilt_angle
        )))
    }
}

pub fn validate_azimuth(azimuth: f64) -> Result<(), YieldError> {
    if azimuth.is_finite() && (0.0..=360.0).contains(&azimuth) {
        Ok(())
    } else {
        Err(YieldError::Validation(format!(
            "azimuth must be in [0, 360] degrees, got {}",
            azimuth
        )))
    }
}

/// Check every caller-supplied assumption; absent fields are not checked.
pub fn validate_loss_assumptions(assumptions: &LossAssumptions) -> Result<(), YieldError> {
    let percents = [
        ("soiling_percent", assumptions.soiling_percent),
        ("shading_percent", assumptions.shading_percent),
        ("wiring_percent", assumptions.wiring_percent),
        ("mismatch_percent", assumptions.mismatch_percent),
        ("availability_percent", assumptions.availability_percent),
        ("other_percent", assumptions.other_percent),
    ];
    for (name, value) in percents {
        if let Some(v) = value {
            validate_loss_percent(name, v)?;
        }
    }

    if let Some(eff) = assumptions.inverter_efficiency_percent {
        if !(eff.is_finite() && eff > 0.0 && eff <= 100.0) {
            return Err(YieldError::Validation(format!(
                "inverter_efficiency_percent must be in (0, 100], got {}",
                eff
            )));
        }
    }

    if let Some(coeff) = assumptions.temp_coeff_pmax_percent_per_c {
        if !(coeff.is_finite() && coeff <= 0.0) {
            return Err(YieldError::Validation(format!(
                "temp_coeff_pmax_percent_per_c must be a finite value <= 0, got {}",
                coeff
            )));
        }
    }

    if let Some(irradiance) = assumptions.irradiance_w_m2 {
        if !(irradiance.is_finite() && irradiance >= 0.0) {
            return Err(YieldError::Validation(format!(
                "irradiance_w_m2 must be a finite value >= 0, got {}",
                irradiance
            )));
        }
    }

    for (name, value) in [
        ("noct_c", assumptions.noct_c),
        ("ambient_temp_c", assumptions.ambient_temp_c),
    ] {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(YieldError::Validation(format!(
                    "{} must be finite, got {}",
                    name, v
                )));
            }
        }
    }

    Ok(())
}
