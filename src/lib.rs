//! Photovoltaic yield estimation engine.
//!
//! Estimates annual and monthly energy yield for a PV installation from its
//! location and capacity. Yield and irradiance come from PVGIS when it is
//! reachable and covers the site, otherwise from an offline latitude-band
//! table; either way the result carries a locally modelled performance ratio
//! and loss breakdown.
//!
//! ```no_run
//! use std::sync::Arc;
//! use pv_yield_api::models::YieldInput;
//! use pv_yield_api::services::cache::InMemoryResponseCache;
//! use pv_yield_api::services::pvgis::{PvgisClient, PVGIS_DEFAULT_BASE_URL, PVGIS_DEFAULT_TIMEOUT};
//! use pv_yield_api::services::yield_calculator::{CoveragePolicy, YieldCalculator};
//!
//! # async fn run() -> Result<(), pv_yield_api::errors::YieldError> {
//! let cache = Arc::new(InMemoryResponseCache::default());
//! let client = PvgisClient::new(PVGIS_DEFAULT_BASE_URL, PVGIS_DEFAULT_TIMEOUT, cache)?;
//! let calculator = YieldCalculator::new(client, CoveragePolicy::Advisory);
//!
//! let result = calculator.calculate_yield(&YieldInput::new(51.5, -0.12, 10.0)).await;
//! if let Some(estimate) = result.estimate {
//!     println!("{:.0} kWh/year from {}", estimate.annual_yield_kwh, estimate.source);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
mod helpers;
pub mod models;
pub mod routes;
pub mod services;
