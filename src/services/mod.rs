pub mod cache;
pub mod ghi_lookup;
pub mod performance_ratio;
pub mod pvgis;
pub mod validation;
pub mod yield_calculator;
