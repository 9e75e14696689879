//! Stats module - descriptive statistics of towers and bells

pub mod calculator;

pub use calculator::{CountryStats, QuantityStats, StatsCalculator};
