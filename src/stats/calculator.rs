//! Statistics Calculator Module
//! Descriptive statistics over the world's towers and bells.

use polars::prelude::*;
use statrs::statistics::Statistics;
use std::collections::BTreeMap;

use crate::data::ProcessorError;
use crate::model::{Bell, Tower, World};

/// Descriptive statistics for one quantity.
#[derive(Debug, Clone)]
pub struct QuantityStats {
    pub quantity: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p05: f64,
    pub p95: f64,
}

impl Default for QuantityStats {
    fn default() -> Self {
        Self {
            quantity: String::new(),
            count: 0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p05: f64::NAN,
            p95: f64::NAN,
        }
    }
}

/// Per-country tower and tenor figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryStats {
    pub country: String,
    pub towers: usize,
    pub bells: usize,
    pub mean_tenor_cwt: f64,
    pub heaviest_tenor_cwt: f64,
}

pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values; NaNs are dropped.
    pub fn describe(quantity: &str, values: &[f64]) -> QuantityStats {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let n = sorted.len();
        if n == 0 {
            return QuantityStats {
                quantity: quantity.to_string(),
                ..Default::default()
            };
        }
        sorted.sort_by(f64::total_cmp);

        let std = if n > 1 { sorted.iter().std_dev() } else { 0.0 };

        QuantityStats {
            quantity: quantity.to_string(),
            count: n,
            mean: sorted.iter().mean(),
            median: Self::percentile(&sorted, 50.0),
            std,
            min: sorted[0],
            max: sorted[n - 1],
            p05: Self::percentile(&sorted, 5.0),
            p95: Self::percentile(&sorted, 95.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// One row per quantity plotted by the chart module.
    pub fn describe_world(world: &World) -> Vec<QuantityStats> {
        let bells_per_tower: Vec<f64> = world.towers().iter().map(|t| t.n_bells() as f64).collect();
        let tenors: Vec<f64> = world
            .towers()
            .iter()
            .filter_map(|t| t.tenor().and_then(Bell::cwt))
            .collect();
        let bell_values = |f: fn(&Bell) -> Option<f64>| -> Vec<f64> { world.bells().filter_map(f).collect() };

        vec![
            Self::describe("Bells per tower", &bells_per_tower),
            Self::describe("Tenor weight (cwt)", &tenors),
            Self::describe("Bell weight (cwt)", &bell_values(Bell::cwt)),
            Self::describe("Nominal (Hz)", &bell_values(|b| b.nominal)),
            Self::describe("Diameter (cm)", &bell_values(|b| b.diameter)),
            Self::describe("Year cast", &bell_values(|b| b.dated.map(f64::from))),
        ]
    }

    /// Towers, bells and tenor weights grouped by country, sorted by name.
    pub fn country_breakdown(world: &World) -> Vec<CountryStats> {
        let mut groups: BTreeMap<&str, Vec<&Tower>> = BTreeMap::new();
        for tower in world.towers() {
            let country = if tower.country.is_empty() {
                "Unknown"
            } else {
                tower.country.as_str()
            };
            groups.entry(country).or_default().push(tower);
        }

        groups
            .into_iter()
            .map(|(country, towers)| {
                let tenors: Vec<f64> = towers
                    .iter()
                    .filter_map(|t| t.tenor().and_then(Bell::cwt))
                    .collect();
                let heaviest = tenors.iter().copied().fold(f64::NAN, f64::max);
                CountryStats {
                    country: country.to_string(),
                    towers: towers.len(),
                    bells: towers.iter().map(|t| t.n_bells()).sum(),
                    mean_tenor_cwt: if tenors.is_empty() {
                        f64::NAN
                    } else {
                        tenors.iter().mean()
                    },
                    heaviest_tenor_cwt: heaviest,
                }
            })
            .collect()
    }

    pub fn describe_frame(stats: &[QuantityStats]) -> Result<DataFrame, ProcessorError> {
        let col = |f: fn(&QuantityStats) -> f64| stats.iter().map(f).collect::<Vec<f64>>();
        let df = DataFrame::new(vec![
            Column::new(
                "Quantity".into(),
                stats.iter().map(|s| s.quantity.clone()).collect::<Vec<String>>(),
            ),
            Column::new("N".into(), stats.iter().map(|s| s.count as u32).collect::<Vec<u32>>()),
            Column::new("Mean".into(), col(|s| s.mean)),
            Column::new("Median".into(), col(|s| s.median)),
            Column::new("Std".into(), col(|s| s.std)),
            Column::new("Min".into(), col(|s| s.min)),
            Column::new("Max".into(), col(|s| s.max)),
            Column::new("P05".into(), col(|s| s.p05)),
            Column::new("P95".into(), col(|s| s.p95)),
        ])?;
        Ok(df)
    }

    pub fn country_frame(stats: &[CountryStats]) -> Result<DataFrame, ProcessorError> {
        let df = DataFrame::new(vec![
            Column::new(
                "Country".into(),
                stats.iter().map(|s| s.country.clone()).collect::<Vec<String>>(),
            ),
            Column::new("Towers".into(), stats.iter().map(|s| s.towers as u32).collect::<Vec<u32>>()),
            Column::new("Bells".into(), stats.iter().map(|s| s.bells as u32).collect::<Vec<u32>>()),
            Column::new(
                "Mean tenor (cwt)".into(),
                stats.iter().map(|s| s.mean_tenor_cwt).collect::<Vec<f64>>(),
            ),
            Column::new(
                "Heaviest tenor (cwt)".into(),
                stats.iter().map(|s| s.heaviest_tenor_cwt).collect::<Vec<f64>>(),
            ),
        ])?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BellRole, Weight};

    #[test]
    fn test_describe() {
        let s = StatsCalculator::describe("x", &[4.0, 1.0, 3.0, 2.0, f64::NAN]);
        assert_eq!(s.count, 4);
        assert!((s.mean - 2.5).abs() < 1e-12);
        assert!((s.median - 2.5).abs() < 1e-12);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 4.0);
        assert!((s.std - 1.290_994_448_735_805_6).abs() < 1e-9);
        assert!((s.p05 - 1.15).abs() < 1e-12);
        assert!((s.p95 - 3.85).abs() < 1e-12);
    }

    #[test]
    fn test_describe_empty_and_single() {
        let empty = StatsCalculator::describe("x", &[]);
        assert_eq!(empty.count, 0);
        assert!(empty.mean.is_nan());

        let one = StatsCalculator::describe("x", &[7.0]);
        assert_eq!(one.median, 7.0);
        assert_eq!(one.std, 0.0);
    }

    fn tower(id: i64, country: &str, tenor_lb: f64) -> Tower {
        let mut t = Tower::new(id, "S Mary", "Anytown");
        t.country = country.into();
        t.add_bell(Bell {
            role: Some(BellRole::Numbered(1)),
            weight: Some(Weight::from_pounds(tenor_lb)),
            ..Default::default()
        });
        t
    }

    #[test]
    fn test_country_breakdown() {
        let world = World::new(vec![
            tower(1, "England", 1120.0),
            tower(2, "Wales", 560.0),
            tower(3, "England", 2240.0),
            tower(4, "", 112.0),
        ]);
        let rows = StatsCalculator::country_breakdown(&world);
        let names: Vec<&str> = rows.iter().map(|r| r.country.as_str()).collect();
        assert_eq!(names, ["England", "Unknown", "Wales"]);
        assert_eq!(rows[0].towers, 2);
        assert!((rows[0].mean_tenor_cwt - 15.0).abs() < 1e-3);
        assert!((rows[0].heaviest_tenor_cwt - 20.0).abs() < 1e-3);

        let df = StatsCalculator::country_frame(&rows).unwrap();
        assert_eq!(df.height(), 3);
    }

    #[test]
    fn test_describe_world() {
        let world = World::new(vec![tower(1, "England", 1120.0), tower(2, "Wales", 560.0)]);
        let rows = StatsCalculator::describe_world(&world);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].count, 2);
        assert_eq!(rows[3].count, 0);
        let df = StatsCalculator::describe_frame(&rows).unwrap();
        assert_eq!(df.height(), 6);
    }
}
