//! Summary Processor Module
//! Flattens the tower/bell model into Polars summary tables.

use polars::prelude::*;
use thiserror::Error;

use crate::model::{BellSummary, Tower, TowerSummary, World};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
}

/// Tower table columns, in output order.
pub const TOWER_SUMMARY_COLUMNS: [&str; 9] = [
    "dove_id",
    "Name",
    "Place",
    "Bells",
    "Tenor",
    "Hundredweight",
    "Country",
    "County",
    "Postcode",
];

/// Bell table columns, in output order.
pub const BELL_SUMMARY_COLUMNS: [&str; 9] = [
    "dove_id", "N", "C", "note", "nominal", "weight", "cwt", "diameter", "dated",
];

/// Builds summary DataFrames from the world model.
pub struct DataProcessor;

impl DataProcessor {
    /// One row per tower.
    pub fn tower_frame(world: &World) -> Result<DataFrame, ProcessorError> {
        let rows: Vec<TowerSummary> = world.towers().iter().map(Tower::summary).collect();
        Self::tower_rows_frame(&rows)
    }

    pub fn tower_rows_frame(rows: &[TowerSummary]) -> Result<DataFrame, ProcessorError> {
        let [id, name, place, bells, tenor, cwt, country, county, postcode] = TOWER_SUMMARY_COLUMNS;
        let df = DataFrame::new(vec![
            Column::new(id.into(), rows.iter().map(|r| r.dove_id).collect::<Vec<i64>>()),
            Column::new(name.into(), rows.iter().map(|r| r.name.clone()).collect::<Vec<String>>()),
            Column::new(place.into(), rows.iter().map(|r| r.place.clone()).collect::<Vec<String>>()),
            Column::new(bells.into(), rows.iter().map(|r| r.bells as u32).collect::<Vec<u32>>()),
            Column::new(
                tenor.into(),
                rows.iter().map(|r| r.tenor.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(cwt.into(), rows.iter().map(|r| r.hundredweight).collect::<Vec<Option<f64>>>()),
            Column::new(
                country.into(),
                rows.iter().map(|r| r.country.clone()).collect::<Vec<String>>(),
            ),
            Column::new(county.into(), rows.iter().map(|r| r.county.clone()).collect::<Vec<String>>()),
            Column::new(
                postcode.into(),
                rows.iter().map(|r| r.postcode.clone()).collect::<Vec<String>>(),
            ),
        ])?;
        Ok(df)
    }

    /// One row per bell across the world.
    pub fn bell_frame(world: &World) -> Result<DataFrame, ProcessorError> {
        let rows: Vec<BellSummary> = world.bells().map(|b| b.summary()).collect();
        Self::bell_rows_frame(&rows)
    }

    /// The bells of a single tower, ordered by designation then weight.
    pub fn tower_bell_frame(tower: &Tower) -> Result<DataFrame, ProcessorError> {
        Self::bell_rows_frame(&tower.bell_summaries())
    }

    pub fn bell_rows_frame(rows: &[BellSummary]) -> Result<DataFrame, ProcessorError> {
        let [id, n, c, note, nominal, weight, cwt, diameter, dated] = BELL_SUMMARY_COLUMNS;
        let df = DataFrame::new(vec![
            Column::new(id.into(), rows.iter().map(|r| r.dove_id).collect::<Vec<Option<i64>>>()),
            Column::new(n.into(), rows.iter().map(|r| r.n.clone()).collect::<Vec<Option<String>>>()),
            Column::new(c.into(), rows.iter().map(|r| r.c.clone()).collect::<Vec<Option<String>>>()),
            Column::new(
                note.into(),
                rows.iter().map(|r| r.note.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(nominal.into(), rows.iter().map(|r| r.nominal).collect::<Vec<Option<f64>>>()),
            Column::new(
                weight.into(),
                rows.iter().map(|r| r.weight.clone()).collect::<Vec<Option<String>>>(),
            ),
            Column::new(cwt.into(), rows.iter().map(|r| r.cwt).collect::<Vec<Option<f64>>>()),
            Column::new(
                diameter.into(),
                rows.iter().map(|r| r.diameter).collect::<Vec<Option<f64>>>(),
            ),
            Column::new(dated.into(), rows.iter().map(|r| r.dated).collect::<Vec<Option<i32>>>()),
        ])?;
        Ok(df)
    }

    /// Non-null values of a numeric column as `f64`, e.g. for histograms.
    pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<f64>, ProcessorError> {
        let values = df.column(column)?.cast(&DataType::Float64)?;
        Ok(values
            .f64()?
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Bell, BellRole, Weight};

    fn world() -> World {
        let mut a = Tower::new(1, "S Mary", "Anytown");
        a.country = "England".into();
        a.add_bells([
            Bell {
                role: Some(BellRole::Numbered(2)),
                weight: Some(Weight::from_pounds(560.0)),
                dated: Some(1900),
                ..Default::default()
            },
            Bell {
                role: Some(BellRole::Numbered(1)),
                weight: Some(Weight::from_pounds(448.0)),
                ..Default::default()
            },
        ]);
        let b = Tower::new(2, "S Luke", "Otherton");
        World::new(vec![a, b])
    }

    #[test]
    fn test_tower_frame() {
        let df = DataProcessor::tower_frame(&world()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.get_column_names().len(), TOWER_SUMMARY_COLUMNS.len());
        let cwt = df.column("Hundredweight").unwrap().f64().unwrap();
        assert!((cwt.get(0).unwrap() - 5.0).abs() < 1e-4);
        assert_eq!(cwt.get(1), None);
        let bells = DataProcessor::numeric_values(&df, "Bells").unwrap();
        assert_eq!(bells, vec![2.0, 0.0]);
    }

    #[test]
    fn test_bell_frames() {
        let w = world();
        let all = DataProcessor::bell_frame(&w).unwrap();
        assert_eq!(all.height(), 2);
        assert_eq!(DataProcessor::numeric_values(&all, "dated").unwrap(), vec![1900.0]);

        let tower = DataProcessor::tower_bell_frame(&w.towers()[0]).unwrap();
        let order = tower.column("N").unwrap().str().unwrap();
        assert_eq!(order.get(0), Some("1"));
        assert_eq!(order.get(1), Some("2"));
    }

    #[test]
    fn test_empty_world_keeps_columns() {
        let df = DataProcessor::tower_frame(&World::default()).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), TOWER_SUMMARY_COLUMNS.len());
        let bells = DataProcessor::bell_frame(&World::default()).unwrap();
        assert_eq!(bells.width(), BELL_SUMMARY_COLUMNS.len());
    }
}
