//! Dove CSV Loader Module
//! Reads `towers.csv` and `bells.csv` with Polars and builds the tower/bell model.

use polars::prelude::*;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::normalize::{
    optional_text, parse_bell_designation, parse_cast_date, parse_float, parse_int,
    text_or_default,
};
use crate::model::{Bell, Coords, Tower, Weight};

pub const TOWERS_FILE: &str = "towers.csv";
pub const BELLS_FILE: &str = "bells.csv";

const TOWER_COLUMNS: [&str; 14] = [
    "TowerID",
    "Dedicn",
    "Place",
    "Lat",
    "Long",
    "Postcode",
    "NG",
    "Country",
    "County",
    "Diocese",
    "Affiliations",
    "Practice",
    "LGrade",
    "RingType",
];

const BELL_COLUMNS: [&str; 16] = [
    "Tower ID",
    "Bell Role",
    "Bell ID",
    "Note",
    "Nominal (Hz)",
    "Weight (lbs)",
    "Diameter (in)",
    "Caster",
    "Founder",
    "Cast Date",
    "Collection Type",
    "Listed",
    "Canons",
    "Turnings",
    "Cracked",
    "Frame ID",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Dove file not found: {0}")]
    MissingFile(PathBuf),
    #[error("{file} has no '{column}' column")]
    MissingColumn { file: String, column: String },
}

/// Read a CSV with every column as text; the normalisers see the raw strings.
pub fn read_text_csv(path: &Path) -> Result<DataFrame, LoaderError> {
    if !path.is_file() {
        return Err(LoaderError::MissingFile(path.to_path_buf()));
    }
    // A schema inference length of 0 reads every column as String.
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;
    Ok(df)
}

/// Text view over the named columns of a frame.
struct TextColumns {
    columns: HashMap<&'static str, StringChunked>,
}

impl TextColumns {
    fn new(df: &DataFrame, file: &str, names: &[&'static str]) -> Result<Self, LoaderError> {
        let mut columns = HashMap::with_capacity(names.len());
        for &name in names {
            let column = df.column(name).map_err(|_| LoaderError::MissingColumn {
                file: file.to_string(),
                column: name.to_string(),
            })?;
            columns.insert(name, column.str()?.clone());
        }
        Ok(Self { columns })
    }

    fn get(&self, name: &str, row: usize) -> Option<&str> {
        self.columns.get(name).and_then(|ca| ca.get(row))
    }
}

/// Builds towers and bells from Dove exports, keeping one ring type.
pub struct DoveLoader {
    ring_type: String,
}

impl DoveLoader {
    pub fn new(ring_type: &str) -> Self {
        Self {
            ring_type: ring_type.to_lowercase(),
        }
    }

    /// Load `towers.csv` and `bells.csv` from `dove_dir`.
    pub fn load_dir(&self, dove_dir: &Path) -> Result<Vec<Tower>, LoaderError> {
        let towers = read_text_csv(&dove_dir.join(TOWERS_FILE))?;
        let bells = read_text_csv(&dove_dir.join(BELLS_FILE))?;
        self.build(&towers, &bells)
    }

    /// Combine tower and bell frames; duplicate tower ids keep the first row.
    pub fn build(&self, towers_df: &DataFrame, bells_df: &DataFrame) -> Result<Vec<Tower>, LoaderError> {
        let mut bells_by_tower = self.bells_by_tower(bells_df)?;
        let cols = TextColumns::new(towers_df, TOWERS_FILE, &TOWER_COLUMNS)?;

        let total = towers_df.height();
        let mut towers = Vec::new();
        let mut seen: HashSet<i64> = HashSet::new();
        let mut next_mark = 10;

        log::info!("Building towers: 0 %");
        for row in 0..total {
            while next_mark <= 100 && (row + 1) * 100 >= next_mark * total {
                log::info!("Building towers: {next_mark} %");
                next_mark += 10;
            }

            let Some(mut tower) = self.make_tower(&cols, row) else {
                continue;
            };
            if !seen.insert(tower.dove_id) {
                log::debug!("Skipping duplicate tower {}", tower.dove_id);
                continue;
            }
            if let Some(bells) = bells_by_tower.remove(&tower.dove_id) {
                tower.add_bells(bells);
            }
            towers.push(tower);
        }

        log::info!(
            "Built {} towers with {} bells",
            towers.len(),
            towers.iter().map(Tower::n_bells_all).sum::<usize>()
        );
        Ok(towers)
    }

    fn make_tower(&self, cols: &TextColumns, row: usize) -> Option<Tower> {
        let ring_type = text_or_default(cols.get("RingType", row), "").to_lowercase();
        if ring_type != self.ring_type {
            return None;
        }
        let Some(dove_id) = parse_int(cols.get("TowerID", row)) else {
            log::warn!("Tower row {row} has no usable TowerID, skipped");
            return None;
        };

        let coordinates = match (
            parse_float(cols.get("Lat", row)),
            parse_float(cols.get("Long", row)),
        ) {
            (Some(lat), Some(long)) => Some(Coords::new(lat, long)),
            _ => None,
        };

        Some(Tower {
            name: text_or_default(cols.get("Dedicn", row), ""),
            place: text_or_default(cols.get("Place", row), ""),
            dove_id,
            bells: Vec::new(),
            coordinates,
            postcode: text_or_default(cols.get("Postcode", row), ""),
            grid_reference: optional_text(cols.get("NG", row)),
            country: text_or_default(cols.get("Country", row), ""),
            county: text_or_default(cols.get("County", row), ""),
            diocese: optional_text(cols.get("Diocese", row)),
            affiliation: optional_text(cols.get("Affiliations", row)),
            practice: optional_text(cols.get("Practice", row)),
            listed_grade: optional_text(cols.get("LGrade", row)),
        })
    }

    /// Bells of the configured collection type, grouped by tower id in row order.
    fn bells_by_tower(&self, bells_df: &DataFrame) -> Result<HashMap<i64, Vec<Bell>>, LoaderError> {
        let cols = TextColumns::new(bells_df, BELLS_FILE, &BELL_COLUMNS)?;
        let mut grouped: HashMap<i64, Vec<Bell>> = HashMap::new();

        for row in 0..bells_df.height() {
            let collection = text_or_default(cols.get("Collection Type", row), "").to_lowercase();
            if collection != self.ring_type {
                continue;
            }
            let Some(tower_id) = parse_int(cols.get("Tower ID", row)) else {
                log::warn!("Bell row {row} has no usable Tower ID, skipped");
                continue;
            };
            let bell = Self::make_bell(&cols, row, collection);
            grouped.entry(tower_id).or_default().push(bell);
        }
        Ok(grouped)
    }

    fn make_bell(cols: &TextColumns, row: usize, collection_type: String) -> Bell {
        let designation = parse_bell_designation(cols.get("Bell Role", row).unwrap_or(""));
        let dove_id = parse_int(cols.get("Bell ID", row));
        if dove_id.is_none() {
            log::warn!("Bell row {row} has no usable Bell ID");
        }

        Bell {
            role: designation.role,
            chime: designation.chime,
            dove_id,
            note: optional_text(cols.get("Note", row)),
            nominal: parse_float(cols.get("Nominal (Hz)", row)),
            weight: parse_float(cols.get("Weight (lbs)", row)).map(Weight::from_pounds),
            diameter: None,
            caster: optional_text(cols.get("Caster", row)),
            founder: optional_text(cols.get("Founder", row)),
            dated: parse_cast_date(cols.get("Cast Date", row).unwrap_or("")),
            collection_type: Some(collection_type),
            listed: optional_text(cols.get("Listed", row)),
            canons: optional_text(cols.get("Canons", row)),
            turnings: optional_text(cols.get("Turnings", row)),
            cracked: optional_text(cols.get("Cracked", row)),
            frame_id: parse_int(cols.get("Frame ID", row)),
        }
        .with_diameter_inches(parse_float(cols.get("Diameter (in)", row)))
    }
}
