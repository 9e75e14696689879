//! User Tower List Module
//! Matches a user's spreadsheet of visited towers against the world and
//! writes an annotated copy next to it.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Settings;
use crate::data::processor::TOWER_SUMMARY_COLUMNS;
use crate::model::{SearchError, SearchField, SearchKey, TowerSummary, World};
use crate::xlsx::{self, Cell, Table, XlsxError};

pub const DATE_COLUMN: &str = "Date";
pub const PURPOSE_COLUMN: &str = "Purpose";
const OUTPUT_SUFFIX: &str = "_OUTPUT";
const TEXT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d"];

#[derive(Error, Debug)]
pub enum UserListError {
    #[error("Could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("Could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },
    #[error("{file} has no '{column}' column")]
    MissingColumn { file: PathBuf, column: String },
    #[error(transparent)]
    Search(#[from] SearchError),
}

/// One line of the user's list after normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct Visit {
    pub value: String,
    pub key: SearchKey,
    pub date: Option<NaiveDate>,
    pub purpose: Option<String>,
}

/// A matched tower with the visit it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct MyTowerRow {
    pub summary: TowerSummary,
    pub date: Option<NaiveDate>,
    pub purpose: Option<String>,
}

/// Result of [`UserList::grab_my_towers`].
#[derive(Debug, Clone)]
pub struct MyTowers {
    pub world: World,
    pub rows: Vec<MyTowerRow>,
    /// Set when the annotated list was saved.
    pub output: Option<PathBuf>,
}

/// Missing dates sort after every real date.
fn cmp_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Date from an Excel serial number or a date string.
pub fn parse_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Number(serial) if serial.is_finite() && *serial >= 0.0 => {
            // Excel day zero, allowing for its 1900 leap year.
            NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
        }
        Cell::Text(text) => {
            let text = text.trim();
            TEXT_DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(text, f).ok())
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.date())
                })
        }
        _ => None,
    }
}

/// Label such as `1st March 2023`.
pub fn format_date_label(date: NaiveDate) -> String {
    let day = date.day();
    let suffix = match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{day}{suffix} {}", date.format("%B %Y"))
}

/// Read the visits in `path`, sorted by date with repeated towers dropped.
///
/// The search column is the one named after `field` (case-insensitive).
/// Rows with an empty or unparseable search value are skipped with a warning.
pub fn read_visits(path: &Path, field: SearchField) -> Result<Vec<Visit>, UserListError> {
    let table = xlsx::read_table(path).map_err(|source| UserListError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let missing = |column: &str| UserListError::MissingColumn {
        file: path.to_path_buf(),
        column: column.to_string(),
    };
    let key_col = table.column_index(field.as_str()).ok_or_else(|| missing(field.as_str()))?;
    let date_col = table.column_index(DATE_COLUMN).ok_or_else(|| missing(DATE_COLUMN))?;
    let purpose_col = table.column_index(PURPOSE_COLUMN);

    let mut visits = Vec::with_capacity(table.height());
    for row in 0..table.height() {
        let value = table.cell(row, key_col).as_text().trim().to_string();
        if value.is_empty() {
            log::debug!("Row {} of {} has no {}", row + 2, path.display(), field);
            continue;
        }
        let key = match field.key(&value) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("Row {} of {}: {}", row + 2, path.display(), e);
                continue;
            }
        };
        let date_cell = table.cell(row, date_col);
        let date = parse_date(date_cell);
        if date.is_none() && !date_cell.is_empty() {
            log::warn!("Row {}: could not read date '{}'", row + 2, date_cell.as_text());
        }
        let purpose = purpose_col
            .map(|c| table.cell(row, c))
            .filter(|c| !c.is_empty())
            .map(Cell::as_text);
        visits.push(Visit {
            value,
            key,
            date,
            purpose,
        });
    }

    visits.sort_by(|a, b| cmp_dates(a.date, b.date));
    let mut unique: Vec<Visit> = Vec::with_capacity(visits.len());
    for visit in visits {
        if !unique.iter().any(|u| u.key == visit.key) {
            unique.push(visit);
        }
    }
    Ok(unique)
}

/// The user's tower lists under the configured user data folder.
pub struct UserList<'a> {
    settings: &'a Settings,
}

impl<'a> UserList<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn input_path(&self, name: &str) -> PathBuf {
        self.settings.user_dir().join(format!("{name}.xlsx"))
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.settings.user_dir().join(format!("{name}{OUTPUT_SUFFIX}.xlsx"))
    }

    /// Find the towers listed in `<name>.xlsx` and attach the visit details.
    ///
    /// With `save`, the matched towers are written to `<name>_OUTPUT.xlsx`.
    pub fn grab_my_towers(
        &self,
        world: &World,
        name: &str,
        field: SearchField,
        save: bool,
    ) -> Result<MyTowers, UserListError> {
        let input = self.input_path(name);
        let visits = read_visits(&input, field)?;
        log::info!("{} distinct towers listed in {}", visits.len(), input.display());

        let values: Vec<&str> = visits.iter().map(|v| v.value.as_str()).collect();
        let found = world.search(field, &values)?;

        let mut rows: Vec<MyTowerRow> = found
            .towers()
            .iter()
            .zip(found.lookup())
            .map(|(tower, lookup)| {
                let visit = visits.iter().find(|v| lookup.matches(field, &v.key));
                MyTowerRow {
                    summary: tower.summary(),
                    date: visit.and_then(|v| v.date),
                    purpose: visit.and_then(|v| v.purpose.clone()),
                }
            })
            .collect();
        rows.sort_by(|a, b| cmp_dates(a.date, b.date));

        for visit in &visits {
            if !found.lookup().iter().any(|l| l.matches(field, &visit.key)) {
                log::warn!("No tower found for {} '{}'", field, visit.value);
            }
        }

        let output = if save {
            let path = self.output_path(name);
            xlsx::write_table(&path, &rows_table(&rows), name).map_err(|source| UserListError::Write {
                path: path.clone(),
                source,
            })?;
            Some(path)
        } else {
            None
        };

        Ok(MyTowers {
            world: found,
            rows,
            output,
        })
    }
}

/// Tower summary columns followed by `Date` and `Purpose`.
pub fn rows_table(rows: &[MyTowerRow]) -> Table {
    let mut columns: Vec<String> = TOWER_SUMMARY_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.push(DATE_COLUMN.to_string());
    columns.push(PURPOSE_COLUMN.to_string());

    let mut table = Table::new(columns);
    for row in rows {
        let s = &row.summary;
        table.push_row(vec![
            Cell::Number(s.dove_id as f64),
            Cell::from(s.name.as_str()),
            Cell::from(s.place.as_str()),
            Cell::Number(s.bells as f64),
            Cell::from(s.tenor.clone()),
            Cell::from(s.hundredweight),
            Cell::from(s.country.as_str()),
            Cell::from(s.county.as_str()),
            Cell::from(s.postcode.as_str()),
            Cell::from(row.date.map(|d| d.format("%Y-%m-%d").to_string())),
            Cell::from(row.purpose.clone()),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DistanceUnit, ImageFormat};
    use crate::model::{Bell, BellRole, Tower, Weight};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_date_label() {
        assert_eq!(format_date_label(date(2023, 3, 1)), "1st March 2023");
        assert_eq!(format_date_label(date(2023, 3, 2)), "2nd March 2023");
        assert_eq!(format_date_label(date(2022, 12, 23)), "23rd December 2022");
        assert_eq!(format_date_label(date(2021, 7, 11)), "11th July 2021");
        assert_eq!(format_date_label(date(2021, 7, 13)), "13th July 2021");
        assert_eq!(format_date_label(date(2021, 7, 31)), "31st July 2021");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(&Cell::Number(44986.0)), Some(date(2023, 3, 1)));
        assert_eq!(parse_date(&Cell::Number(44986.75)), Some(date(2023, 3, 1)));
        assert_eq!(parse_date(&Cell::from("2023-03-01")), Some(date(2023, 3, 1)));
        assert_eq!(parse_date(&Cell::from("01/03/2023")), Some(date(2023, 3, 1)));
        assert_eq!(parse_date(&Cell::from("2023-03-01 10:30:00")), Some(date(2023, 3, 1)));
        assert_eq!(parse_date(&Cell::from("soon")), None);
        assert_eq!(parse_date(&Cell::Empty), None);
    }

    fn settings(root: &Path) -> Settings {
        Settings {
            working_dir: root.to_path_buf(),
            data_dir: "data".into(),
            user_data_dir: "user".into(),
            plot_dir: "plots".into(),
            distance_unit: DistanceUnit::Miles,
            dpi: 100,
            ring_type: "full-circle".into(),
            dove_refresh: false,
            image_format: ImageFormat::Png,
        }
    }

    fn tower(id: i64, name: &str, postcode: &str) -> Tower {
        let mut t = Tower::new(id, name, "Town");
        t.postcode = postcode.into();
        t.add_bell(Bell {
            role: Some(BellRole::Numbered(1)),
            weight: Some(Weight::from_pounds(560.0)),
            ..Default::default()
        });
        t
    }

    fn world() -> World {
        World::new(vec![
            tower(10, "S Mary", "AB1 2CD"),
            tower(11, "S Paul", "EF3 4GH"),
            tower(12, "S John", "IJ5 6KL"),
        ])
    }

    fn write_list(settings: &Settings, name: &str, rows: Vec<Vec<Cell>>) {
        let mut table = Table::new(vec!["Date".into(), "postcode".into(), "Purpose".into()]);
        for row in rows {
            table.push_row(row);
        }
        xlsx::write_table(&UserList::new(settings).input_path(name), &table, name).unwrap();
    }

    #[test]
    fn test_grab_my_towers() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        write_list(
            &s,
            "Visits",
            vec![
                vec![Cell::Number(45000.0), Cell::from("EF3 4GH"), Cell::from("Quarter peal")],
                vec![Cell::from("2020-05-01"), Cell::from("AB1 2CD"), Cell::Empty],
                vec![Cell::from("2019-01-01"), Cell::from("EF3 4GH"), Cell::from("Practice")],
                vec![Cell::from("2021-01-01"), Cell::from("ZZ9 9ZZ"), Cell::Empty],
            ],
        );

        let mine = UserList::new(&s)
            .grab_my_towers(&world(), "Visits", SearchField::Postcode, true)
            .unwrap();

        assert_eq!(mine.world.n_towers(), 2);
        let ids: Vec<i64> = mine.rows.iter().map(|r| r.summary.dove_id).collect();
        assert_eq!(ids, vec![11, 10]);
        // The earliest visit to a repeated tower wins.
        assert_eq!(mine.rows[0].date, Some(date(2019, 1, 1)));
        assert_eq!(mine.rows[0].purpose.as_deref(), Some("Practice"));
        assert_eq!(mine.rows[1].purpose, None);

        let output = mine.output.unwrap();
        assert_eq!(output, dir.path().join("user").join("Visits_OUTPUT.xlsx"));
        let saved = xlsx::read_table(&output).unwrap();
        assert_eq!(saved.height(), 2);
        assert_eq!(saved.columns.len(), TOWER_SUMMARY_COLUMNS.len() + 2);
        let date_col = saved.column_index("Date").unwrap();
        assert_eq!(saved.cell(0, date_col), &Cell::from("2019-01-01"));
        assert_eq!(saved.cell(0, 0), &Cell::Number(11.0));
    }

    #[test]
    fn test_no_save_and_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        write_list(
            &s,
            "Short",
            vec![vec![Cell::from("2020-05-01"), Cell::from("IJ5 6KL"), Cell::Empty]],
        );
        let list = UserList::new(&s);

        let mine = list
            .grab_my_towers(&world(), "Short", SearchField::Postcode, false)
            .unwrap();
        assert_eq!(mine.rows.len(), 1);
        assert!(mine.output.is_none());
        assert!(!list.output_path("Short").exists());

        let err = list
            .grab_my_towers(&world(), "Short", SearchField::County, false)
            .unwrap_err();
        assert!(matches!(err, UserListError::MissingColumn { column, .. } if column == "county"));
    }

    #[test]
    fn test_search_by_dove_id() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings(dir.path());
        let mut table = Table::new(vec!["dove_id".into(), "Date".into()]);
        table.push_row(vec![Cell::Number(12.0), Cell::from("2022-02-02")]);
        table.push_row(vec![Cell::from("not a number"), Cell::from("2022-02-03")]);
        xlsx::write_table(&UserList::new(&s).input_path("Ids"), &table, "Ids").unwrap();

        let mine = UserList::new(&s)
            .grab_my_towers(&world(), "Ids", SearchField::DoveId, false)
            .unwrap();
        assert_eq!(mine.rows.len(), 1);
        assert_eq!(mine.rows[0].summary.name, "S John");
        assert_eq!(mine.rows[0].date, Some(date(2022, 2, 2)));
    }
}
