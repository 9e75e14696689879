//! World Module
//! The full collection of towers plus a denormalised lookup table used for search.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use super::bell::Bell;
use super::coords::Coords;
use super::tower::Tower;

/// Tolerance in degrees when matching coordinates.
pub const COORD_TOLERANCE: f64 = 1e-6;

#[derive(Error, Debug, PartialEq)]
pub enum SearchError {
    #[error("Unknown search field '{0}' (expected name, place, dove_id, nbells, coordinates, postcode, country or county)")]
    UnknownField(String),
    #[error("'{value}' is not a valid {field} value")]
    InvalidValue { field: SearchField, value: String },
}

/// Attribute of the lookup table a search can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchField {
    Name,
    Place,
    DoveId,
    NBells,
    Coordinates,
    Postcode,
    Country,
    County,
}

impl SearchField {
    pub const ALL: [SearchField; 8] = [
        SearchField::Name,
        SearchField::Place,
        SearchField::DoveId,
        SearchField::NBells,
        SearchField::Coordinates,
        SearchField::Postcode,
        SearchField::Country,
        SearchField::County,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::Place => "place",
            SearchField::DoveId => "dove_id",
            SearchField::NBells => "nbells",
            SearchField::Coordinates => "coordinates",
            SearchField::Postcode => "postcode",
            SearchField::Country => "country",
            SearchField::County => "county",
        }
    }

    /// Normalise a user-supplied value into a key comparable with the lookup table.
    pub fn key(self, value: &str) -> Result<SearchKey, SearchError> {
        let invalid = || SearchError::InvalidValue {
            field: self,
            value: value.to_string(),
        };
        let value = value.trim();
        match self {
            SearchField::DoveId | SearchField::NBells => {
                let n = value
                    .parse::<i64>()
                    .or_else(|_| match value.parse::<f64>() {
                        Ok(f) if f.fract() == 0.0 => Ok(f as i64),
                        _ => Err(()),
                    })
                    .map_err(|_| invalid())?;
                Ok(SearchKey::Integer(n))
            }
            SearchField::Coordinates => {
                let (lat, long) = value.split_once(',').ok_or_else(invalid)?;
                let lat = lat.trim().parse::<f64>().map_err(|_| invalid())?;
                let long = long.trim().parse::<f64>().map_err(|_| invalid())?;
                Ok(SearchKey::Coordinates { lat, long })
            }
            SearchField::Postcode => Ok(SearchKey::Text(value.to_string())),
            SearchField::Name | SearchField::Place | SearchField::Country | SearchField::County => {
                Ok(SearchKey::Text(value.to_lowercase()))
            }
        }
    }
}

impl FromStr for SearchField {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        SearchField::ALL
            .into_iter()
            .find(|f| f.as_str() == lowered)
            .ok_or_else(|| SearchError::UnknownField(s.to_string()))
    }
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalised search value.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchKey {
    Text(String),
    Integer(i64),
    Coordinates { lat: f64, long: f64 },
}

/// One row of the lookup table; text fields except postcode are lowercased.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRow {
    pub name: String,
    pub place: String,
    pub dove_id: i64,
    pub nbells: usize,
    pub coordinates: Option<Coords>,
    pub postcode: String,
    pub country: String,
    pub county: String,
}

impl LookupRow {
    fn from_tower(tower: &Tower) -> Self {
        Self {
            name: tower.name.to_lowercase(),
            place: tower.place.to_lowercase(),
            dove_id: tower.dove_id,
            nbells: tower.n_bells(),
            coordinates: tower.coordinates,
            postcode: tower.postcode.clone(),
            country: tower.country.to_lowercase(),
            county: tower.county.to_lowercase(),
        }
    }

    /// The key this row holds for `field`.
    pub fn key(&self, field: SearchField) -> Option<SearchKey> {
        let text = |s: &String| Some(SearchKey::Text(s.clone()));
        match field {
            SearchField::Name => text(&self.name),
            SearchField::Place => text(&self.place),
            SearchField::Postcode => text(&self.postcode),
            SearchField::Country => text(&self.country),
            SearchField::County => text(&self.county),
            SearchField::DoveId => Some(SearchKey::Integer(self.dove_id)),
            SearchField::NBells => Some(SearchKey::Integer(self.nbells as i64)),
            SearchField::Coordinates => self.coordinates.map(|c| SearchKey::Coordinates {
                lat: c.lat,
                long: c.long,
            }),
        }
    }

    pub fn matches(&self, field: SearchField, key: &SearchKey) -> bool {
        match (field, key) {
            (SearchField::Coordinates, SearchKey::Coordinates { lat, long }) => self
                .coordinates
                .is_some_and(|c| c.approx_eq(*lat, *long, COORD_TOLERANCE)),
            _ => self.key(field).as_ref() == Some(key),
        }
    }
}

/// All towers and their bells.
#[derive(Debug, Clone, Default)]
pub struct World {
    towers: Vec<Tower>,
    lookup: Vec<LookupRow>,
}

impl World {
    pub fn new(towers: Vec<Tower>) -> Self {
        let lookup = towers.iter().map(LookupRow::from_tower).collect();
        Self { towers, lookup }
    }

    pub fn towers(&self) -> &[Tower] {
        &self.towers
    }

    pub fn into_towers(self) -> Vec<Tower> {
        self.towers
    }

    /// Every bell of every tower, in tower order.
    pub fn bells(&self) -> impl Iterator<Item = &Bell> {
        self.towers.iter().flat_map(|t| t.bells.iter())
    }

    pub fn lookup(&self) -> &[LookupRow] {
        &self.lookup
    }

    pub fn n_towers(&self) -> usize {
        self.towers.len()
    }

    pub fn n_bells(&self) -> usize {
        self.towers.iter().map(Tower::n_bells_all).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.towers.is_empty()
    }

    pub fn tower(&self, dove_id: i64) -> Option<&Tower> {
        self.towers.iter().find(|t| t.dove_id == dove_id)
    }

    /// Indices of towers whose `field` matches any of `values`, each once, ascending.
    pub fn matching_indices<S: AsRef<str>>(
        &self,
        field: SearchField,
        values: &[S],
    ) -> Result<Vec<usize>, SearchError> {
        let keys = values
            .iter()
            .map(|v| field.key(v.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let indices: BTreeSet<usize> = self
            .lookup
            .iter()
            .enumerate()
            .filter(|(_, row)| keys.iter().any(|k| row.matches(field, k)))
            .map(|(i, _)| i)
            .collect();
        Ok(indices.into_iter().collect())
    }

    /// A new world holding the towers whose `field` matches any of `values`.
    pub fn search<S: AsRef<str>>(
        &self,
        field: SearchField,
        values: &[S],
    ) -> Result<World, SearchError> {
        let indices = self.matching_indices(field, values)?;
        log::debug!(
            "Search on {field} for {} value(s) matched {} tower(s)",
            values.len(),
            indices.len()
        );
        Ok(World::new(
            indices.into_iter().map(|i| self.towers[i].clone()).collect(),
        ))
    }

    pub fn search_one(&self, field: SearchField, value: &str) -> Result<World, SearchError> {
        self.search(field, &[value])
    }
}
