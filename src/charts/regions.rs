//! Map extents for the tower location plot.

use std::fmt;
use std::str::FromStr;

use crate::model::Coords;

const UK_PLACES: [&str; 8] = [
    "uk",
    "channel islands",
    "england",
    "scotland",
    "wales",
    "northern ireland",
    "republic of ireland",
    "isle of man",
];
const NORTH_AMERICA_PLACES: [&str; 2] = ["canada", "united states of america"];
const EUROPE_PLACES: [&str; 6] = ["europe", "netherlands", "belgium", "spain", "grenada", "france"];
const SOUTHERN_AFRICA_PLACES: [&str; 3] = ["kenya", "zimbabwe", "south africa"];
const SOUTH_ASIA_PLACES: [&str; 3] = ["india", "pakistan", "singapore"];
const AUSTRALASIA_PLACES: [&str; 3] = ["st vincent", "australia", "new zealand"];

/// A named group of places sharing one map extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Region {
    #[default]
    UnitedKingdom,
    NorthAmerica,
    WesternEurope,
    SouthernAfrica,
    SouthAsia,
    Australasia,
    World,
}

/// Longitude/latitude limits in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lon: (f64, f64),
    pub lat: (f64, f64),
}

impl Bounds {
    /// The limits in Web Mercator metres as `((x_min, x_max), (y_min, y_max))`.
    pub fn projected(&self) -> ((f64, f64), (f64, f64)) {
        let (x1, y1) = Coords::project(self.lat.0, self.lon.0);
        let (x2, y2) = Coords::project(self.lat.1, self.lon.1);
        ((x1, x2), (y1, y2))
    }

    pub fn contains(&self, coords: &Coords) -> bool {
        (self.lon.0..=self.lon.1).contains(&coords.long)
            && (self.lat.0..=self.lat.1).contains(&coords.lat)
    }
}

impl Region {
    /// Region for a country or home nation; anything unrecognised maps to `World`.
    pub fn for_place(place: &str) -> Self {
        let place = place.trim().to_lowercase();
        let place = place.as_str();
        if UK_PLACES.contains(&place) {
            Region::UnitedKingdom
        } else if NORTH_AMERICA_PLACES.contains(&place) {
            Region::NorthAmerica
        } else if EUROPE_PLACES.contains(&place) {
            Region::WesternEurope
        } else if SOUTHERN_AFRICA_PLACES.contains(&place) {
            Region::SouthernAfrica
        } else if SOUTH_ASIA_PLACES.contains(&place) {
            Region::SouthAsia
        } else if AUSTRALASIA_PLACES.contains(&place) {
            Region::Australasia
        } else {
            Region::World
        }
    }

    pub fn bounds(self) -> Bounds {
        let (lon, lat) = match self {
            Region::UnitedKingdom => ((-11.2, 2.5), (49.5, 59.0)),
            Region::NorthAmerica => ((-125.0, -65.0), (20.0, 80.0)),
            Region::WesternEurope => ((-14.238281, 16.611328), (35.940866, 59.083277)),
            Region::SouthernAfrica => ((4.710925, 46.722643), (-35.734913, 4.603028)),
            Region::SouthAsia => ((57.796873, 107.367185), (0.246806, 35.963483)),
            Region::Australasia => ((111.076172, 179.999), (-47.773102, -11.355495)),
            Region::World => ((-180.0, 180.0), (-80.0, 80.0)),
        };
        Bounds { lon, lat }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::UnitedKingdom => "UK",
            Region::NorthAmerica => "North America",
            Region::WesternEurope => "Europe",
            Region::SouthernAfrica => "Southern Africa",
            Region::SouthAsia => "South Asia",
            Region::Australasia => "Australasia",
            Region::World => "World",
        }
    }
}

impl FromStr for Region {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let region = match s.trim().to_lowercase().as_str() {
            "north america" => Region::NorthAmerica,
            "southern africa" => Region::SouthernAfrica,
            "south asia" => Region::SouthAsia,
            "australasia" => Region::Australasia,
            "world" => Region::World,
            _ => Region::for_place(s),
        };
        Ok(region)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
