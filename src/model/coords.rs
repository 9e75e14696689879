//! Coordinates Module
//! Latitude/longitude with Web Mercator projection and geodesic distance.

use geo::{GeodesicDistance, Point};
use serde::{Deserialize, Serialize};
use std::f64::consts::{FRAC_PI_4, PI};

use crate::config::DistanceUnit;

/// Sphere radius of the Web Mercator projection (EPSG:3857).
const MERCATOR_RADIUS: f64 = 6_378_137.0;
/// Mercator is undefined at the poles; clamp like EPSG:3857 does.
const MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A tower location: lat/long (EPSG:4326) plus its Web Mercator projection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub lat: f64,
    pub long: f64,
    pub x: f64,
    pub y: f64,
}

impl Coords {
    pub fn new(lat: f64, long: f64) -> Self {
        let (x, y) = Self::project(lat, long);
        Self { lat, long, x, y }
    }

    /// Project lat/long degrees into Web Mercator metres.
    pub fn project(lat: f64, long: f64) -> (f64, f64) {
        let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
        let x = MERCATOR_RADIUS * long.to_radians();
        let y = MERCATOR_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    /// Inverse of [`Coords::project`].
    pub fn unproject(x: f64, y: f64) -> (f64, f64) {
        let long = (x / MERCATOR_RADIUS).to_degrees();
        let lat = (2.0 * (y / MERCATOR_RADIUS).exp().atan() - PI / 2.0).to_degrees();
        (lat, long)
    }

    /// Geodesic (WGS84) distance to another location in `unit`.
    pub fn distance_to(&self, other: &Coords, unit: DistanceUnit) -> f64 {
        let a = Point::new(self.long, self.lat);
        let b = Point::new(other.long, other.lat);
        unit.from_meters(a.geodesic_distance(&b))
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite() && self.long.is_finite()
    }

    /// Same location within `tolerance` degrees.
    pub fn approx_eq(&self, lat: f64, long: f64, tolerance: f64) -> bool {
        (self.lat - lat).abs() <= tolerance && (self.long - long).abs() <= tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_projects_to_zero() {
        let c = Coords::new(0.0, 0.0);
        assert!(c.x.abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_projection_matches_epsg3857() {
        // London, checked against pyproj
        let c = Coords::new(51.5074, -0.1278);
        assert!((c.x - -14226.63).abs() < 1.0, "x = {}", c.x);
        assert!((c.y - 6711542.47).abs() < 5.0, "y = {}", c.y);

        let (lat, long) = Coords::unproject(c.x, c.y);
        assert!((lat - 51.5074).abs() < 1e-9);
        assert!((long - -0.1278).abs() < 1e-9);
    }

    #[test]
    fn test_distance_in_units() {
        let york = Coords::new(53.9623, -1.0819);
        let leeds = Coords::new(53.7997, -1.5492);
        let km = york.distance_to(&leeds, DistanceUnit::Kilometers);
        let mi = york.distance_to(&leeds, DistanceUnit::Miles);
        assert!((km - 35.6).abs() < 1.0, "km = {km}");
        assert!((km * 1000.0 / 1609.34 - mi).abs() < 1e-9);
    }
}
