//! Geographic coordinates and distance calculations.

use serde::{Deserialize, Serialize};

use super::DomainError;

/// A WGS84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Create a coordinate, validating the latitude and longitude ranges.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::domain::Coordinate;
    ///
    /// assert!(Coordinate::new(51.5, -0.12).is_ok());
    /// assert!(Coordinate::new(95.0, 0.0).is_err());
    /// assert!(Coordinate::new(0.0, 181.0).is_err());
    /// ```
    pub fn new(lat: f64, lon: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(DomainError::InvalidCoordinate { lat, lon });
        }
        Ok(Self { lat, lon })
    }
}

/// Great-circle distance calculations.
///
/// Constructed once and handed down through the routing context rather than
/// living in a global.
#[derive(Debug, Clone, Copy)]
pub struct DistanceLibrary {
    radius_m: f64,
}

impl DistanceLibrary {
    /// Mean earth radius in metres.
    pub const EARTH_RADIUS_M: f64 = 6_371_010.0;

    /// Create a library for a sphere of the given radius.
    pub fn with_radius(radius_m: f64) -> Self {
        Self { radius_m }
    }

    /// Haversine distance between two coordinates, in metres.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::domain::{Coordinate, DistanceLibrary};
    ///
    /// let lib = DistanceLibrary::default();
    /// let a = Coordinate::new(0.0, 0.0).unwrap();
    /// let b = Coordinate::new(0.0, 1.0).unwrap();
    /// let d = lib.distance(a, b);
    /// assert!((d - 111_195.0).abs() < 10.0);
    /// ```
    pub fn distance(&self, a: Coordinate, b: Coordinate) -> f64 {
        let lat1 = a.lat.to_radians();
        let lat2 = b.lat.to_radians();
        let dlat = lat2 - lat1;
        let dlon = (b.lon - a.lon).to_radians();

        let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * self.radius_m * h.sqrt().min(1.0).asin()
    }

    /// Metres per degree of latitude on this sphere.
    pub fn metres_per_degree(&self) -> f64 {
        self.radius_m * std::f64::consts::PI / 180.0
    }
}

impl Default for DistanceLibrary {
    fn default() -> Self {
        Self::with_radius(Self::EARTH_RADIUS_M)
    }
}
