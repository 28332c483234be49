use geo_types::{Geometry, Point};
use serde::{Deserialize, Serialize};

use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(Error::invalid_request_error("latitude out of range"));
        }

        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(Error::invalid_request_error("longitude out of range"));
        }

        Ok(())
    }
}

impl From<Coordinates> for Geometry<f64> {
    fn from(coordinates: Coordinates) -> Self {
        Geometry::Point(Point::new(coordinates.lng, coordinates.lat))
    }
}

/// A resolved point with the label the rider saw when choosing it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub coordinates: Coordinates,
    #[serde(default)]
    pub label: String,
}

impl Place {
    pub fn new(coordinates: Coordinates, label: impl Into<String>) -> Self {
        Self {
            coordinates,
            label: label.into(),
        }
    }
}

#[test]
fn coordinates_validation_test() {
    assert!(Coordinates::new(12.9716, 77.5946).validate().is_ok());
    assert!(Coordinates::new(-90.0, 180.0).validate().is_ok());

    let err = Coordinates::new(91.0, 0.0).validate().unwrap_err();
    assert!(err.is_invalid_request_error());

    let err = Coordinates::new(0.0, f64::NAN).validate().unwrap_err();
    assert!(err.is_invalid_request_error());
}
