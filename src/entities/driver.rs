use chrono::{DateTime, Utc};
use oso::PolarClass;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Driver {
    pub id: Uuid,
    pub rates: DriverRateProfile,
    pub created_at: DateTime<Utc>,
}

/// Commission percentages negotiated with a driver. Unset rates fall back
/// to the base rate, and an unset base rate to the platform default.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverRateProfile {
    pub base_rate: Option<f64>,
    pub peak_rate: Option<f64>,
    pub night_rate: Option<f64>,
    pub weekend_rate: Option<f64>,
    pub long_distance_rate: Option<f64>,
}

impl DriverRateProfile {
    pub fn validate(&self) -> Result<(), Error> {
        let rates = [
            ("base", self.base_rate),
            ("peak", self.peak_rate),
            ("night", self.night_rate),
            ("weekend", self.weekend_rate),
            ("long distance", self.long_distance_rate),
        ];

        for (name, rate) in rates {
            if let Some(rate) = rate {
                if !rate.is_finite() || !(0.0..=100.0).contains(&rate) {
                    return Err(Error::invalid_request_error(format!(
                        "{} rate must be a percentage between 0 and 100",
                        name
                    )));
                }
            }
        }

        Ok(())
    }
}

impl Driver {
    pub fn new(id: Uuid, rates: DriverRateProfile, created_at: DateTime<Utc>) -> Result<Self, Error> {
        rates.validate()?;

        Ok(Self {
            id,
            rates,
            created_at,
        })
    }
}

impl PolarClass for Driver {
    fn get_polar_class_builder() -> oso::ClassBuilder<Driver> {
        oso::Class::builder()
            .name("Driver")
            .add_attribute_getter("id", |recv: &Driver| recv.id.to_string())
    }

    fn get_polar_class() -> oso::Class {
        let builder = Driver::get_polar_class_builder();
        builder.build()
    }
}

#[test]
fn rate_profile_validation_test() {
    let mut rates = DriverRateProfile {
        base_rate: Some(10.0),
        peak_rate: Some(15.0),
        ..Default::default()
    };
    assert!(rates.validate().is_ok());

    rates.night_rate = Some(120.0);
    assert!(rates.validate().unwrap_err().is_invalid_request_error());

    rates.night_rate = Some(-1.0);
    assert!(Driver::new(Uuid::new_v4(), rates, Utc::now()).is_err());
}
