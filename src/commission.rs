//! Resolves the platform's cut of a fare from a driver's rate profile.
//!
//! The base rate is first replaced by at most one time-bucket rate (peak,
//! then night, then weekend; first match wins), and the result may then be
//! superseded by the long-distance rate.

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::entities::DriverRateProfile;

pub const DEFAULT_COMMISSION_RATE: f64 = 10.0;

pub const LONG_DISTANCE_THRESHOLD_KM: f64 = 50.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeBucket {
    Peak,
    Night,
    Weekend,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Breakdown {
    pub base_rate: f64,
    pub time_bucket: Option<TimeBucket>,
    /// Rate change contributed by the time bucket, in percentage points.
    pub time_adjustment: f64,
    pub long_distance: bool,
    /// Rate change contributed by the distance override on top of the time
    /// bucket, in percentage points.
    pub distance_adjustment: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Commission {
    pub applied_rate: f64,
    pub commission_amount: f64,
    pub driver_earnings: f64,
    pub breakdown: Breakdown,
}

fn is_weekend(day: Weekday) -> bool {
    matches!(day, Weekday::Sat | Weekday::Sun)
}

fn is_peak_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

fn is_night_hour(hour: u32) -> bool {
    hour >= 22 || hour <= 5
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Which time bucket applies at `when`, given the rates the profile sets.
pub fn time_bucket(profile: &DriverRateProfile, when: &NaiveDateTime) -> Option<(TimeBucket, f64)> {
    let hour = when.hour();
    let weekend = is_weekend(when.weekday());

    if let Some(rate) = profile.peak_rate.filter(|_| !weekend && is_peak_hour(hour)) {
        return Some((TimeBucket::Peak, rate));
    }

    if let Some(rate) = profile.night_rate.filter(|_| is_night_hour(hour)) {
        return Some((TimeBucket::Night, rate));
    }

    if let Some(rate) = profile.weekend_rate.filter(|_| weekend) {
        return Some((TimeBucket::Weekend, rate));
    }

    None
}

/// `when` is the wall-clock time in the market where the trip ran.
pub fn resolve(
    profile: &DriverRateProfile,
    booking_amount: f64,
    when: NaiveDateTime,
    distance_km: Option<f64>,
) -> Commission {
    let base_rate = profile.base_rate.unwrap_or(DEFAULT_COMMISSION_RATE);

    let bucket = time_bucket(profile, &when);
    let time_rate = bucket.map_or(base_rate, |(_, rate)| rate);

    let long_distance_rate = profile
        .long_distance_rate
        .filter(|_| distance_km.map_or(false, |d| d > LONG_DISTANCE_THRESHOLD_KM));
    let applied_rate = long_distance_rate.unwrap_or(time_rate);

    let commission_amount = round_cents(booking_amount * applied_rate / 100.0);

    Commission {
        applied_rate,
        commission_amount,
        driver_earnings: round_cents(booking_amount - commission_amount),
        breakdown: Breakdown {
            base_rate,
            time_bucket: bucket.map(|(bucket, _)| bucket),
            time_adjustment: time_rate - base_rate,
            long_distance: long_distance_rate.is_some(),
            distance_adjustment: applied_rate - time_rate,
        },
    }
}
