use oso::{Oso, PolarClass};

use crate::auth::{Platform, User};
use crate::entities::{Booking, Driver};
use crate::error::Error;

pub fn new() -> Result<Oso, Error> {
    let mut o = Oso::new();

    o.register_class(Platform::get_polar_class())?;
    o.register_class(User::get_polar_class())?;
    o.register_class(Driver::get_polar_class())?;
    o.register_class(Booking::get_polar_class())?;

    o.load_str(include_str!("rules.polar"))?;

    Ok(o)
}

#[cfg(test)]
fn booking_for(rider_id: uuid::Uuid) -> Booking {
    use crate::entities::{BookingRequest, Coordinates, Place};
    use chrono::{Duration, Utc};

    let request = BookingRequest {
        pickup: Place::new(Coordinates::new(0.0, 0.0), ""),
        drop: None,
        vehicle_class: "sedan".into(),
        estimated_price: 100.0,
    };

    Booking::open(rider_id, request, Duration::seconds(300), Utc::now()).unwrap()
}

#[test]
fn rider_booking_role_test() {
    let authorizor = new().unwrap();

    let rider = User::new_rider();
    let stranger = User::new_rider();
    let booking = booking_for(rider.id);

    for action in ["read", "list_bids", "accept_bid", "cancel"] {
        let result = authorizor.is_allowed(rider.clone(), action, booking.clone());
        assert_eq!(result.unwrap(), true, "{}", action);

        let result = authorizor.is_allowed(stranger.clone(), action, booking.clone());
        assert_eq!(result.unwrap(), false, "{}", action);
    }

    let result = authorizor.is_allowed(rider.clone(), "progress", booking.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(rider.clone(), "open_bidding", Platform::default());
    assert_eq!(result.unwrap(), true);
}

#[test]
fn assigned_driver_booking_role_test() {
    use chrono::Utc;
    use uuid::Uuid;

    let authorizor = new().unwrap();

    let driver = User::new_driver();
    let mut booking = booking_for(Uuid::new_v4());

    // before the driver wins the booking

    let result = authorizor.is_allowed(driver.clone(), "read", booking.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(driver.clone(), "progress", booking.clone());
    assert_eq!(result.unwrap(), false);

    booking.assign(driver.id, Uuid::new_v4(), Utc::now()).unwrap();

    // after the driver wins the booking

    for action in ["read", "progress", "track", "cancel"] {
        let result = authorizor.is_allowed(driver.clone(), action, booking.clone());
        assert_eq!(result.unwrap(), true, "{}", action);
    }

    let result = authorizor.is_allowed(driver.clone(), "accept_bid", booking.clone());
    assert_eq!(result.unwrap(), false);

    let result = authorizor.is_allowed(driver.clone(), "open_bidding", Platform::default());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn driver_acts_only_as_self_test() {
    use crate::entities::DriverRateProfile;
    use chrono::Utc;

    let authorizor = new().unwrap();

    let user = User::new_driver();
    let other = User::new_driver();
    let driver = Driver::new(user.id, DriverRateProfile::default(), Utc::now()).unwrap();

    for action in ["list_open", "place_bid", "update_location"] {
        let result = authorizor.is_allowed(user.clone(), action, driver.clone());
        assert_eq!(result.unwrap(), true, "{}", action);

        let result = authorizor.is_allowed(other.clone(), action, driver.clone());
        assert_eq!(result.unwrap(), false, "{}", action);
    }

    let result = authorizor.is_allowed(user.clone(), "update_rates", driver.clone());
    assert_eq!(result.unwrap(), false);
}

#[test]
fn operator_role_test() {
    use crate::entities::DriverRateProfile;
    use chrono::Utc;
    use uuid::Uuid;

    let authorizor = new().unwrap();

    let operator = User::new_operator();
    let booking = booking_for(Uuid::new_v4());
    let driver = Driver::new(Uuid::new_v4(), DriverRateProfile::default(), Utc::now()).unwrap();

    let result = authorizor.is_allowed(operator.clone(), "accept_bid", booking.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(operator.clone(), "create_driver", Platform::default());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(operator.clone(), "update_rates", driver.clone());
    assert_eq!(result.unwrap(), true);

    let result = authorizor.is_allowed(operator.clone(), "place_bid", driver.clone());
    assert_eq!(result.unwrap(), false);
}
