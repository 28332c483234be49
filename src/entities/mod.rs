mod bid;
mod booking;
mod driver;
mod ledger;
mod location;
mod tracking;

pub use bid::{validate_offer, Bid, Status as BidStatus};
pub use booking::{Booking, BookingRequest, Status as BookingStatus};
pub use driver::{Driver, DriverRateProfile};
pub use ledger::{Acceptance, BookingLedger};
pub use location::{Coordinates, Place};
pub use tracking::TrackingRecord;
