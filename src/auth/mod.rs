pub mod authorizor;
mod platform;
mod user;

pub use platform::Platform;
pub use user::{User, DRIVER_ROLE, OPERATOR_ROLE, RIDER_ROLE};
