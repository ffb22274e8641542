#![forbid(unsafe_code)]

pub mod error;
pub mod model;
pub mod progression;
pub mod time;

pub use error::OrdinalError;
pub use time::Clock;
