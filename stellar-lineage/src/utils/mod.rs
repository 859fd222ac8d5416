//! Utility functions for time, clocks and input validation.

mod clock;
pub mod timestamps;
mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use timestamps::{now_utc, parse_horizon_timestamp, Timestamp, TimestampError};
pub use validation::{document_id_from_href, is_account_address, validate_account_address};
