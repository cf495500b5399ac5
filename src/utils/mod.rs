//! Utility functions and helpers.

pub mod clock;
pub mod http;
pub mod retry;

pub use clock::{Clock, FixedClock, SystemClock};
pub use retry::{RetryPolicy, with_retry};
