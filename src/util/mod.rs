pub mod backoff;
pub mod countdown;

pub use backoff::Backoff;
pub use countdown::Countdown;
