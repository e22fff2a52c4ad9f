mod guard;
pub mod jwt;

pub use guard::{authorize, Authorization};

/// Current unix time in seconds, the unit JWT `exp` uses.
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
