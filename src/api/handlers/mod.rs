//! API handlers and shared helpers.
//!
//! The auth module owns the credential store, login-attempt ledger, rate
//! limiter, and session guard; the remaining modules are the guarded CRUD
//! surface over brands and their tasks, shoots, and content items.

pub mod auth;
pub mod brands;
pub mod content;
pub mod dashboard;
pub mod health;
pub mod shoots;
pub mod tasks;

use chrono::NaiveDate;
use std::time::SystemTime;

/// Unix seconds for ledger timestamps and session activity checks.
#[must_use]
pub fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Calendar fields travel as ISO `YYYY-MM-DD` strings.
pub(crate) fn valid_date(value: &str) -> bool {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
