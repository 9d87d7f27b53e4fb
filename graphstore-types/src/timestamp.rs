//! Timestamp serialization for object bodies.
//!
//! `created_at`, `updated_at` and `deleted_at` are stored as RFC 3339 strings
//! in UTC with millisecond precision, e.g. `2026-03-01T10:15:30.250Z`.

use chrono::{DateTime, SecondsFormat, Utc};

/// Serializes a point in time the way object bodies store it.
#[must_use]
pub fn serialize_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The current time, serialized.
#[must_use]
pub fn now_rfc3339() -> String {
    serialize_date(Utc::now())
}
