//! Time utilities for ledger-verifications.
//!
//! Ledger timestamps are Unix epoch seconds (u64). Zero means "unset".

/// Return the current time as seconds since Unix epoch.
pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Convert epoch seconds to an RFC 3339 string.
///
/// Seconds beyond chrono's representable range clamp to its maximum.
pub fn secs_to_rfc3339(secs: u64) -> String {
    let dt = i64::try_from(secs)
        .ok()
        .and_then(|s| chrono::DateTime::from_timestamp(s, 0))
        .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);
    dt.to_rfc3339()
}

/// Map the ledger's zero sentinel to `None`.
pub fn optional_secs(secs: u64) -> Option<u64> {
    (secs != 0).then_some(secs)
}
