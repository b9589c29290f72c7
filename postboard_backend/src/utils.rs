use chrono::{DateTime, Duration, Utc};

pub const APP_NAME: &str = "postboard_backend";

const MAX_OFFSET_SECS: u64 = 100 * 365 * 24 * 60 * 60;

pub fn now_utc_iso() -> String {
    Utc::now().to_rfc3339()
}

/// RFC 3339 timestamp `secs` seconds from now.
pub fn utc_iso_in(secs: u64) -> String {
    let secs = secs.min(MAX_OFFSET_SECS) as i64;
    (Utc::now() + Duration::seconds(secs)).to_rfc3339()
}

/// Whether an RFC 3339 timestamp lies in the past. Unparseable values count
/// as expired.
pub fn is_expired(timestamp: &str) -> bool {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(at) => at.with_timezone(&Utc) <= Utc::now(),
        Err(_) => true,
    }
}

pub fn print_banner() {
    println!("{APP_NAME} v{}", env!("CARGO_PKG_VERSION"));
}
