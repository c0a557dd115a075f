// crates/hcp-store/src/partition.rs
//
// Calendar-month range partitioning for the transaction ledger.
//
// Each month `[month_start, month_start + 1 month)` maps to one column family
// named `transactions_YYYY_MM`. The name is a pure function of the month, so
// every writer derives the same partition for the same `submitted_at`, and the
// names sort lexicographically in time order.

use chrono::{DateTime, Datelike, TimeZone, Utc};

/// Prefix shared by every ledger partition.
pub const PARTITION_PREFIX: &str = "transactions_";

/// Deterministic partition name for the month containing `ts`.
pub fn partition_name(ts: DateTime<Utc>) -> String {
    format!("{}{:04}_{:02}", PARTITION_PREFIX, ts.year(), ts.month())
}

/// Half-open `[start, end)` bounds of the month containing `ts`.
pub fn month_bounds(ts: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let (year, month) = (ts.year(), ts.month());
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let start = Utc
        .with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .unwrap_or(ts);
    let end = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single()
        .unwrap_or(ts);
    (start, end)
}

/// Whether a column family name denotes a ledger partition.
pub fn is_partition_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix(PARTITION_PREFIX) else {
        return false;
    };
    let bytes = rest.as_bytes();
    bytes.len() == 7
        && bytes[4] == b'_'
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[5..].iter().all(u8::is_ascii_digit)
}
