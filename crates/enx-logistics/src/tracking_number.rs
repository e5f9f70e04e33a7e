use chrono::{DateTime, Utc};
use rand::Rng;

const PREFIX: &str = "ENX";

/// `ENX` + last six digits of the epoch millis + a zero-padded random 0..=999.
/// Uniqueness is assumed from timestamp and randomness, not checked.
pub fn generate_tracking_number(now: DateTime<Utc>) -> String {
    let suffix = rand::rng().random_range(0..1000u32);
    format_tracking_number(now.timestamp_millis(), suffix)
}

pub(crate) fn format_tracking_number(epoch_millis: i64, suffix: u32) -> String {
    format!(
        "{PREFIX}{:06}{:03}",
        epoch_millis.rem_euclid(1_000_000),
        suffix % 1000
    )
}

pub fn is_tracking_number(value: &str) -> bool {
    value
        .strip_prefix(PREFIX)
        .is_some_and(|digits| digits.len() == 9 && digits.bytes().all(|b| b.is_ascii_digit()))
}
