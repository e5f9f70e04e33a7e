use chrono::{DateTime, Utc};
use rand::Rng;

/// `INV` + issue date as YYYYMMDD + a zero-padded random 0..=999.
pub fn generate_invoice_number(now: DateTime<Utc>) -> String {
    let suffix = rand::rng().random_range(0..1000u32);
    format_invoice_number(now, suffix)
}

fn format_invoice_number(now: DateTime<Utc>, suffix: u32) -> String {
    format!("INV{}{:03}", now.format("%Y%m%d"), suffix % 1000)
}
