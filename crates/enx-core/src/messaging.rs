use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageReceipt {
    pub to: String,
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessengerStatus {
    pub ready: bool,
    pub phone: Option<String>,
    pub platform: Option<String>,
    pub connected: bool,
}

/// Outbound chat channel. One instance is built at startup and shared by
/// every handler that notifies customers.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, phone_number: &str, body: &str) -> anyhow::Result<MessageReceipt>;
    async fn status(&self) -> MessengerStatus;
}

pub mod templates {
    use rust_decimal::{Decimal, RoundingStrategy};

    const BRAND: &str = "P&D EnielExpress";

    pub fn tracking_link(frontend_url: &str, tracking_number: &str) -> String {
        format!(
            "{}/tracking.html?number={tracking_number}",
            frontend_url.trim_end_matches('/')
        )
    }

    pub fn tracking_update(
        frontend_url: &str,
        tracking_number: &str,
        status: &str,
        location: &str,
        description: &str,
    ) -> String {
        format!(
            "*{BRAND} Tracking Update*\n\n\
             Tracking Number: {tracking_number}\n\
             Status: {status}\n\
             Location: {location}\n\
             Description: {description}\n\n\
             Track your shipment: {}",
            tracking_link(frontend_url, tracking_number)
        )
    }

    pub fn payment_confirmation(invoice_number: &str, amount: &str, payment_date: &str) -> String {
        format!(
            "*{BRAND} Payment Confirmation*\n\n\
             Invoice Number: {invoice_number}\n\
             Amount: {amount}\n\
             Payment Date: {payment_date}\n\n\
             Thank you for your payment! Your invoice has been marked as paid."
        )
    }

    pub fn delivery_notification(
        tracking_number: &str,
        recipient_name: &str,
        delivery_time: &str,
    ) -> String {
        format!(
            "*{BRAND} Delivery Notification*\n\n\
             Dear {recipient_name},\n\n\
             Your package with tracking number {tracking_number} has been delivered.\n\
             Delivery Time: {delivery_time}\n\n\
             Thank you for choosing {BRAND}!"
        )
    }

    pub fn subscription_confirmation(tracking_number: &str) -> String {
        format!(
            "You have successfully subscribed to tracking updates for shipment {tracking_number}. \
             You will receive notifications when the status changes."
        )
    }

    /// Two-decimal amount with the currency symbol and thousands separators.
    pub fn format_currency(amount: Decimal, currency: &str) -> String {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let digits = format!("{:.2}", rounded.abs());
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (index, ch) in whole.chars().enumerate() {
            if index > 0 && (whole.len() - index) % 3 == 0 {
                grouped.push(',');
            }
            grouped.push(ch);
        }

        let code = currency.trim().to_ascii_uppercase();
        let prefix = match code.as_str() {
            "USD" => "$".to_string(),
            "NGN" => "₦".to_string(),
            "EUR" => "€".to_string(),
            "GBP" => "£".to_string(),
            _ => format!("{code} "),
        };
        let sign = if negative { "-" } else { "" };
        format!("{sign}{prefix}{grouped}.{fraction}")
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::templates::*;

    #[test]
    fn tracking_update_includes_link_without_double_slash() {
        let body = tracking_update(
            "http://localhost:3000/",
            "ENX123456789",
            "In Transit",
            "Lagos Hub",
            "Departed facility",
        );
        assert!(body.starts_with("*P&D EnielExpress Tracking Update*"));
        assert!(body.contains("Status: In Transit"));
        assert!(body.contains("http://localhost:3000/tracking.html?number=ENX123456789"));
    }

    #[test]
    fn currency_is_grouped_and_rounded() {
        let amount = Decimal::from_str("1234567.005").unwrap();
        assert_eq!(format_currency(amount, "usd"), "$1,234,567.01");
        assert_eq!(format_currency(Decimal::from_str("27.5").unwrap(), "USD"), "$27.50");
        assert_eq!(format_currency(Decimal::ZERO, "KES"), "KES 0.00");
        assert_eq!(format_currency(Decimal::from_str("-12").unwrap(), "GBP"), "-£12.00");
    }

    #[test]
    fn delivery_message_addresses_recipient() {
        let body = delivery_notification("ENX1", "Chidi", "2026-01-01 10:00");
        assert!(body.contains("Dear Chidi,"));
        assert!(body.contains("ENX1 has been delivered"));
    }
}
