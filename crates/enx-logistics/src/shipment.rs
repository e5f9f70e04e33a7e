use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::estimate::Dimensions;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum ShipmentStatus {
    #[default]
    #[serde(rename = "Package Received")]
    PackageReceived,
    #[serde(rename = "In Transit")]
    InTransit,
    #[serde(rename = "Out for Delivery")]
    OutForDelivery,
    #[serde(rename = "Delivered")]
    Delivered,
    #[serde(rename = "Customs")]
    Customs,
    #[serde(rename = "Exception")]
    Exception,
}

impl ShipmentStatus {
    pub const ALL: [ShipmentStatus; 6] = [
        ShipmentStatus::PackageReceived,
        ShipmentStatus::InTransit,
        ShipmentStatus::OutForDelivery,
        ShipmentStatus::Delivered,
        ShipmentStatus::Customs,
        ShipmentStatus::Exception,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ShipmentStatus::PackageReceived => "Package Received",
            ShipmentStatus::InTransit => "In Transit",
            ShipmentStatus::OutForDelivery => "Out for Delivery",
            ShipmentStatus::Delivered => "Delivered",
            ShipmentStatus::Customs => "Customs",
            ShipmentStatus::Exception => "Exception",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    Standard,
    Express,
    Overnight,
    International,
}

impl ServiceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceType::Standard => "standard",
            ServiceType::Express => "express",
            ServiceType::Overnight => "overnight",
            ServiceType::International => "international",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "standard" => Some(ServiceType::Standard),
            "express" => Some(ServiceType::Express),
            "overnight" => Some(ServiceType::Overnight),
            "international" => Some(ServiceType::International),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    Document,
    #[default]
    Parcel,
    Freight,
}

impl PackageType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "document" => Some(PackageType::Document),
            "parcel" => Some(PackageType::Parcel),
            "freight" => Some(PackageType::Freight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShipmentPaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    pub status: ShipmentStatus,
    pub location: String,
    pub timestamp: DateTime<Utc>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: Uuid,
    pub tracking_number: String,
    pub sender_name: String,
    pub sender_phone: String,
    pub sender_email: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_email: String,
    pub recipient_address: String,
    pub package_description: String,
    pub package_weight: f64,
    pub package_dimensions: Option<Dimensions>,
    #[serde(with = "rust_decimal::serde::float")]
    pub package_value: Decimal,
    pub package_type: PackageType,
    pub service_type: ServiceType,
    pub origin: String,
    pub destination: String,
    pub status: ShipmentStatus,
    /// Insertion order; entries are never edited or removed.
    pub tracking_history: Vec<TrackingEvent>,
    pub estimated_delivery: DateTime<Utc>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub payment_status: ShipmentPaymentStatus,
    pub invoice_id: Option<Uuid>,
    #[serde(default)]
    pub notification_phone_numbers: Vec<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated input for a new shipment.
#[derive(Debug, Clone)]
pub struct NewShipment {
    pub sender_name: String,
    pub sender_phone: String,
    pub sender_email: String,
    pub sender_address: String,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_email: String,
    pub recipient_address: String,
    pub package_description: String,
    pub package_weight: f64,
    pub package_dimensions: Option<Dimensions>,
    pub package_value: Decimal,
    pub package_type: PackageType,
    pub service_type: ServiceType,
    pub origin: String,
    pub destination: String,
    pub estimated_delivery: DateTime<Utc>,
    pub notes: Option<String>,
}

pub const RECEIVED_DESCRIPTION: &str = "Package has been received at the origin facility";

impl Shipment {
    pub fn create(
        input: NewShipment,
        tracking_number: String,
        created_by: Uuid,
        now: DateTime<Utc>,
    ) -> Self {
        let first_event = TrackingEvent {
            status: ShipmentStatus::PackageReceived,
            location: input.origin.clone(),
            timestamp: now,
            description: Some(RECEIVED_DESCRIPTION.to_string()),
        };

        Self {
            id: Uuid::new_v4(),
            tracking_number,
            sender_name: input.sender_name,
            sender_phone: input.sender_phone,
            sender_email: input.sender_email,
            sender_address: input.sender_address,
            recipient_name: input.recipient_name,
            recipient_phone: input.recipient_phone,
            recipient_email: input.recipient_email,
            recipient_address: input.recipient_address,
            package_description: input.package_description,
            package_weight: input.package_weight,
            package_dimensions: input.package_dimensions,
            package_value: input.package_value,
            package_type: input.package_type,
            service_type: input.service_type,
            origin: input.origin,
            destination: input.destination,
            status: ShipmentStatus::PackageReceived,
            tracking_history: vec![first_event],
            estimated_delivery: input.estimated_delivery,
            actual_delivery: None,
            payment_status: ShipmentPaymentStatus::Pending,
            invoice_id: None,
            notification_phone_numbers: Vec::new(),
            notes: input.notes,
            created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a history entry and moves the shipment to `status`.
    /// `actual_delivery` is stamped only when the new status is Delivered.
    pub fn record_event(
        &mut self,
        status: ShipmentStatus,
        location: String,
        description: Option<String>,
        actor: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> &TrackingEvent {
        if status == ShipmentStatus::Delivered {
            self.actual_delivery = Some(now);
        }
        self.push_event(status, location, description, actor, now)
    }

    /// Scan variant: without an explicit status the current one is repeated
    /// in the history and delivery time is left alone.
    pub fn record_scan(
        &mut self,
        status: Option<ShipmentStatus>,
        location: String,
        description: Option<String>,
        actor: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> &TrackingEvent {
        match status {
            Some(status) => self.record_event(status, location, description, actor, now),
            None => {
                let current = self.status;
                self.push_event(current, location, description, actor, now)
            }
        }
    }

    fn push_event(
        &mut self,
        status: ShipmentStatus,
        location: String,
        description: Option<String>,
        actor: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> &TrackingEvent {
        self.status = status;
        self.updated_at = now;
        if actor.is_some() {
            self.updated_by = actor;
        }
        let index = self.tracking_history.len();
        self.tracking_history.push(TrackingEvent {
            status,
            location,
            timestamp: now,
            description,
        });
        &self.tracking_history[index]
    }

    /// Adds `phone_number` to the notification list; false when already present.
    pub fn subscribe(&mut self, phone_number: &str) -> bool {
        let phone_number = phone_number.trim();
        if self
            .notification_phone_numbers
            .iter()
            .any(|existing| existing == phone_number)
        {
            return false;
        }
        self.notification_phone_numbers.push(phone_number.to_string());
        true
    }

    pub fn history_newest_first(&self) -> Vec<TrackingEvent> {
        self.tracking_history.iter().rev().cloned().collect()
    }

    /// Recipient first, then subscribers, without repeats.
    pub fn notification_targets(&self) -> Vec<String> {
        let mut targets = vec![self.recipient_phone.clone()];
        for phone in &self.notification_phone_numbers {
            if !targets.contains(phone) {
                targets.push(phone.clone());
            }
        }
        targets
    }

    pub fn involves_email(&self, email: &str) -> bool {
        self.sender_email.eq_ignore_ascii_case(email)
            || self.recipient_email.eq_ignore_ascii_case(email)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn sample_input() -> NewShipment {
        NewShipment {
            sender_name: "Ngozi Eze".into(),
            sender_phone: "+2348012345678".into(),
            sender_email: "ngozi@example.com".into(),
            sender_address: "12 Marina, Lagos".into(),
            recipient_name: "Tunde Bakare".into(),
            recipient_phone: "+2348098765432".into(),
            recipient_email: "tunde@example.com".into(),
            recipient_address: "4 Ring Road, Ibadan".into(),
            package_description: "Laptop".into(),
            package_weight: 2.5,
            package_dimensions: None,
            package_value: Decimal::new(120000, 2),
            package_type: PackageType::Parcel,
            service_type: ServiceType::Express,
            origin: "Lagos".into(),
            destination: "Ibadan".into(),
            estimated_delivery: Utc::now() + Duration::days(2),
            notes: None,
        }
    }

    fn sample() -> Shipment {
        Shipment::create(
            sample_input(),
            "ENX123456007".into(),
            Uuid::new_v4(),
            Utc::now(),
        )
    }

    #[test]
    fn creation_seeds_received_entry_at_origin() {
        let shipment = sample();
        assert_eq!(shipment.status, ShipmentStatus::PackageReceived);
        assert_eq!(shipment.tracking_history.len(), 1);
        assert_eq!(shipment.tracking_history[0].location, "Lagos");
        assert!(shipment.actual_delivery.is_none());
    }

    #[test]
    fn history_only_grows() {
        let mut shipment = sample();
        let mut previous = shipment.tracking_history.len();
        for status in [
            ShipmentStatus::InTransit,
            ShipmentStatus::Customs,
            ShipmentStatus::InTransit,
            ShipmentStatus::OutForDelivery,
        ] {
            shipment.record_event(status, "Hub".into(), None, None, Utc::now());
            assert!(shipment.tracking_history.len() > previous);
            previous = shipment.tracking_history.len();
        }
        assert_eq!(shipment.status, ShipmentStatus::OutForDelivery);
    }

    #[test]
    fn delivered_sets_actual_delivery_and_others_leave_it() {
        let mut shipment = sample();
        shipment.record_event(ShipmentStatus::InTransit, "Hub".into(), None, None, Utc::now());
        assert!(shipment.actual_delivery.is_none());

        let delivered_at = Utc::now();
        shipment.record_event(ShipmentStatus::Delivered, "Ibadan".into(), None, None, delivered_at);
        assert_eq!(shipment.actual_delivery, Some(delivered_at));

        shipment.record_event(
            ShipmentStatus::Exception,
            "Ibadan".into(),
            Some("Returned".into()),
            None,
            delivered_at + Duration::hours(1),
        );
        assert_eq!(shipment.actual_delivery, Some(delivered_at));
    }

    #[test]
    fn scan_without_status_keeps_current_status() {
        let mut shipment = sample();
        shipment.record_event(ShipmentStatus::InTransit, "Hub".into(), None, None, Utc::now());
        let event = shipment
            .record_scan(None, "Abeokuta".into(), Some("Scanned".into()), None, Utc::now())
            .clone();
        assert_eq!(event.status, ShipmentStatus::InTransit);
        assert_eq!(shipment.tracking_history.len(), 3);
    }

    #[test]
    fn subscribe_is_idempotent() {
        let mut shipment = sample();
        assert!(shipment.subscribe("+2348011111111"));
        assert!(!shipment.subscribe("+2348011111111"));
        assert!(!shipment.subscribe(" +2348011111111 "));
        assert_eq!(shipment.notification_phone_numbers.len(), 1);
    }

    #[test]
    fn notification_targets_skip_recipient_duplicate() {
        let mut shipment = sample();
        shipment.subscribe("+2348098765432");
        shipment.subscribe("+2348011111111");
        assert_eq!(
            shipment.notification_targets(),
            vec!["+2348098765432".to_string(), "+2348011111111".to_string()]
        );
    }

    #[test]
    fn display_order_is_reverse_chronological() {
        let mut shipment = sample();
        shipment.record_event(ShipmentStatus::InTransit, "Hub".into(), None, None, Utc::now());
        let newest_first = shipment.history_newest_first();
        assert_eq!(newest_first[0].status, ShipmentStatus::InTransit);
        assert_eq!(newest_first[1].status, ShipmentStatus::PackageReceived);
    }

    #[test]
    fn status_serializes_with_display_names() {
        let json = serde_json::to_value(ShipmentStatus::OutForDelivery).unwrap();
        assert_eq!(json, "Out for Delivery");
        assert_eq!(
            ShipmentStatus::parse("out for delivery"),
            Some(ShipmentStatus::OutForDelivery)
        );
        assert_eq!(ShipmentStatus::parse("Lost"), None);
    }
}
