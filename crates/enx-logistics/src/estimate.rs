use chrono::{DateTime, TimeDelta, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::{Deserialize, Serialize};

use crate::shipment::ServiceType;

const EARTH_RADIUS_KM: f64 = 6371.0;
const VOLUMETRIC_DIVISOR: f64 = 5000.0;

/// Half the Earth's circumference; no two points on the surface are further apart.
pub const MAX_DISTANCE_KM: f64 = 20_040.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Dimensions {
    pub length: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl Dimensions {
    /// l·w·h when every side is known and non-zero.
    pub fn volume(&self) -> Option<f64> {
        match (self.length, self.width, self.height) {
            (Some(l), Some(w), Some(h)) if l > 0.0 && w > 0.0 && h > 0.0 => Some(l * w * h),
            _ => None,
        }
    }

    pub fn has_negative_side(&self) -> bool {
        [self.length, self.width, self.height]
            .into_iter()
            .flatten()
            .any(|side| side < 0.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    #[serde(alias = "lng")]
    pub lon: f64,
}

/// Great-circle distance in kilometres.
pub fn distance_km(from: Coordinates, to: Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lon - from.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

pub fn transit_days(service_type: ServiceType, distance_km: f64) -> i64 {
    let base: i64 = match service_type {
        ServiceType::Overnight => 1,
        ServiceType::Express => 2,
        ServiceType::Standard => 5,
        ServiceType::International => 10,
    };
    let extra = if distance_km > 1000.0 {
        (distance_km / 1000.0).floor() as i64
    } else {
        0
    };
    base.saturating_add(extra)
}

/// `None` when the transit time would carry the date past chrono's range.
pub fn estimated_delivery(
    service_type: ServiceType,
    distance_km: f64,
    from: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    let transit = TimeDelta::try_days(transit_days(service_type, distance_km))?;
    from.checked_add_signed(transit)
}

/// Tariff: weight band, volumetric surcharge, service multiplier, then a
/// distance surcharge; rounded to cents.
pub fn shipping_cost(
    weight_kg: f64,
    dimensions: Option<&Dimensions>,
    service_type: ServiceType,
    distance_km: f64,
) -> Decimal {
    let mut cost = 5.0;

    cost += if weight_kg <= 1.0 {
        5.0
    } else if weight_kg <= 5.0 {
        10.0
    } else if weight_kg <= 10.0 {
        20.0
    } else {
        30.0 + (weight_kg - 10.0) * 2.0
    };

    if let Some(volume) = dimensions.and_then(Dimensions::volume) {
        let volumetric_weight = volume / VOLUMETRIC_DIVISOR;
        if volumetric_weight > weight_kg {
            cost += (volumetric_weight - weight_kg) * 2.0;
        }
    }

    cost *= match service_type {
        ServiceType::Overnight => 3.0,
        ServiceType::Express => 2.0,
        ServiceType::Standard => 1.0,
        ServiceType::International => 4.0,
    };

    if distance_km > 100.0 {
        cost += (distance_km / 100.0) * 2.0;
    }

    Decimal::from_f64(cost)
        .unwrap_or_default()
        .round_dp(2)
}
