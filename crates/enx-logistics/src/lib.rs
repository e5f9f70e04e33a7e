pub mod estimate;
pub mod item;
pub mod scan;
pub mod shipment;
pub mod tracking_number;

pub use estimate::{
    Coordinates, Dimensions, MAX_DISTANCE_KM, distance_km, estimated_delivery, shipping_cost, transit_days,
};
pub use item::{CategoryStats, Item, ItemCategory, NewItem, summarize_by_category};
pub use scan::{ScanError, ScanType, extract_tracking_number};
pub use shipment::{
    NewShipment, PackageType, ServiceType, Shipment, ShipmentPaymentStatus, ShipmentStatus,
    TrackingEvent,
};
pub use tracking_number::{generate_tracking_number, is_tracking_number};
