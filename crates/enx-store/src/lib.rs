pub mod memory;
pub mod storage;

pub use memory::{
    InMemoryInvoiceStore, InMemoryItemStore, InMemoryShipmentStore, InMemoryUserStore,
};
pub use storage::{InvoiceStore, ItemStore, ShipmentStore, UserStore};
