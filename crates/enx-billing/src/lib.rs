pub mod invoice;
pub mod invoice_number;

pub use invoice::{
    BillingError, Invoice, InvoiceItem, InvoiceStatus, InvoiceUpdate, NewInvoice,
    NewInvoiceItem, PaymentMethod, StatusSummary, TAX_RATE,
};
pub use invoice_number::generate_invoice_number;
