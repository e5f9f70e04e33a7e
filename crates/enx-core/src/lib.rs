pub mod error;
pub mod messaging;
pub mod models;
pub mod pagination;
pub mod payments;

pub use error::CoreError;
pub use messaging::{MessageReceipt, Messenger, MessengerStatus, templates};
pub use models::{Principal, Role, User, UserView};
pub use pagination::{Page, Paginated, PaginationMeta};
pub use payments::{PaymentGateway, PaymentSession, PaymentVerification};
