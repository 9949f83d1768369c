mod approval;
mod storage;
mod types;

pub use approval::ApprovalMode;
pub use storage::{BookingError, BookingStore};
pub use types::{Booking, BookingRequest, BookingStatus, PricingConfig};
