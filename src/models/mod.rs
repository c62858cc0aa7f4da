pub mod account;
pub mod booking;
pub mod interval;
pub mod invoice;
pub mod ledger;
pub mod payment;
pub mod time_slot;
pub mod venue;

pub use account::{Account, Role};
pub use booking::{Booking, BookingStatus};
pub use interval::Interval;
pub use invoice::{Invoice, InvoiceStatus};
pub use ledger::{EntryKind, WalletTransaction};
pub use payment::{Payment, PaymentDistribution, PaymentStatus};
pub use time_slot::TimeSlot;
pub use venue::{Room, Venue, VenueType};
