pub mod accounts;
pub mod availability;
pub mod booking;
pub mod invoices;
pub mod ledger;
pub mod payments;
pub mod refund;
pub mod settlement;
pub mod slots;
pub mod venues;
