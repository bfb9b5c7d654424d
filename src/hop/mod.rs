//! Hour of Power: the slot table and the service that reads and moves the
//! customer's free hour

pub mod service;
pub mod table;

pub use service::HourOfPowerService;
pub use table::{HopSlot, HourOfPowerTable};
