//! Communication-cost accounting.
//!
//! - [`ledger`] - per-client, per-round record of `(bits, element_count)`

pub mod ledger;

pub use ledger::{CommunicationLedger, CostRecord};
