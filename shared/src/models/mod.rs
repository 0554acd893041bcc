//! Domain models for the inventory ledger

mod catalog;
mod documents;
mod ledger;
mod replenishment;
mod status;

pub use catalog::*;
pub use documents::*;
pub use ledger::*;
pub use replenishment::*;
pub use status::*;
