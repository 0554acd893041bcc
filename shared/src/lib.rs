//! Shared types and pure logic for the Inventory Ledger & Allocation Engine
//!
//! This crate holds the domain model, the typed workflow requests with their
//! validation rules, and every calculation that does not need storage:
//! FIFO allocation, ABC classification and replenishment arithmetic.

pub mod allocation;
pub mod analysis;
pub mod models;
pub mod requests;
pub mod types;
pub mod validation;

pub use allocation::*;
pub use analysis::*;
pub use models::*;
pub use requests::*;
pub use types::*;
pub use validation::*;
