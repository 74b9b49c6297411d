//! Storage layer and domain rules for the clinic service.
//!
//! The two pieces with real decision logic live here: the scheduling guard
//! ([`scheduling`]) and the billing ledger ([`billing`]). Both keep their
//! rules as pure functions over row data, with thin sqlx services wrapping
//! them in transactions. The remaining modules are direct request-to-row
//! mappings.

pub mod billing;
pub mod dashboard;
pub mod error;
pub mod models;
pub mod patients;
pub mod scheduling;
pub mod schema;
pub mod seed;
pub mod staff;

pub use error::{Error, Result};
