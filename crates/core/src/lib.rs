//! Core business logic for Finly.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Balance arithmetic for budget ledgers lives here; storage and HTTP crates
//! call into it and never compute balances themselves.
//!
//! # Modules
//!
//! - `ledger` - Running-balance projection and delta propagation

pub mod ledger;
