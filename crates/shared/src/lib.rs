//! Shared types, errors, and configuration for Finly.
//!
//! This crate provides common types used across all other crates:
//! - UUID v7 identifiers for users, budgets, and ledger rows
//! - Application-wide error types and the error kinds callers branch on
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, ErrorKind};
