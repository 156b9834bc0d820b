//! Data layer module
//!
//! Handles all persistence for the account store:
//! - SQLite database operations
//! - Account and session models

mod database;
mod models;

pub use database::Database;
pub use models::*;
