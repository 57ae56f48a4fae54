//! # HEMIS Common Library
//!
//! Shared code for the HEMIS reporting services including:
//! - Error type and result alias
//! - Configuration loading (TOML bootstrap + environment overrides)
//! - Report data model (contingency table and summary shapes)

pub mod config;
pub mod error;
pub mod report;

pub use error::{Error, Result};
pub use report::{ColumnKey, Member, Row, Summary, Table, Totals};
