//! Command handlers
//!
//! Each handler builds a serializable report from the library and renders
//! it as text or JSON, so the reports can be tested without a terminal.

pub mod config;
pub mod data;

pub use config::{execute_config, ConfigReport};
pub use data::{execute_cases, execute_resolve, execute_show, CasesReport, DataReport};
