//! Configuration
//!
//! Bootstrap configuration types, error taxonomy, and file loading.

pub mod loader;
pub mod types;
