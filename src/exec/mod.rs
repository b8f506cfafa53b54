//! Execution control
//!
//! Drives a managed runtime from process entry to exit status with type-state enforcement.

pub mod bootstrap;
pub mod fatal;
pub mod marshal;
