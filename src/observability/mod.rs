//! Observability
//!
//! Structured lifecycle events for operational visibility.

pub mod audit;
