//! managed-boot: Native bootstrap layer for a managed language runtime
//! Brings a process from its native entry point to the runtime's entry function and back
//!
//! # Architecture
//!
//! This crate is organized by bootstrap phase:
//!
//! ## Execution Control ([`exec`])
//! - [`exec::bootstrap`]: Type-state enforced startup/shutdown sequencing
//! - [`exec::marshal`]: Native argv to runtime string list conversion
//! - [`exec::fatal`]: Pre-entry fatal error reporting and abort
//!
//! ## Managed Runtime ([`runtime`])
//! - [`runtime::traits`]: The interface the sequencer drives
//! - [`runtime::heap`]: Managed strings and the budgeted heap
//! - [`runtime::hosted`]: In-process runtime hosting a Rust closure
//!
//! ## Kernel Primitives ([`kernel`])
//! - [`kernel::platform`]: Pointer width and SSE2 preconditions
//! - [`kernel::affinity`]: Process CPU affinity backends (sched, Win32, no-op)
//!
//! ## Profiling ([`profiling`])
//! - [`profiling::scope`]: Scoped single-CPU pinning with exact mask restore
//!
//! ## Observability ([`observability`])
//! - [`observability::audit`]: Structured lifecycle events
//!
//! ## Configuration ([`config`])
//! - [`config::types`]: Shared type definitions and error enums
//! - [`config::loader`]: JSON configuration loading
//!
//! # Design Principles
//!
//! 1. **Order is the contract** - Startup and shutdown steps never reorder
//! 2. **Types prevent errors** - Entering the program before its arguments exist does not compile
//! 3. **Fail loudly before entry** - Every pre-entry failure aborts with one diagnostic line
//! 4. **Minimal unsafe** - Thin wrappers with explicit preconditions

// Kernel Primitives
pub mod kernel;

// Execution Control
pub mod exec;

// Managed Runtime
pub mod runtime;

// Profiling
pub mod profiling;

// Observability
pub mod observability;

// Configuration
pub mod config;

// CLI entrypoint wiring for the managed-boot binary.
pub mod cli;

// Re-export commonly used types for convenience
pub use config::types::*;
pub use exec::bootstrap::{bootstrap, run_main, Completion};
pub use profiling::{profiling_active, setup_profiling, teardown_profiling};
