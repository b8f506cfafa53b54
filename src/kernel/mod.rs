//! Thin wrappers around OS primitives used during bootstrap.
//!
//! All `unsafe` code is concentrated here with explicit SAFETY comments.

pub mod affinity;
pub mod platform;
