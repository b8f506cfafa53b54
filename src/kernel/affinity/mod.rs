//! Process CPU affinity
//!
//! One backend per platform, chosen at build time. Platforms without an
//! affinity API get [`noop::NoAffinity`], which turns every operation into a no-op.

pub mod backend;
pub mod noop;

#[cfg(any(target_os = "linux", target_os = "android"))]
pub mod linux;

#[cfg(windows)]
pub mod win32;

pub use backend::{select_profiling_cpu, AffinityBackend, CpuMask};

/// Affinity backend for the compilation target
#[cfg(any(target_os = "linux", target_os = "android"))]
pub type PlatformAffinity = linux::SchedAffinity;

#[cfg(windows)]
pub type PlatformAffinity = win32::ProcessAffinity;

#[cfg(not(any(target_os = "linux", target_os = "android", windows)))]
pub type PlatformAffinity = noop::NoAffinity;
