//! Profiling support
//!
//! [`ProfilingScope`] is the explicit, owned form. The free functions below
//! drive one process-wide scope over the platform backend pinned to
//! [`DEFAULT_PROFILING_CPU`]; the mutex only serializes access, callers are
//! still expected to use it from a single thread.

pub mod scope;

pub use scope::{AffinitySnapshot, PinGuard, ProfilingScope};

use crate::config::types::{Result, DEFAULT_PROFILING_CPU};
use crate::kernel::affinity::PlatformAffinity;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

static PROCESS_SCOPE: OnceLock<Mutex<ProfilingScope<PlatformAffinity>>> = OnceLock::new();

fn process_scope() -> MutexGuard<'static, ProfilingScope<PlatformAffinity>> {
    PROCESS_SCOPE
        .get_or_init(|| {
            Mutex::new(ProfilingScope::new(
                PlatformAffinity::default(),
                DEFAULT_PROFILING_CPU,
            ))
        })
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Pin the process to one CPU until [`teardown_profiling`]
pub fn setup_profiling() -> Result<()> {
    process_scope().setup()
}

/// Restore the affinity captured by [`setup_profiling`]
pub fn teardown_profiling() -> Result<()> {
    process_scope().teardown()
}

pub fn profiling_active() -> bool {
    process_scope().is_active()
}
