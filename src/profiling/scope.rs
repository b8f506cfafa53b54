//! Scoped single-CPU pinning for stable profiling measurements.

use crate::config::types::Result;
use crate::kernel::affinity::{select_profiling_cpu, AffinityBackend, CpuMask};
use crate::observability::audit::{self, LifecycleEvent};

/// Affinity observed right before a profiling window was entered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffinitySnapshot {
    /// Mask restored on teardown
    pub base: CpuMask,
    /// CPU the window is pinned to
    pub pinned_cpu: usize,
}

/// Enter/exit a single-CPU measurement window without permanently changing
/// the process scheduling constraints.
///
/// Driven from one thread. `setup` and `teardown` are both idempotent.
pub struct ProfilingScope<B: AffinityBackend> {
    backend: B,
    preferred_cpu: usize,
    snapshot: Option<AffinitySnapshot>,
}

impl<B: AffinityBackend> ProfilingScope<B> {
    pub fn new(backend: B, preferred_cpu: usize) -> Self {
        Self {
            backend,
            preferred_cpu,
            snapshot: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&AffinitySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Capture the current mask and pin to one CPU. No-op while active.
    ///
    /// The CPU comes from the system-wide mask, not from the current one, so
    /// an already narrowed process still lands on the preferred CPU. If the
    /// kernel refuses it (a cpuset excluding it), the lowest CPU of the current
    /// mask is tried once. If no pinned mask can be applied the scope stays
    /// inactive.
    pub fn setup(&mut self) -> Result<()> {
        if self.snapshot.is_some() {
            log::debug!("Profiling scope already active");
            return Ok(());
        }

        if !self.backend.is_supported() {
            log::debug!(
                "Affinity backend '{}' unsupported; profiling scope is a no-op",
                self.backend.backend_name()
            );
            return Ok(());
        }

        let base = self.backend.current_mask()?;
        let permitted = self.backend.system_mask()?;
        let cpu = select_profiling_cpu(self.preferred_cpu, &permitted);

        if cpu != self.preferred_cpu {
            log::info!(
                "CPU {} not permitted, pinning profiling window to CPU {}",
                self.preferred_cpu,
                cpu
            );
        }

        let cpu = match self.backend.apply_mask(&CpuMask::single(cpu)) {
            Ok(()) => cpu,
            Err(e) => match base.lowest().filter(|&fallback| fallback != cpu) {
                Some(fallback) => {
                    log::info!("CPU {} refused ({}), pinning to CPU {}", cpu, e, fallback);
                    self.backend.apply_mask(&CpuMask::single(fallback))?;
                    fallback
                }
                None => return Err(e),
            },
        };

        self.snapshot = Some(AffinitySnapshot {
            base,
            pinned_cpu: cpu,
        });

        log::info!("Profiling window pinned to CPU {}", cpu);
        audit::record(LifecycleEvent::ProfilingPinned {
            cpu,
            backend: self.backend.backend_name().to_string(),
        });
        Ok(())
    }

    /// Restore the captured mask. No-op when no window is active.
    ///
    /// The snapshot is consumed even if restoring fails.
    pub fn teardown(&mut self) -> Result<()> {
        let Some(snapshot) = self.snapshot.take() else {
            return Ok(());
        };

        self.backend.apply_mask(&snapshot.base)?;

        log::info!("Profiling window closed, affinity restored");
        audit::record(LifecycleEvent::ProfilingRestored {
            cpu_count: snapshot.base.count(),
        });
        Ok(())
    }

    /// Pin for the lifetime of the returned guard
    pub fn pin(&mut self) -> Result<PinGuard<'_, B>> {
        self.setup()?;
        Ok(PinGuard { scope: self })
    }
}

/// Tears the profiling window down on drop
pub struct PinGuard<'a, B: AffinityBackend> {
    scope: &'a mut ProfilingScope<B>,
}

impl<B: AffinityBackend> PinGuard<'_, B> {
    pub fn pinned_cpu(&self) -> Option<usize> {
        self.scope.snapshot().map(|snapshot| snapshot.pinned_cpu)
    }
}

impl<B: AffinityBackend> Drop for PinGuard<'_, B> {
    fn drop(&mut self) {
        if let Err(e) = self.scope.teardown() {
            log::warn!("Failed to restore affinity after profiling window: {}", e);
        }
    }
}
