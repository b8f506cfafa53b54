//! Linux backend over sched_getaffinity/sched_setaffinity.
//!
//! pid 0 addresses the calling thread. Bootstrap runs single-threaded, so
//! that thread is the process as far as the profiled window is concerned.
//!
//! The system-wide mask is the online CPU list from sysfs, independent of
//! how far the calling thread has already been narrowed.

use super::backend::{AffinityBackend, CpuMask};
use crate::config::types::{BootError, Result};
use nix::sched::{sched_getaffinity, sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use std::path::Path;

/// Kernel list of CPUs currently online, e.g. `0-3,6`
pub const ONLINE_CPUS_PATH: &str = "/sys/devices/system/cpu/online";

#[derive(Debug, Clone, Copy)]
pub struct SchedAffinity {
    pid: Pid,
}

impl SchedAffinity {
    pub fn new() -> Self {
        Self {
            pid: Pid::from_raw(0),
        }
    }
}

impl Default for SchedAffinity {
    fn default() -> Self {
        Self::new()
    }
}

fn mask_from_cpuset(set: &CpuSet) -> CpuMask {
    (0..CpuSet::count())
        .filter(|&cpu| set.is_set(cpu).unwrap_or(false))
        .collect()
}

/// Parse the kernel cpulist format (`0-3,6,8-9`)
pub fn parse_cpu_list(list: &str) -> Result<CpuMask> {
    let mut mask = CpuMask::new();
    for range in list.trim().split(',').filter(|r| !r.is_empty()) {
        let invalid = || BootError::Affinity(format!("invalid CPU list entry '{}'", range));
        let (start, end) = match range.split_once('-') {
            Some((start, end)) => (start, end),
            None => (range, range),
        };
        let start: usize = start.trim().parse().map_err(|_| invalid())?;
        let end: usize = end.trim().parse().map_err(|_| invalid())?;
        if start > end {
            return Err(invalid());
        }
        for cpu in start..=end {
            mask.set(cpu);
        }
    }
    Ok(mask)
}

fn read_cpu_list(path: &Path) -> Result<CpuMask> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        BootError::Affinity(format!("Failed to read {}: {}", path.display(), e))
    })?;
    parse_cpu_list(&content)
}

fn cpuset_from_mask(mask: &CpuMask) -> Result<CpuSet> {
    let mut set = CpuSet::new();
    for cpu in mask.iter() {
        set.set(cpu).map_err(|e| {
            BootError::Affinity(format!("CPU {} does not fit in cpu_set_t: {}", cpu, e))
        })?;
    }
    Ok(set)
}

impl AffinityBackend for SchedAffinity {
    fn backend_name(&self) -> &'static str {
        "sched_affinity"
    }

    fn current_mask(&self) -> Result<CpuMask> {
        let set = sched_getaffinity(self.pid)
            .map_err(|e| BootError::Affinity(format!("sched_getaffinity failed: {}", e)))?;
        Ok(mask_from_cpuset(&set))
    }

    /// Online CPUs. Falls back to the current mask when sysfs is unavailable.
    fn system_mask(&self) -> Result<CpuMask> {
        match read_cpu_list(Path::new(ONLINE_CPUS_PATH)) {
            Ok(online) if !online.is_empty() => Ok(online),
            Ok(_) => self.current_mask(),
            Err(e) => {
                log::debug!("{}; using the current affinity mask", e);
                self.current_mask()
            }
        }
    }

    fn apply_mask(&mut self, mask: &CpuMask) -> Result<()> {
        let set = cpuset_from_mask(mask)?;
        sched_setaffinity(self.pid, &set)
            .map_err(|e| BootError::Affinity(format!("sched_setaffinity failed: {}", e)))?;
        log::debug!("Applied affinity mask with {} CPU(s)", mask.count());
        Ok(())
    }
}
