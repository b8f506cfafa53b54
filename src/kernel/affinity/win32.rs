//! Windows backend over GetProcessAffinityMask/SetProcessAffinityMask.
//!
//! Masks cover the processor group the process belongs to (at most 64 CPUs).

use super::backend::{AffinityBackend, CpuMask};
use crate::config::types::{BootError, Result};
use windows::Win32::System::Threading::{
    GetCurrentProcess, GetProcessAffinityMask, SetProcessAffinityMask,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessAffinity;

impl ProcessAffinity {
    pub fn new() -> Self {
        Self
    }

    /// (process mask, system mask)
    fn masks(&self) -> Result<(usize, usize)> {
        let mut process_mask: usize = 0;
        let mut system_mask: usize = 0;

        // SAFETY: the pseudo-handle needs no cleanup and both out-pointers are live locals.
        unsafe { GetProcessAffinityMask(GetCurrentProcess(), &mut process_mask, &mut system_mask) }
            .map_err(|e| BootError::Affinity(format!("GetProcessAffinityMask failed: {}", e)))?;

        Ok((process_mask, system_mask))
    }
}

impl AffinityBackend for ProcessAffinity {
    fn backend_name(&self) -> &'static str {
        "process_affinity_mask"
    }

    fn current_mask(&self) -> Result<CpuMask> {
        let (process_mask, _) = self.masks()?;
        Ok(CpuMask::from_bits(process_mask as u64))
    }

    fn system_mask(&self) -> Result<CpuMask> {
        let (_, system_mask) = self.masks()?;
        Ok(CpuMask::from_bits(system_mask as u64))
    }

    fn apply_mask(&mut self, mask: &CpuMask) -> Result<()> {
        let bits = mask.to_bits().ok_or_else(|| {
            BootError::Affinity("affinity mask exceeds one processor group".to_string())
        })?;

        // SAFETY: the pseudo-handle is always valid for the current process.
        unsafe { SetProcessAffinityMask(GetCurrentProcess(), bits as usize) }
            .map_err(|e| BootError::Affinity(format!("SetProcessAffinityMask failed: {}", e)))?;

        log::debug!("Applied process affinity mask {:#x}", bits);
        Ok(())
    }
}
