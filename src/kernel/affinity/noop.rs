//! Fallback for platforms without a process affinity API.

use super::backend::{AffinityBackend, CpuMask};
use crate::config::types::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoAffinity;

impl NoAffinity {
    pub fn new() -> Self {
        Self
    }
}

impl AffinityBackend for NoAffinity {
    fn backend_name(&self) -> &'static str {
        "none"
    }

    fn is_supported(&self) -> bool {
        false
    }

    fn current_mask(&self) -> Result<CpuMask> {
        Ok(CpuMask::new())
    }

    fn system_mask(&self) -> Result<CpuMask> {
        Ok(CpuMask::new())
    }

    fn apply_mask(&mut self, _mask: &CpuMask) -> Result<()> {
        Ok(())
    }
}
