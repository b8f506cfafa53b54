/// Core types and structures for the managed-boot system
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Exit status produced by the managed entry point and handed back to the OS.
pub type ExitStatus = i32;

/// Native pointer width in bits for the target this crate was compiled for.
pub const NATIVE_POINTER_WIDTH_BITS: u32 = usize::BITS;

/// Default heap budget for the hosted runtime (64 MiB).
pub const DEFAULT_HEAP_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

/// CPU index the profiling scope pins to unless the system forbids it.
pub const DEFAULT_PROFILING_CPU: usize = 0;

/// Full bootstrap configuration (managed-boot.json)
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BootstrapConfig {
    pub platform: PlatformConfig,
    pub runtime: RuntimeConfig,
    pub diagnostics: DiagnosticsConfig,
    pub profiling: ProfilingConfig,
}

/// Structural preconditions checked before the runtime starts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// Pointer width the runtime was translated for
    pub pointer_width_bits: u32,
    /// Refuse to start on x86 CPUs without SSE2
    pub require_sse2: bool,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            pointer_width_bits: NATIVE_POINTER_WIDTH_BITS,
            require_sse2: false,
        }
    }
}

/// Hosted runtime settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Total bytes the managed heap may hand out before raising MemoryError
    pub heap_limit_bytes: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            heap_limit_bytes: DEFAULT_HEAP_LIMIT_BYTES,
        }
    }
}

/// Shutdown diagnostic dumps
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiagnosticsConfig {
    /// Print live allocation results after the entry point returns
    pub alloc_results: bool,
    /// Print allocation counters after the fault check
    pub malloc_counters: bool,
}

/// CPU pinning around the managed entry point
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfilingConfig {
    pub enabled: bool,
    pub cpu: usize,
}

impl Default for ProfilingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cpu: DEFAULT_PROFILING_CPU,
        }
    }
}

/// Failures that happen before any managed program semantics exist.
///
/// The `Display` output is exactly the message handed to the fatal reporter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreEntryFailure {
    #[error("{0}")]
    PlatformIncompatibility(String),

    #[error("{0}")]
    RuntimeInitFailure(String),

    #[error("out of memory")]
    AllocationFailure,
}

/// The managed runtime signalled an unhandled fault after the entry point
/// had already produced its exit status. Reported, never escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostEntryFault {
    /// Status the entry point returned; it is still the process exit status
    pub exit_status: ExitStatus,
}

/// Custom error types for managed-boot
#[derive(Error, Debug)]
pub enum BootError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Affinity error: {0}")]
    Affinity(String),
}

/// Result type alias for managed-boot operations
pub type Result<T> = std::result::Result<T, BootError>;
