/// Bootstrap lifecycle event logging
/// Provides structured records of every sequencing step for post-mortem analysis
///
/// - One run identifier per process, shared by every record
/// - Records are JSON lines on the `managed_boot::audit` log target at debug level
/// - Recording never influences control flow
use log::{debug, log_enabled, warn, Level};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::SystemTime;
use uuid::Uuid;

/// Log target all lifecycle records are written to
pub const AUDIT_TARGET: &str = "managed_boot::audit";

static RUN_ID: OnceLock<String> = OnceLock::new();

/// Lifecycle events emitted by the sequencer and the profiling scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    InstrumentationReady,
    PlatformChecked { pointer_width_bits: u32 },
    RuntimeStarted,
    ArgumentsMarshalled { argc: usize },
    EntryReturned { exit_status: i32 },
    PostEntryFault { exit_status: i32 },
    ProfilingPinned { cpu: usize, backend: String },
    ProfilingRestored { cpu_count: usize },
}

/// One serialized lifecycle record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub run_id: String,
    pub process_id: u32,
    pub timestamp_ms: u128,
    #[serde(flatten)]
    pub event: LifecycleEvent,
}

impl AuditRecord {
    pub fn new(event: LifecycleEvent) -> Self {
        Self {
            run_id: run_id().to_string(),
            process_id: std::process::id(),
            timestamp_ms: SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis(),
            event,
        }
    }
}

/// Identifier shared by all records of this process
pub fn run_id() -> &'static str {
    RUN_ID.get_or_init(|| Uuid::new_v4().to_string())
}

/// Record a lifecycle event
pub fn record(event: LifecycleEvent) {
    if !log_enabled!(target: AUDIT_TARGET, Level::Debug) {
        return;
    }

    match serde_json::to_string(&AuditRecord::new(event)) {
        Ok(line) => debug!(target: AUDIT_TARGET, "{}", line),
        Err(e) => warn!("Failed to serialize lifecycle event: {}", e),
    }
}
