//! In-process managed runtime hosting a Rust closure as the managed program.
//!
//! Used by the `managed-boot` binary and by tests that need a real
//! [`ManagedRuntime`] with a finite heap and an observable fault state.

use super::heap::{AllocationKind, HeapStats, ManagedHeap, ManagedString, ManagedStringList};
use super::traits::ManagedRuntime;
use crate::config::types::{BootstrapConfig, DiagnosticsConfig, ExitStatus};
use std::io::{self, Write};

/// Fault raised by managed code (or by the heap) and not yet handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingException {
    pub kind: String,
    pub message: String,
    /// Outermost frame first
    pub traceback: Vec<String>,
}

fn memory_error(heap: &ManagedHeap, requested: u64, traceback: Vec<String>) -> PendingException {
    PendingException {
        kind: "MemoryError".to_string(),
        message: format!(
            "cannot allocate {} bytes ({} of {} bytes left)",
            requested,
            heap.remaining_bytes(),
            heap.limit_bytes()
        ),
        traceback,
    }
}

/// Write the managed call stack of `exception` in the diagnostic format
pub fn write_traceback<W: Write + ?Sized>(out: &mut W, exception: &PendingException) -> io::Result<()> {
    writeln!(out, "Managed traceback:")?;
    for frame in &exception.traceback {
        writeln!(out, "  in {}", frame)?;
    }
    if exception.message.is_empty() {
        writeln!(out, "Fatal managed error: {}", exception.kind)?;
    } else {
        writeln!(out, "Fatal managed error: {}: {}", exception.kind, exception.message)?;
    }
    out.flush()
}

/// View of the runtime handed to the managed program
pub struct ManagedContext<'a> {
    heap: &'a mut ManagedHeap,
    pending: &'a mut Option<PendingException>,
    frames: Vec<String>,
}

impl ManagedContext<'_> {
    pub fn enter(&mut self, frame: impl Into<String>) {
        self.frames.push(frame.into());
    }

    pub fn leave(&mut self) {
        self.frames.pop();
    }

    /// Raise a fault at the current frame. The first unhandled fault wins.
    pub fn raise(&mut self, kind: impl Into<String>, message: impl Into<String>) {
        if self.pending.is_some() {
            return;
        }
        *self.pending = Some(PendingException {
            kind: kind.into(),
            message: message.into(),
            traceback: self.frames.clone(),
        });
    }

    pub fn exception_occurred(&self) -> bool {
        self.pending.is_some()
    }

    /// Handle the pending fault, clearing the flag
    pub fn take_exception(&mut self) -> Option<PendingException> {
        self.pending.take()
    }

    /// Allocate a string; on exhaustion raises MemoryError and returns `None`
    pub fn new_string(&mut self, bytes: &[u8]) -> Option<ManagedString> {
        let cost = ManagedHeap::string_cost(bytes.len());
        if self.heap.try_charge(AllocationKind::String, cost) {
            return Some(ManagedString::from_bytes(bytes));
        }

        if self.pending.is_none() {
            *self.pending = Some(memory_error(&*self.heap, cost, self.frames.clone()));
        }
        None
    }

    pub fn heap_stats(&self) -> &HeapStats {
        self.heap.stats()
    }
}

type StartupHook = Box<dyn FnMut() -> Option<String>>;

/// Managed runtime whose program is the closure `F`
pub struct HostedRuntime<F> {
    heap: ManagedHeap,
    pending: Option<PendingException>,
    diagnostics: DiagnosticsConfig,
    sink: Box<dyn Write>,
    startup_hook: Option<StartupHook>,
    entry: F,
}

impl<F> HostedRuntime<F>
where
    F: FnMut(&mut ManagedContext<'_>, &ManagedStringList) -> ExitStatus,
{
    pub fn new(config: &BootstrapConfig, entry: F) -> Self {
        Self {
            heap: ManagedHeap::new(config.runtime.heap_limit_bytes),
            pending: None,
            diagnostics: config.diagnostics.clone(),
            sink: Box::new(io::stderr()),
            startup_hook: None,
            entry,
        }
    }

    /// Redirect tracebacks and diagnostic dumps (stderr by default)
    pub fn with_diagnostics<W: Write + 'static>(mut self, sink: W) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Extra startup check run after the built-in ones
    pub fn with_startup_hook<H>(mut self, hook: H) -> Self
    where
        H: FnMut() -> Option<String> + 'static,
    {
        self.startup_hook = Some(Box::new(hook));
        self
    }

    pub fn heap(&self) -> &ManagedHeap {
        &self.heap
    }

    pub fn pending_exception(&self) -> Option<&PendingException> {
        self.pending.as_ref()
    }

    fn raise_memory_error(&mut self, requested: u64) {
        if self.pending.is_none() {
            self.pending = Some(memory_error(&self.heap, requested, Vec::new()));
        }
    }
}

impl<F> ManagedRuntime for HostedRuntime<F>
where
    F: FnMut(&mut ManagedContext<'_>, &ManagedStringList) -> ExitStatus,
{
    type String = ManagedString;
    type StringList = ManagedStringList;

    fn instrument_setup(&mut self) {
        log::debug!(
            "Hosted runtime ready: heap limit {} bytes",
            self.heap.limit_bytes()
        );
    }

    fn startup(&mut self) -> Option<String> {
        if self.heap.limit_bytes() == 0 {
            return Some("runtime.heap_limit_bytes must be non-zero".to_string());
        }

        match self.startup_hook.as_mut() {
            Some(hook) => hook(),
            None => None,
        }
    }

    fn new_string_list(&mut self, len: usize) -> ManagedStringList {
        let cost = ManagedHeap::list_cost(len);
        if self.heap.try_charge(AllocationKind::List, cost) {
            ManagedStringList::with_len(len)
        } else {
            self.raise_memory_error(cost);
            ManagedStringList::default()
        }
    }

    fn new_string(&mut self, bytes: &[u8]) -> ManagedString {
        let cost = ManagedHeap::string_cost(bytes.len());
        if self.heap.try_charge(AllocationKind::String, cost) {
            ManagedString::from_bytes(bytes)
        } else {
            self.raise_memory_error(cost);
            ManagedString::default()
        }
    }

    fn set_list_item(&mut self, list: &mut ManagedStringList, index: usize, item: ManagedString) {
        list.store(index, item);
    }

    fn exception_occurred(&self) -> bool {
        self.pending.is_some()
    }

    fn invoke_entry_point(&mut self, argv: ManagedStringList) -> ExitStatus {
        let mut context = ManagedContext {
            heap: &mut self.heap,
            pending: &mut self.pending,
            frames: Vec::new(),
        };
        (self.entry)(&mut context, &argv)
    }

    fn print_fatal_traceback(&mut self) {
        if let Some(exception) = self.pending.as_ref() {
            let _ = write_traceback(&mut self.sink, exception);
        }
    }

    fn dump_alloc_results(&mut self) {
        if !self.diagnostics.alloc_results {
            return;
        }
        let stats = self.heap.stats();
        let _ = writeln!(
            self.sink,
            "alloc results: {} strings, {} lists, {} bytes live",
            stats.strings, stats.lists, stats.bytes_allocated
        );
    }

    fn dump_malloc_counters(&mut self) {
        if !self.diagnostics.malloc_counters {
            return;
        }
        let stats = self.heap.stats();
        let _ = writeln!(
            self.sink,
            "malloc counters: allocations={} bytes={} failed={} limit={}",
            stats.allocations(),
            stats.bytes_allocated,
            stats.failed_allocations,
            self.heap.limit_bytes()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct SharedSink(Rc<RefCell<Vec<u8>>>);

    impl SharedSink {
        fn contents(&self) -> String {
            String::from_utf8(self.0.borrow().clone()).unwrap()
        }
    }

    impl Write for SharedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn config_with_heap(limit: u64) -> BootstrapConfig {
        let mut config = BootstrapConfig::default();
        config.runtime.heap_limit_bytes = limit;
        config
    }

    #[test]
    fn test_zero_heap_fails_startup() {
        let mut runtime = HostedRuntime::new(&config_with_heap(0), |_, _| 0);
        assert_eq!(
            runtime.startup().as_deref(),
            Some("runtime.heap_limit_bytes must be non-zero")
        );
    }

    #[test]
    fn test_startup_hook_message_returned() {
        let mut runtime = HostedRuntime::new(&BootstrapConfig::default(), |_, _| 0)
            .with_startup_hook(|| Some("bad config".to_string()));
        assert_eq!(runtime.startup().as_deref(), Some("bad config"));
    }

    #[test]
    fn test_exhausted_heap_sets_pending_exception() {
        let mut runtime = HostedRuntime::new(&config_with_heap(20), |_, _| 0);
        let _ = runtime.new_string(b"abcd");
        assert!(!runtime.exception_occurred());

        let _ = runtime.new_string(b"abcd");
        assert!(runtime.exception_occurred());
        assert_eq!(runtime.pending_exception().unwrap().kind, "MemoryError");
        assert_eq!(runtime.heap().stats().failed_allocations, 1);
    }

    #[test]
    fn test_entry_point_sees_arguments_and_raises() {
        let mut runtime = HostedRuntime::new(&BootstrapConfig::default(), |ctx, argv| {
            ctx.enter("main");
            ctx.enter("helper");
            ctx.raise("RuntimeError", format!("{} args", argv.len()));
            ctx.raise("IgnoredError", "second fault");
            3
        });

        let mut list = runtime.new_string_list(1);
        let item = runtime.new_string(b"prog");
        runtime.set_list_item(&mut list, 0, item);

        assert_eq!(runtime.invoke_entry_point(list), 3);
        let exception = runtime.pending_exception().unwrap();
        assert_eq!(exception.kind, "RuntimeError");
        assert_eq!(exception.message, "1 args");
        assert_eq!(exception.traceback, vec!["main", "helper"]);
    }

    #[test]
    fn test_context_allocation_failure_raises_memory_error() {
        let mut runtime = HostedRuntime::new(&config_with_heap(16), |ctx, _| {
            ctx.enter("main");
            assert!(ctx.new_string(b"").is_some());
            assert!(ctx.new_string(b"x").is_none());
            assert!(ctx.exception_occurred());
            0
        });
        runtime.invoke_entry_point(ManagedStringList::default());

        let exception = runtime.pending_exception().unwrap();
        assert_eq!(exception.kind, "MemoryError");
        assert_eq!(exception.traceback, vec!["main"]);
    }

    #[test]
    fn test_handled_exception_clears_flag() {
        let mut runtime = HostedRuntime::new(&BootstrapConfig::default(), |ctx, _| {
            ctx.raise("ValueError", "caught");
            let handled = ctx.take_exception();
            assert!(handled.is_some());
            0
        });
        runtime.invoke_entry_point(ManagedStringList::default());
        assert!(!runtime.exception_occurred());
    }

    #[test]
    fn test_traceback_format() {
        let sink = SharedSink::default();
        let mut runtime = HostedRuntime::new(&BootstrapConfig::default(), |ctx, _| {
            ctx.enter("main");
            ctx.raise("RuntimeError", "boom");
            1
        })
        .with_diagnostics(sink.clone());

        runtime.invoke_entry_point(ManagedStringList::default());
        runtime.print_fatal_traceback();

        assert_eq!(
            sink.contents(),
            "Managed traceback:\n  in main\nFatal managed error: RuntimeError: boom\n"
        );
    }

    #[test]
    fn test_dumps_silent_unless_enabled() {
        let sink = SharedSink::default();
        let mut runtime =
            HostedRuntime::new(&BootstrapConfig::default(), |_, _| 0).with_diagnostics(sink.clone());
        runtime.dump_alloc_results();
        runtime.dump_malloc_counters();
        assert!(sink.contents().is_empty());
    }

    #[test]
    fn test_dumps_report_heap_stats() {
        let mut config = config_with_heap(1024);
        config.diagnostics.alloc_results = true;
        config.diagnostics.malloc_counters = true;

        let sink = SharedSink::default();
        let mut runtime = HostedRuntime::new(&config, |_, _| 0).with_diagnostics(sink.clone());
        let _ = runtime.new_string_list(2);
        let _ = runtime.new_string(b"four");

        runtime.dump_alloc_results();
        runtime.dump_malloc_counters();

        assert_eq!(
            sink.contents(),
            "alloc results: 1 strings, 1 lists, 36 bytes live\n\
             malloc counters: allocations=2 bytes=36 failed=0 limit=1024\n"
        );
    }
}
