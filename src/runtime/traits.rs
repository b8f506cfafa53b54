//! Collaborator boundary between the bootstrap layer and a managed runtime.

use crate::config::types::ExitStatus;

/// Hooks a compiled managed runtime exposes to its native entry point.
///
/// Allocation methods never report failure through their return value: an
/// exhausted runtime sets its pending exception instead, and callers must
/// query [`ManagedRuntime::exception_occurred`] after every allocation.
pub trait ManagedRuntime {
    /// Runtime-owned immutable byte string
    type String;
    /// Runtime-owned fixed-length list of strings
    type StringList;

    /// Called before anything else, including platform checks
    fn instrument_setup(&mut self) {}

    /// Runtime startup code. `None` (or an empty message) means success.
    fn startup(&mut self) -> Option<String>;

    fn new_string_list(&mut self, len: usize) -> Self::StringList;

    fn new_string(&mut self, bytes: &[u8]) -> Self::String;

    fn set_list_item(&mut self, list: &mut Self::StringList, index: usize, item: Self::String);

    /// Current value of the pending exception flag
    fn exception_occurred(&self) -> bool;

    /// Run the managed program. May leave the pending exception set.
    fn invoke_entry_point(&mut self, argv: Self::StringList) -> ExitStatus;

    /// Print the managed call stack. Only called while an exception is pending.
    fn print_fatal_traceback(&mut self);

    /// First shutdown dump: live allocation results
    fn dump_alloc_results(&mut self);

    /// Second shutdown dump: allocation counters
    fn dump_malloc_counters(&mut self);
}
