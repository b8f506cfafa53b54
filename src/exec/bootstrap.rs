//! Bootstrap Sequencing
//!
//! The startup sequence is FIXED and must not drift:
//! 1. instrumentation setup
//! 2. platform preconditions (pointer width, optional SSE2)
//! 3. runtime startup code
//! 4. argument marshalling
//! 5. managed entry point
//! 6. allocation results dump
//! 7. pending fault check, traceback if set
//! 8. allocation counters dump
//! 9. return the entry point's exit status
//!
//! Steps 2-4 may fail. Their failures are fatal: the process aborts through
//! the fatal reporter and never reaches the entry point. A fault observed in
//! step 7 is only reported; the exit status from step 5 still stands.

use crate::config::types::{BootstrapConfig, ExitStatus, PostEntryFault, PreEntryFailure};
use crate::exec::{fatal, marshal};
use crate::kernel::platform;
use crate::observability::audit::{self, LifecycleEvent};
use crate::runtime::ManagedRuntime;

// ============================================================================
// Type-State Bootstrap Chain
// ============================================================================
//
// PlatformCheck -> RuntimeInit -> ArgMarshal -> EntryInvoke -> Shutdown
//
// Each step consumes the prior state and returns exactly one next state on
// success. Only Bootstrap<EntryInvoke<_>> can call the managed program, and
// it can only be reached with a fully marshalled argument list.

/// Type-state marker: nothing checked yet
pub struct PlatformCheck;

/// Type-state marker: platform verified, runtime not started
pub struct RuntimeInit;

/// Type-state marker: runtime started, arguments not marshalled
pub struct ArgMarshal;

/// Type-state: argument list built and ready for the entry point
pub struct EntryInvoke<L> {
    argv: L,
}

/// Type-state: entry point returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    exit_status: ExitStatus,
    fault: Option<PostEntryFault>,
}

/// Bootstrap of one managed program with type-state tracking.
///
/// Entering the managed program before its arguments exist does not compile:
///
/// ```compile_fail
/// use managed_boot::exec::bootstrap::Bootstrap;
/// use managed_boot::runtime::HostedRuntime;
/// use managed_boot::BootstrapConfig;
///
/// let config = BootstrapConfig::default();
/// let mut runtime = HostedRuntime::new(&config, |_, _| 0);
/// let boot = Bootstrap::new(&mut runtime, &config);
/// boot.invoke_entry();
/// ```
///
/// Neither does skipping the runtime startup code:
///
/// ```compile_fail
/// use managed_boot::exec::bootstrap::Bootstrap;
/// use managed_boot::runtime::HostedRuntime;
/// use managed_boot::BootstrapConfig;
///
/// let config = BootstrapConfig::default();
/// let mut runtime = HostedRuntime::new(&config, |_, _| 0);
/// let boot = Bootstrap::new(&mut runtime, &config).check_platform().unwrap();
/// let _ = boot.marshal_args(&[b"prog"]);
/// ```
///
/// The full chain:
///
/// ```
/// use managed_boot::exec::bootstrap::Bootstrap;
/// use managed_boot::runtime::HostedRuntime;
/// use managed_boot::BootstrapConfig;
///
/// let config = BootstrapConfig::default();
/// let mut runtime = HostedRuntime::new(&config, |_, argv| argv.len() as i32);
/// let done = Bootstrap::new(&mut runtime, &config)
///     .check_platform()
///     .and_then(|boot| boot.start_runtime())
///     .and_then(|boot| boot.marshal_args(&["prog", "arg"]))
///     .map(|boot| boot.invoke_entry())
///     .unwrap();
/// assert_eq!(done.finish(), 2);
/// ```
pub struct Bootstrap<'r, R: ManagedRuntime, S> {
    runtime: &'r mut R,
    config: &'r BootstrapConfig,
    state: S,
}

impl<'r, R: ManagedRuntime> Bootstrap<'r, R, PlatformCheck> {
    pub fn new(runtime: &'r mut R, config: &'r BootstrapConfig) -> Self {
        Self {
            runtime,
            config,
            state: PlatformCheck,
        }
    }

    /// Transition to RuntimeInit state.
    /// Instrumentation is set up first, before anything can fail.
    pub fn check_platform(self) -> Result<Bootstrap<'r, R, RuntimeInit>, PreEntryFailure> {
        self.runtime.instrument_setup();
        audit::record(LifecycleEvent::InstrumentationReady);

        platform::check_platform(&self.config.platform)?;
        log::debug!(
            "Platform check passed ({}-bit pointers)",
            self.config.platform.pointer_width_bits
        );
        audit::record(LifecycleEvent::PlatformChecked {
            pointer_width_bits: self.config.platform.pointer_width_bits,
        });

        Ok(Bootstrap {
            runtime: self.runtime,
            config: self.config,
            state: RuntimeInit,
        })
    }
}

impl<'r, R: ManagedRuntime> Bootstrap<'r, R, RuntimeInit> {
    /// Transition to ArgMarshal state.
    /// A non-empty message from the startup code is a RuntimeInitFailure.
    pub fn start_runtime(self) -> Result<Bootstrap<'r, R, ArgMarshal>, PreEntryFailure> {
        if let Some(message) = self.runtime.startup().filter(|m| !m.is_empty()) {
            return Err(PreEntryFailure::RuntimeInitFailure(message));
        }

        log::debug!("Runtime startup code completed");
        audit::record(LifecycleEvent::RuntimeStarted);

        Ok(Bootstrap {
            runtime: self.runtime,
            config: self.config,
            state: ArgMarshal,
        })
    }
}

impl<'r, R: ManagedRuntime> Bootstrap<'r, R, ArgMarshal> {
    /// Transition to EntryInvoke state
    pub fn marshal_args<A: AsRef<[u8]>>(
        self,
        args: &[A],
    ) -> Result<Bootstrap<'r, R, EntryInvoke<R::StringList>>, PreEntryFailure> {
        let argv = marshal::marshal(self.runtime, args)?;

        log::debug!("Marshalled {} argument(s)", args.len());
        audit::record(LifecycleEvent::ArgumentsMarshalled { argc: args.len() });

        Ok(Bootstrap {
            runtime: self.runtime,
            config: self.config,
            state: EntryInvoke { argv },
        })
    }
}

impl<'r, R: ManagedRuntime> Bootstrap<'r, R, EntryInvoke<R::StringList>> {
    /// Run the managed program and the shutdown diagnostics.
    ///
    /// Order is part of the contract: dump, fault check, traceback, dump.
    /// A pending fault never changes the exit status.
    pub fn invoke_entry(self) -> Bootstrap<'r, R, Shutdown> {
        let Bootstrap {
            runtime,
            config,
            state: EntryInvoke { argv },
        } = self;

        let exit_status = runtime.invoke_entry_point(argv);
        audit::record(LifecycleEvent::EntryReturned { exit_status });

        runtime.dump_alloc_results();

        let fault = if runtime.exception_occurred() {
            runtime.print_fatal_traceback();
            audit::record(LifecycleEvent::PostEntryFault { exit_status });
            Some(PostEntryFault { exit_status })
        } else {
            None
        };

        runtime.dump_malloc_counters();

        Bootstrap {
            runtime,
            config,
            state: Shutdown { exit_status, fault },
        }
    }
}

impl<R: ManagedRuntime> Bootstrap<'_, R, Shutdown> {
    pub fn exit_status(&self) -> ExitStatus {
        self.state.exit_status
    }

    pub fn post_entry_fault(&self) -> Option<PostEntryFault> {
        self.state.fault
    }

    /// Terminated: hand the exit status back to the process
    pub fn finish(self) -> ExitStatus {
        self.state.exit_status
    }
}

/// Result of a bootstrap that reached the managed program
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub exit_status: ExitStatus,
    pub fault: Option<PostEntryFault>,
}

/// Drive the whole chain, stopping at the first pre-entry failure.
pub fn bootstrap<R, A>(
    runtime: &mut R,
    config: &BootstrapConfig,
    args: &[A],
) -> Result<Completion, PreEntryFailure>
where
    R: ManagedRuntime,
    A: AsRef<[u8]>,
{
    let done = Bootstrap::new(runtime, config)
        .check_platform()?
        .start_runtime()?
        .marshal_args(args)?
        .invoke_entry();

    Ok(Completion {
        exit_status: done.exit_status(),
        fault: done.post_entry_fault(),
    })
}

/// Process entry: bootstrap, run, and return the exit status for the OS.
/// Pre-entry failures abort the process.
pub fn run_main<R, A>(runtime: &mut R, config: &BootstrapConfig, args: &[A]) -> ExitStatus
where
    R: ManagedRuntime,
    A: AsRef<[u8]>,
{
    run_main_with(runtime, config, args, fatal::report)
}

/// [`run_main`] with the error state delegated to `on_fatal`
pub fn run_main_with<R, A>(
    runtime: &mut R,
    config: &BootstrapConfig,
    args: &[A],
    on_fatal: fn(&str) -> !,
) -> ExitStatus
where
    R: ManagedRuntime,
    A: AsRef<[u8]>,
{
    match bootstrap(runtime, config, args) {
        Ok(completion) => completion.exit_status,
        // Nothing may reach stderr ahead of the fatal line.
        Err(failure) => on_fatal(&failure.to_string()),
    }
}

#[cfg(test)]
mod typestate_tests {
    use super::*;
    use crate::runtime::{HostedRuntime, ManagedContext, ManagedStringList};

    fn echo_len(_: &mut ManagedContext<'_>, argv: &ManagedStringList) -> ExitStatus {
        argv.len() as ExitStatus
    }

    #[test]
    fn test_typestate_chain_happy_path() {
        let config = BootstrapConfig::default();
        let mut runtime = HostedRuntime::new(&config, echo_len);

        let boot = Bootstrap::new(&mut runtime, &config)
            .check_platform()
            .expect("platform check failed");
        let boot = boot.start_runtime().expect("runtime start failed");
        let boot = boot
            .marshal_args(&["prog", "-x", "42"])
            .expect("marshalling failed");
        let done = boot.invoke_entry();

        assert_eq!(done.exit_status(), 3);
        assert_eq!(done.post_entry_fault(), None);
        assert_eq!(done.finish(), 3);
    }

    #[test]
    fn test_pointer_width_mismatch_stops_chain() {
        let mut config = BootstrapConfig::default();
        config.platform.pointer_width_bits = 16;
        let mut runtime = HostedRuntime::new(&config, echo_len);

        let result = Bootstrap::new(&mut runtime, &config).check_platform();
        assert!(matches!(
            result,
            Err(PreEntryFailure::PlatformIncompatibility(_))
        ));
    }

    #[test]
    fn test_empty_startup_message_is_success() {
        let config = BootstrapConfig::default();
        let mut runtime =
            HostedRuntime::new(&config, echo_len).with_startup_hook(|| Some(String::new()));

        let boot = Bootstrap::new(&mut runtime, &config).check_platform().unwrap();
        assert!(boot.start_runtime().is_ok());
    }

    #[test]
    fn test_fault_does_not_change_exit_status() {
        let config = BootstrapConfig::default();
        let mut runtime = HostedRuntime::new(&config, |ctx, _| {
            ctx.enter("main");
            ctx.raise("RuntimeError", "late fault");
            3
        })
        .with_diagnostics(std::io::sink());

        let completion = bootstrap(&mut runtime, &config, &[b"prog"]).unwrap();
        assert_eq!(completion.exit_status, 3);
        assert_eq!(completion.fault, Some(PostEntryFault { exit_status: 3 }));
    }

    #[test]
    fn test_allocation_failure_reported_as_out_of_memory() {
        let mut config = BootstrapConfig::default();
        config.runtime.heap_limit_bytes = 8;
        let mut runtime = HostedRuntime::new(&config, echo_len);

        let err = bootstrap(&mut runtime, &config, &[b"prog"]).unwrap_err();
        assert_eq!(err, PreEntryFailure::AllocationFailure);
        assert_eq!(err.to_string(), "out of memory");
    }
}
