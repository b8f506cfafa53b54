use crate::config::types::{BootstrapConfig, ExitStatus};
use crate::exec::{bootstrap, fatal, marshal};
use crate::kernel::affinity::PlatformAffinity;
use crate::profiling::ProfilingScope;
use crate::runtime::{HostedRuntime, ManagedContext, ManagedStringList};
use anyhow::{Context, Result};
use clap::Parser;
use std::ffi::{OsStr, OsString};
use std::io::Write;

/// Built-in managed program run by the `managed-boot` binary.
///
/// Parsed from the marshalled argument list, not from the process argv.
#[derive(Parser, Debug)]
#[command(name = "managed-boot", author, version, about, long_about = None)]
pub struct DemoArgs {
    /// Exit status returned by the managed program
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    pub exit_code: ExitStatus,
    /// Raise a managed fault with this message before returning
    #[arg(long)]
    pub fault: Option<String>,
    /// Pin the program body to the CPU set by `profiling.cpu`
    #[arg(long)]
    pub pin: bool,
    /// Words echoed to stdout, one per line
    pub words: Vec<OsString>,
}

#[cfg(unix)]
fn to_os_string(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStringExt;
    OsString::from_vec(bytes.to_vec())
}

#[cfg(not(unix))]
fn to_os_string(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

#[cfg(unix)]
fn write_word<W: Write>(out: &mut W, word: &OsStr) -> std::io::Result<()> {
    use std::os::unix::ffi::OsStrExt;
    out.write_all(word.as_bytes())?;
    out.write_all(b"\n")
}

#[cfg(not(unix))]
fn write_word<W: Write>(out: &mut W, word: &OsStr) -> std::io::Result<()> {
    writeln!(out, "{}", word.to_string_lossy())
}

fn echo_words<W: Write>(out: &mut W, words: &[OsString]) -> Result<()> {
    for word in words {
        write_word(out, word)
            .with_context(|| format!("failed to echo '{}'", word.to_string_lossy()))?;
    }
    out.flush().context("failed to flush stdout")
}

/// Entry point of the demo program; `--pin` windows go to `profiling_cpu`
pub fn demo_program(
    ctx: &mut ManagedContext<'_>,
    argv: &ManagedStringList,
    profiling_cpu: usize,
) -> ExitStatus {
    let args = match DemoArgs::try_parse_from(argv.iter().map(|arg| to_os_string(arg.as_bytes()))) {
        Ok(args) => args,
        Err(e) => {
            // Help and version land here too.
            let _ = e.print();
            return e.exit_code();
        }
    };

    ctx.enter("main");

    let mut scope = args
        .pin
        .then(|| ProfilingScope::new(PlatformAffinity::default(), profiling_cpu));
    let guard = match scope.as_mut().map(|scope| scope.pin()) {
        Some(Ok(guard)) => Some(guard),
        Some(Err(e)) => {
            log::warn!("Profiling window not entered: {}", e);
            None
        }
        None => None,
    };

    let stdout = std::io::stdout();
    if let Err(e) = echo_words(&mut stdout.lock(), &args.words) {
        ctx.raise("IOError", format!("{:#}", e));
    }
    drop(guard);

    if let Some(message) = args.fault {
        ctx.raise("RuntimeError", message);
    }

    ctx.leave();
    args.exit_code
}

/// Run the demo program through the full bootstrap sequence
pub fn run_with_config<A: AsRef<[u8]>>(config: &BootstrapConfig, args: &[A]) -> ExitStatus {
    let profiling_cpu = config.profiling.cpu;
    let mut runtime =
        HostedRuntime::new(config, |ctx, argv| demo_program(ctx, argv, profiling_cpu));

    let mut scope = config
        .profiling
        .enabled
        .then(|| ProfilingScope::new(PlatformAffinity::default(), config.profiling.cpu));
    let _guard = match scope.as_mut().map(|scope| scope.pin()) {
        Some(Ok(guard)) => Some(guard),
        Some(Err(e)) => {
            log::warn!("Running without a profiling window: {}", e);
            None
        }
        None => None,
    };

    bootstrap::run_main(&mut runtime, config, args)
}

pub fn run() -> ExitStatus {
    // Initialize structured logging; RUST_LOG selects the level
    env_logger::init();

    let config = match BootstrapConfig::load() {
        Ok(config) => config,
        Err(e) => fatal::report(&e.to_string()),
    };

    run_with_config(&config, &marshal::native_args())
}
