// Cold-start benchmark for the bootstrap sequence
// Measures end-to-end latency from process spawn to exit status, and the
// in-process cost of one bootstrap, inside a single-CPU profiling window.
// Target: p50 < 20ms, p95 < 50ms for the spawned binary

use managed_boot::exec::bootstrap;
use managed_boot::kernel::affinity::PlatformAffinity;
use managed_boot::profiling::ProfilingScope;
use managed_boot::runtime::HostedRuntime;
use managed_boot::{BootstrapConfig, DEFAULT_PROFILING_CPU};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Benchmark configuration
const ITERATIONS: usize = 100;
const WARMUP_ITERATIONS: usize = 10;
const IN_PROCESS_ITERATIONS: usize = 10_000;

const BINARY: &str = env!("CARGO_BIN_EXE_managed-boot");

/// Latency percentiles
struct LatencyStats {
    p50: Duration,
    p95: Duration,
    p99: Duration,
    min: Duration,
    max: Duration,
    mean: Duration,
}

impl LatencyStats {
    fn from_samples(mut samples: Vec<Duration>) -> Self {
        samples.sort();
        let len = samples.len();

        let p50_idx = (len as f64 * 0.50) as usize;
        let p95_idx = (len as f64 * 0.95) as usize;
        let p99_idx = (len as f64 * 0.99) as usize;

        let sum: Duration = samples.iter().sum();
        let mean = sum / len as u32;

        Self {
            p50: samples[p50_idx],
            p95: samples[p95_idx],
            p99: samples[p99_idx],
            min: samples[0],
            max: samples[len - 1],
            mean,
        }
    }

    fn print(&self, label: &str) {
        println!("\n{}", label);
        println!("  p50: {:?}", self.p50);
        println!("  p95: {:?}", self.p95);
        println!("  p99: {:?}", self.p99);
        println!("  min: {:?}", self.min);
        println!("  max: {:?}", self.max);
        println!("  mean: {:?}", self.mean);
    }
}

/// Benchmark result
struct BenchmarkResult {
    scenario: String,
    stats: LatencyStats,
    passed: bool,
    reason: Option<String>,
}

impl BenchmarkResult {
    fn print(&self) {
        println!("\n=== {} ===", self.scenario);
        self.stats.print("Latency");

        match &self.reason {
            None => println!("PASS"),
            Some(reason) => println!("FAIL: {}", reason),
        }
    }
}

fn spawn_once(args: &[&str], config: Option<&std::path::Path>) -> Duration {
    let mut command = Command::new(BINARY);
    command
        .args(args)
        .env("RUST_LOG", "off")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    match config {
        Some(path) => command.env("MANAGED_BOOT_CONFIG", path),
        None => command.env_remove("MANAGED_BOOT_CONFIG"),
    };

    let start = Instant::now();
    let _ = command.status();
    start.elapsed()
}

fn benchmark_binary(
    scenario: &str,
    args: &[&str],
    config: Option<&std::path::Path>,
) -> BenchmarkResult {
    for _ in 0..WARMUP_ITERATIONS {
        spawn_once(args, config);
    }

    let samples = (0..ITERATIONS).map(|_| spawn_once(args, config)).collect();
    let stats = LatencyStats::from_samples(samples);

    let passed = stats.p50 < Duration::from_millis(20) && stats.p95 < Duration::from_millis(50);
    let reason = if !passed {
        Some(format!(
            "p50={:?} (target <20ms), p95={:?} (target <50ms)",
            stats.p50, stats.p95
        ))
    } else {
        None
    };

    BenchmarkResult {
        scenario: scenario.to_string(),
        stats,
        passed,
        reason,
    }
}

/// Measure one in-process bootstrap with a trivial managed program
fn benchmark_in_process() -> BenchmarkResult {
    let config = BootstrapConfig::default();
    let args = ["prog", "-x", "42"];

    let samples = (0..IN_PROCESS_ITERATIONS)
        .map(|_| {
            let mut runtime = HostedRuntime::new(&config, |_, argv| argv.len() as i32);
            let start = Instant::now();
            let _ = bootstrap::bootstrap(&mut runtime, &config, &args);
            start.elapsed()
        })
        .collect();
    let stats = LatencyStats::from_samples(samples);

    let passed = stats.p99 < Duration::from_micros(500);
    let reason = (!passed).then(|| format!("p99={:?} (target <500us)", stats.p99));

    BenchmarkResult {
        scenario: "In-process bootstrap".to_string(),
        stats,
        passed,
        reason,
    }
}

fn main() {
    println!("=== managed-boot Cold-Start Benchmark ===");
    println!("Iterations: {} (after {} warmup)", ITERATIONS, WARMUP_ITERATIONS);

    let mut scope = ProfilingScope::new(PlatformAffinity::default(), DEFAULT_PROFILING_CPU);
    let guard = match scope.pin() {
        Ok(guard) => guard,
        Err(e) => {
            println!("Profiling window unavailable: {}", e);
            std::process::exit(1);
        }
    };
    match guard.pinned_cpu() {
        Some(cpu) => println!("Pinned to CPU {}", cpu),
        None => println!("Affinity unsupported, running unpinned"),
    }

    let mut diagnostics = match tempfile::NamedTempFile::new() {
        Ok(file) => file,
        Err(e) => {
            println!("Failed to create config file: {}", e);
            std::process::exit(1);
        }
    };
    let _ = write!(
        diagnostics,
        r#"{{"diagnostics": {{"alloc_results": true, "malloc_counters": true}}}}"#
    );

    let results = vec![
        benchmark_binary("Echo", &["hello", "world"], None),
        benchmark_binary("Echo with shutdown dumps", &["hello"], Some(diagnostics.path())),
        benchmark_binary("Post-entry fault", &["--fault", "boom"], None),
        benchmark_in_process(),
    ];
    drop(guard);

    // Print all results
    for result in &results {
        result.print();
    }

    // Summary
    let passed_count = results.iter().filter(|r| r.passed).count();
    let total_count = results.len();

    println!("\n=== Summary ===");
    println!("{}/{} scenarios passed", passed_count, total_count);

    if passed_count == total_count {
        println!("All cold-start budgets met");
        std::process::exit(0);
    } else {
        println!("Some cold-start budgets exceeded");
        std::process::exit(1);
    }
}
