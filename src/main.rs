//! Purpose: `hstack-bench` entry point.
//! Role: Binary crate root; parses args, runs the benchmark, emits JSON on stdout.
//! Invariants: Errors are emitted as JSON on stderr; stdout carries only bench output.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use clap::Parser;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod bench;

use bench::{BenchArgs, BenchFormat, run_bench};
use hstack::api::{Error, to_exit_code};

#[derive(Parser, Debug)]
#[command(
    name = "hstack-bench",
    version,
    about = "Measure push, pop and churn throughput of hstack registries"
)]
struct Cli {
    /// Number of stacks written in each push/pop round.
    #[arg(long, default_value_t = 16)]
    stacks: usize,
    /// Elements pushed per stack, and create/destroy cycles per churn round.
    /// Every element of a push round stays live until the pop round drains it.
    #[arg(long, default_value_t = 1_000)]
    ops: u64,
    /// Payload sizes in bytes, comma separated.
    #[arg(long = "payload-size", value_delimiter = ',', default_values_t = [16usize, 256, 4096])]
    payload_sizes: Vec<usize>,
    #[arg(long, value_enum, default_value_t = BenchFormat::Json)]
    format: BenchFormat,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let args = BenchArgs {
        stacks: cli.stacks,
        ops: cli.ops,
        payload_sizes: cli.payload_sizes,
        format: cli.format,
    };
    let exit_code = match run_bench(args, env!("CARGO_PKG_VERSION")) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn emit_error(err: &Error) {
    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    if let Some(message) = err.message() {
        inner.insert("message".to_string(), json!(message));
    }
    if let Some(handle) = err.handle() {
        inner.insert("handle".to_string(), json!(handle));
    }
    if let Some(needed) = err.needed() {
        inner.insert("needed".to_string(), json!(needed));
    }
    json!({ "error": Value::Object(inner) })
}
