// Benchmark harness for hstack.
//
// Purpose:
// - Provide a repeatable baseline for push, pop and create/destroy churn on an owned registry.
// - Emit machine-readable JSON to stdout and a human-readable table to stderr.
//
// Design notes:
// - Every popped element is checked against what was pushed; a mismatch fails the run.

use std::time::{Duration, Instant};

use clap::ValueEnum;
use serde::Serialize;
use serde_json::{Value, json};

use hstack::api::{Error, ErrorKind, Handle, Registry};

// Upper bound on payload bytes held live by a push/pop round.
const MAX_RESIDENT_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct BenchArgs {
    pub stacks: usize,
    pub ops: u64,
    pub payload_sizes: Vec<usize>,
    pub format: BenchFormat,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum BenchFormat {
    Json,
    Table,
    Both,
}

#[derive(Debug, Serialize)]
struct BenchResult {
    bench: &'static str,
    payload_bytes: usize,
    stacks: usize,
    ops: u64,
    elapsed_ms: f64,
    ns_per_op: f64,
}

impl BenchResult {
    fn new(bench: &'static str, args: &BenchArgs, payload_bytes: usize, ops: u64, elapsed: Duration) -> Self {
        let ns = elapsed.as_nanos() as f64;
        Self {
            bench,
            payload_bytes,
            stacks: args.stacks,
            ops,
            elapsed_ms: ns / 1_000_000.0,
            ns_per_op: if ops == 0 { 0.0 } else { ns / ops as f64 },
        }
    }
}

pub fn run_bench(args: BenchArgs, program_version: &str) -> Result<(), Error> {
    validate(&args)?;
    let ts = rfc3339_now()?;

    let mut results = Vec::new();
    for &payload_bytes in &args.payload_sizes {
        tracing::info!(payload_bytes, stacks = args.stacks, ops = args.ops, "bench round");
        results.extend(bench_push_pop(&args, payload_bytes)?);
        results.push(bench_churn(&args, payload_bytes)?);
    }

    let results = serde_json::to_value(&results).map_err(|err| {
        Error::new(ErrorKind::Internal).with_message(format!("failed to encode results: {err}"))
    })?;
    let output = json!({
        "name": "hstack",
        "version": program_version,
        "ts": ts,
        "params": {
            "stacks": args.stacks,
            "ops": args.ops,
            "payload_sizes": args.payload_sizes,
            "debug_build": cfg!(debug_assertions),
        },
        "results": results,
    });

    emit_bench_output(&output, args.format)
}

fn validate(args: &BenchArgs) -> Result<(), Error> {
    if args.stacks == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("--stacks must be at least 1"));
    }
    if args.ops == 0 {
        return Err(Error::new(ErrorKind::Usage).with_message("--ops must be at least 1"));
    }
    if args.payload_sizes.is_empty() || args.payload_sizes.contains(&0) {
        return Err(Error::new(ErrorKind::Usage).with_message("payload sizes must be nonzero"));
    }
    let total = total_ops(args)?;
    let largest = args.payload_sizes.iter().copied().max().unwrap_or(0) as u64;
    let resident = total.checked_mul(largest).filter(|bytes| *bytes <= MAX_RESIDENT_BYTES);
    if resident.is_none() {
        return Err(Error::new(ErrorKind::Usage).with_message(format!(
            "--stacks x --ops x largest payload must stay within {MAX_RESIDENT_BYTES} bytes"
        )));
    }
    Ok(())
}

fn total_ops(args: &BenchArgs) -> Result<u64, Error> {
    u64::try_from(args.stacks)
        .ok()
        .and_then(|stacks| args.ops.checked_mul(stacks))
        .ok_or_else(|| Error::new(ErrorKind::Usage).with_message("--stacks x --ops overflows"))
}

fn bench_push_pop(args: &BenchArgs, payload_bytes: usize) -> Result<[BenchResult; 2], Error> {
    let mut registry = Registry::new();
    let handles = (0..args.stacks)
        .map(|_| registry.create())
        .collect::<Result<Vec<Handle>, Error>>()?;
    let total = total_ops(args)?;
    let mut payload = vec![0u8; payload_bytes];

    let start = Instant::now();
    for seq in 0..args.ops {
        fill_payload(&mut payload, seq);
        for &handle in &handles {
            registry.push(handle, &payload)?;
        }
    }
    let push = BenchResult::new("push", args, payload_bytes, total, start.elapsed());

    let mut out = vec![0u8; payload_bytes];
    let start = Instant::now();
    for seq in (0..args.ops).rev() {
        fill_payload(&mut payload, seq);
        for &handle in &handles {
            let len = registry.pop(handle, &mut out)?;
            if out[..len] != payload[..] {
                return Err(Error::new(ErrorKind::Internal)
                    .with_message(format!("popped element {seq} does not match pushed bytes"))
                    .with_handle(handle.raw()));
            }
        }
    }
    let pop = BenchResult::new("pop", args, payload_bytes, total, start.elapsed());

    if let Some(&handle) = handles.iter().find(|handle| registry.size(**handle) != 0) {
        return Err(Error::new(ErrorKind::Internal)
            .with_message("stack not drained after pop pass")
            .with_handle(handle.raw()));
    }
    Ok([push, pop])
}

// Each cycle creates a stack, pushes one element, and destroys it with the element still held.
fn bench_churn(args: &BenchArgs, payload_bytes: usize) -> Result<BenchResult, Error> {
    let mut registry = Registry::new();
    let payload = vec![0x5Au8; payload_bytes];

    let start = Instant::now();
    for _ in 0..args.ops {
        let handle = registry.create()?;
        registry.push(handle, &payload)?;
        if !registry.destroy(handle) {
            return Err(Error::new(ErrorKind::Internal)
                .with_message("destroy missed a live stack")
                .with_handle(handle.raw()));
        }
    }
    let elapsed = start.elapsed();

    if registry.live_count() != 0 {
        return Err(Error::new(ErrorKind::Internal).with_message("churn left live stacks"));
    }
    Ok(BenchResult::new("churn", args, payload_bytes, args.ops, elapsed))
}

fn fill_payload(payload: &mut [u8], seq: u64) {
    let seed = seq.to_le_bytes();
    for (i, byte) in payload.iter_mut().enumerate() {
        *byte = seed[i % seed.len()] ^ (i as u8);
    }
}

fn rfc3339_now() -> Result<String, Error> {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal).with_message(format!("timestamp format failed: {err}"))
    })
}

fn emit_bench_output(value: &Value, format: BenchFormat) -> Result<(), Error> {
    match format {
        BenchFormat::Json => emit_json(value),
        BenchFormat::Table => emit_table(value),
        BenchFormat::Both => {
            emit_json(value)?;
            emit_table(value)
        }
    }
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let text = serde_json::to_string_pretty(value).map_err(|err| {
        Error::new(ErrorKind::Internal).with_message(format!("failed to encode bench output: {err}"))
    })?;
    println!("{text}");
    Ok(())
}

fn emit_table(value: &Value) -> Result<(), Error> {
    let results = value
        .get("results")
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::new(ErrorKind::Internal).with_message("bench results missing"))?;

    eprintln!("hstack bench (table)");
    eprintln!(
        "{:>8}  {:>10}  {:>8}  {:>10}  {:>12}  {:>10}",
        "bench", "payload", "stacks", "ops", "elapsed_ms", "ns/op"
    );
    for item in results {
        let bench = item.get("bench").and_then(|v| v.as_str()).unwrap_or("?");
        let payload = item.get("payload_bytes").and_then(|v| v.as_u64()).unwrap_or(0);
        let stacks = item.get("stacks").and_then(|v| v.as_u64()).unwrap_or(0);
        let ops = item.get("ops").and_then(|v| v.as_u64()).unwrap_or(0);
        let elapsed_ms = item
            .get("elapsed_ms")
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::NAN);
        let ns_per_op = item
            .get("ns_per_op")
            .and_then(|v| v.as_f64())
            .unwrap_or(f64::NAN);
        eprintln!(
            "{bench:>8}  {payload:>10}  {stacks:>8}  {ops:>10}  {elapsed_ms:>12.3}  {ns_per_op:>10.1}"
        );
    }
    Ok(())
}
