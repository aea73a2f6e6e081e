//! Throughput harness for the execution engine.
//!
//! Runs small listing loops on independent engines, one per thread, sharing
//! the process-wide instruction registry. Each loop is resolved once and the
//! decoded instructions are executed repeatedly.
//!
//! ## Usage
//!
//! ```sh
//! cargo run -p thumb-core --release --example throughput
//! ```

#![allow(clippy::pedantic)]

use proptest as _;
use regex as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use thumb_core::{Engine, EngineConfig, ExecuteOutcome, Register, ResolvedInstruction, SparseMemory, Word};

const NUM_THREADS: usize = 4;
const BASE: u32 = 0x8000;
const RAM: u32 = 0x2000_0000;

/// `(mnemonic, operands, width)`; the last row branches back to `BASE`.
type Listing = &'static [(&'static str, &'static str, u32)];

const ALU_LOOP: Listing = &[
    ("adds", "r0, r0, r1", 2),
    ("eors", "r2, r0", 2),
    ("lsls", "r3, r2, #3", 2),
    ("sub.w", "r4, r3, r0, lsr #1", 4),
    ("b.n", "8000 <loop>", 2),
];

const MEMORY_LOOP: Listing = &[
    ("str", "r0, [r5, #4]", 2),
    ("ldr", "r1, [r5, #4]", 2),
    ("push", "{r0, r1}", 2),
    ("pop", "{r2, r3}", 2),
    ("b.n", "8000 <loop>", 2),
];

const CONDITIONAL_LOOP: Listing = &[
    ("cmp", "r0, r1", 2),
    ("ite", "eq", 2),
    ("addeq", "r0, #1", 2),
    ("subne", "r0, #1", 2),
    ("qadd16", "r2, r2, r0", 4),
    ("b.n", "8000 <loop>", 2),
];

struct BenchmarkResult {
    name: &'static str,
    instructions_per_second: f64,
    skipped_fraction: f64,
}

fn resolve(engine: &mut Engine, listing: Listing) -> Vec<(ResolvedInstruction, u32)> {
    let mut address = BASE;
    listing
        .iter()
        .map(|(mnemonic, operands, width)| {
            let resolved = engine
                .resolve(mnemonic, operands, address)
                .unwrap_or_else(|fault| panic!("{mnemonic} {operands}: {fault}"));
            address += width;
            (resolved, *width)
        })
        .collect()
}

fn benchmark(name: &'static str, listing: Listing, duration: Duration) -> BenchmarkResult {
    let (tx, rx) = mpsc::channel();

    let handles: Vec<_> = (0..NUM_THREADS)
        .map(|_| {
            let tx = tx.clone();
            thread::spawn(move || {
                let mut engine = Engine::new(&EngineConfig {
                    initial_pc: BASE,
                    initial_sp: RAM + 0x1000,
                    collect_counters: false,
                })
                .expect("standard registry");
                let mut memory = SparseMemory::new();
                memory.map_zeroed(RAM, 0x1000);
                engine.write(Register::R1, Word::new(3));
                engine.write(Register::R5, Word::new(RAM));
                let program = resolve(&mut engine, listing);

                let mut executed = 0u64;
                let mut skipped = 0u64;
                let start = Instant::now();
                while start.elapsed() < duration {
                    for (instruction, width) in &program {
                        match engine.execute(instruction, &mut memory) {
                            Ok(ExecuteOutcome::Skipped) => skipped += 1,
                            Ok(_) => executed += 1,
                            Err(fault) => panic!("{}: {fault}", instruction.entry()),
                        }
                        engine.advance(*width);
                    }
                }
                tx.send((executed, skipped)).ok();
            })
        })
        .collect();

    for h in handles {
        h.join().ok();
    }
    drop(tx);

    let (executed, skipped) = rx
        .into_iter()
        .fold((0u64, 0u64), |(e, s), (de, ds)| (e + de, s + ds));
    let total = (executed + skipped) as f64;
    BenchmarkResult {
        name,
        instructions_per_second: total / duration.as_secs_f64(),
        skipped_fraction: if total > 0.0 { skipped as f64 / total } else { 0.0 },
    }
}

fn format_number(n: f64) -> String {
    if n >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{:.2}", n)
    }
}

fn main() {
    let duration = Duration::from_secs(2);
    let results = [
        benchmark("alu_loop", ALU_LOOP, duration),
        benchmark("memory_loop", MEMORY_LOOP, duration),
        benchmark("conditional", CONDITIONAL_LOOP, duration),
    ];

    println!("threads: {NUM_THREADS}, duration per benchmark: {duration:?}");
    println!("{:14} {:>12} {:>9}", "benchmark", "instr/sec", "skipped");
    for result in &results {
        println!(
            "{:14} {:>12} {:>8.1}%",
            result.name,
            format_number(result.instructions_per_second),
            result.skipped_fraction * 100.0
        );
    }
}
