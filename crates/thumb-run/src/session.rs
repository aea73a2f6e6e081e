//! Running a loaded program on one engine instance.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use thumb_core::{
    Engine, EngineConfig, ExecuteOutcome, ExecutionCounters, Fault, Register, ResolvedInstruction,
    SparseMemory, Word,
};
use tracing::{debug, info, trace};

use crate::errors::LoadError;
use crate::listing::Program;

/// Default initial stack pointer.
pub const DEFAULT_STACK_TOP: u32 = thumb_core::DEFAULT_INITIAL_SP;
/// Default size of the zeroed stack region below the stack top.
pub const DEFAULT_STACK_SIZE: u32 = 0x1_0000;

/// How a session is set up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Entry symbol or `0x` address; see [`Program::entry_point`].
    pub entry: Option<String>,
    /// Initial stack pointer, the first address past the stack region.
    pub stack_top: u32,
    /// Bytes of zeroed memory mapped below `stack_top`.
    pub stack_size: u32,
    /// Enables engine execution counters.
    pub collect_counters: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            entry: None,
            stack_top: DEFAULT_STACK_TOP,
            stack_size: DEFAULT_STACK_SIZE,
            collect_counters: false,
        }
    }
}

/// Why [`Session::run`] stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The program ended execution with a status.
    Exited(Word),
    /// The step budget ran out.
    StepLimit,
    /// An instruction faulted; `PC` is left on it.
    Fault(Fault),
    /// `PC` reached an address with no listed instruction.
    NoInstruction(u32),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exited(status) => write!(f, "exited with status {}", status.unsigned()),
            Self::StepLimit => write!(f, "step limit reached"),
            Self::Fault(fault) => write!(f, "fault: {fault}"),
            Self::NoInstruction(address) => {
                write!(f, "no instruction listed at {address:#010x}")
            }
        }
    }
}

/// Result of [`Session::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Instructions stepped, skipped ones and the stopping one included.
    pub steps: u64,
    /// Why the run stopped.
    pub stop: StopReason,
}

/// Registers and flags as printed by `--dump-state`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StateSnapshot {
    /// `r0`..`r12`, `sp`, `lr`, `pc` by name.
    pub registers: Vec<(String, u32)>,
    /// Packed `APSR`.
    pub apsr: u32,
    /// `N`, `Z`, `C`, `V`, `Q`.
    pub flags: FlagSnapshot,
    /// Packed `GE` bits.
    pub ge: u8,
    /// Whether a conditional block is still open.
    pub in_it_block: bool,
    /// Counters, when enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counters: Option<ExecutionCounters>,
}

/// Individual condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct FlagSnapshot {
    /// Negative.
    pub n: bool,
    /// Zero.
    pub z: bool,
    /// Carry.
    pub c: bool,
    /// Overflow.
    pub v: bool,
    /// Saturation.
    pub q: bool,
}

/// A program, its memory and an engine positioned at the entry point.
#[derive(Debug)]
pub struct Session {
    program: Program,
    memory: SparseMemory,
    engine: Engine,
    resolved: HashMap<u32, ResolvedInstruction>,
}

impl Session {
    /// Loads the program image, maps the stack and places `PC` on the entry.
    ///
    /// # Errors
    ///
    /// - Entry point errors from [`Program::entry_point`].
    /// - [`LoadError::Engine`] when the instruction registry fails to build.
    pub fn new(program: Program, config: &SessionConfig) -> Result<Self, LoadError> {
        let entry = program.entry_point(config.entry.as_deref())?;
        let mut memory = SparseMemory::new();
        memory.map_zeroed(
            config.stack_top.wrapping_sub(config.stack_size),
            config.stack_size,
        );
        for (address, bytes) in program.segments() {
            memory.load_bytes(address, bytes);
        }
        let engine = Engine::new(&EngineConfig {
            initial_pc: entry,
            initial_sp: config.stack_top,
            collect_counters: config.collect_counters,
        })?;
        info!(entry, sp = config.stack_top, "session ready");
        Ok(Self {
            program,
            memory,
            engine,
            resolved: HashMap::new(),
        })
    }

    /// The loaded program.
    #[must_use]
    pub const fn program(&self) -> &Program {
        &self.program
    }

    /// The engine.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable engine, for seeding registers before a run.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Backing memory.
    #[must_use]
    pub const fn memory(&self) -> &SparseMemory {
        &self.memory
    }

    /// Mutable backing memory.
    pub fn memory_mut(&mut self) -> &mut SparseMemory {
        &mut self.memory
    }

    /// Executes the instruction at `PC` and advances past it.
    ///
    /// Each address is resolved once; later visits reuse the decoded form.
    ///
    /// # Errors
    ///
    /// - [`StopReason::NoInstruction`] when nothing is listed at `PC`.
    /// - [`StopReason::Fault`] for resolve and execute faults.
    pub fn step(&mut self) -> Result<ExecuteOutcome, StopReason> {
        let pc = self.engine.pc();
        let listed = self
            .program
            .instruction(pc)
            .ok_or(StopReason::NoInstruction(pc))?;

        let resolved = match self.resolved.entry(pc) {
            std::collections::hash_map::Entry::Occupied(slot) => slot.into_mut(),
            std::collections::hash_map::Entry::Vacant(slot) => {
                trace!(pc, line = listed.line, "first visit");
                let resolved = self
                    .engine
                    .resolve(&listed.mnemonic, &listed.operands, pc)
                    .map_err(StopReason::Fault)?;
                slot.insert(resolved)
            }
        };

        let outcome = self
            .engine
            .execute(resolved, &mut self.memory)
            .map_err(StopReason::Fault)?;
        if !outcome.is_end() {
            self.engine.advance(listed.width);
        }
        Ok(outcome)
    }

    /// Steps until the program ends, faults, leaves the listing or
    /// `max_steps` instructions have been stepped.
    pub fn run(&mut self, max_steps: u64) -> RunOutcome {
        let mut steps = 0;
        let stop = loop {
            if steps == max_steps {
                break StopReason::StepLimit;
            }
            let pc = self.engine.pc();
            match self.step() {
                Ok(ExecuteOutcome::EndOfExecution { status }) => {
                    steps += 1;
                    break StopReason::Exited(status);
                }
                Ok(_) => steps += 1,
                Err(reason) => {
                    if matches!(reason, StopReason::Fault(_)) {
                        steps += 1;
                    }
                    debug!(pc, %reason, "run stopped");
                    break reason;
                }
            }
        };
        info!(steps, %stop, "run finished");
        RunOutcome { steps, stop }
    }

    /// Registers, flags and counters at this point.
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        let core = self.engine.core();
        let registers = (0..16)
            .filter_map(Register::from_index)
            .map(|register| {
                let value = if register == Register::Pc {
                    core.registers.pc()
                } else {
                    core.read(register).unsigned()
                };
                (register.name().to_owned(), value)
            })
            .collect();
        StateSnapshot {
            registers,
            apsr: core.status.apsr().unsigned(),
            flags: FlagSnapshot {
                n: core.status.negative,
                z: core.status.zero,
                c: core.status.carry,
                v: core.status.overflow,
                q: core.status.saturation,
            },
            ge: core.status.ge(),
            in_it_block: core.status.it().is_active(),
            counters: self.engine.counters().cloned(),
        }
    }
}
