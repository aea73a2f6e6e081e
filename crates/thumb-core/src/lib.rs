//! Execution engine for a Thumb-2 instruction-set simulator.
//!
//! Instructions arrive as disassembly text (mnemonic plus operand string),
//! are resolved against a table of operand templates into decoded handlers,
//! and run against a register file, status flags and a byte-addressed
//! memory supplied by the embedding driver.

/// 32-bit value type and bit-field helpers.
pub mod word;
pub use word::{DoubleWord, Word, WORD_BITS};

/// Fault taxonomy surfaced by resolve and execute.
pub mod fault;
pub use fault::{Fault, FaultClass};

/// Condition codes and their evaluation against the flags.
pub mod condition;
pub use condition::{Condition, CONDITION_SUFFIXES};

/// Architectural state: registers, flags and conditional-block tracking.
pub mod state;
pub use state::{CoreState, ItState, Register, RegisterFile, RegisterList, StatusFlags};

/// Shared arithmetic, shift and saturation primitives.
pub mod alu;

/// Byte-addressed memory interface and a sparse backing store.
pub mod memory;
pub use memory::{AccessSize, Memory, SparseMemory};

/// Operand templates, the instruction registry and resolution.
pub mod dispatch;
pub use dispatch::{
    EntrySpec, Execute, InstructionEntry, InstructionRegistry, Operands, ResolvedInstruction,
    StaticBits,
};

mod handlers;

/// Host-facing configuration and outcome types.
pub mod api;
pub use api::{EngineConfig, ExecuteOutcome, DEFAULT_INITIAL_PC, DEFAULT_INITIAL_SP};

/// Resolve, execute and advance driver.
pub mod engine;
pub use engine::Engine;

/// Per-engine execution counters.
pub mod counters;
pub use counters::ExecutionCounters;

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
