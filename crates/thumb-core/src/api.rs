//! Host-facing configuration and outcome types for embedding the engine.

use crate::Word;

/// Default entry point used when no configuration is given.
pub const DEFAULT_INITIAL_PC: u32 = 0x0000_8000;

/// Default initial stack pointer (top of a 64 KiB SRAM block).
pub const DEFAULT_INITIAL_SP: u32 = 0x2001_0000;

/// Top-level immutable configuration for an engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct EngineConfig {
    /// Address of the first instruction. Bit 0 is ignored.
    pub initial_pc: u32,
    /// Initial stack pointer.
    pub initial_sp: u32,
    /// Enables per-instance execution counters.
    pub collect_counters: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_pc: DEFAULT_INITIAL_PC,
            initial_sp: DEFAULT_INITIAL_SP,
            collect_counters: false,
        }
    }
}

/// Result of executing one resolved instruction.
///
/// Faults are reported separately through `Result`; a failed condition is a
/// normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ExecuteOutcome {
    /// The instruction ran.
    Executed,
    /// The instruction's condition failed; no architectural effect.
    Skipped,
    /// The program requested a clean stop.
    EndOfExecution {
        /// Exit status reported by the program.
        status: Word,
    },
}

impl ExecuteOutcome {
    /// `true` for [`ExecuteOutcome::EndOfExecution`].
    #[must_use]
    pub const fn is_end(&self) -> bool {
        matches!(self, Self::EndOfExecution { .. })
    }
}
