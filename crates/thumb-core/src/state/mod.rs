//! Architectural core state: register file and status flags.

/// Register identifiers, register lists and the register file.
pub mod registers;
/// Condition flags, GE bits and the conditional-block countdown.
pub mod status;

pub use registers::{Register, RegisterFile, RegisterList, PC_READ_AHEAD, REGISTER_COUNT};
pub use status::{
    ItState, StatusFlags, APSR_C, APSR_GE_MASK, APSR_GE_SHIFT, APSR_N, APSR_NZCVQ_MASK, APSR_Q,
    APSR_V, APSR_Z,
};

use crate::Word;

/// Everything a decoded instruction may read or modify besides memory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreState {
    /// General-purpose registers.
    pub registers: RegisterFile,
    /// Condition flags and IT state.
    pub status: StatusFlags,
}

impl CoreState {
    /// Creates a core at `pc` with stack pointer `sp` and clear flags.
    #[must_use]
    pub fn new(pc: u32, sp: u32) -> Self {
        Self {
            registers: RegisterFile::new(pc, sp),
            status: StatusFlags::default(),
        }
    }

    /// Shorthand for `self.registers.read(register)`.
    #[must_use]
    pub const fn read(&self, register: Register) -> Word {
        self.registers.read(register)
    }

    /// Shorthand for `self.registers.write(register, value)`.
    pub fn write(&mut self, register: Register, value: Word) {
        self.registers.write(register, value);
    }

    /// Writes `PC` with bit 0 cleared, as every branch does.
    pub fn branch_to(&mut self, target: u32) {
        self.registers.write(Register::Pc, Word::new(target & !1));
    }

    /// `PC` as seen by PC-relative addressing: read-ahead value aligned
    /// down to a word boundary.
    #[must_use]
    pub const fn aligned_pc(&self) -> u32 {
        self.registers.read(Register::Pc).unsigned() & !3
    }
}
