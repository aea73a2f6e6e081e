use std::fmt;
use std::str::FromStr;

use crate::{Fault, Word};

/// Number of general-purpose register slots (`R0..R15`).
pub const REGISTER_COUNT: usize = 16;

/// Offset added to the stored program counter when it is read as an operand.
pub const PC_READ_AHEAD: u32 = 4;

/// Architectural register identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Register {
    R0 = 0,
    R1 = 1,
    R2 = 2,
    R3 = 3,
    R4 = 4,
    R5 = 5,
    R6 = 6,
    R7 = 7,
    R8 = 8,
    R9 = 9,
    R10 = 10,
    R11 = 11,
    R12 = 12,
    /// Stack pointer.
    Sp = 13,
    /// Link register.
    Lr = 14,
    /// Program counter.
    Pc = 15,
}

impl Register {
    /// Ordered list of all registers.
    pub const ALL: [Self; REGISTER_COUNT] = [
        Self::R0,
        Self::R1,
        Self::R2,
        Self::R3,
        Self::R4,
        Self::R5,
        Self::R6,
        Self::R7,
        Self::R8,
        Self::R9,
        Self::R10,
        Self::R11,
        Self::R12,
        Self::Sp,
        Self::Lr,
        Self::Pc,
    ];

    /// Returns the slot index (`0..=15`).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decodes a 4-bit register number.
    #[must_use]
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self::ALL[index as usize])
        } else {
            None
        }
    }

    /// Canonical lower-case listing name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::R0 => "r0",
            Self::R1 => "r1",
            Self::R2 => "r2",
            Self::R3 => "r3",
            Self::R4 => "r4",
            Self::R5 => "r5",
            Self::R6 => "r6",
            Self::R7 => "r7",
            Self::R8 => "r8",
            Self::R9 => "r9",
            Self::R10 => "r10",
            Self::R11 => "r11",
            Self::R12 => "r12",
            Self::Sp => "sp",
            Self::Lr => "lr",
            Self::Pc => "pc",
        }
    }

    /// `true` for `R0..R7`.
    #[must_use]
    pub const fn is_low(self) -> bool {
        (self as u8) < 8
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Register {
    type Err = Fault;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let lower = text.trim().to_ascii_lowercase();
        let register = match lower.as_str() {
            "sp" => Self::Sp,
            "lr" => Self::Lr,
            "pc" => Self::Pc,
            "ip" => Self::R12,
            "fp" => Self::R11,
            "sl" => Self::R10,
            "sb" => Self::R9,
            other => other
                .strip_prefix('r')
                .and_then(|digits| digits.parse::<u8>().ok())
                .and_then(Self::from_index)
                .ok_or_else(|| Fault::invalid(format!("unknown register `{text}`")))?,
        };
        Ok(register)
    }
}

/// A set of registers, as written between braces in `PUSH`/`LDM` forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RegisterList(u16);

impl RegisterList {
    /// Builds a list from a raw 16-bit mask (bit `n` = `Rn`).
    #[must_use]
    pub const fn from_mask(mask: u16) -> Self {
        Self(mask)
    }

    /// Raw 16-bit mask.
    #[must_use]
    pub const fn mask(self) -> u16 {
        self.0
    }

    /// Number of registers in the list.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// `true` when no register is listed.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `true` when `register` is listed.
    #[must_use]
    pub const fn contains(self, register: Register) -> bool {
        self.0 & (1 << register as u16) != 0
    }

    /// Lowest-numbered listed register.
    #[must_use]
    pub fn lowest(self) -> Option<Register> {
        self.iter().next()
    }

    /// Listed registers in ascending order.
    pub fn iter(self) -> impl Iterator<Item = Register> {
        Register::ALL
            .into_iter()
            .filter(move |register| self.contains(*register))
    }
}

impl FromStr for RegisterList {
    type Err = Fault;

    /// Parses `r4, r5, lr` or `r4-r7, pc` (braces optional).
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let inner = text.trim().trim_start_matches('{').trim_end_matches('}');
        let mut mask = 0u16;
        for item in inner.split(',').map(str::trim).filter(|item| !item.is_empty()) {
            if let Some((first, last)) = item.split_once('-') {
                let first: Register = first.parse()?;
                let last: Register = last.parse()?;
                if first > last {
                    return Err(Fault::invalid(format!("descending register range `{item}`")));
                }
                for index in first.index()..=last.index() {
                    mask |= 1 << index;
                }
            } else {
                let register: Register = item.parse()?;
                mask |= 1 << register.index();
            }
        }
        Ok(Self(mask))
    }
}

/// The sixteen general-purpose registers plus the explicit-PC-write marker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    slots: [u32; REGISTER_COUNT],
    #[cfg_attr(feature = "serde", serde(skip))]
    pc_written: bool,
}

impl RegisterFile {
    /// Creates a register file with the given entry point and stack pointer.
    ///
    /// Bit 0 of `pc` is cleared: Thumb instructions are halfword aligned.
    #[must_use]
    pub fn new(pc: u32, sp: u32) -> Self {
        let mut slots = [0; REGISTER_COUNT];
        slots[Register::Pc.index()] = pc & !1;
        slots[Register::Sp.index()] = sp;
        Self {
            slots,
            pc_written: false,
        }
    }

    /// Reads a register. `PC` reads as the stored address plus
    /// [`PC_READ_AHEAD`].
    #[must_use]
    pub const fn read(&self, register: Register) -> Word {
        let value = self.slots[register.index()];
        match register {
            Register::Pc => Word::new(value.wrapping_add(PC_READ_AHEAD)),
            _ => Word::new(value),
        }
    }

    /// Writes a register. Writing `PC` marks the step as an explicit
    /// control-flow change.
    pub fn write(&mut self, register: Register, value: Word) {
        self.slots[register.index()] = value.unsigned();
        if register == Register::Pc {
            self.pc_written = true;
        }
    }

    /// Address of the instruction currently being executed.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.slots[Register::Pc.index()]
    }

    /// Current stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u32 {
        self.slots[Register::Sp.index()]
    }

    /// Returns whether `PC` was written during this step and clears the mark.
    pub fn take_pc_written(&mut self) -> bool {
        std::mem::take(&mut self.pc_written)
    }

    /// Returns whether `PC` was written during this step.
    #[must_use]
    pub const fn pc_written(&self) -> bool {
        self.pc_written
    }

    /// Moves `PC` forward without marking a control-flow change.
    pub(crate) fn step_pc(&mut self, step_size: u32) {
        let pc = &mut self.slots[Register::Pc.index()];
        *pc = pc.wrapping_add(step_size);
    }

    /// Raw stored values, `PC` without read-ahead.
    #[must_use]
    pub const fn slots(&self) -> &[u32; REGISTER_COUNT] {
        &self.slots
    }
}
