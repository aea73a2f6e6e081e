use std::fmt;
use std::str::FromStr;

use crate::{Fault, StatusFlags};

/// Condition suffixes recognized by mnemonic repair, in architectural order.
///
/// `AL` is deliberately absent: an explicit `AL` suffix never needs repair.
pub const CONDITION_SUFFIXES: [&str; 14] = [
    "EQ", "NE", "CS", "CC", "MI", "PL", "VS", "VC", "HI", "LS", "GE", "LT", "GT", "LE",
];

/// Architectural condition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum Condition {
    /// Equal (`Z`).
    Eq = 0x0,
    /// Not equal (`!Z`).
    Ne = 0x1,
    /// Carry set / unsigned higher or same (`C`).
    Cs = 0x2,
    /// Carry clear / unsigned lower (`!C`).
    Cc = 0x3,
    /// Minus (`N`).
    Mi = 0x4,
    /// Plus or zero (`!N`).
    Pl = 0x5,
    /// Overflow (`V`).
    Vs = 0x6,
    /// No overflow (`!V`).
    Vc = 0x7,
    /// Unsigned higher (`C && !Z`).
    Hi = 0x8,
    /// Unsigned lower or same (`!C || Z`).
    Ls = 0x9,
    /// Signed greater or equal (`N == V`).
    Ge = 0xA,
    /// Signed less than (`N != V`).
    Lt = 0xB,
    /// Signed greater than (`!Z && N == V`).
    Gt = 0xC,
    /// Signed less or equal (`Z || N != V`).
    Le = 0xD,
    /// Always.
    Al = 0xE,
}

impl Condition {
    /// Evaluates the condition against the current flags.
    #[must_use]
    pub const fn passed(self, flags: &StatusFlags) -> bool {
        match self {
            Self::Eq => flags.zero,
            Self::Ne => !flags.zero,
            Self::Cs => flags.carry,
            Self::Cc => !flags.carry,
            Self::Mi => flags.negative,
            Self::Pl => !flags.negative,
            Self::Vs => flags.overflow,
            Self::Vc => !flags.overflow,
            Self::Hi => flags.carry && !flags.zero,
            Self::Ls => !flags.carry || flags.zero,
            Self::Ge => flags.negative == flags.overflow,
            Self::Lt => flags.negative != flags.overflow,
            Self::Gt => !flags.zero && flags.negative == flags.overflow,
            Self::Le => flags.zero || flags.negative != flags.overflow,
            Self::Al => true,
        }
    }

    /// The opposite condition. `AL` has no inverse and maps to itself.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Cs => Self::Cc,
            Self::Cc => Self::Cs,
            Self::Mi => Self::Pl,
            Self::Pl => Self::Mi,
            Self::Vs => Self::Vc,
            Self::Vc => Self::Vs,
            Self::Hi => Self::Ls,
            Self::Ls => Self::Hi,
            Self::Ge => Self::Lt,
            Self::Lt => Self::Ge,
            Self::Gt => Self::Le,
            Self::Le => Self::Gt,
            Self::Al => Self::Al,
        }
    }

    /// Canonical upper-case suffix.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Al => "AL",
            other => CONDITION_SUFFIXES[other as usize],
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

impl FromStr for Condition {
    type Err = Fault;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let condition = match text.to_ascii_uppercase().as_str() {
            "EQ" => Self::Eq,
            "NE" => Self::Ne,
            "CS" | "HS" => Self::Cs,
            "CC" | "LO" => Self::Cc,
            "MI" => Self::Mi,
            "PL" => Self::Pl,
            "VS" => Self::Vs,
            "VC" => Self::Vc,
            "HI" => Self::Hi,
            "LS" => Self::Ls,
            "GE" => Self::Ge,
            "LT" => Self::Lt,
            "GT" => Self::Gt,
            "LE" => Self::Le,
            "AL" => Self::Al,
            _ => return Err(Fault::UnrecognizedCondition(text.to_owned())),
        };
        Ok(condition)
    }
}
