use std::fmt;
use std::str::FromStr;

use crate::{Fault, Word};

/// Barrel-shifter operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right.
    Ror,
    /// Rotate right by one through carry. The amount is ignored.
    Rrx,
}

impl ShiftKind {
    /// Whether `amount` is encodable as an immediate shift of this kind.
    #[must_use]
    pub const fn accepts_immediate(self, amount: u32) -> bool {
        match self {
            Self::Lsl => amount <= 31,
            Self::Lsr | Self::Asr => amount >= 1 && amount <= 32,
            Self::Ror => amount >= 1 && amount <= 31,
            Self::Rrx => amount == 1,
        }
    }

    /// Upper-case mnemonic.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Lsl => "LSL",
            Self::Lsr => "LSR",
            Self::Asr => "ASR",
            Self::Ror => "ROR",
            Self::Rrx => "RRX",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ShiftKind {
    type Err = Fault;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text.to_ascii_uppercase().as_str() {
            "LSL" => Ok(Self::Lsl),
            "LSR" => Ok(Self::Lsr),
            "ASR" => Ok(Self::Asr),
            "ROR" => Ok(Self::Ror),
            "RRX" => Ok(Self::Rrx),
            _ => Err(Fault::invalid(format!("unknown shift `{text}`"))),
        }
    }
}

/// Shifts `value`, returning the result and the shifter carry-out.
///
/// `amount` is the already-resolved shift distance (immediate, or the bottom
/// byte of a register). An amount of zero returns `value` and `carry_in`
/// untouched for every kind except `RRX`, which always rotates by one.
#[must_use]
pub const fn shift_with_carry(
    value: Word,
    kind: ShiftKind,
    amount: u32,
    carry_in: bool,
) -> (Word, bool) {
    let x = value.unsigned();
    if let ShiftKind::Rrx = kind {
        let top = if carry_in { 1 << 31 } else { 0 };
        let result = top | (x >> 1);
        return (Word::new(result), x & 1 != 0);
    }
    if amount == 0 {
        return (Word::new(x), carry_in);
    }
    match kind {
        ShiftKind::Lsl => match amount {
            1..=31 => (Word::new(x << amount), (x >> (32 - amount)) & 1 != 0),
            32 => (Word::ZERO, x & 1 != 0),
            _ => (Word::ZERO, false),
        },
        ShiftKind::Lsr => match amount {
            1..=31 => (Word::new(x >> amount), (x >> (amount - 1)) & 1 != 0),
            32 => (Word::ZERO, x >> 31 != 0),
            _ => (Word::ZERO, false),
        },
        ShiftKind::Asr => {
            let signed = value.signed();
            if amount < 32 {
                (
                    Word::from_signed(signed >> amount),
                    (x >> (amount - 1)) & 1 != 0,
                )
            } else {
                (Word::from_signed(signed >> 31), x >> 31 != 0)
            }
        }
        ShiftKind::Ror => {
            let result = x.rotate_right(amount % 32);
            (Word::new(result), result >> 31 != 0)
        }
        ShiftKind::Rrx => (Word::new(x), carry_in),
    }
}

/// Carry-out of a modified immediate constant written as its final value.
///
/// Plain bytes and the three replicated-byte patterns leave the carry
/// unchanged; constants that need a rotation copy their bit 31 into carry.
#[must_use]
pub const fn immediate_carry(value: Word, carry_in: bool) -> bool {
    let x = value.unsigned();
    let byte = x & 0xFF;
    let high_byte = (x >> 8) & 0xFF;
    let plain = x <= 0xFF;
    let replicated = x == byte * 0x0001_0001
        || x == high_byte * 0x0100_0100
        || x == byte * 0x0101_0101;
    if plain || replicated {
        carry_in
    } else {
        x >> 31 != 0
    }
}
