//! 32-bit machine word with signed/unsigned readings and bit-field access.
//!
//! A [`Word`] normally spans all 32 bits. Words produced by [`Word::field`]
//! carry the position of their most significant bit so that
//! [`Word::sign_extend`] knows which bit to replicate.

use std::fmt;
use std::ops::Not;

use crate::Fault;

/// Width in bits of every architectural register and memory word.
pub const WORD_BITS: u8 = 32;

/// Default MSB tag of a full-width word.
const FULL_MSB: u8 = WORD_BITS - 1;

/// An immutable 32-bit machine word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Word {
    value: u32,
    msb: u8,
}

impl Default for Word {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Word {
    /// The all-zero full-width word.
    pub const ZERO: Self = Self::new(0);

    /// Creates a full-width word.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self {
            value,
            msb: FULL_MSB,
        }
    }

    /// Creates a full-width word from a two's-complement value.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_signed(value: i32) -> Self {
        Self::new(value as u32)
    }

    /// Decodes the canonical little-endian byte form.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self::new(u32::from_le_bytes(bytes))
    }

    /// Returns the canonical little-endian byte form.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.value.to_le_bytes()
    }

    /// Unsigned reading (`0..2^32`).
    #[must_use]
    pub const fn unsigned(self) -> u32 {
        self.value
    }

    /// Two's-complement reading of all 32 bits.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn signed(self) -> i32 {
        self.value as i32
    }

    /// Position of the most significant bit this word represents.
    #[must_use]
    pub const fn msb(self) -> u8 {
        self.msb
    }

    /// Number of meaningful bits (`msb + 1`).
    #[must_use]
    pub const fn width(self) -> u8 {
        self.msb + 1
    }

    /// Returns bit `n` (masked to `0..=31`).
    #[must_use]
    pub const fn bit(self, n: u8) -> bool {
        (self.value >> (n & 31)) & 1 != 0
    }

    /// Returns `true` when bit 31 is set.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.bit(31)
    }

    /// Returns `true` when every bit is clear.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.value == 0
    }

    /// Extracts bits `[msb:lsb]`, right-justified and tagged with width.
    ///
    /// Positions are masked to `0..=31`. When `lsb > msb` after masking the
    /// field is empty.
    #[must_use]
    pub const fn field(self, msb: u8, lsb: u8) -> Self {
        let msb = msb & 31;
        let lsb = lsb & 31;
        if lsb > msb {
            return Self { value: 0, msb: 0 };
        }
        let width = msb - lsb + 1;
        Self {
            value: (self.value >> lsb) & mask(width),
            msb: msb - lsb,
        }
    }

    /// Widens a field to a full word, filling with zeros.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MalformedField`] when `total_width` is not 32.
    pub fn zero_extend(self, total_width: u8) -> Result<Self, Fault> {
        if total_width != WORD_BITS {
            return Err(Fault::MalformedField { width: total_width });
        }
        Ok(Self::new(self.value & mask(self.width())))
    }

    /// Widens a field to a full word, replicating the field's sign bit.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::MalformedField`] when `total_width` is not 32.
    pub fn sign_extend(self, total_width: u8) -> Result<Self, Fault> {
        if total_width != WORD_BITS {
            return Err(Fault::MalformedField { width: total_width });
        }
        let low = self.value & mask(self.width());
        if self.bit(self.msb) {
            Ok(Self::new(low | !mask(self.width())))
        } else {
            Ok(Self::new(low))
        }
    }

    /// Returns this word with bits `[msb:lsb]` replaced by the low bits of
    /// `replacement`. All other bits are unchanged.
    #[must_use]
    pub const fn set_field(self, msb: u8, lsb: u8, replacement: Self) -> Self {
        let msb = msb & 31;
        let lsb = lsb & 31;
        if lsb > msb {
            return Self::new(self.value);
        }
        let field_mask = mask(msb - lsb + 1) << lsb;
        Self::new((self.value & !field_mask) | ((replacement.value << lsb) & field_mask))
    }

    /// Wrapping addition modulo 2^32.
    #[must_use]
    pub const fn wrapping_add(self, other: Self) -> Self {
        Self::new(self.value.wrapping_add(other.value))
    }

    /// Wrapping subtraction modulo 2^32.
    #[must_use]
    pub const fn wrapping_sub(self, other: Self) -> Self {
        Self::new(self.value.wrapping_sub(other.value))
    }

    /// Number of leading zero bits.
    #[must_use]
    pub const fn count_leading_zeros(self) -> u32 {
        self.value.leading_zeros()
    }

    /// Bit order reversed.
    #[must_use]
    pub const fn reverse_bits(self) -> Self {
        Self::new(self.value.reverse_bits())
    }

    /// Byte order reversed.
    #[must_use]
    pub const fn reverse_bytes(self) -> Self {
        Self::new(self.value.swap_bytes())
    }

    /// Byte order reversed within each halfword.
    #[must_use]
    pub const fn reverse_halfword_bytes(self) -> Self {
        let v = self.value;
        Self::new(((v & 0x00FF_00FF) << 8) | ((v >> 8) & 0x00FF_00FF))
    }
}

/// Low `width` bits set; `width >= 32` yields all ones.
const fn mask(width: u8) -> u32 {
    if width >= WORD_BITS {
        u32::MAX
    } else {
        (1 << width) - 1
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Word> for u32 {
    fn from(word: Word) -> Self {
        word.unsigned()
    }
}

impl Not for Word {
    type Output = Self;

    fn not(self) -> Self {
        Self::new(!self.value)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.value)
    }
}

impl fmt::LowerHex for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.value, f)
    }
}

/// A 64-bit quantity held as two words, used by long multiply/accumulate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DoubleWord {
    /// Bits `[31:0]`.
    pub low: Word,
    /// Bits `[63:32]`.
    pub high: Word,
}

impl DoubleWord {
    /// Splits an unsigned 64-bit value.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_u64(value: u64) -> Self {
        Self {
            low: Word::new(value as u32),
            high: Word::new((value >> 32) as u32),
        }
    }

    /// Splits a signed 64-bit value.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn from_i64(value: i64) -> Self {
        Self::from_u64(value as u64)
    }

    /// Reads `{ low, high }` as one unsigned quantity.
    #[must_use]
    pub const fn unsigned(self) -> u64 {
        ((self.high.unsigned() as u64) << 32) | self.low.unsigned() as u64
    }

    /// Reads `{ low, high }` as one two's-complement quantity.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub const fn signed(self) -> i64 {
        self.unsigned() as i64
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{DoubleWord, Word};
    use crate::Fault;

    #[test]
    fn byte_form_is_little_endian() {
        let word = Word::from_le_bytes([0x01, 0x02, 0x03, 0x04]);
        assert_eq!(word.unsigned(), 0x0403_0201);
        assert_eq!(word.to_le_bytes(), [0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn signed_and_unsigned_readings_agree_on_bits() {
        let word = Word::new(0xFFFF_FFFE);
        assert_eq!(word.signed(), -2);
        assert_eq!(Word::from_signed(-2), word);
        assert!(word.is_negative());
    }

    #[test]
    fn field_is_right_justified_and_tagged() {
        let word = Word::new(0xABCD_1234);
        let nibble = word.field(15, 12);
        assert_eq!(nibble.unsigned(), 0x1);
        assert_eq!(nibble.msb(), 3);
        assert_eq!(word.field(31, 0), word);
    }

    #[test]
    fn field_masks_out_of_range_positions() {
        let word = Word::new(0x8000_0001);
        assert_eq!(word.field(63, 31).unsigned(), 1);
        assert_eq!(word.field(3, 7).unsigned(), 0);
    }

    #[test]
    fn sign_extension_uses_field_msb() {
        let byte = Word::new(0x0000_0080).field(7, 0);
        assert_eq!(byte.sign_extend(32), Ok(Word::new(0xFFFF_FF80)));
        assert_eq!(byte.zero_extend(32), Ok(Word::new(0x80)));

        let positive = Word::new(0x7F).field(7, 0);
        assert_eq!(positive.sign_extend(32), Ok(Word::new(0x7F)));
    }

    #[test]
    fn extension_to_other_widths_is_malformed() {
        let field = Word::new(0xF).field(3, 0);
        assert_eq!(
            field.sign_extend(16),
            Err(Fault::MalformedField { width: 16 })
        );
        assert_eq!(
            field.zero_extend(64),
            Err(Fault::MalformedField { width: 64 })
        );
    }

    #[test]
    fn set_field_only_touches_selected_bits() {
        let word = Word::new(0xFFFF_FFFF);
        assert_eq!(
            word.set_field(11, 4, Word::new(0)).unsigned(),
            0xFFFF_F00F
        );
        assert_eq!(
            Word::ZERO.set_field(31, 28, Word::new(0x1F)).unsigned(),
            0xF000_0000
        );
    }

    #[test]
    fn double_word_readings() {
        let pair = DoubleWord::from_i64(-1);
        assert_eq!(pair.low.unsigned(), u32::MAX);
        assert_eq!(pair.high.unsigned(), u32::MAX);
        assert_eq!(pair.unsigned(), u64::MAX);
        assert_eq!(pair.signed(), -1);
    }

    #[test]
    fn byte_reversals() {
        let word = Word::new(0x1122_3344);
        assert_eq!(word.reverse_bytes().unsigned(), 0x4433_2211);
        assert_eq!(word.reverse_halfword_bytes().unsigned(), 0x2211_4433);
        assert_eq!(Word::new(1).reverse_bits().unsigned(), 0x8000_0000);
    }

    proptest! {
        #[test]
        fn set_field_of_own_field_is_identity(value in any::<u32>(), a in 0u8..32, b in 0u8..32) {
            let (msb, lsb) = if a >= b { (a, b) } else { (b, a) };
            let word = Word::new(value);
            prop_assert_eq!(word.set_field(msb, lsb, word.field(msb, lsb)), word);
        }

        #[test]
        fn full_field_zero_extends_to_itself(value in any::<u32>()) {
            let word = Word::new(value);
            prop_assert_eq!(word.field(31, 0).zero_extend(32), Ok(word));
            prop_assert_eq!(word.field(31, 0).sign_extend(32), Ok(word));
        }
    }
}
