//! Bit-exact arithmetic primitives shared by every instruction handler.

/// Packed byte/halfword arithmetic.
pub mod lanes;
/// Signed and unsigned saturation.
pub mod saturate;
/// Shifted-operand evaluation with carry-out.
pub mod shift;

pub use lanes::{packed_add_sub, packed_select, LaneMode, LaneOp, Lanes, PackedResult};
pub use saturate::{signed_saturate, unsigned_saturate};
pub use shift::{immediate_carry, shift_with_carry, ShiftKind};

use crate::Word;

/// `N`, `Z`, `C`, `V` produced by a flag-setting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct AluFlags {
    /// Bit 31 of the result.
    pub negative: bool,
    /// Result is zero.
    pub zero: bool,
    /// Unsigned carry out.
    pub carry: bool,
    /// Signed overflow.
    pub overflow: bool,
}

/// Adds `x + y + carry_in`, returning the wrapped result and its flags.
///
/// Carry and overflow are computed by comparing the wide unsigned and signed
/// sums with the readings of the 32-bit result. Subtraction is
/// `add_with_carry(x, !y, true)`; see [`subtract`].
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn add_with_carry(x: Word, y: Word, carry_in: bool) -> (Word, AluFlags) {
    let carry = u64::from(carry_in);
    let unsigned_sum = u64::from(x.unsigned()) + u64::from(y.unsigned()) + carry;
    let signed_sum = i64::from(x.signed()) + i64::from(y.signed()) + i64::from(carry_in);
    let result = Word::new(unsigned_sum as u32);
    let flags = AluFlags {
        negative: result.is_negative(),
        zero: result.is_zero(),
        carry: u64::from(result.unsigned()) != unsigned_sum,
        overflow: i64::from(result.signed()) != signed_sum,
    };
    (result, flags)
}

/// `x - y` with ARM borrow semantics (`C` set when no borrow occurred).
#[must_use]
pub fn subtract(x: Word, y: Word) -> (Word, AluFlags) {
    add_with_carry(x, !y, true)
}

/// `x - y - !carry_in`, as used by `SBC`.
#[must_use]
pub fn subtract_with_carry(x: Word, y: Word, carry_in: bool) -> (Word, AluFlags) {
    add_with_carry(x, !y, carry_in)
}

/// Replaces bits `[lsb + width - 1 : lsb]` of `base` with the low `width`
/// bits of `insert`.
#[must_use]
pub const fn bit_field_insert(base: Word, insert: Word, lsb: u8, width: u8) -> Word {
    if width == 0 {
        return base;
    }
    base.set_field(lsb + width - 1, lsb, insert)
}

/// Extracts `width` bits starting at `lsb`, zero- or sign-extended.
///
/// # Errors
///
/// Never fails for in-range fields; the error path is the field model's
/// width check.
pub fn bit_field_extract(
    value: Word,
    lsb: u8,
    width: u8,
    signed: bool,
) -> Result<Word, crate::Fault> {
    if width == 0 {
        return Ok(Word::ZERO);
    }
    let field = value.field(lsb + width - 1, lsb);
    if signed {
        field.sign_extend(crate::WORD_BITS)
    } else {
        field.zero_extend(crate::WORD_BITS)
    }
}
