use crate::Word;

/// Clamps `value` to the signed range of `bits` bits (`1..=32`).
///
/// Returns the clamped value sign-extended to a word and whether clamping
/// happened. Callers OR the flag into `Q`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn signed_saturate(value: i64, bits: u8) -> (Word, bool) {
    let bits = bits.clamp(1, 32);
    let max = (1_i64 << (bits - 1)) - 1;
    let min = -(1_i64 << (bits - 1));
    let clamped = value.clamp(min, max);
    (Word::from_signed(clamped as i32), clamped != value)
}

/// Clamps `value` to the unsigned range of `bits` bits (`0..=32`).
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn unsigned_saturate(value: i64, bits: u8) -> (Word, bool) {
    let bits = bits.min(32);
    let max = (1_i64 << bits) - 1;
    let clamped = value.clamp(0, max);
    (Word::new(clamped as u32), clamped != value)
}
