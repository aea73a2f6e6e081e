use super::{signed_saturate, unsigned_saturate};
use crate::Word;

/// How a word is split for packed arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lanes {
    /// Two 16-bit lanes.
    Halfwords,
    /// Four 8-bit lanes.
    Bytes,
}

impl Lanes {
    /// Bits per lane.
    #[must_use]
    pub const fn width(self) -> u8 {
        match self {
            Self::Halfwords => 16,
            Self::Bytes => 8,
        }
    }

    /// Lanes per word.
    #[must_use]
    pub const fn count(self) -> u8 {
        match self {
            Self::Halfwords => 2,
            Self::Bytes => 4,
        }
    }

    const fn ge_bits_per_lane(self) -> u8 {
        4 / self.count()
    }
}

/// Interpretation and overflow handling of each lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneMode {
    /// Signed, wrapping, sets GE.
    Signed,
    /// Unsigned, wrapping, sets GE.
    Unsigned,
    /// Signed, clamped.
    SignedSaturating,
    /// Unsigned, clamped.
    UnsignedSaturating,
    /// Signed, result halved.
    SignedHalving,
    /// Unsigned, result halved.
    UnsignedHalving,
}

impl LaneMode {
    const fn is_signed(self) -> bool {
        matches!(
            self,
            Self::Signed | Self::SignedSaturating | Self::SignedHalving
        )
    }
}

/// Per-lane operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LaneOp {
    /// `a[i] + b[i]`.
    Add,
    /// `a[i] - b[i]`.
    Subtract,
    /// Halfwords only: `lo = a.lo - b.hi`, `hi = a.hi + b.lo`.
    AddSubtractExchange,
    /// Halfwords only: `lo = a.lo + b.hi`, `hi = a.hi - b.lo`.
    SubtractAddExchange,
}

/// Packed result plus GE bits for the wrapping modes and the saturation
/// outcome for the clamped modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedResult {
    /// Packed lanes.
    pub value: Word,
    /// GE bits, present only for [`LaneMode::Signed`] and [`LaneMode::Unsigned`].
    pub ge: Option<u8>,
    /// `true` when any lane was clamped.
    pub saturated: bool,
}

fn lane(word: Word, lanes: Lanes, index: u8, signed: bool) -> i64 {
    let width = lanes.width();
    let lsb = index * width;
    let field = word.field(lsb + width - 1, lsb);
    if signed {
        let shift = 64 - u32::from(width);
        (i64::from(field.unsigned()) << shift) >> shift
    } else {
        i64::from(field.unsigned())
    }
}

/// Applies `op` lane by lane.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn packed_add_sub(a: Word, b: Word, lanes: Lanes, op: LaneOp, mode: LaneMode) -> PackedResult {
    let width = lanes.width();
    let signed = mode.is_signed();
    let lane_mask = (1_u32 << width) - 1;
    let mut value = 0_u32;
    let mut ge = 0_u8;
    let mut saturated = false;

    for index in 0..lanes.count() {
        let x = lane(a, lanes, index, signed);
        let exchanged = matches!(op, LaneOp::AddSubtractExchange | LaneOp::SubtractAddExchange)
            && lanes == Lanes::Halfwords;
        let y = lane(b, lanes, if exchanged { 1 - index } else { index }, signed);
        let adds = match op {
            LaneOp::Add => true,
            LaneOp::Subtract => false,
            LaneOp::AddSubtractExchange => index == 1,
            LaneOp::SubtractAddExchange => index == 0,
        };
        let raw = if adds { x + y } else { x - y };

        let result = match mode {
            LaneMode::Signed | LaneMode::Unsigned => raw as u32,
            LaneMode::SignedSaturating | LaneMode::UnsignedSaturating => {
                let (clamped, clipped) = if signed {
                    signed_saturate(raw, width)
                } else {
                    unsigned_saturate(raw, width)
                };
                saturated |= clipped;
                clamped.unsigned()
            }
            LaneMode::SignedHalving | LaneMode::UnsignedHalving => (raw >> 1) as u32,
        };
        value |= (result & lane_mask) << (u32::from(index) * u32::from(width));

        let lane_ge = match mode {
            LaneMode::Signed => raw >= 0,
            LaneMode::Unsigned if adds => raw >= 1_i64 << width,
            LaneMode::Unsigned => raw >= 0,
            _ => false,
        };
        if lane_ge {
            let per_lane = lanes.ge_bits_per_lane();
            let bits = (1_u8 << per_lane) - 1;
            ge |= bits << (index * per_lane);
        }
    }

    PackedResult {
        value: Word::new(value),
        ge: matches!(mode, LaneMode::Signed | LaneMode::Unsigned).then_some(ge),
        saturated,
    }
}

/// `SEL`: picks each byte from `a` when its GE bit is set, otherwise from `b`.
#[must_use]
pub const fn packed_select(a: Word, b: Word, ge: u8) -> Word {
    let mut mask = 0_u32;
    let mut index = 0;
    while index < 4 {
        if ge & (1 << index) != 0 {
            mask |= 0xFF << (index * 8);
        }
        index += 1;
    }
    Word::new((a.unsigned() & mask) | (b.unsigned() & !mask))
}
