use crate::alu::AluFlags;
use crate::{Condition, Word};

/// APSR bit for the negative flag.
pub const APSR_N: u32 = 1 << 31;
/// APSR bit for the zero flag.
pub const APSR_Z: u32 = 1 << 30;
/// APSR bit for the carry flag.
pub const APSR_C: u32 = 1 << 29;
/// APSR bit for the overflow flag.
pub const APSR_V: u32 = 1 << 28;
/// APSR bit for the sticky saturation flag.
pub const APSR_Q: u32 = 1 << 27;
/// Shift of the four GE bits inside the APSR.
pub const APSR_GE_SHIFT: u32 = 16;
/// Mask of the `N`, `Z`, `C`, `V`, `Q` group.
pub const APSR_NZCVQ_MASK: u32 = APSR_N | APSR_Z | APSR_C | APSR_V | APSR_Q;
/// Mask of the GE group.
pub const APSR_GE_MASK: u32 = 0xF << APSR_GE_SHIFT;

/// Conditional-block (IT) countdown.
///
/// `enter` arms the block; the retirement of the entering instruction itself
/// does not consume a step. Bit 0 of `else_slots` belongs to the instruction
/// currently covered; a set bit runs it on the inverse condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ItState {
    condition: Option<Condition>,
    remaining: u8,
    else_slots: u8,
    entering: bool,
}

impl ItState {
    /// Largest number of instructions a single block can cover.
    pub const MAX_STEPS: u8 = 4;

    /// Starts a block covering the next `steps` instructions, all on
    /// `condition`.
    pub fn enter(&mut self, condition: Condition, steps: u8) {
        self.enter_with_else(condition, steps, 0);
    }

    /// Starts a block where bit `i` of `else_slots` marks the `i`-th covered
    /// instruction (0-based) as an else slot.
    pub fn enter_with_else(&mut self, condition: Condition, steps: u8, else_slots: u8) {
        let steps = steps.min(Self::MAX_STEPS);
        if steps == 0 {
            self.clear();
            return;
        }
        self.condition = Some(condition);
        self.remaining = steps;
        self.else_slots = else_slots & ((1 << steps) - 1);
        self.entering = true;
    }

    /// Accounts for one retired instruction.
    pub fn retire(&mut self) {
        if self.entering {
            self.entering = false;
            return;
        }
        if self.remaining == 0 {
            return;
        }
        self.remaining -= 1;
        self.else_slots >>= 1;
        if self.remaining == 0 {
            self.clear();
        }
    }

    /// Leaves the block immediately.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `true` while instructions are still covered by the block.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.remaining != 0
    }

    /// `true` when the block was entered by the instruction now retiring.
    #[must_use]
    pub const fn is_entering(&self) -> bool {
        self.entering
    }

    /// Block condition, if a block is active.
    #[must_use]
    pub const fn condition(&self) -> Option<Condition> {
        self.condition
    }

    /// Condition guarding the instruction currently covered: the block
    /// condition, inverted in an else slot.
    #[must_use]
    pub const fn current_condition(&self) -> Option<Condition> {
        match self.condition {
            Some(condition) if self.else_slots & 1 != 0 => Some(condition.inverse()),
            other => other,
        }
    }

    /// Instructions still covered by the block.
    #[must_use]
    pub const fn remaining(&self) -> u8 {
        self.remaining
    }
}

/// Condition flags, GE bits, and conditional-block state of one core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    /// `N`: result was negative.
    pub negative: bool,
    /// `Z`: result was zero.
    pub zero: bool,
    /// `C`: unsigned carry out / no borrow.
    pub carry: bool,
    /// `V`: signed overflow.
    pub overflow: bool,
    /// `Q`: sticky saturation.
    pub saturation: bool,
    ge: u8,
    it: ItState,
}

impl StatusFlags {
    /// Overwrites `N`, `Z`, `C`, `V` from an ALU result.
    pub const fn apply(&mut self, flags: AluFlags) {
        self.negative = flags.negative;
        self.zero = flags.zero;
        self.carry = flags.carry;
        self.overflow = flags.overflow;
    }

    /// Updates `N` and `Z` from a result, leaving `C` and `V` alone.
    pub const fn set_nz(&mut self, result: Word) {
        self.negative = result.is_negative();
        self.zero = result.is_zero();
    }

    /// Updates `N`, `Z` and `C`, leaving `V` alone.
    pub const fn set_nzc(&mut self, result: Word, carry: bool) {
        self.set_nz(result);
        self.carry = carry;
    }

    /// Accumulates a saturation event into the sticky `Q` flag.
    pub const fn or_saturation(&mut self, saturated: bool) {
        self.saturation |= saturated;
    }

    /// The four GE bits (bit `n` = `GE[n]`).
    #[must_use]
    pub const fn ge(&self) -> u8 {
        self.ge
    }

    /// Replaces the four GE bits.
    pub const fn set_ge(&mut self, ge: u8) {
        self.ge = ge & 0xF;
    }

    /// Conditional-block state.
    #[must_use]
    pub const fn it(&self) -> &ItState {
        &self.it
    }

    /// Mutable conditional-block state.
    pub const fn it_mut(&mut self) -> &mut ItState {
        &mut self.it
    }

    /// Packs the flags into the APSR layout.
    #[must_use]
    pub const fn apsr(&self) -> Word {
        let mut value = 0;
        if self.negative {
            value |= APSR_N;
        }
        if self.zero {
            value |= APSR_Z;
        }
        if self.carry {
            value |= APSR_C;
        }
        if self.overflow {
            value |= APSR_V;
        }
        if self.saturation {
            value |= APSR_Q;
        }
        value |= (self.ge as u32) << APSR_GE_SHIFT;
        Word::new(value)
    }

    /// Writes the APSR groups selected by `mask` from `value`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn set_apsr(&mut self, value: Word, mask: u32) {
        let value = value.unsigned();
        if mask & APSR_NZCVQ_MASK != 0 {
            self.negative = value & APSR_N != 0;
            self.zero = value & APSR_Z != 0;
            self.carry = value & APSR_C != 0;
            self.overflow = value & APSR_V != 0;
            self.saturation = value & APSR_Q != 0;
        }
        if mask & APSR_GE_MASK != 0 {
            self.set_ge(((value & APSR_GE_MASK) >> APSR_GE_SHIFT) as u8);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ItState, StatusFlags, APSR_GE_MASK, APSR_NZCVQ_MASK};
    use crate::alu::AluFlags;
    use crate::{Condition, Word};

    #[test]
    fn it_block_counts_down_after_entry() {
        let mut it = ItState::default();
        it.enter(Condition::Eq, 2);
        assert!(it.is_active());

        it.retire();
        assert_eq!(it.remaining(), 2);

        it.retire();
        assert_eq!(it.remaining(), 1);
        assert_eq!(it.condition(), Some(Condition::Eq));

        it.retire();
        assert!(!it.is_active());
        assert_eq!(it.condition(), None);
    }

    #[test]
    fn else_slots_invert_the_condition_in_order() {
        let mut it = ItState::default();
        // ITET EQ: then, else, then.
        it.enter_with_else(Condition::Eq, 3, 0b010);
        it.retire();
        assert_eq!(it.current_condition(), Some(Condition::Eq));
        it.retire();
        assert_eq!(it.current_condition(), Some(Condition::Ne));
        it.retire();
        assert_eq!(it.current_condition(), Some(Condition::Eq));
        it.retire();
        assert_eq!(it.current_condition(), None);
    }

    #[test]
    fn it_block_clear_drops_everything() {
        let mut it = ItState::default();
        it.enter(Condition::Ne, 4);
        it.retire();
        it.clear();
        assert_eq!(it, ItState::default());
    }

    #[test]
    fn it_block_length_is_capped() {
        let mut it = ItState::default();
        it.enter(Condition::Gt, 9);
        assert_eq!(it.remaining(), ItState::MAX_STEPS);
    }

    #[test]
    fn saturation_is_sticky() {
        let mut flags = StatusFlags::default();
        flags.or_saturation(true);
        flags.or_saturation(false);
        assert!(flags.saturation);
    }

    #[test]
    fn apply_overwrites_all_four_condition_flags() {
        let mut flags = StatusFlags {
            negative: true,
            zero: true,
            carry: true,
            overflow: true,
            ..StatusFlags::default()
        };
        flags.apply(AluFlags::default());
        assert!(!flags.negative && !flags.zero && !flags.carry && !flags.overflow);
    }

    #[test]
    fn apsr_packs_and_unpacks_groups_independently() {
        let mut flags = StatusFlags {
            negative: true,
            carry: true,
            saturation: true,
            ..StatusFlags::default()
        };
        flags.set_ge(0b1010);
        assert_eq!(flags.apsr(), Word::new(0xA80A_0000));

        let mut copy = StatusFlags::default();
        copy.set_apsr(Word::new(0xA80A_0000), APSR_NZCVQ_MASK);
        assert!(copy.negative && copy.carry && copy.saturation);
        assert_eq!(copy.ge(), 0);

        copy.set_apsr(Word::new(0xA80A_0000), APSR_GE_MASK);
        assert_eq!(copy.ge(), 0b1010);
    }
}
