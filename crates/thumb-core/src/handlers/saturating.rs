//! Saturation instructions and saturating word arithmetic.

use super::{boxed, general, Decoded};
use crate::alu::{shift_with_carry, signed_saturate, unsigned_saturate, ShiftKind};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::Memory;
use crate::{CoreState, ExecuteOutcome, Fault, Register, Word};

#[derive(Debug)]
struct Saturate {
    rd: Register,
    rn: Register,
    bits: u8,
    signed: bool,
    shift: Option<(ShiftKind, u32)>,
}

impl Execute for Saturate {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = match self.shift {
            Some((kind, amount)) => shift_with_carry(core.read(self.rn), kind, amount, false).0,
            None => core.read(self.rn),
        };
        let operand = i64::from(value.signed());
        let (result, saturated) = if self.signed {
            signed_saturate(operand, self.bits)
        } else {
            unsigned_saturate(operand, self.bits)
        };
        core.write(self.rd, result);
        core.status.or_saturation(saturated);
        Ok(ExecuteOutcome::Executed)
    }
}

fn saturation_width(operands: &Operands<'_>, signed: bool, lane_bits: u8) -> Result<u8, Fault> {
    let range = if signed {
        1..=i64::from(lane_bits)
    } else {
        0..=i64::from(lane_bits) - 1
    };
    let bits = operands.bounded("sat", range, "saturation width")?;
    u8::try_from(bits).map_err(|_| Fault::invalid("saturation width"))
}

fn decode_saturate(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let signed = bits.flag("signed");
    let shift = operands.shift()?;
    if let Some((kind, amount)) = shift {
        if !matches!((kind, amount), (ShiftKind::Lsl, 0..=31) | (ShiftKind::Asr, 1..=31)) {
            return Err(Fault::invalid(format!("saturate does not accept {kind} #{amount}")));
        }
    }
    boxed(Saturate {
        rd: general(operands.register("rd")?, "destination")?,
        rn: general(operands.register("rn")?, "source")?,
        bits: saturation_width(operands, signed, 32)?,
        signed,
        shift,
    })
}

#[derive(Debug)]
struct SaturateHalves {
    rd: Register,
    rn: Register,
    bits: u8,
    signed: bool,
}

impl Execute for SaturateHalves {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let source = core.read(self.rn);
        let mut result = Word::ZERO;
        let mut any = false;
        for lsb in [0_u8, 16] {
            let half = source.field(lsb + 15, lsb).sign_extend(crate::WORD_BITS)?;
            let (clamped, saturated) = if self.signed {
                signed_saturate(i64::from(half.signed()), self.bits)
            } else {
                unsigned_saturate(i64::from(half.signed()), self.bits)
            };
            result = result.set_field(lsb + 15, lsb, clamped);
            any |= saturated;
        }
        core.write(self.rd, result);
        core.status.or_saturation(any);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_saturate_halves(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let signed = bits.flag("signed");
    boxed(SaturateHalves {
        rd: general(operands.register("rd")?, "destination")?,
        rn: general(operands.register("rn")?, "source")?,
        bits: saturation_width(operands, signed, 16)?,
        signed,
    })
}

/// `QADD`, `QSUB`, `QDADD`, `QDSUB`: `Rd = sat(Rm ± [sat(2 *)] Rn)`.
#[derive(Debug)]
struct SaturatingArithmetic {
    rd: Register,
    rm: Register,
    rn: Register,
    subtract: bool,
    double: bool,
}

impl Execute for SaturatingArithmetic {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let m = i64::from(core.read(self.rm).signed());
        let (n, doubled_saturated) = if self.double {
            let n = i64::from(core.read(self.rn).signed());
            let (doubled, saturated) = signed_saturate(2 * n, 32);
            (i64::from(doubled.signed()), saturated)
        } else {
            (i64::from(core.read(self.rn).signed()), false)
        };
        let (result, saturated) = signed_saturate(if self.subtract { m - n } else { m + n }, 32);
        core.write(self.rd, result);
        core.status.or_saturation(saturated || doubled_saturated);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_saturating_arithmetic(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    boxed(SaturatingArithmetic {
        rd: general(operands.register("rd")?, "destination")?,
        rm: general(operands.register("rm")?, "first operand")?,
        rn: general(operands.register("rn")?, "second operand")?,
        subtract: bits.flag("subtract"),
        double: bits.flag("double"),
    })
}

const SIGNED: StaticBits = StaticBits::new(&[("signed", 1)]);
const Q_FORM: &str = "{rd}, {rm}, {rn}";

pub(super) const ENTRIES: &[EntrySpec] = &[
    EntrySpec::new("SSAT", "{rd}, #{sat}, {rn}(, {shift})?", decode_saturate, SIGNED),
    EntrySpec::new("USAT", "{rd}, #{sat}, {rn}(, {shift})?", decode_saturate, StaticBits::NONE),
    EntrySpec::new("SSAT16", "{rd}, #{sat}, {rn}", decode_saturate_halves, SIGNED),
    EntrySpec::new("USAT16", "{rd}, #{sat}, {rn}", decode_saturate_halves, StaticBits::NONE),
    EntrySpec::new("QADD", Q_FORM, decode_saturating_arithmetic, StaticBits::NONE),
    EntrySpec::new(
        "QSUB",
        Q_FORM,
        decode_saturating_arithmetic,
        StaticBits::new(&[("subtract", 1)]),
    ),
    EntrySpec::new(
        "QDADD",
        Q_FORM,
        decode_saturating_arithmetic,
        StaticBits::new(&[("double", 1)]),
    ),
    EntrySpec::new(
        "QDSUB",
        Q_FORM,
        decode_saturating_arithmetic,
        StaticBits::new(&[("subtract", 1), ("double", 1)]),
    ),
];
