//! Bit-field, bit-reversal and extension instructions.

use super::{boxed, general, Decoded};
use crate::alu::{bit_field_extract, bit_field_insert, shift_with_carry, ShiftKind};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::Memory;
use crate::{CoreState, ExecuteOutcome, Fault, Register, Word, WORD_BITS};

/// Reads `#{lsb}, #{width}` and checks the field fits in a word.
#[allow(clippy::cast_possible_truncation)]
fn field_bounds(operands: &Operands<'_>) -> Result<(u8, u8), Fault> {
    let lsb = operands.bounded("lsb", 0..=31, "bit-field lsb")?;
    let width = operands.bounded("width", 1..=32, "bit-field width")?;
    if lsb + width > u32::from(WORD_BITS) {
        return Err(Fault::invalid(format!(
            "bit field lsb {lsb} width {width} runs past bit 31"
        )));
    }
    Ok((lsb as u8, width as u8))
}

#[derive(Debug)]
struct Insert {
    rd: Register,
    rn: Option<Register>,
    lsb: u8,
    width: u8,
}

impl Execute for Insert {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let source = self.rn.map_or(Word::ZERO, |rn| core.read(rn));
        let value = bit_field_insert(core.read(self.rd), source, self.lsb, self.width);
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_insert(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    let (lsb, width) = field_bounds(operands)?;
    let rn = operands
        .opt_register("rn")?
        .map(|rn| general(rn, "source"))
        .transpose()?;
    boxed(Insert {
        rd: general(operands.register("rd")?, "destination")?,
        rn,
        lsb,
        width,
    })
}

#[derive(Debug)]
struct Extract {
    rd: Register,
    rn: Register,
    lsb: u8,
    width: u8,
    signed: bool,
}

impl Execute for Extract {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = bit_field_extract(core.read(self.rn), self.lsb, self.width, self.signed)?;
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_extract(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let (lsb, width) = field_bounds(operands)?;
    boxed(Extract {
        rd: general(operands.register("rd")?, "destination")?,
        rn: general(operands.register("rn")?, "source")?,
        lsb,
        width,
        signed: bits.flag("signed"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unary {
    CountLeadingZeros,
    ReverseBits,
    ReverseBytes,
    ReverseHalfwordBytes,
    ReverseSignedHalfword,
}

impl Unary {
    fn apply(self, value: Word) -> Result<Word, Fault> {
        Ok(match self {
            Self::CountLeadingZeros => Word::new(value.count_leading_zeros()),
            Self::ReverseBits => value.reverse_bits(),
            Self::ReverseBytes => value.reverse_bytes(),
            Self::ReverseHalfwordBytes => value.reverse_halfword_bytes(),
            Self::ReverseSignedHalfword => value
                .reverse_halfword_bytes()
                .field(15, 0)
                .sign_extend(WORD_BITS)?,
        })
    }
}

#[derive(Debug)]
struct UnaryOp {
    rd: Register,
    rm: Register,
    op: Unary,
}

impl Execute for UnaryOp {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = self.op.apply(core.read(self.rm))?;
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_unary(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let op = match bits.get("op") {
        Some(0) => Unary::CountLeadingZeros,
        Some(1) => Unary::ReverseBits,
        Some(2) => Unary::ReverseBytes,
        Some(3) => Unary::ReverseHalfwordBytes,
        Some(4) => Unary::ReverseSignedHalfword,
        other => return Err(Fault::invalid(format!("bit op {other:?}"))),
    };
    boxed(UnaryOp {
        rd: general(operands.register("rd")?, "destination")?,
        rm: general(operands.register("rm")?, "source")?,
        op,
    })
}

/// `UXTB`..`SXTAH`: rotate, take the low byte or halfword, extend, and
/// optionally add to `Rn`.
#[derive(Debug)]
struct Extend {
    rd: Register,
    rn: Option<Register>,
    rm: Register,
    rotation: u32,
    msb: u8,
    signed: bool,
}

impl Execute for Extend {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let (rotated, _) = shift_with_carry(core.read(self.rm), ShiftKind::Ror, self.rotation, false);
        let field = rotated.field(self.msb, 0);
        let extended = if self.signed {
            field.sign_extend(WORD_BITS)?
        } else {
            field.zero_extend(WORD_BITS)?
        };
        let value = match self.rn {
            Some(rn) => core.read(rn).wrapping_add(extended),
            None => extended,
        };
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_extend(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let rotation = match operands.shift()? {
        None => 0,
        Some((ShiftKind::Ror, amount @ (8 | 16 | 24))) => amount,
        Some((kind, amount)) => {
            return Err(Fault::invalid(format!(
                "extend rotation must be ror #8, #16 or #24, got {kind} #{amount}"
            )))
        }
    };
    let rn = operands
        .opt_register("rn")?
        .map(|rn| general(rn, "addend"))
        .transpose()?;
    boxed(Extend {
        rd: general(operands.register("rd")?, "destination")?,
        rn,
        rm: general(operands.register("rm")?, "source")?,
        rotation,
        msb: if bits.flag("halfword") { 15 } else { 7 },
        signed: bits.flag("signed"),
    })
}

const EXTEND: &str = "{rd}, {rm}(, {shift})?";
const EXTEND_ADD: &str = "{rd}, {rn}, {rm}(, {shift})?";
const BYTE: StaticBits = StaticBits::NONE;
const HALFWORD: StaticBits = StaticBits::new(&[("halfword", 1)]);
const SIGNED_BYTE: StaticBits = StaticBits::new(&[("signed", 1)]);
const SIGNED_HALFWORD: StaticBits = StaticBits::new(&[("signed", 1), ("halfword", 1)]);

pub(super) const ENTRIES: &[EntrySpec] = &[
    EntrySpec::new("BFI", "{rd}, {rn}, #{lsb}, #{width}", decode_insert, StaticBits::NONE),
    EntrySpec::new("BFC", "{rd}, #{lsb}, #{width}", decode_insert, StaticBits::NONE),
    EntrySpec::new("UBFX", "{rd}, {rn}, #{lsb}, #{width}", decode_extract, StaticBits::NONE),
    EntrySpec::new(
        "SBFX",
        "{rd}, {rn}, #{lsb}, #{width}",
        decode_extract,
        StaticBits::new(&[("signed", 1)]),
    ),
    EntrySpec::new("CLZ", "{rd}, {rm}", decode_unary, StaticBits::new(&[("op", 0)])),
    EntrySpec::new("RBIT", "{rd}, {rm}", decode_unary, StaticBits::new(&[("op", 1)])),
    EntrySpec::new("REV", "{rd}, {rm}", decode_unary, StaticBits::new(&[("op", 2)])),
    EntrySpec::new("REV16", "{rd}, {rm}", decode_unary, StaticBits::new(&[("op", 3)])),
    EntrySpec::new("REVSH", "{rd}, {rm}", decode_unary, StaticBits::new(&[("op", 4)])),
    EntrySpec::new("UXTB", EXTEND, decode_extend, BYTE),
    EntrySpec::new("UXTH", EXTEND, decode_extend, HALFWORD),
    EntrySpec::new("SXTB", EXTEND, decode_extend, SIGNED_BYTE),
    EntrySpec::new("SXTH", EXTEND, decode_extend, SIGNED_HALFWORD),
    EntrySpec::new("UXTAB", EXTEND_ADD, decode_extend, BYTE),
    EntrySpec::new("UXTAH", EXTEND_ADD, decode_extend, HALFWORD),
    EntrySpec::new("SXTAB", EXTEND_ADD, decode_extend, SIGNED_BYTE),
    EntrySpec::new("SXTAH", EXTEND_ADD, decode_extend, SIGNED_HALFWORD),
];

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::handlers::testing::{core, decode, run};
    use crate::memory::SparseMemory;
    use crate::{Register, Word};

    #[test]
    fn bfi_and_bfc_touch_only_the_field() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R0, Word::new(0xFFFF_FFFF));
        core.write(Register::R1, Word::new(0x0000_0005));
        run(&mut core, &mut memory, "bfi", "r0, r1, #4, #4").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xFFFF_FF5F));
        run(&mut core, &mut memory, "bfc", "r0, #0, #8").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xFFFF_FF00));
    }

    #[test]
    fn field_extraction() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(0x0000_F0A0));
        run(&mut core, &mut memory, "ubfx", "r0, r1, #12, #4").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xF));
        run(&mut core, &mut memory, "sbfx", "r0, r1, #12, #4").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xFFFF_FFFF));
    }

    #[rstest]
    #[case("r0, r1, #28, #5")]
    #[case("r0, r1, #32, #1")]
    #[case("r0, r1, #0, #0")]
    fn fields_past_bit_31_are_rejected(#[case] text: &str) {
        assert!(decode("ubfx", text).is_err());
    }

    #[rstest]
    #[case("clz", 0x0001_0000, 15)]
    #[case("rbit", 0x0000_0001, 0x8000_0000)]
    #[case("rev", 0x1234_5678, 0x7856_3412)]
    #[case("rev16", 0x1234_5678, 0x3412_7856)]
    #[case("revsh", 0x0000_0080, 0xFFFF_8000)]
    fn unary_bit_ops(#[case] mnemonic: &str, #[case] input: u32, #[case] expected: u32) {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(input));
        run(&mut core, &mut memory, mnemonic, "r0, r1").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(expected));
    }

    #[test]
    fn extends_rotate_then_extend() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(0x1280_FF34));
        run(&mut core, &mut memory, "uxtb", "r0, r1").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0x34));
        run(&mut core, &mut memory, "sxtb", "r0, r1, ror #8").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xFFFF_FFFF));
        run(&mut core, &mut memory, "sxth", "r0, r1, ror #16").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0x1280));

        core.write(Register::R2, Word::new(100));
        run(&mut core, &mut memory, "uxtab", "r0, r2, r1").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(100 + 0x34));

        assert!(decode("uxtb", "r0, r1, ror #4").is_err());
        assert!(decode("uxth", "r0, r1, lsl #8").is_err());
    }
}
