//! Multiply, multiply-accumulate, long multiply and divide.

use super::{boxed, general, Decoded};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::Memory;
use crate::{CoreState, DoubleWord, ExecuteOutcome, Fault, Register, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Accumulate {
    None,
    Add,
    Subtract,
}

#[derive(Debug)]
struct Multiply {
    rd: Register,
    rn: Register,
    rm: Register,
    ra: Option<Register>,
    accumulate: Accumulate,
    set_flags: bool,
}

impl Execute for Multiply {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let product = core
            .read(self.rn)
            .unsigned()
            .wrapping_mul(core.read(self.rm).unsigned());
        let addend = self.ra.map_or(0, |ra| core.read(ra).unsigned());
        let result = Word::new(match self.accumulate {
            Accumulate::None => product,
            Accumulate::Add => addend.wrapping_add(product),
            Accumulate::Subtract => addend.wrapping_sub(product),
        });
        core.write(self.rd, result);
        if self.set_flags {
            core.status.set_nz(result);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_multiply(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let rd = general(operands.register("rd")?, "destination")?;
    let rn = general(operands.opt_register("rn")?.unwrap_or(rd), "multiplicand")?;
    let rm = general(operands.register("rm")?, "multiplier")?;
    let accumulate = match bits.get("acc") {
        Some(1) => Accumulate::Add,
        Some(2) => Accumulate::Subtract,
        _ => Accumulate::None,
    };
    let ra = match accumulate {
        Accumulate::None => None,
        _ => Some(general(operands.register("ra")?, "accumulator")?),
    };
    boxed(Multiply {
        rd,
        rn,
        rm,
        ra,
        accumulate,
        set_flags: bits.flag("S"),
    })
}

#[derive(Debug)]
struct LongMultiply {
    rdlo: Register,
    rdhi: Register,
    rn: Register,
    rm: Register,
    signed: bool,
    accumulate: bool,
}

impl Execute for LongMultiply {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let (n, m) = (core.read(self.rn), core.read(self.rm));
        let existing = DoubleWord {
            low: core.read(self.rdlo),
            high: core.read(self.rdhi),
        };
        let result = if self.signed {
            let mut value = i64::from(n.signed()) * i64::from(m.signed());
            if self.accumulate {
                value = value.wrapping_add(existing.signed());
            }
            DoubleWord::from_i64(value)
        } else {
            let mut value = u64::from(n.unsigned()) * u64::from(m.unsigned());
            if self.accumulate {
                value = value.wrapping_add(existing.unsigned());
            }
            DoubleWord::from_u64(value)
        };
        core.write(self.rdlo, result.low);
        core.write(self.rdhi, result.high);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_long_multiply(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let rdlo = general(operands.register("rdlo")?, "low destination")?;
    let rdhi = general(operands.register("rdhi")?, "high destination")?;
    if rdlo == rdhi {
        return Err(Fault::invalid("low and high destinations must differ"));
    }
    boxed(LongMultiply {
        rdlo,
        rdhi,
        rn: general(operands.register("rn")?, "multiplicand")?,
        rm: general(operands.register("rm")?, "multiplier")?,
        signed: bits.flag("signed"),
        accumulate: bits.flag("acc"),
    })
}

#[derive(Debug)]
struct Divide {
    rd: Register,
    rn: Register,
    rm: Register,
    signed: bool,
}

impl Execute for Divide {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let (n, m) = (core.read(self.rn), core.read(self.rm));
        // Division by zero yields zero (no divide-by-zero trap is modeled).
        let result = if m.is_zero() {
            Word::ZERO
        } else if self.signed {
            Word::from_signed(n.signed().wrapping_div(m.signed()))
        } else {
            Word::new(n.unsigned() / m.unsigned())
        };
        core.write(self.rd, result);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_divide(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let rd = general(operands.register("rd")?, "destination")?;
    boxed(Divide {
        rd,
        rn: general(operands.opt_register("rn")?.unwrap_or(rd), "dividend")?,
        rm: general(operands.register("rm")?, "divisor")?,
        signed: bits.flag("signed"),
    })
}

const LONG: &str = "{rdlo}, {rdhi}, {rn}, {rm}";

pub(super) const ENTRIES: &[EntrySpec] = &[
    EntrySpec::new("MUL", "{rd}, {rn}, {rm}", decode_multiply, StaticBits::NONE),
    EntrySpec::new("MUL", "{rd}, {rm}", decode_multiply, StaticBits::NONE),
    EntrySpec::new("MULS", "{rd}, {rn}, {rm}", decode_multiply, StaticBits::new(&[("S", 1)])),
    EntrySpec::new("MULS", "{rd}, {rm}", decode_multiply, StaticBits::new(&[("S", 1)])),
    EntrySpec::new("MLA", "{rd}, {rn}, {rm}, {ra}", decode_multiply, StaticBits::new(&[("acc", 1)])),
    EntrySpec::new("MLS", "{rd}, {rn}, {rm}, {ra}", decode_multiply, StaticBits::new(&[("acc", 2)])),
    EntrySpec::new("UMULL", LONG, decode_long_multiply, StaticBits::NONE),
    EntrySpec::new("SMULL", LONG, decode_long_multiply, StaticBits::new(&[("signed", 1)])),
    EntrySpec::new("UMLAL", LONG, decode_long_multiply, StaticBits::new(&[("acc", 1)])),
    EntrySpec::new(
        "SMLAL",
        LONG,
        decode_long_multiply,
        StaticBits::new(&[("signed", 1), ("acc", 1)]),
    ),
    EntrySpec::new("UDIV", "{rd}, {rn}, {rm}", decode_divide, StaticBits::NONE),
    EntrySpec::new("UDIV", "{rd}, {rm}", decode_divide, StaticBits::NONE),
    EntrySpec::new("SDIV", "{rd}, {rn}, {rm}", decode_divide, StaticBits::new(&[("signed", 1)])),
    EntrySpec::new("SDIV", "{rd}, {rm}", decode_divide, StaticBits::new(&[("signed", 1)])),
];

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{core, decode, run};
    use crate::memory::SparseMemory;
    use crate::{Register, Word};

    #[test]
    fn mul_family() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(6));
        core.write(Register::R2, Word::new(7));
        core.write(Register::R3, Word::new(100));
        run(&mut core, &mut memory, "mul", "r0, r1, r2").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(42));
        run(&mut core, &mut memory, "mla", "r4, r1, r2, r3").expect("executes");
        assert_eq!(core.read(Register::R4), Word::new(142));
        run(&mut core, &mut memory, "mls", "r5, r1, r2, r3").expect("executes");
        assert_eq!(core.read(Register::R5), Word::new(58));

        core.write(Register::R6, Word::ZERO);
        run(&mut core, &mut memory, "muls", "r6, r1").expect("executes");
        assert!(core.status.zero);
    }

    #[test]
    fn long_multiply_and_accumulate() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R2, Word::new(0xFFFF_FFFF));
        core.write(Register::R3, Word::new(2));
        run(&mut core, &mut memory, "umull", "r0, r1, r2, r3").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0xFFFF_FFFE));
        assert_eq!(core.read(Register::R1), Word::new(1));

        run(&mut core, &mut memory, "smull", "r0, r1, r2, r3").expect("executes");
        assert_eq!(core.read(Register::R0).signed(), -2);
        assert_eq!(core.read(Register::R1).signed(), -1);

        run(&mut core, &mut memory, "smlal", "r0, r1, r3, r3").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(2));
        assert_eq!(core.read(Register::R1), Word::ZERO);

        assert!(decode("umull", "r0, r0, r2, r3").is_err());
    }

    #[test]
    fn division_rounds_toward_zero_and_tolerates_zero() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::from_signed(-7));
        core.write(Register::R2, Word::new(2));
        run(&mut core, &mut memory, "sdiv", "r0, r1, r2").expect("executes");
        assert_eq!(core.read(Register::R0).signed(), -3);

        core.write(Register::R2, Word::ZERO);
        run(&mut core, &mut memory, "udiv", "r0, r1, r2").expect("executes");
        assert_eq!(core.read(Register::R0), Word::ZERO);

        core.write(Register::R1, Word::new(0x8000_0000));
        core.write(Register::R2, Word::from_signed(-1));
        run(&mut core, &mut memory, "sdiv", "r0, r1, r2").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0x8000_0000));
    }
}
