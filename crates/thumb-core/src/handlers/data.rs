//! Data-processing: add/subtract, compare, logical, moves and shifts.

use super::{boxed, not_pc, write_result, Decoded, Operand2};
use crate::alu::{add_with_carry, shift_with_carry, subtract, subtract_with_carry, ShiftKind};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::Memory;
use crate::{CoreState, ExecuteOutcome, Fault, Register, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArithOp {
    Add,
    AddCarry,
    Subtract,
    SubtractCarry,
    ReverseSubtract,
}

impl ArithOp {
    fn from_bits(bits: StaticBits) -> Result<Self, Fault> {
        Ok(match bits.get("op") {
            Some(0) => Self::Add,
            Some(1) => Self::AddCarry,
            Some(2) => Self::Subtract,
            Some(3) => Self::SubtractCarry,
            Some(4) => Self::ReverseSubtract,
            other => return Err(Fault::invalid(format!("arithmetic op {other:?}"))),
        })
    }

    fn apply(self, a: Word, b: Word, carry: bool) -> (Word, crate::alu::AluFlags) {
        match self {
            Self::Add => add_with_carry(a, b, false),
            Self::AddCarry => add_with_carry(a, b, carry),
            Self::Subtract => subtract(a, b),
            Self::SubtractCarry => subtract_with_carry(a, b, carry),
            Self::ReverseSubtract => subtract(b, a),
        }
    }
}

#[derive(Debug)]
struct Arithmetic {
    op: ArithOp,
    rd: Option<Register>,
    rn: Register,
    operand: Operand2,
    set_flags: bool,
}

impl Execute for Arithmetic {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let a = match (self.rn, self.operand) {
            (Register::Pc, Operand2::Immediate(_)) => Word::new(core.aligned_pc()),
            (rn, _) => core.read(rn),
        };
        let (b, _) = self.operand.evaluate(core);
        let (result, flags) = self.op.apply(a, b, core.status.carry);
        if let Some(rd) = self.rd {
            write_result(core, rd, result);
        }
        if self.set_flags {
            core.status.apply(flags);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_arithmetic(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let op = ArithOp::from_bits(bits)?;
    let set_flags = bits.flag("S");
    let rd = operands.register("rd")?;
    let rn = operands.opt_register("rn")?.unwrap_or(rd);
    let operand = Operand2::decode(operands)?;

    if bits.flag("wide") {
        operands.bounded("imm", 0..=4095, "12-bit immediate")?;
    }
    if rd == Register::Pc {
        let branch_form =
            op == ArithOp::Add && !set_flags && rn == rd && operand.is_plain_register();
        if !branch_form {
            not_pc(rd, "destination")?;
        }
    }
    boxed(Arithmetic {
        op,
        rd: Some(rd),
        rn,
        operand,
        set_flags,
    })
}

fn decode_compare(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let op = ArithOp::from_bits(bits)?;
    let rn = not_pc(operands.register("rn")?, "compare operand")?;
    boxed(Arithmetic {
        op,
        rd: None,
        rn,
        operand: Operand2::decode(operands)?,
        set_flags: true,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogicOp {
    And,
    Or,
    ExclusiveOr,
    BitClear,
    OrNot,
    Move,
    MoveNot,
}

impl LogicOp {
    fn from_bits(bits: StaticBits) -> Result<Self, Fault> {
        Ok(match bits.get("op") {
            Some(0) => Self::And,
            Some(1) => Self::Or,
            Some(2) => Self::ExclusiveOr,
            Some(3) => Self::BitClear,
            Some(4) => Self::OrNot,
            Some(5) => Self::Move,
            Some(6) => Self::MoveNot,
            other => return Err(Fault::invalid(format!("logical op {other:?}"))),
        })
    }

    fn apply(self, a: Word, b: Word) -> Word {
        let (a, b) = (a.unsigned(), b.unsigned());
        Word::new(match self {
            Self::And => a & b,
            Self::Or => a | b,
            Self::ExclusiveOr => a ^ b,
            Self::BitClear => a & !b,
            Self::OrNot => a | !b,
            Self::Move => b,
            Self::MoveNot => !b,
        })
    }
}

#[derive(Debug)]
struct Logical {
    op: LogicOp,
    rd: Option<Register>,
    rn: Option<Register>,
    operand: Operand2,
    set_flags: bool,
}

impl Execute for Logical {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let a = self.rn.map_or(Word::ZERO, |rn| core.read(rn));
        let (b, carry) = self.operand.evaluate(core);
        let result = self.op.apply(a, b);
        if let Some(rd) = self.rd {
            write_result(core, rd, result);
        }
        if self.set_flags {
            core.status.set_nzc(result, carry);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_logical(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let op = LogicOp::from_bits(bits)?;
    let set_flags = bits.flag("S");
    let rd = operands.register("rd")?;
    let operand = Operand2::decode(operands)?;
    let rn = match op {
        LogicOp::Move | LogicOp::MoveNot => None,
        _ => Some(operands.opt_register("rn")?.unwrap_or(rd)),
    };
    let branch_form = op == LogicOp::Move && !set_flags && operand.is_plain_register();
    if !branch_form {
        not_pc(rd, "destination")?;
    }
    boxed(Logical {
        op,
        rd: Some(rd),
        rn,
        operand,
        set_flags,
    })
}

fn decode_test(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    boxed(Logical {
        op: LogicOp::from_bits(bits)?,
        rd: None,
        rn: Some(not_pc(operands.register("rn")?, "test operand")?),
        operand: Operand2::decode(operands)?,
        set_flags: true,
    })
}

#[derive(Debug)]
struct MoveHalf {
    rd: Register,
    value: u32,
    top: bool,
}

impl Execute for MoveHalf {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = if self.top {
            core.read(self.rd).set_field(31, 16, Word::new(self.value))
        } else {
            Word::new(self.value)
        };
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_move_half(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    boxed(MoveHalf {
        rd: not_pc(operands.register("rd")?, "destination")?,
        value: operands.bounded("imm", 0..=0xFFFF, "16-bit immediate")?,
        top: bits.flag("top"),
    })
}

#[derive(Debug, Clone, Copy)]
enum Amount {
    Immediate(u32),
    Register(Register),
}

#[derive(Debug)]
struct Shift {
    kind: ShiftKind,
    rd: Register,
    rm: Register,
    amount: Amount,
    set_flags: bool,
}

impl Execute for Shift {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let amount = match self.amount {
            Amount::Immediate(amount) => amount,
            Amount::Register(rs) => core.read(rs).unsigned() & 0xFF,
        };
        let (result, carry) =
            shift_with_carry(core.read(self.rm), self.kind, amount, core.status.carry);
        core.write(self.rd, result);
        if self.set_flags {
            core.status.set_nzc(result, carry);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn shift_kind(bits: StaticBits) -> Result<ShiftKind, Fault> {
    Ok(match bits.get("kind") {
        Some(0) => ShiftKind::Lsl,
        Some(1) => ShiftKind::Lsr,
        Some(2) => ShiftKind::Asr,
        Some(3) => ShiftKind::Ror,
        Some(4) => ShiftKind::Rrx,
        other => return Err(Fault::invalid(format!("shift kind {other:?}"))),
    })
}

fn decode_shift(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let kind = shift_kind(bits)?;
    let rd = not_pc(operands.register("rd")?, "destination")?;
    let rm = not_pc(operands.opt_register("rm")?.unwrap_or(rd), "shifted operand")?;
    let amount = if operands.has("imm") {
        let amount = operands.bounded("imm", 0..=32, "shift amount")?;
        if !kind.accepts_immediate(amount) {
            return Err(Fault::invalid(format!("{kind} #{amount} is not encodable")));
        }
        Amount::Immediate(amount)
    } else if let Some(rs) = operands.opt_register("rs")? {
        Amount::Register(not_pc(rs, "shift register")?)
    } else {
        Amount::Immediate(1)
    };
    boxed(Shift {
        kind,
        rd,
        rm,
        amount,
        set_flags: bits.flag("S"),
    })
}

#[derive(Debug)]
struct Address {
    rd: Register,
    target: u32,
}

impl Execute for Address {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        core.write(self.rd, Word::new(self.target));
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_address(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    boxed(Address {
        rd: not_pc(operands.register("rd")?, "destination")?,
        target: operands.target()?,
    })
}

const ADD: StaticBits = StaticBits::new(&[("op", 0)]);
const ADDS: StaticBits = StaticBits::new(&[("op", 0), ("S", 1)]);
const ADC: StaticBits = StaticBits::new(&[("op", 1)]);
const ADCS: StaticBits = StaticBits::new(&[("op", 1), ("S", 1)]);
const SUB: StaticBits = StaticBits::new(&[("op", 2)]);
const SUBS: StaticBits = StaticBits::new(&[("op", 2), ("S", 1)]);
const SBC: StaticBits = StaticBits::new(&[("op", 3)]);
const SBCS: StaticBits = StaticBits::new(&[("op", 3), ("S", 1)]);
const RSB: StaticBits = StaticBits::new(&[("op", 4)]);
const RSBS: StaticBits = StaticBits::new(&[("op", 4), ("S", 1)]);
const ADDW: StaticBits = StaticBits::new(&[("op", 0), ("wide", 1)]);
const SUBW: StaticBits = StaticBits::new(&[("op", 2), ("wide", 1)]);

const AND: StaticBits = StaticBits::new(&[("op", 0)]);
const ANDS: StaticBits = StaticBits::new(&[("op", 0), ("S", 1)]);
const ORR: StaticBits = StaticBits::new(&[("op", 1)]);
const ORRS: StaticBits = StaticBits::new(&[("op", 1), ("S", 1)]);
const EOR: StaticBits = StaticBits::new(&[("op", 2)]);
const EORS: StaticBits = StaticBits::new(&[("op", 2), ("S", 1)]);
const BIC: StaticBits = StaticBits::new(&[("op", 3)]);
const BICS: StaticBits = StaticBits::new(&[("op", 3), ("S", 1)]);
const ORN: StaticBits = StaticBits::new(&[("op", 4)]);
const ORNS: StaticBits = StaticBits::new(&[("op", 4), ("S", 1)]);
const MOV: StaticBits = StaticBits::new(&[("op", 5)]);
const MOVS: StaticBits = StaticBits::new(&[("op", 5), ("S", 1)]);
const MVN: StaticBits = StaticBits::new(&[("op", 6)]);
const MVNS: StaticBits = StaticBits::new(&[("op", 6), ("S", 1)]);

const LSL: StaticBits = StaticBits::new(&[("kind", 0)]);
const LSLS: StaticBits = StaticBits::new(&[("kind", 0), ("S", 1)]);
const LSR: StaticBits = StaticBits::new(&[("kind", 1)]);
const LSRS: StaticBits = StaticBits::new(&[("kind", 1), ("S", 1)]);
const ASR: StaticBits = StaticBits::new(&[("kind", 2)]);
const ASRS: StaticBits = StaticBits::new(&[("kind", 2), ("S", 1)]);
const ROR: StaticBits = StaticBits::new(&[("kind", 3)]);
const RORS: StaticBits = StaticBits::new(&[("kind", 3), ("S", 1)]);
const RRX: StaticBits = StaticBits::new(&[("kind", 4)]);
const RRXS: StaticBits = StaticBits::new(&[("kind", 4), ("S", 1)]);

const THREE_IMM: &str = "{rd}, {rn}, #{imm}";
const TWO_IMM: &str = "{rd}, #{imm}";
const TWO_REG: &str = "{rd}, {rm}";
const THREE_REG: &str = "{rd}, {rn}, {rm}(, {shift})?";
const TWO_REG_SHIFTED: &str = "{rd}, {rm}(, {shift})?";
const COMPARE_IMM: &str = "{rn}, #{imm}";
const COMPARE_REG: &str = "{rn}, {rm}(, {shift})?";

const fn arith(mnemonic: &'static str, template: &'static str, bits: StaticBits) -> EntrySpec {
    EntrySpec::new(mnemonic, template, decode_arithmetic, bits)
}

const fn logic(mnemonic: &'static str, template: &'static str, bits: StaticBits) -> EntrySpec {
    EntrySpec::new(mnemonic, template, decode_logical, bits)
}

const fn shift(mnemonic: &'static str, template: &'static str, bits: StaticBits) -> EntrySpec {
    EntrySpec::new(mnemonic, template, decode_shift, bits)
}

pub(super) const ENTRIES: &[EntrySpec] = &[
    arith("ADD", THREE_IMM, ADD),
    arith("ADD", TWO_IMM, ADD),
    arith("ADD", TWO_REG, ADD),
    arith("ADD", THREE_REG, ADD),
    arith("ADDS", THREE_IMM, ADDS),
    arith("ADDS", TWO_IMM, ADDS),
    arith("ADDS", TWO_REG, ADDS),
    arith("ADDS", THREE_REG, ADDS),
    arith("ADC", THREE_IMM, ADC),
    arith("ADC", TWO_REG_SHIFTED, ADC),
    arith("ADC", THREE_REG, ADC),
    arith("ADCS", THREE_IMM, ADCS),
    arith("ADCS", TWO_REG_SHIFTED, ADCS),
    arith("ADCS", THREE_REG, ADCS),
    arith("SUB", THREE_IMM, SUB),
    arith("SUB", TWO_IMM, SUB),
    arith("SUB", TWO_REG, SUB),
    arith("SUB", THREE_REG, SUB),
    arith("SUBS", THREE_IMM, SUBS),
    arith("SUBS", TWO_IMM, SUBS),
    arith("SUBS", TWO_REG, SUBS),
    arith("SUBS", THREE_REG, SUBS),
    arith("SBC", THREE_IMM, SBC),
    arith("SBC", TWO_REG_SHIFTED, SBC),
    arith("SBC", THREE_REG, SBC),
    arith("SBCS", THREE_IMM, SBCS),
    arith("SBCS", TWO_REG_SHIFTED, SBCS),
    arith("SBCS", THREE_REG, SBCS),
    arith("RSB", THREE_IMM, RSB),
    arith("RSB", THREE_REG, RSB),
    arith("RSBS", THREE_IMM, RSBS),
    arith("RSBS", THREE_REG, RSBS),
    arith("ADDW", THREE_IMM, ADDW),
    arith("SUBW", THREE_IMM, SUBW),
    EntrySpec::new("CMP", COMPARE_IMM, decode_compare, SUB),
    EntrySpec::new("CMP", COMPARE_REG, decode_compare, SUB),
    EntrySpec::new("CMN", COMPARE_IMM, decode_compare, ADD),
    EntrySpec::new("CMN", COMPARE_REG, decode_compare, ADD),
    EntrySpec::new("TST", COMPARE_IMM, decode_test, AND),
    EntrySpec::new("TST", COMPARE_REG, decode_test, AND),
    EntrySpec::new("TEQ", COMPARE_IMM, decode_test, EOR),
    EntrySpec::new("TEQ", COMPARE_REG, decode_test, EOR),
    logic("AND", THREE_IMM, AND),
    logic("AND", TWO_REG_SHIFTED, AND),
    logic("AND", THREE_REG, AND),
    logic("ANDS", THREE_IMM, ANDS),
    logic("ANDS", TWO_REG_SHIFTED, ANDS),
    logic("ANDS", THREE_REG, ANDS),
    logic("ORR", THREE_IMM, ORR),
    logic("ORR", TWO_REG_SHIFTED, ORR),
    logic("ORR", THREE_REG, ORR),
    logic("ORRS", THREE_IMM, ORRS),
    logic("ORRS", TWO_REG_SHIFTED, ORRS),
    logic("ORRS", THREE_REG, ORRS),
    logic("EOR", THREE_IMM, EOR),
    logic("EOR", TWO_REG_SHIFTED, EOR),
    logic("EOR", THREE_REG, EOR),
    logic("EORS", THREE_IMM, EORS),
    logic("EORS", TWO_REG_SHIFTED, EORS),
    logic("EORS", THREE_REG, EORS),
    logic("BIC", THREE_IMM, BIC),
    logic("BIC", TWO_REG_SHIFTED, BIC),
    logic("BIC", THREE_REG, BIC),
    logic("BICS", THREE_IMM, BICS),
    logic("BICS", TWO_REG_SHIFTED, BICS),
    logic("BICS", THREE_REG, BICS),
    logic("ORN", THREE_IMM, ORN),
    logic("ORN", THREE_REG, ORN),
    logic("ORNS", THREE_IMM, ORNS),
    logic("ORNS", THREE_REG, ORNS),
    logic("MOV", TWO_IMM, MOV),
    logic("MOV", TWO_REG, MOV),
    logic("MOV", TWO_REG_SHIFTED, MOV),
    logic("MOVS", TWO_IMM, MOVS),
    logic("MOVS", TWO_REG_SHIFTED, MOVS),
    logic("MVN", TWO_IMM, MVN),
    logic("MVN", TWO_REG_SHIFTED, MVN),
    logic("MVNS", TWO_IMM, MVNS),
    logic("MVNS", TWO_REG_SHIFTED, MVNS),
    EntrySpec::new("MOVW", TWO_IMM, decode_move_half, StaticBits::NONE),
    EntrySpec::new("MOVT", TWO_IMM, decode_move_half, StaticBits::new(&[("top", 1)])),
    shift("LSL", "{rd}, {rm}, #{imm}", LSL),
    shift("LSL", "{rd}, {rm}, {rs}", LSL),
    shift("LSL", "{rd}, {rs}", LSL),
    shift("LSLS", "{rd}, {rm}, #{imm}", LSLS),
    shift("LSLS", "{rd}, {rm}, {rs}", LSLS),
    shift("LSLS", "{rd}, {rs}", LSLS),
    shift("LSR", "{rd}, {rm}, #{imm}", LSR),
    shift("LSR", "{rd}, {rm}, {rs}", LSR),
    shift("LSR", "{rd}, {rs}", LSR),
    shift("LSRS", "{rd}, {rm}, #{imm}", LSRS),
    shift("LSRS", "{rd}, {rm}, {rs}", LSRS),
    shift("LSRS", "{rd}, {rs}", LSRS),
    shift("ASR", "{rd}, {rm}, #{imm}", ASR),
    shift("ASR", "{rd}, {rm}, {rs}", ASR),
    shift("ASR", "{rd}, {rs}", ASR),
    shift("ASRS", "{rd}, {rm}, #{imm}", ASRS),
    shift("ASRS", "{rd}, {rm}, {rs}", ASRS),
    shift("ASRS", "{rd}, {rs}", ASRS),
    shift("ROR", "{rd}, {rm}, #{imm}", ROR),
    shift("ROR", "{rd}, {rm}, {rs}", ROR),
    shift("ROR", "{rd}, {rs}", ROR),
    shift("RORS", "{rd}, {rm}, #{imm}", RORS),
    shift("RORS", "{rd}, {rm}, {rs}", RORS),
    shift("RORS", "{rd}, {rs}", RORS),
    shift("RRX", TWO_REG, RRX),
    shift("RRXS", TWO_REG, RRXS),
    EntrySpec::new("ADR", "{rd}, {target}", decode_address, StaticBits::NONE),
];

#[cfg(test)]
mod tests {
    use crate::handlers::testing::{core, decode, run, BASE};
    use crate::memory::SparseMemory;
    use crate::{Register, Word};

    #[test]
    fn adds_immediate_sets_flags_from_add_with_carry() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R0, Word::new(5));
        run(&mut core, &mut memory, "adds", "r1, r0, #10").expect("executes");
        assert_eq!(core.read(Register::R1), Word::new(15));
        assert!(!core.status.zero && !core.status.negative);
        assert!(!core.status.carry && !core.status.overflow);
    }

    #[test]
    fn subs_and_cmp_use_borrow_convention() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R2, Word::new(3));
        run(&mut core, &mut memory, "subs", "r2, #3").expect("executes");
        assert!(core.status.zero && core.status.carry);

        core.write(Register::R3, Word::new(1));
        run(&mut core, &mut memory, "cmp", "r3, #2").expect("executes");
        assert!(core.status.negative && !core.status.carry);
        assert_eq!(core.read(Register::R3), Word::new(1));
    }

    #[test]
    fn adc_and_sbc_consume_carry() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.status.carry = true;
        core.write(Register::R0, Word::new(1));
        core.write(Register::R1, Word::new(2));
        run(&mut core, &mut memory, "adc", "r2, r0, r1").expect("executes");
        assert_eq!(core.read(Register::R2), Word::new(4));

        core.status.carry = false;
        run(&mut core, &mut memory, "sbcs", "r3, r1, r0").expect("executes");
        assert_eq!(core.read(Register::R3), Word::ZERO);
        assert!(core.status.zero && core.status.carry);
    }

    #[test]
    fn rsbs_negates() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(7));
        run(&mut core, &mut memory, "rsbs", "r0, r1, #0").expect("executes");
        assert_eq!(core.read(Register::R0).signed(), -7);
        assert!(core.status.negative);
    }

    #[test]
    fn logical_ops_take_carry_from_shifter() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(0xF0F0_F0F0));
        core.write(Register::R2, Word::new(0x8000_0001));
        run(&mut core, &mut memory, "ands", "r0, r1, r2, lsl #1").expect("executes");
        assert_eq!(core.read(Register::R0), Word::ZERO);
        assert!(core.status.zero && core.status.carry);

        run(&mut core, &mut memory, "orn", "r3, r1, #0xff").expect("executes");
        assert_eq!(core.read(Register::R3), Word::new(0xFFFF_FFF0));
        run(&mut core, &mut memory, "bic", "r4, r1, #0xf0").expect("executes");
        assert_eq!(core.read(Register::R4), Word::new(0xF0F0_F000));
        run(&mut core, &mut memory, "mvns", "r5, r1").expect("executes");
        assert_eq!(core.read(Register::R5), Word::new(0x0F0F_0F0F));
    }

    #[test]
    fn tst_and_teq_only_touch_flags() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R0, Word::new(0b1010));
        run(&mut core, &mut memory, "tst", "r0, #5").expect("executes");
        assert!(core.status.zero);
        run(&mut core, &mut memory, "teq", "r0, r0").expect("executes");
        assert!(core.status.zero);
        assert_eq!(core.read(Register::R0), Word::new(0b1010));
    }

    #[test]
    fn movw_movt_build_a_constant() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        run(&mut core, &mut memory, "movw", "r0, #0x5678").expect("executes");
        run(&mut core, &mut memory, "movt", "r0, #0x1234").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(0x1234_5678));
        assert!(decode("movw", "r0, #0x10000").is_err());
    }

    #[test]
    fn shifts_by_immediate_and_register() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::R1, Word::new(0x8000_0001));
        run(&mut core, &mut memory, "lsls", "r0, r1, #1").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(2));
        assert!(core.status.carry);

        core.write(Register::R2, Word::new(33));
        run(&mut core, &mut memory, "lsrs", "r3, r1, r2").expect("executes");
        assert_eq!(core.read(Register::R3), Word::ZERO);
        assert!(!core.status.carry && core.status.zero);

        core.status.carry = true;
        run(&mut core, &mut memory, "rrxs", "r4, r1").expect("executes");
        assert_eq!(core.read(Register::R4), Word::new(0xC000_0000));
        assert!(core.status.carry);

        assert!(decode("asrs", "r0, r1, #0").is_err());
        assert!(decode("lsls", "r0, r1, #32").is_err());
    }

    #[test]
    fn pc_destination_rules() {
        assert!(decode("add", "pc, r1").is_ok());
        assert!(decode("mov", "pc, lr").is_ok());
        assert!(decode("adds", "pc, r1, #1").is_err());
        assert!(decode("movs", "pc, lr").is_err());
        assert!(decode("and", "pc, r0, r1").is_err());
        assert!(decode("movw", "pc, #1").is_err());
    }

    #[test]
    fn mov_pc_branches_and_pc_relative_add_is_aligned() {
        let mut core = core();
        let mut memory = SparseMemory::new();
        core.write(Register::Lr, Word::new(0x9001));
        run(&mut core, &mut memory, "mov", "pc, lr").expect("executes");
        assert_eq!(core.registers.pc(), 0x9000);
        assert!(core.registers.take_pc_written());

        let mut core = crate::CoreState::new(BASE + 2, 0);
        run(&mut core, &mut memory, "add", "r0, pc, #8").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(BASE + 4 + 8));
        run(&mut core, &mut memory, "adr", "r1, 8010 <table>").expect("executes");
        assert_eq!(core.read(Register::R1), Word::new(0x8010));
    }

    #[test]
    fn addw_limits_immediate() {
        assert!(decode("addw", "r0, r1, #4095").is_ok());
        assert!(decode("subw", "r0, r1, #4096").is_err());
    }
}
