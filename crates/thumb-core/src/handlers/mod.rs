//! Built-in instruction handlers.
//!
//! Each submodule exports an `ENTRIES` table of (mnemonic, template, decoder,
//! static bits). Within a mnemonic, more specific templates come first.

mod bits;
mod control;
mod data;
mod multiple;
mod multiply;
mod packed;
mod saturating;
mod transfer;

use crate::alu::{immediate_carry, shift_with_carry, ShiftKind};
use crate::dispatch::{EntrySpec, Execute, Operands};
use crate::{CoreState, Fault, Register, Word};

/// Every built-in entry group, in registration order.
pub(crate) const STANDARD_ENTRIES: [&[EntrySpec]; 8] = [
    data::ENTRIES,
    multiply::ENTRIES,
    saturating::ENTRIES,
    packed::ENTRIES,
    bits::ENTRIES,
    transfer::ENTRIES,
    multiple::ENTRIES,
    control::ENTRIES,
];

type Decoded = Result<Box<dyn Execute>, Fault>;

#[allow(clippy::unnecessary_wraps)]
fn boxed<T: Execute + 'static>(instruction: T) -> Decoded {
    Ok(Box::new(instruction))
}

/// Rejects `PC` in a role where the form forbids it.
fn not_pc(register: Register, role: &str) -> Result<Register, Fault> {
    if register == Register::Pc {
        return Err(Fault::invalid(format!("pc is not allowed as {role}")));
    }
    Ok(register)
}

/// Rejects `SP` and `PC` in a role where the form forbids both.
fn general(register: Register, role: &str) -> Result<Register, Fault> {
    if register == Register::Sp {
        return Err(Fault::invalid(format!("sp is not allowed as {role}")));
    }
    not_pc(register, role)
}

/// Flexible second operand: an immediate or an optionally shifted register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operand2 {
    Immediate(Word),
    Register {
        rm: Register,
        shift: Option<(ShiftKind, u32)>,
    },
}

impl Operand2 {
    fn decode(operands: &Operands<'_>) -> Result<Self, Fault> {
        if operands.has("imm") {
            return Ok(Self::Immediate(Word::new(operands.word_immediate("imm")?)));
        }
        Ok(Self::Register {
            rm: operands.register("rm")?,
            shift: operands.shift()?,
        })
    }

    const fn is_plain_register(&self) -> bool {
        matches!(self, Self::Register { shift: None, .. })
    }

    /// Operand value and shifter carry-out.
    fn evaluate(&self, core: &CoreState) -> (Word, bool) {
        let carry = core.status.carry;
        match *self {
            Self::Immediate(value) => (value, immediate_carry(value, carry)),
            Self::Register { rm, shift: None } => (core.read(rm), carry),
            Self::Register {
                rm,
                shift: Some((kind, amount)),
            } => shift_with_carry(core.read(rm), kind, amount, carry),
        }
    }
}

/// Writes a data-processing result; `PC` destinations branch.
fn write_result(core: &mut CoreState, rd: Register, value: Word) {
    if rd == Register::Pc {
        core.branch_to(value.unsigned());
    } else {
        core.write(rd, value);
    }
}
