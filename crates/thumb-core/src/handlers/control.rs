//! Branches, table branches, conditional blocks, breakpoints and status
//! register moves.

use super::{boxed, general, not_pc, Decoded};
use crate::alu::ShiftKind;
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::{AccessSize, Memory};
use crate::state::{APSR_GE_MASK, APSR_NZCVQ_MASK};
use crate::{Condition, CoreState, ExecuteOutcome, Fault, Register, Word};

#[derive(Debug)]
struct Branch {
    target: u32,
    link: bool,
}

impl Execute for Branch {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        if self.link {
            // Return address is the instruction after this 32-bit BL.
            let return_address = core.read(Register::Pc).unsigned() | 1;
            core.write(Register::Lr, Word::new(return_address));
        }
        core.branch_to(self.target);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_branch(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    boxed(Branch {
        target: operands.target()?,
        link: bits.flag("link"),
    })
}

#[derive(Debug)]
struct BranchExchange {
    rm: Register,
    link: bool,
}

impl Execute for BranchExchange {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let target = core.read(self.rm).unsigned();
        if self.link {
            // 16-bit BLX: the next instruction is two bytes on.
            let return_address = core.read(Register::Pc).unsigned().wrapping_sub(2) | 1;
            core.write(Register::Lr, Word::new(return_address));
        }
        core.branch_to(target);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_branch_exchange(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let link = bits.flag("link");
    let rm = operands.register("rm")?;
    let rm = if link { not_pc(rm, "call target")? } else { rm };
    boxed(BranchExchange { rm, link })
}

#[derive(Debug)]
struct CompareBranch {
    rn: Register,
    target: u32,
    nonzero: bool,
}

impl Execute for CompareBranch {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        if core.read(self.rn).is_zero() != self.nonzero {
            core.branch_to(self.target);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_compare_branch(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let rn = operands.register("rn")?;
    if !rn.is_low() {
        return Err(Fault::invalid(format!("{} needs a low register", operands.mnemonic())));
    }
    let target = operands.target()?;
    if target <= operands.address() {
        return Err(Fault::invalid("compare-and-branch only branches forward"));
    }
    boxed(CompareBranch {
        rn,
        target,
        nonzero: bits.flag("nonzero"),
    })
}

/// `TBB`/`TBH`: forward branch by twice a byte or halfword table entry.
#[derive(Debug)]
struct TableBranch {
    rn: Register,
    rm: Register,
    size: AccessSize,
}

impl Execute for TableBranch {
    fn execute(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        let base = core.read(self.rn).unsigned();
        let index = core.read(self.rm).unsigned();
        let scaled = index.wrapping_mul(u32::from(self.size.bytes()));
        let entry = memory.read_unsigned(base.wrapping_add(scaled), self.size)?;
        let target = core
            .read(Register::Pc)
            .unsigned()
            .wrapping_add(entry.unsigned() * 2);
        core.branch_to(target);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_table_branch(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let halfword = bits.flag("halfword");
    match (halfword, operands.shift()?) {
        (false, None) | (true, Some((ShiftKind::Lsl, 1))) => {}
        _ => return Err(Fault::invalid("table index shift must be lsl #1 for TBH only")),
    }
    boxed(TableBranch {
        rn: operands.register("rn")?,
        rm: general(operands.register("rm")?, "table index")?,
        size: if halfword {
            AccessSize::Halfword
        } else {
            AccessSize::Byte
        },
    })
}

#[derive(Debug)]
struct EnterBlock {
    condition: Condition,
    steps: u8,
    else_slots: u8,
}

impl Execute for EnterBlock {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        core.status
            .it_mut()
            .enter_with_else(self.condition, self.steps, self.else_slots);
        Ok(ExecuteOutcome::Executed)
    }
}

/// The block length and else slots come from the written mnemonic: `IT`
/// followed by up to three `T`/`E` letters.
fn decode_enter_block(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    let condition = operands.condition()?;
    let letters = operands
        .mnemonic()
        .strip_prefix("IT")
        .ok_or_else(|| Fault::invalid("conditional block without IT prefix"))?;
    if letters.len() > 3 {
        return Err(Fault::invalid(format!("IT mask `{letters}` is too long")));
    }
    let mut else_slots = 0_u8;
    for (slot, letter) in letters.chars().enumerate() {
        match letter {
            'T' => {}
            'E' if condition != Condition::Al => else_slots |= 1 << (slot + 1),
            _ => return Err(Fault::invalid(format!("invalid IT mask `{letters}`"))),
        }
    }
    boxed(EnterBlock {
        condition,
        steps: u8::try_from(letters.len() + 1).map_err(|_| Fault::invalid("IT mask"))?,
        else_slots,
    })
}

#[derive(Debug)]
struct Breakpoint;

impl Execute for Breakpoint {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        Ok(ExecuteOutcome::EndOfExecution {
            status: core.read(Register::R0),
        })
    }
}

fn decode_breakpoint(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    if operands.has("imm") {
        operands.bounded("imm", 0..=255, "breakpoint number")?;
    }
    boxed(Breakpoint)
}

#[derive(Debug)]
struct ReadStatus {
    rd: Register,
}

impl Execute for ReadStatus {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let apsr = core.status.apsr();
        core.write(self.rd, apsr);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_read_status(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    let psr = operands.text("psr").unwrap_or_default().to_ascii_lowercase();
    if !matches!(psr.as_str(), "apsr" | "xpsr" | "iapsr" | "eapsr") {
        return Err(Fault::invalid(format!("cannot read special register `{psr}`")));
    }
    boxed(ReadStatus {
        rd: general(operands.register("rd")?, "destination")?,
    })
}

#[derive(Debug)]
struct WriteStatus {
    rn: Register,
    mask: u32,
}

impl Execute for WriteStatus {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = core.read(self.rn);
        core.status.set_apsr(value, self.mask);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_write_status(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    let psr = operands.text("psr").unwrap_or_default().to_ascii_lowercase();
    let mask = match psr.as_str() {
        "apsr" | "apsr_nzcvq" => APSR_NZCVQ_MASK,
        "apsr_g" => APSR_GE_MASK,
        "apsr_nzcvqg" => APSR_NZCVQ_MASK | APSR_GE_MASK,
        _ => return Err(Fault::invalid(format!("cannot write special register `{psr}`"))),
    };
    boxed(WriteStatus {
        rn: general(operands.register("rn")?, "source")?,
        mask,
    })
}

pub(super) const ENTRIES: &[EntrySpec] = &[
    EntrySpec::new("B", "{target}", decode_branch, StaticBits::NONE),
    EntrySpec::new("BL", "{target}", decode_branch, StaticBits::new(&[("link", 1)])),
    EntrySpec::new("BX", "{rm}", decode_branch_exchange, StaticBits::NONE),
    EntrySpec::new("BLX", "{rm}", decode_branch_exchange, StaticBits::new(&[("link", 1)])),
    EntrySpec::new("CBZ", "{rn}, {target}", decode_compare_branch, StaticBits::NONE),
    EntrySpec::new(
        "CBNZ",
        "{rn}, {target}",
        decode_compare_branch,
        StaticBits::new(&[("nonzero", 1)]),
    ),
    EntrySpec::new("TBB", "[{rn}, {rm}]", decode_table_branch, StaticBits::NONE),
    EntrySpec::new(
        "TBH",
        "[{rn}, {rm}, {shift}]",
        decode_table_branch,
        StaticBits::new(&[("halfword", 1)]),
    ),
    EntrySpec::new("IT", "{cond}", decode_enter_block, StaticBits::NONE),
    EntrySpec::new("BKPT", "(#)?{imm}", decode_breakpoint, StaticBits::NONE),
    EntrySpec::new("BKPT", "", decode_breakpoint, StaticBits::NONE),
    EntrySpec::new("MRS", "{rd}, {psr}", decode_read_status, StaticBits::NONE),
    EntrySpec::new("MSR", "{psr}, {rn}", decode_write_status, StaticBits::NONE),
];
