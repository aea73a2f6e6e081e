//! Single and dual register loads and stores.

use std::ops::RangeInclusive;

use super::{boxed, general, not_pc, Decoded};
use crate::alu::ShiftKind;
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::{AccessSize, Memory};
use crate::state::PC_READ_AHEAD;
use crate::{CoreState, ExecuteOutcome, Fault, Register, Word};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Indexing {
    /// `[Rn, #imm]`: no write-back.
    Offset,
    /// `[Rn, #imm]!`
    PreIndex,
    /// `[Rn], #imm`
    PostIndex,
}

impl Indexing {
    fn from_bits(bits: StaticBits) -> Self {
        match bits.get("index") {
            Some(1) => Self::PreIndex,
            Some(2) => Self::PostIndex,
            _ => Self::Offset,
        }
    }

    const fn writes_back(self) -> bool {
        !matches!(self, Self::Offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Offset {
    Immediate(i32),
    Register { rm: Register, shift: u32 },
}

/// Base register, offset and indexing mode of one access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Addressing {
    rn: Register,
    offset: Offset,
    indexing: Indexing,
}

impl Addressing {
    fn decode(
        operands: &Operands<'_>,
        bits: StaticBits,
        range: RangeInclusive<i64>,
    ) -> Result<Self, Fault> {
        let indexing = Indexing::from_bits(bits);
        if operands.has("target") {
            let base = operands.address().wrapping_add(PC_READ_AHEAD) & !3;
            let offset = i64::from(operands.target()?) - i64::from(base);
            return Ok(Self {
                rn: Register::Pc,
                offset: Offset::Immediate(literal_offset(offset)?),
                indexing: Indexing::Offset,
            });
        }
        let rn = operands.register("rn")?;
        if indexing.writes_back() {
            not_pc(rn, "write-back base")?;
        }
        let offset = if operands.has("rm") {
            let shift = match operands.shift()? {
                None => 0,
                Some((ShiftKind::Lsl, amount @ 0..=3)) => amount,
                Some((kind, amount)) => {
                    return Err(Fault::invalid(format!(
                        "register offset shift must be lsl #0..3, got {kind} #{amount}"
                    )))
                }
            };
            Offset::Register {
                rm: general(operands.register("rm")?, "offset register")?,
                shift,
            }
        } else {
            let range = if rn == Register::Pc { -4095..=4095 } else { range };
            let value = operands.immediate_or("imm", 0)?;
            if !range.contains(&value) {
                return Err(Fault::invalid(format!(
                    "offset {value} outside {}..={}",
                    range.start(),
                    range.end()
                )));
            }
            Offset::Immediate(literal_offset(value)?)
        };
        Ok(Self {
            rn,
            offset,
            indexing,
        })
    }

    /// Returns `(access address, write-back value)`.
    #[allow(clippy::cast_sign_loss)]
    fn resolve(&self, core: &CoreState) -> (u32, u32) {
        let base = if self.rn == Register::Pc {
            core.aligned_pc()
        } else {
            core.read(self.rn).unsigned()
        };
        let offset = match self.offset {
            Offset::Immediate(value) => value as u32,
            Offset::Register { rm, shift } => core.read(rm).unsigned() << shift,
        };
        let offset_address = base.wrapping_add(offset);
        match self.indexing {
            Indexing::PostIndex => (base, offset_address),
            Indexing::Offset | Indexing::PreIndex => (offset_address, offset_address),
        }
    }

    fn write_back(&self, core: &mut CoreState, value: u32) {
        if self.indexing.writes_back() {
            core.write(self.rn, Word::new(value));
        }
    }
}

fn literal_offset(value: i64) -> Result<i32, Fault> {
    i32::try_from(value).map_err(|_| Fault::invalid(format!("offset {value} out of range")))
}

fn access_size(bits: StaticBits) -> AccessSize {
    match bits.get("size") {
        Some(1) => AccessSize::Byte,
        Some(2) => AccessSize::Halfword,
        _ => AccessSize::Word,
    }
}

#[derive(Debug)]
struct Load {
    rt: Register,
    addressing: Addressing,
    size: AccessSize,
    signed: bool,
}

impl Execute for Load {
    fn execute(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        let (address, updated) = self.addressing.resolve(core);
        let value = if self.signed {
            memory.read_signed(address, self.size)?
        } else {
            memory.read_unsigned(address, self.size)?
        };
        self.addressing.write_back(core, updated);
        if self.rt == Register::Pc {
            core.branch_to(value.unsigned());
        } else {
            core.write(self.rt, value);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

#[derive(Debug)]
struct Store {
    rt: Register,
    addressing: Addressing,
    size: AccessSize,
}

impl Execute for Store {
    fn execute(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        let (address, updated) = self.addressing.resolve(core);
        memory.write_unsigned(address, self.size, core.read(self.rt))?;
        self.addressing.write_back(core, updated);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_single(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let size = access_size(bits);
    let load = bits.flag("load");
    let range = if Indexing::from_bits(bits).writes_back() {
        -255..=255
    } else {
        -255..=4095
    };
    let addressing = Addressing::decode(operands, bits, range)?;
    let rt = operands.register("rt")?;
    let rt = match (load, size) {
        (true, AccessSize::Word) => rt,
        (false, AccessSize::Word) => not_pc(rt, "stored register")?,
        _ => general(rt, "transfer register")?,
    };
    if addressing.indexing.writes_back() && rt == addressing.rn {
        return Err(Fault::invalid("write-back base equals the transfer register"));
    }
    if !load && addressing.rn == Register::Pc {
        return Err(Fault::invalid("stores cannot address relative to pc"));
    }
    if load {
        boxed(Load {
            rt,
            addressing,
            size,
            signed: bits.flag("signed"),
        })
    } else {
        boxed(Store {
            rt,
            addressing,
            size,
        })
    }
}

/// `LDRD`/`STRD`: two words at consecutive addresses.
#[derive(Debug)]
struct Dual {
    rt: Register,
    rt2: Register,
    addressing: Addressing,
    load: bool,
}

impl Execute for Dual {
    fn execute(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        let (address, updated) = self.addressing.resolve(core);
        let second = address.wrapping_add(4);
        if self.load {
            let first_word = memory.read_unsigned(address, AccessSize::Word)?;
            let second_word = memory.read_unsigned(second, AccessSize::Word)?;
            self.addressing.write_back(core, updated);
            core.write(self.rt, first_word);
            core.write(self.rt2, second_word);
        } else {
            // Probe the second word first so a fault leaves memory untouched.
            memory.read_unsigned(second, AccessSize::Word)?;
            memory.write_unsigned(address, AccessSize::Word, core.read(self.rt))?;
            memory.write_unsigned(second, AccessSize::Word, core.read(self.rt2))?;
            self.addressing.write_back(core, updated);
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_dual(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let load = bits.flag("load");
    let addressing = Addressing::decode(operands, bits, -1020..=1020)?;
    if let Offset::Immediate(offset) = addressing.offset {
        if offset % 4 != 0 {
            return Err(Fault::invalid(format!("dual offset {offset} is not a multiple of 4")));
        }
    }
    let rt = general(operands.register("rt")?, "first transfer register")?;
    let rt2 = general(operands.register("rt2")?, "second transfer register")?;
    if load && rt == rt2 {
        return Err(Fault::invalid("LDRD destinations must differ"));
    }
    if addressing.indexing.writes_back() && (rt == addressing.rn || rt2 == addressing.rn) {
        return Err(Fault::invalid("write-back base equals a transfer register"));
    }
    if !load && addressing.rn == Register::Pc {
        return Err(Fault::invalid("stores cannot address relative to pc"));
    }
    boxed(Dual {
        rt,
        rt2,
        addressing,
        load,
    })
}

/// Registers the five addressing forms of one single-register transfer.
macro_rules! single_forms {
    ($mnemonic:literal, [$($bit:expr),*]) => {
        [
            EntrySpec::new(
                $mnemonic,
                "{rt}, [{rn}, #{imm}]!",
                decode_single,
                StaticBits::new(&[$($bit,)* ("index", 1)]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, [{rn}], #{imm}",
                decode_single,
                StaticBits::new(&[$($bit,)* ("index", 2)]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, [{rn}, {rm}(, {shift})?]",
                decode_single,
                StaticBits::new(&[$($bit),*]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, [{rn}(, #{imm})?]",
                decode_single,
                StaticBits::new(&[$($bit),*]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, {target}",
                decode_single,
                StaticBits::new(&[$($bit),*]),
            ),
        ]
    };
}

macro_rules! dual_forms {
    ($mnemonic:literal, [$($bit:expr),*]) => {
        [
            EntrySpec::new(
                $mnemonic,
                "{rt}, {rt2}, [{rn}, #{imm}]!",
                decode_dual,
                StaticBits::new(&[$($bit,)* ("index", 1)]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, {rt2}, [{rn}], #{imm}",
                decode_dual,
                StaticBits::new(&[$($bit,)* ("index", 2)]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, {rt2}, [{rn}(, #{imm})?]",
                decode_dual,
                StaticBits::new(&[$($bit),*]),
            ),
            EntrySpec::new(
                $mnemonic,
                "{rt}, {rt2}, {target}",
                decode_dual,
                StaticBits::new(&[$($bit),*]),
            ),
        ]
    };
}

const LDR: [EntrySpec; 5] = single_forms!("LDR", [("load", 1)]);
const LDRB: [EntrySpec; 5] = single_forms!("LDRB", [("load", 1), ("size", 1)]);
const LDRH: [EntrySpec; 5] = single_forms!("LDRH", [("load", 1), ("size", 2)]);
const LDRSB: [EntrySpec; 5] = single_forms!("LDRSB", [("load", 1), ("size", 1), ("signed", 1)]);
const LDRSH: [EntrySpec; 5] = single_forms!("LDRSH", [("load", 1), ("size", 2), ("signed", 1)]);
const STR: [EntrySpec; 5] = single_forms!("STR", []);
const STRB: [EntrySpec; 5] = single_forms!("STRB", [("size", 1)]);
const STRH: [EntrySpec; 5] = single_forms!("STRH", [("size", 2)]);
const LDRD: [EntrySpec; 4] = dual_forms!("LDRD", [("load", 1)]);
const STRD: [EntrySpec; 4] = dual_forms!("STRD", []);

pub(super) const ENTRIES: &[EntrySpec] = &[
    LDR[0], LDR[1], LDR[2], LDR[3], LDR[4],
    LDRB[0], LDRB[1], LDRB[2], LDRB[3], LDRB[4],
    LDRH[0], LDRH[1], LDRH[2], LDRH[3], LDRH[4],
    LDRSB[0], LDRSB[1], LDRSB[2], LDRSB[3], LDRSB[4],
    LDRSH[0], LDRSH[1], LDRSH[2], LDRSH[3], LDRSH[4],
    STR[0], STR[1], STR[2], STR[3], STR[4],
    STRB[0], STRB[1], STRB[2], STRB[3], STRB[4],
    STRH[0], STRH[1], STRH[2], STRH[3], STRH[4],
    LDRD[0], LDRD[1], LDRD[2], LDRD[3],
    STRD[0], STRD[1], STRD[2], STRD[3],
];
