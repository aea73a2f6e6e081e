//! Packed byte and halfword arithmetic, and `SEL`.

use super::{boxed, general, Decoded};
use crate::alu::{packed_add_sub, packed_select, LaneMode, LaneOp, Lanes};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::Memory;
use crate::{CoreState, ExecuteOutcome, Fault, Register};

#[derive(Debug)]
struct Packed {
    rd: Register,
    rn: Register,
    rm: Register,
    lanes: Lanes,
    op: LaneOp,
    mode: LaneMode,
}

impl Execute for Packed {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let result = packed_add_sub(
            core.read(self.rn),
            core.read(self.rm),
            self.lanes,
            self.op,
            self.mode,
        );
        core.write(self.rd, result.value);
        if let Some(ge) = result.ge {
            core.status.set_ge(ge);
        }
        core.status.or_saturation(result.saturated);
        Ok(ExecuteOutcome::Executed)
    }
}

fn operand_registers(operands: &Operands<'_>) -> Result<(Register, Register, Register), Fault> {
    let rd = general(operands.register("rd")?, "destination")?;
    let rn = general(operands.opt_register("rn")?.unwrap_or(rd), "first operand")?;
    let rm = general(operands.register("rm")?, "second operand")?;
    Ok((rd, rn, rm))
}

fn decode_packed(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let lanes = match bits.get("lanes") {
        Some(0) => Lanes::Halfwords,
        Some(1) => Lanes::Bytes,
        other => return Err(Fault::invalid(format!("lane split {other:?}"))),
    };
    let op = match bits.get("op") {
        Some(0) => LaneOp::Add,
        Some(1) => LaneOp::Subtract,
        Some(2) => LaneOp::AddSubtractExchange,
        Some(3) => LaneOp::SubtractAddExchange,
        other => return Err(Fault::invalid(format!("lane op {other:?}"))),
    };
    let mode = match bits.get("mode") {
        Some(0) => LaneMode::Signed,
        Some(1) => LaneMode::Unsigned,
        Some(2) => LaneMode::SignedSaturating,
        Some(3) => LaneMode::UnsignedSaturating,
        Some(4) => LaneMode::SignedHalving,
        Some(5) => LaneMode::UnsignedHalving,
        other => return Err(Fault::invalid(format!("lane mode {other:?}"))),
    };
    let (rd, rn, rm) = operand_registers(operands)?;
    boxed(Packed {
        rd,
        rn,
        rm,
        lanes,
        op,
        mode,
    })
}

#[derive(Debug)]
struct Select {
    rd: Register,
    rn: Register,
    rm: Register,
}

impl Execute for Select {
    fn execute(&self, core: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        let value = packed_select(core.read(self.rn), core.read(self.rm), core.status.ge());
        core.write(self.rd, value);
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_select(operands: &Operands<'_>, _: StaticBits) -> Decoded {
    let (rd, rn, rm) = operand_registers(operands)?;
    boxed(Select { rd, rn, rm })
}

const THREE_REG: &str = "{rd}, {rn}, {rm}";
const TWO_REG: &str = "{rd}, {rm}";

/// Expands `MNEMONIC => lanes, op, mode;` rows into a three-register entry
/// followed by the `Rd, Rm` shorthand.
///
/// lanes: 0 halfwords, 1 bytes. op: 0 add, 1 subtract, 2 ASX, 3 SAX.
/// mode: 0 signed, 1 unsigned, 2/3 saturating, 4/5 halving.
macro_rules! packed_entries {
    ($($mnemonic:literal => $lanes:literal, $op:literal, $mode:literal;)*) => {
        &[
            $(
                EntrySpec::new(
                    $mnemonic,
                    THREE_REG,
                    decode_packed,
                    StaticBits::new(&[("lanes", $lanes), ("op", $op), ("mode", $mode)]),
                ),
                EntrySpec::new(
                    $mnemonic,
                    TWO_REG,
                    decode_packed,
                    StaticBits::new(&[("lanes", $lanes), ("op", $op), ("mode", $mode)]),
                ),
            )*
            EntrySpec::new("SEL", THREE_REG, decode_select, StaticBits::NONE),
        ]
    };
}

pub(super) const ENTRIES: &[EntrySpec] = packed_entries! {
    "SADD16" => 0, 0, 0;
    "SSUB16" => 0, 1, 0;
    "SASX" => 0, 2, 0;
    "SSAX" => 0, 3, 0;
    "SADD8" => 1, 0, 0;
    "SSUB8" => 1, 1, 0;
    "UADD16" => 0, 0, 1;
    "USUB16" => 0, 1, 1;
    "UASX" => 0, 2, 1;
    "USAX" => 0, 3, 1;
    "UADD8" => 1, 0, 1;
    "USUB8" => 1, 1, 1;
    "QADD16" => 0, 0, 2;
    "QSUB16" => 0, 1, 2;
    "QADD8" => 1, 0, 2;
    "QSUB8" => 1, 1, 2;
    "UQADD16" => 0, 0, 3;
    "UQSUB16" => 0, 1, 3;
    "UQADD8" => 1, 0, 3;
    "UQSUB8" => 1, 1, 3;
    "SHADD16" => 0, 0, 4;
    "SHSUB16" => 0, 1, 4;
    "SHADD8" => 1, 0, 4;
    "SHSUB8" => 1, 1, 4;
    "UHADD16" => 0, 0, 5;
    "UHSUB16" => 0, 1, 5;
    "UHADD8" => 1, 0, 5;
    "UHSUB8" => 1, 1, 5;
};
