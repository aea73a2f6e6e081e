//! Resolution against the standard registry: repair, ordering and faults.

use regex as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

use proptest::prelude::*;
use thumb_core::{
    Condition, CoreState, EntrySpec, Execute, ExecuteOutcome, Fault, InstructionRegistry, Memory,
    Operands, SparseMemory, StaticBits, Word,
};

fn standard() -> &'static InstructionRegistry {
    InstructionRegistry::standard().expect("standard registry builds")
}

#[test]
fn first_matching_entry_wins() {
    let resolved = standard().resolve("mov", "r0, r1", 0x8000).expect("resolves");
    assert_eq!(resolved.entry(), "MOV {rd}, {rm}");
    assert_eq!(resolved.mnemonic(), "MOV");
    assert_eq!(resolved.address(), 0x8000);
    assert_eq!(resolved.condition(), None);
}

#[test]
fn suffix_repair_carries_the_condition() {
    let resolved = standard()
        .resolve("addeq.w", "r0, r0, #1", 0x8000)
        .expect("resolves");
    assert_eq!(resolved.mnemonic(), "ADD");
    assert_eq!(resolved.condition(), Some(Condition::Eq));

    let loads = standard()
        .resolve("ldmia.w", "sp!, {r4, r5}", 0x8000)
        .expect("resolves");
    assert_eq!(loads.mnemonic(), "LDM");
}

#[test]
fn hints_resolve_to_no_ops() {
    let mut core = CoreState::new(0x8000, 0x2000_1000);
    let before = core.clone();
    let mut memory = SparseMemory::new();
    for (mnemonic, operands) in [("nop", ""), ("dmb", "sy"), ("wfi", ""), ("cpsid", "i")] {
        let resolved = standard()
            .resolve(mnemonic, operands, 0x8000)
            .expect("hint resolves");
        assert_eq!(resolved.run(&mut core, &mut memory), Ok(ExecuteOutcome::Executed));
    }
    assert_eq!(core, before);
}

#[test]
fn unknown_mnemonics_and_operand_forms_are_distinguished() {
    assert_eq!(
        standard().resolve("vadd.f32", "s0, s1, s2", 0x8000).err(),
        Some(Fault::UnmanagedInstruction {
            mnemonic: "VADD.F32".into()
        })
    );
    assert!(matches!(
        standard().resolve("add", "r0, [r1]", 0x8000),
        Err(Fault::NoMatchingPattern { .. })
    ));
}

#[test]
fn every_family_is_registered() {
    let registry = standard();
    for mnemonic in [
        "ADD", "ADDS", "MOV", "CMP", "LSL", "MUL", "UMULL", "SDIV", "SSAT", "QADD", "UADD8",
        "SEL", "BFI", "UBFX", "CLZ", "UXTB", "SXTAH", "LDR", "STRD", "LDM", "PUSH", "POP", "B",
        "BL", "BX", "CBZ", "TBB", "IT", "BKPT", "MRS", "MSR",
    ] {
        assert!(registry.contains(mnemonic), "{mnemonic} is missing");
    }
    assert!(registry.len() > registry.mnemonics().count());
}

#[derive(Debug)]
struct LoadConstant(u32);

impl Execute for LoadConstant {
    fn execute(
        &self,
        core: &mut CoreState,
        _: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        core.write(thumb_core::Register::R0, Word::new(self.0));
        Ok(ExecuteOutcome::Executed)
    }
}

fn decode_constant(
    operands: &Operands<'_>,
    bits: StaticBits,
) -> Result<Box<dyn Execute>, Fault> {
    let value = operands.bounded("imm", 0..=0xFFFF, "constant")?;
    Ok(Box::new(LoadConstant(value | bits.get("tag").unwrap_or(0))))
}

const CUSTOM: &[EntrySpec] = &[
    EntrySpec::new(
        "LDK",
        "#{imm}",
        decode_constant,
        StaticBits::new(&[("tag", 0x1_0000)]),
    ),
    EntrySpec::new("LDK", "{rd}, #{imm}", decode_constant, StaticBits::NONE),
];

#[test]
fn custom_registries_resolve_their_own_entries() {
    let registry = InstructionRegistry::from_specs([CUSTOM]).expect("valid templates");
    let mut core = CoreState::new(0x100, 0x200);
    let mut memory = SparseMemory::new();
    registry
        .resolve("ldk", "#0x12", 0x100)
        .and_then(|resolved| resolved.run(&mut core, &mut memory))
        .expect("runs");
    assert_eq!(core.read(thumb_core::Register::R0), Word::new(0x1_0012));
    assert!(matches!(
        registry.resolve("mov", "r0, r1", 0x100),
        Err(Fault::UnmanagedInstruction { .. })
    ));
}

proptest! {
    #[test]
    fn immediate_moves_round_trip(value in 0_u32..=0xFFFF, low in 0_u8..8) {
        let mut core = CoreState::new(0x8000, 0x2000_1000);
        let mut memory = SparseMemory::new();
        let resolved = standard()
            .resolve("movw", &format!("r{low}, #{value}"), 0x8000)
            .expect("resolves");
        resolved.run(&mut core, &mut memory).expect("runs");
        let register = thumb_core::Register::from_index(low).expect("low register");
        prop_assert_eq!(core.read(register), Word::new(value));
    }

    #[test]
    fn subtraction_against_itself_sets_zero_and_carry(value: u32) {
        let mut core = CoreState::new(0x8000, 0x2000_1000);
        let mut memory = SparseMemory::new();
        core.write(thumb_core::Register::R2, Word::new(value));
        standard()
            .resolve("cmp", "r2, r2", 0x8000)
            .and_then(|resolved| resolved.run(&mut core, &mut memory))
            .expect("runs");
        prop_assert!(core.status.zero);
        prop_assert!(core.status.carry);
        prop_assert!(!core.status.overflow);
    }
}
