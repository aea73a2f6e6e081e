//! Multiple-register transfers: `LDM`, `STM` and the stack forms.

use super::{boxed, not_pc, Decoded};
use crate::dispatch::{EntrySpec, Execute, Operands, StaticBits};
use crate::memory::{AccessSize, Memory};
use crate::{CoreState, ExecuteOutcome, Fault, Register, RegisterList, Word};

#[derive(Debug)]
struct Multiple {
    rn: Register,
    list: RegisterList,
    load: bool,
    decrement_before: bool,
    write_back: bool,
}

impl Multiple {
    /// Lowest address touched and the updated base.
    fn span(&self, base: u32) -> (u32, u32) {
        let bytes = self.list.len() * 4;
        if self.decrement_before {
            let start = base.wrapping_sub(bytes);
            (start, start)
        } else {
            (base, base.wrapping_add(bytes))
        }
    }

    fn load(&self, core: &mut CoreState, memory: &dyn Memory) -> Result<(), Fault> {
        let (start, updated) = self.span(core.read(self.rn).unsigned());
        let mut values = Vec::new();
        let mut address = start;
        for register in self.list.iter() {
            values.push((register, memory.read_unsigned(address, AccessSize::Word)?));
            address = address.wrapping_add(4);
        }
        // A base register that is also loaded keeps the loaded value.
        if self.write_back && !self.list.contains(self.rn) {
            core.write(self.rn, Word::new(updated));
        }
        for (register, value) in values {
            if register == Register::Pc {
                core.branch_to(value.unsigned());
            } else {
                core.write(register, value);
            }
        }
        Ok(())
    }

    fn store(&self, core: &mut CoreState, memory: &mut dyn Memory) -> Result<(), Fault> {
        let (start, updated) = self.span(core.read(self.rn).unsigned());
        let addresses = (0..self.list.len()).map(|slot| start.wrapping_add(4 * slot));
        for address in addresses.clone() {
            memory.read_unsigned(address, AccessSize::Word)?;
        }
        // Registers are read before write-back, so a listed base stores its
        // original value.
        for (address, register) in addresses.zip(self.list.iter()) {
            memory.write_unsigned(address, AccessSize::Word, core.read(register))?;
        }
        if self.write_back {
            core.write(self.rn, Word::new(updated));
        }
        Ok(())
    }
}

impl Execute for Multiple {
    fn execute(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        if self.load {
            self.load(core, memory)?;
        } else {
            self.store(core, memory)?;
        }
        Ok(ExecuteOutcome::Executed)
    }
}

fn check_list(list: RegisterList, load: bool) -> Result<(), Fault> {
    if list.is_empty() {
        return Err(Fault::invalid("empty register list"));
    }
    if list.contains(Register::Sp) {
        return Err(Fault::invalid("register list contains sp"));
    }
    if load && list.contains(Register::Lr) && list.contains(Register::Pc) {
        return Err(Fault::invalid("register list loads both lr and pc"));
    }
    if !load && list.contains(Register::Pc) {
        return Err(Fault::invalid("register list stores pc"));
    }
    Ok(())
}

fn decode_multiple(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let load = bits.flag("load");
    let list = operands.register_list()?;
    check_list(list, load)?;
    boxed(Multiple {
        rn: not_pc(operands.register("rn")?, "base")?,
        list,
        load,
        decrement_before: bits.flag("db"),
        write_back: bits.flag("wb"),
    })
}

fn decode_stack(operands: &Operands<'_>, bits: StaticBits) -> Decoded {
    let load = bits.flag("load");
    let list = operands.register_list()?;
    check_list(list, load)?;
    boxed(Multiple {
        rn: Register::Sp,
        list,
        load,
        decrement_before: !load,
        write_back: true,
    })
}

const WRITE_BACK: &str = "{rn}!, {reglist}";
const NO_WRITE_BACK: &str = "{rn}, {reglist}";

pub(super) const ENTRIES: &[EntrySpec] = &[
    EntrySpec::new("LDM", WRITE_BACK, decode_multiple, StaticBits::new(&[("load", 1), ("wb", 1)])),
    EntrySpec::new("LDM", NO_WRITE_BACK, decode_multiple, StaticBits::new(&[("load", 1)])),
    EntrySpec::new(
        "LDMDB",
        WRITE_BACK,
        decode_multiple,
        StaticBits::new(&[("load", 1), ("db", 1), ("wb", 1)]),
    ),
    EntrySpec::new(
        "LDMDB",
        NO_WRITE_BACK,
        decode_multiple,
        StaticBits::new(&[("load", 1), ("db", 1)]),
    ),
    EntrySpec::new("STM", WRITE_BACK, decode_multiple, StaticBits::new(&[("wb", 1)])),
    EntrySpec::new("STM", NO_WRITE_BACK, decode_multiple, StaticBits::NONE),
    EntrySpec::new("STMDB", WRITE_BACK, decode_multiple, StaticBits::new(&[("db", 1), ("wb", 1)])),
    EntrySpec::new("STMDB", NO_WRITE_BACK, decode_multiple, StaticBits::new(&[("db", 1)])),
    EntrySpec::new("PUSH", "{reglist}", decode_stack, StaticBits::NONE),
    EntrySpec::new("POP", "{reglist}", decode_stack, StaticBits::new(&[("load", 1)])),
];

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::handlers::testing::{core, decode, run};
    use crate::memory::{AccessSize, Memory, SparseMemory};
    use crate::{Register, Word};

    const STACK_TOP: u32 = 0x2000_1000;

    fn stack() -> SparseMemory {
        let mut memory = SparseMemory::new();
        memory.map_zeroed(STACK_TOP - 0x100, 0x100);
        memory
    }

    #[test]
    fn push_then_pop_round_trips_through_the_stack() {
        let mut core = core();
        let mut memory = stack();
        core.write(Register::R4, Word::new(4));
        core.write(Register::R5, Word::new(5));
        core.write(Register::Lr, Word::new(0x8101));
        run(&mut core, &mut memory, "push", "{r4, r5, lr}").expect("executes");
        assert_eq!(core.registers.sp(), STACK_TOP - 12);
        assert_eq!(
            memory.read_unsigned(STACK_TOP - 12, AccessSize::Word),
            Ok(Word::new(4))
        );
        assert_eq!(
            memory.read_unsigned(STACK_TOP - 4, AccessSize::Word),
            Ok(Word::new(0x8101))
        );

        core.write(Register::R4, Word::ZERO);
        core.write(Register::R5, Word::ZERO);
        run(&mut core, &mut memory, "pop", "{r4, r5, pc}").expect("executes");
        assert_eq!(core.registers.sp(), STACK_TOP);
        assert_eq!(core.read(Register::R4), Word::new(4));
        assert_eq!(core.read(Register::R5), Word::new(5));
        assert_eq!(core.registers.pc(), 0x8100);
        assert!(core.registers.pc_written());
    }

    #[test]
    fn ldm_and_stm_addressing_modes() {
        let mut core = core();
        let mut memory = stack();
        let base = STACK_TOP - 0x40;
        core.write(Register::R0, Word::new(base));
        core.write(Register::R1, Word::new(0x11));
        core.write(Register::R2, Word::new(0x22));
        run(&mut core, &mut memory, "stmia", "r0!, {r1, r2}").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(base + 8));

        run(&mut core, &mut memory, "ldmdb", "r0, {r3, r4}").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(base + 8));
        assert_eq!(core.read(Register::R3), Word::new(0x11));
        assert_eq!(core.read(Register::R4), Word::new(0x22));

        run(&mut core, &mut memory, "stmdb", "r0!, {r3}").expect("executes");
        assert_eq!(core.read(Register::R0), Word::new(base + 4));
        assert_eq!(memory.read_unsigned(base + 4, AccessSize::Word), Ok(Word::new(0x11)));
    }

    #[test]
    fn base_in_list_follows_the_documented_choice() {
        let mut core = core();
        let mut memory = stack();
        let base = STACK_TOP - 0x40;
        core.write(Register::R0, Word::new(base));
        core.write(Register::R1, Word::new(0x99));
        run(&mut core, &mut memory, "stm", "r0!, {r0, r1}").expect("executes");
        assert_eq!(memory.read_unsigned(base, AccessSize::Word), Ok(Word::new(base)));
        assert_eq!(core.read(Register::R0), Word::new(base + 8));

        core.write(Register::R1, Word::new(base));
        memory
            .write_unsigned(base, AccessSize::Word, Word::new(0x1234))
            .expect("mapped");
        run(&mut core, &mut memory, "ldm", "r1!, {r1, r2}").expect("executes");
        assert_eq!(core.read(Register::R1), Word::new(0x1234));
    }

    #[test]
    fn faulting_store_writes_nothing() {
        let mut core = core();
        let mut memory = stack();
        core.write(Register::R0, Word::new(STACK_TOP - 4));
        core.write(Register::R1, Word::new(0x55));
        assert!(run(&mut core, &mut memory, "stm", "r0!, {r1, r2}").is_err());
        assert_eq!(
            memory.read_unsigned(STACK_TOP - 4, AccessSize::Word),
            Ok(Word::ZERO)
        );
        assert_eq!(core.read(Register::R0), Word::new(STACK_TOP - 4));
    }

    #[rstest]
    #[case("push", "{}")]
    #[case("push", "{r4, sp}")]
    #[case("push", "{r4, pc}")]
    #[case("pop", "{r4, lr, pc}")]
    #[case("ldm", "r0!, {r1, sp}")]
    #[case("stm", "r0, {r1, pc}")]
    #[case("ldm", "pc, {r1}")]
    fn invalid_lists_are_rejected(#[case] mnemonic: &str, #[case] operands: &str) {
        assert!(decode(mnemonic, operands).is_err(), "{mnemonic} {operands}");
    }
}
