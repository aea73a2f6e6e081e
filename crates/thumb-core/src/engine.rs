//! The execution engine: resolve, execute and advance.
//!
//! An [`Engine`] owns one core's registers and flags and borrows memory per
//! call. The embedding driver runs each listed instruction as
//! `resolve` → `execute` → `advance(step_size)`, or uses [`Engine::step`].

use tracing::{debug, trace, warn};

use crate::dispatch::{InstructionRegistry, ResolvedInstruction};
use crate::memory::Memory;
use crate::{
    Condition, CoreState, EngineConfig, ExecuteOutcome, ExecutionCounters, Fault, Register, Word,
};

/// One simulated core bound to an instruction registry.
#[derive(Debug)]
pub struct Engine {
    registry: &'static InstructionRegistry,
    core: CoreState,
    counters: Option<ExecutionCounters>,
}

impl Engine {
    /// Creates an engine over the standard instruction set.
    ///
    /// # Errors
    ///
    /// Returns the fault raised while building the standard registry.
    pub fn new(config: &EngineConfig) -> Result<Self, Fault> {
        Ok(Self::with_registry(config, InstructionRegistry::standard()?))
    }

    /// Creates an engine over a caller-supplied registry.
    #[must_use]
    pub fn with_registry(config: &EngineConfig, registry: &'static InstructionRegistry) -> Self {
        Self {
            registry,
            core: CoreState::new(config.initial_pc, config.initial_sp),
            counters: config.collect_counters.then(ExecutionCounters::new),
        }
    }

    /// The registry instructions are resolved against.
    #[must_use]
    pub const fn registry(&self) -> &'static InstructionRegistry {
        self.registry
    }

    /// Registers and flags.
    #[must_use]
    pub const fn core(&self) -> &CoreState {
        &self.core
    }

    /// Mutable registers and flags, for drivers that seed state.
    pub fn core_mut(&mut self) -> &mut CoreState {
        &mut self.core
    }

    /// Reads a register with the usual `PC` read-ahead.
    #[must_use]
    pub const fn read(&self, register: Register) -> Word {
        self.core.read(register)
    }

    /// Writes a register.
    pub fn write(&mut self, register: Register, value: Word) {
        self.core.write(register, value);
    }

    /// Address of the next instruction to execute.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.core.registers.pc()
    }

    /// Execution counters, when enabled.
    #[must_use]
    pub const fn counters(&self) -> Option<&ExecutionCounters> {
        self.counters.as_ref()
    }

    /// Resolves listing text into a decoded instruction bound to `address`.
    ///
    /// # Errors
    ///
    /// See [`InstructionRegistry::resolve`].
    pub fn resolve(
        &mut self,
        mnemonic: &str,
        operands: &str,
        address: u32,
    ) -> Result<ResolvedInstruction, Fault> {
        trace!(mnemonic, operands, address, "resolve");
        self.registry
            .resolve(mnemonic, operands, address)
            .map_err(|fault| self.surface(fault, address))
    }

    /// Executes a resolved instruction at the live program counter.
    ///
    /// The instruction's own condition suffix takes precedence over the
    /// active conditional block. A failing condition yields
    /// [`ExecuteOutcome::Skipped`] with no architectural effect.
    ///
    /// # Errors
    ///
    /// - [`Fault::ProgramCounterMismatch`] when the instruction was resolved
    ///   for a different address than the live `PC`.
    /// - Any fault raised by the instruction itself.
    ///
    /// A `PC` write mark left over from outside this step (a seeded `PC`, a
    /// faulted step) is discarded before the instruction runs.
    pub fn execute(
        &mut self,
        instruction: &ResolvedInstruction,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        // Only writes made by this instruction may steer the next advance.
        if self.core.registers.take_pc_written() {
            trace!(pc = self.core.registers.pc(), "stale pc write mark dropped");
        }
        let pc = self.core.registers.pc();
        if instruction.address() != pc {
            let fault = Fault::ProgramCounterMismatch {
                expected: instruction.address(),
                actual: pc,
            };
            return Err(self.surface(fault, pc));
        }

        if let Some(condition) = self.guarding_condition(instruction) {
            if !condition.passed(&self.core.status) {
                debug!(pc, entry = instruction.entry(), %condition, "condition failed, skipped");
                if let Some(counters) = self.counters.as_mut() {
                    counters.record_skipped();
                }
                return Ok(ExecuteOutcome::Skipped);
            }
        }

        match instruction.run(&mut self.core, memory) {
            Ok(outcome) => {
                trace!(pc, entry = instruction.entry(), ?outcome, "executed");
                if let Some(counters) = self.counters.as_mut() {
                    counters.record_executed(instruction.entry());
                }
                Ok(outcome)
            }
            Err(fault) => Err(self.surface(fault, pc)),
        }
    }

    /// Moves to the next instruction.
    ///
    /// Without an explicit `PC` write this step, `PC` moves on by
    /// `step_size` (2 or 4) and the conditional block retires one
    /// instruction. After an explicit write, the write mark is consumed and
    /// the block is dropped.
    pub fn advance(&mut self, step_size: u32) {
        if self.core.registers.take_pc_written() {
            if self.core.status.it().is_active() {
                debug!(pc = self.core.registers.pc(), "pc write leaves conditional block");
            }
            self.core.status.it_mut().clear();
        } else {
            self.core.registers.step_pc(step_size);
            self.core.status.it_mut().retire();
        }
    }

    /// Resolves, executes and advances one instruction at the live `PC`.
    ///
    /// `PC` is left on the instruction that ends execution.
    ///
    /// # Errors
    ///
    /// Propagates resolve and execute faults; the state is not advanced.
    pub fn step(
        &mut self,
        mnemonic: &str,
        operands: &str,
        step_size: u32,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        let instruction = self.resolve(mnemonic, operands, self.pc())?;
        let outcome = self.execute(&instruction, memory)?;
        if !outcome.is_end() {
            self.advance(step_size);
        }
        Ok(outcome)
    }

    fn guarding_condition(&self, instruction: &ResolvedInstruction) -> Option<Condition> {
        instruction.condition().or_else(|| {
            let it = self.core.status.it();
            if it.is_active() && !it.is_entering() {
                it.current_condition()
            } else {
                None
            }
        })
    }

    fn surface(&mut self, fault: Fault, pc: u32) -> Fault {
        warn!(pc, class = ?fault.class(), %fault, "fault");
        if let Some(counters) = self.counters.as_mut() {
            counters.record_fault(&fault, pc);
        }
        fault
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::memory::SparseMemory;
    use crate::{EngineConfig, ExecuteOutcome, Fault, Register, Word};

    fn engine() -> Engine {
        Engine::new(&EngineConfig {
            collect_counters: true,
            ..EngineConfig::default()
        })
        .expect("standard registry")
    }

    #[test]
    fn construction_clears_bit_zero_of_pc() {
        let engine = Engine::new(&EngineConfig {
            initial_pc: 0x8001,
            ..EngineConfig::default()
        })
        .expect("standard registry");
        assert_eq!(engine.pc(), 0x8000);
        assert!(engine.counters().is_none());
    }

    #[test]
    fn step_advances_by_encoding_width() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        engine.step("movs", "r0, #1", 2, &mut memory).expect("step");
        engine.step("add.w", "r0, r0, #0x100", 4, &mut memory).expect("step");
        assert_eq!(engine.pc(), 0x8006);
        assert_eq!(engine.read(Register::R0), Word::new(0x101));
    }

    #[test]
    fn resolving_ahead_of_pc_is_a_sequencing_fault() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        let ahead = engine.resolve("movs", "r0, #1", 0x8002).expect("resolves");
        assert_eq!(
            engine.execute(&ahead, &mut memory),
            Err(Fault::ProgramCounterMismatch {
                expected: 0x8002,
                actual: 0x8000
            })
        );
        let counters = engine.counters().expect("enabled");
        assert_eq!(counters.fault_count_sequencing, 1);
        assert_eq!(counters.last_fault_pc, Some(0x8000));
    }

    #[test]
    fn explicit_condition_skips_without_effect_but_still_advances() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        let outcome = engine.step("moveq", "r0, #7", 4, &mut memory).expect("step");
        assert_eq!(outcome, ExecuteOutcome::Skipped);
        assert_eq!(engine.read(Register::R0), Word::ZERO);
        assert_eq!(engine.pc(), 0x8004);
        assert_eq!(engine.counters().map(|c| c.skipped), Some(1));
    }

    #[test]
    fn branch_suppresses_sequential_increment() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        engine.step("b.n", "8020 <done>", 2, &mut memory).expect("step");
        assert_eq!(engine.pc(), 0x8020);
        assert!(!engine.core().registers.pc_written());
    }

    #[test]
    fn seeded_pc_does_not_suppress_the_first_advance() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        engine.write(Register::Pc, Word::new(0x9000));
        engine.step("movs", "r0, #1", 2, &mut memory).expect("step");
        assert_eq!(engine.pc(), 0x9002);

        engine.core_mut().status.zero = true;
        engine.step("it", "eq", 2, &mut memory).expect("step");
        engine.write(Register::Pc, Word::new(0x9004));
        engine.step("moveq", "r1, #5", 2, &mut memory).expect("step");
        assert_eq!(engine.pc(), 0x9006);
        assert_eq!(engine.read(Register::R1), Word::new(5));
        assert!(!engine.core().status.it().is_active());
    }

    #[test]
    fn end_of_execution_leaves_pc_on_the_breakpoint() {
        let mut engine = engine();
        let mut memory = SparseMemory::new();
        engine.step("movs", "r0, #42", 2, &mut memory).expect("step");
        let outcome = engine.step("bkpt", "0x00ab", 2, &mut memory).expect("step");
        assert_eq!(
            outcome,
            ExecuteOutcome::EndOfExecution {
                status: Word::new(42)
            }
        );
        assert_eq!(engine.pc(), 0x8002);
    }

    #[test]
    fn unmanaged_mnemonic_is_counted() {
        let mut engine = engine();
        assert!(matches!(
            engine.resolve("svc", "0", 0x8000),
            Err(Fault::UnmanagedInstruction { .. })
        ));
        assert_eq!(
            engine.counters().map(|c| c.fault_count_unmanaged),
            Some(1)
        );
    }
}
