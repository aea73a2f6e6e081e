//! Instruction registry and dispatcher.
//!
//! A mnemonic maps to an ordered list of entries. Resolution picks the first
//! entry whose pattern matches the whole operand text and runs its decoder
//! once; the decoded instruction can then be executed any number of times.

/// Operand accessors handed to decoders.
pub mod operands;
/// Template to regex expansion.
pub mod pattern;
/// Mnemonic normalization and repair.
pub mod repair;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, trace};

pub use operands::Operands;
pub use repair::{is_hint, normalize, repair, Repaired, HINT_MNEMONICS};

use crate::memory::Memory;
use crate::{Condition, CoreState, ExecuteOutcome, Fault};

/// The execute half of a decoded instruction.
pub trait Execute: fmt::Debug + Send + Sync {
    /// Performs the instruction's effect on registers, flags and memory.
    ///
    /// # Errors
    ///
    /// Returns the fault raised by the operation, typically
    /// [`Fault::IllegalMemoryAccess`].
    fn execute(&self, core: &mut CoreState, memory: &mut dyn Memory)
        -> Result<ExecuteOutcome, Fault>;
}

/// The decode half of a handler: validates operands once and returns the
/// executable form.
pub type DecodeFn = fn(&Operands<'_>, StaticBits) -> Result<Box<dyn Execute>, Fault>;

/// Encoding bits fixed by the text variant an entry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaticBits(&'static [(&'static str, u32)]);

impl StaticBits {
    /// No static bits.
    pub const NONE: Self = Self(&[]);

    /// Wraps a static name/value table.
    #[must_use]
    pub const fn new(bits: &'static [(&'static str, u32)]) -> Self {
        Self(bits)
    }

    /// Value of a named bit group.
    #[must_use]
    pub fn get(self, name: &str) -> Option<u32> {
        self.0
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }

    /// `true` when the named bit is present and non-zero.
    #[must_use]
    pub fn flag(self, name: &str) -> bool {
        self.get(name).is_some_and(|value| value != 0)
    }
}

/// Static description of one registry entry.
#[derive(Debug, Clone, Copy)]
pub struct EntrySpec {
    /// Canonical upper-case mnemonic.
    pub mnemonic: &'static str,
    /// Operand template (see [`pattern`]).
    pub template: &'static str,
    /// Decoder invoked on a match.
    pub decode: DecodeFn,
    /// Bits fixed by this variant.
    pub bits: StaticBits,
}

impl EntrySpec {
    /// Builds an entry description.
    #[must_use]
    pub const fn new(
        mnemonic: &'static str,
        template: &'static str,
        decode: DecodeFn,
        bits: StaticBits,
    ) -> Self {
        Self {
            mnemonic,
            template,
            decode,
            bits,
        }
    }
}

/// A compiled registry entry.
#[derive(Debug)]
pub struct InstructionEntry {
    name: String,
    pattern: Regex,
    decode: DecodeFn,
    bits: StaticBits,
}

impl InstructionEntry {
    /// `MNEMONIC template`, used as the diagnostics key.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static bits of this entry.
    #[must_use]
    pub const fn bits(&self) -> StaticBits {
        self.bits
    }
}

/// Mnemonic to ordered entry list. Read-only once built.
#[derive(Debug, Default)]
pub struct InstructionRegistry {
    entries: BTreeMap<String, Vec<InstructionEntry>>,
}

static STANDARD: LazyLock<Result<InstructionRegistry, Fault>> =
    LazyLock::new(|| InstructionRegistry::from_specs(crate::handlers::STANDARD_ENTRIES));

impl InstructionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry from entry descriptions, in order.
    ///
    /// # Errors
    ///
    /// Returns a decode fault for a malformed template.
    pub fn from_specs<'a>(
        specs: impl IntoIterator<Item = &'a [EntrySpec]>,
    ) -> Result<Self, Fault> {
        let mut registry = Self::new();
        for group in specs {
            for spec in group {
                registry.register(spec)?;
            }
        }
        Ok(registry)
    }

    /// The process-wide registry holding every built-in handler.
    ///
    /// # Errors
    ///
    /// Returns the fault raised while compiling a built-in template.
    pub fn standard() -> Result<&'static Self, Fault> {
        STANDARD.as_ref().map_err(Clone::clone)
    }

    /// Appends an entry after any already registered for its mnemonic.
    ///
    /// # Errors
    ///
    /// Returns a decode fault for a malformed template.
    pub fn register(&mut self, spec: &EntrySpec) -> Result<(), Fault> {
        let pattern = pattern::compile(spec.template)?;
        let mnemonic = spec.mnemonic.to_ascii_uppercase();
        let entry = InstructionEntry {
            name: format!("{mnemonic} {}", spec.template),
            pattern,
            decode: spec.decode,
            bits: spec.bits,
        };
        self.entries.entry(mnemonic).or_default().push(entry);
        Ok(())
    }

    /// `true` when the mnemonic has at least one entry.
    #[must_use]
    pub fn contains(&self, mnemonic: &str) -> bool {
        self.entries.contains_key(mnemonic)
    }

    /// Entries of a mnemonic in registration order.
    #[must_use]
    pub fn entries(&self, mnemonic: &str) -> &[InstructionEntry] {
        self.entries.get(mnemonic).map_or(&[], Vec::as_slice)
    }

    /// Registered mnemonics in sorted order.
    pub fn mnemonics(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Total number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    /// `true` when nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolves listing text into a decoded instruction bound to `address`.
    ///
    /// # Errors
    ///
    /// - [`Fault::UnmanagedInstruction`] when the mnemonic is unknown after
    ///   repair and is not a hint.
    /// - [`Fault::NoMatchingPattern`] when no operand form matches.
    /// - Any fault raised by the selected decoder.
    pub fn resolve(
        &self,
        mnemonic: &str,
        operand_text: &str,
        address: u32,
    ) -> Result<ResolvedInstruction, Fault> {
        let written = normalize(mnemonic);
        let operand_text = operand_text.trim();

        let (canonical, condition) = if self.contains(&written) {
            (written.clone(), None)
        } else {
            match repair(&written) {
                Some(repaired) if self.contains(&repaired.mnemonic) => {
                    (repaired.mnemonic, repaired.condition)
                }
                repaired => {
                    let hint = is_hint(&written)
                        || repaired.as_ref().is_some_and(|r| is_hint(&r.mnemonic));
                    if hint {
                        debug!(mnemonic = %written, address, "hint resolved as no-op");
                        return Ok(ResolvedInstruction {
                            address,
                            mnemonic: written.clone(),
                            entry: format!("{written} (hint)"),
                            condition: repaired.and_then(|r| r.condition),
                            decoded: Box::new(Hint { mnemonic: written }),
                        });
                    }
                    return Err(Fault::UnmanagedInstruction { mnemonic: written });
                }
            }
        };

        for entry in self.entries(&canonical) {
            let Some(captures) = entry.pattern.captures(operand_text) else {
                continue;
            };
            trace!(entry = entry.name(), address, operands = operand_text, "pattern matched");
            let operands = Operands::new(&written, address, captures);
            let decoded = (entry.decode)(&operands, entry.bits)?;
            return Ok(ResolvedInstruction {
                address,
                mnemonic: canonical,
                entry: entry.name.clone(),
                condition,
                decoded,
            });
        }

        Err(Fault::NoMatchingPattern {
            mnemonic: canonical,
            operands: operand_text.to_owned(),
        })
    }
}

/// A decoded instruction bound to the address it was resolved at.
#[derive(Debug)]
pub struct ResolvedInstruction {
    address: u32,
    mnemonic: String,
    entry: String,
    condition: Option<Condition>,
    decoded: Box<dyn Execute>,
}

impl ResolvedInstruction {
    /// Address recorded at resolve time.
    #[must_use]
    pub const fn address(&self) -> u32 {
        self.address
    }

    /// Canonical mnemonic after repair.
    #[must_use]
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    /// Name of the selected registry entry.
    #[must_use]
    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Condition taken from a mnemonic suffix, if any.
    #[must_use]
    pub const fn condition(&self) -> Option<Condition> {
        self.condition
    }

    /// Runs the decoded instruction without any sequencing checks.
    ///
    /// # Errors
    ///
    /// Propagates the instruction's fault.
    pub fn run(
        &self,
        core: &mut CoreState,
        memory: &mut dyn Memory,
    ) -> Result<ExecuteOutcome, Fault> {
        self.decoded.execute(core, memory)
    }
}

#[derive(Debug)]
struct Hint {
    mnemonic: String,
}

impl Execute for Hint {
    fn execute(&self, _: &mut CoreState, _: &mut dyn Memory) -> Result<ExecuteOutcome, Fault> {
        debug!(mnemonic = %self.mnemonic, "hint executed as no-op");
        Ok(ExecuteOutcome::Executed)
    }
}
