use thiserror::Error;

/// Fault classes used for diagnostics aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// A handler rejected the operand combination at decode time.
    Decode,
    /// The mnemonic is not known to the registry.
    Unmanaged,
    /// A read or write touched an unmapped address.
    Memory,
    /// Condition-code text could not be interpreted.
    Condition,
    /// The instruction stream and the live program counter disagree.
    Sequencing,
}

/// Every way resolving or executing an instruction can fail.
///
/// None of these are recovered inside the engine; they surface to the
/// embedding driver at the offending instruction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// Architecturally disallowed operand combination.
    #[error("invalid instruction form: {reason}")]
    InvalidInstructionForm {
        /// What made the form invalid.
        reason: String,
    },
    /// Mnemonic unresolved after repair and not a hint.
    #[error("unmanaged instruction `{mnemonic}`")]
    UnmanagedInstruction {
        /// Mnemonic as presented to the registry.
        mnemonic: String,
    },
    /// The mnemonic exists but none of its operand patterns matched.
    #[error("no operand form of `{mnemonic}` matches `{operands}`")]
    NoMatchingPattern {
        /// Canonical mnemonic that was looked up.
        mnemonic: String,
        /// Operand text that failed to match.
        operands: String,
    },
    /// A byte in the accessed range is absent from the backing mapping.
    #[error("illegal memory access: {size} byte(s) at {address:#010x}")]
    IllegalMemoryAccess {
        /// First address of the access.
        address: u32,
        /// Access width in bytes.
        size: u8,
    },
    /// Condition text outside the recognized set.
    #[error("unrecognized condition `{0}`")]
    UnrecognizedCondition(String),
    /// A sub-field was widened to something other than a 32-bit word.
    #[error("malformed field: cannot extend to {width} bits")]
    MalformedField {
        /// Requested total width.
        width: u8,
    },
    /// An instruction resolved for one address was executed at another.
    #[error("instruction resolved at {expected:#010x} executed with pc {actual:#010x}")]
    ProgramCounterMismatch {
        /// Address recorded at resolve time.
        expected: u32,
        /// Live program counter at execute time.
        actual: u32,
    },
}

impl Fault {
    /// Shorthand for [`Fault::InvalidInstructionForm`].
    #[must_use]
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInstructionForm {
            reason: reason.into(),
        }
    }

    /// Returns the diagnostics class for this fault.
    #[must_use]
    pub const fn class(&self) -> FaultClass {
        match self {
            Self::InvalidInstructionForm { .. }
            | Self::NoMatchingPattern { .. }
            | Self::MalformedField { .. } => FaultClass::Decode,
            Self::UnmanagedInstruction { .. } => FaultClass::Unmanaged,
            Self::IllegalMemoryAccess { .. } => FaultClass::Memory,
            Self::UnrecognizedCondition(_) => FaultClass::Condition,
            Self::ProgramCounterMismatch { .. } => FaultClass::Sequencing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fault, FaultClass};

    #[test]
    fn class_mapping_matches_fault_taxonomy() {
        assert_eq!(Fault::invalid("pc as destination").class(), FaultClass::Decode);
        assert_eq!(
            Fault::NoMatchingPattern {
                mnemonic: "ADD".into(),
                operands: "?".into()
            }
            .class(),
            FaultClass::Decode
        );
        assert_eq!(
            Fault::UnmanagedInstruction {
                mnemonic: "VADD".into()
            }
            .class(),
            FaultClass::Unmanaged
        );
        assert_eq!(
            Fault::IllegalMemoryAccess {
                address: 0,
                size: 4
            }
            .class(),
            FaultClass::Memory
        );
        assert_eq!(
            Fault::UnrecognizedCondition("XX".into()).class(),
            FaultClass::Condition
        );
        assert_eq!(
            Fault::ProgramCounterMismatch {
                expected: 0x8000,
                actual: 0x8002
            }
            .class(),
            FaultClass::Sequencing
        );
    }

    #[test]
    fn messages_name_the_offending_detail() {
        let fault = Fault::IllegalMemoryAccess {
            address: 0x2000_0000,
            size: 2,
        };
        assert_eq!(
            fault.to_string(),
            "illegal memory access: 2 byte(s) at 0x20000000"
        );
        assert_eq!(
            Fault::UnmanagedInstruction {
                mnemonic: "VMUL".into()
            }
            .to_string(),
            "unmanaged instruction `VMUL`"
        );
    }
}
