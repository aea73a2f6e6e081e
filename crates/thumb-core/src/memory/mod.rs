//! Memory contract consumed by the engine and a sparse backing store.

/// Sparse byte map used by the runner and the tests.
pub mod sparse;

pub use sparse::SparseMemory;

use crate::{Fault, Word};

/// Width of one data transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum AccessSize {
    /// One byte.
    Byte = 1,
    /// Two bytes.
    Halfword = 2,
    /// Four bytes.
    Word = 4,
}

impl AccessSize {
    /// Width in bytes.
    #[must_use]
    pub const fn bytes(self) -> u8 {
        self as u8
    }

    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.bytes() * 8
    }
}

/// Byte-addressable memory as seen by instruction handlers.
///
/// Implementors provide byte access; sized little-endian transfers are
/// derived. An absent byte is an [`Fault::IllegalMemoryAccess`].
pub trait Memory {
    /// Returns the byte at `address`, or `None` when it is not mapped.
    fn byte(&self, address: u32) -> Option<u8>;

    /// Returns a mutable handle to the byte at `address`, or `None` when it
    /// is not mapped.
    fn byte_mut(&mut self, address: u32) -> Option<&mut u8>;

    /// Reads `size` bytes little-endian, zero-extended.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::IllegalMemoryAccess`] when any byte in the range is
    /// unmapped.
    fn read_unsigned(&self, address: u32, size: AccessSize) -> Result<Word, Fault> {
        let mut bytes = [0_u8; 4];
        for (offset, slot) in (0..u32::from(size.bytes())).zip(bytes.iter_mut()) {
            *slot = address
                .checked_add(offset)
                .and_then(|at| self.byte(at))
                .ok_or_else(|| illegal(address, size))?;
        }
        Ok(Word::from_le_bytes(bytes))
    }

    /// Reads `size` bytes little-endian, sign-extended from the top bit read.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::IllegalMemoryAccess`] when any byte in the range is
    /// unmapped.
    fn read_signed(&self, address: u32, size: AccessSize) -> Result<Word, Fault> {
        let raw = self.read_unsigned(address, size)?;
        raw.field(size.bits() - 1, 0).sign_extend(crate::WORD_BITS)
    }

    /// Writes the low `size` bytes of `value` little-endian.
    ///
    /// Every byte is checked before any is written, so a faulting write leaves
    /// memory untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Fault::IllegalMemoryAccess`] when any byte in the range is
    /// unmapped.
    fn write_unsigned(&mut self, address: u32, size: AccessSize, value: Word) -> Result<(), Fault> {
        let count = u32::from(size.bytes());
        let fits = (0..count).all(|offset| {
            address
                .checked_add(offset)
                .is_some_and(|at| self.byte(at).is_some())
        });
        if !fits {
            return Err(illegal(address, size));
        }
        for (offset, byte) in (0..count).zip(value.to_le_bytes()) {
            let slot = address
                .checked_add(offset)
                .and_then(|at| self.byte_mut(at))
                .ok_or_else(|| illegal(address, size))?;
            *slot = byte;
        }
        Ok(())
    }
}

const fn illegal(address: u32, size: AccessSize) -> Fault {
    Fault::IllegalMemoryAccess {
        address,
        size: size.bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::{AccessSize, Memory, SparseMemory};
    use crate::{Fault, Word};

    #[test]
    fn word_reads_are_little_endian() {
        let mut memory = SparseMemory::new();
        memory.load_bytes(0x100, &[0x01, 0x02, 0x03, 0x04]);
        assert_eq!(
            memory.read_unsigned(0x100, AccessSize::Word),
            Ok(Word::new(0x0403_0201))
        );
        assert_eq!(
            memory.read_unsigned(0x102, AccessSize::Halfword),
            Ok(Word::new(0x0403))
        );
    }

    #[test]
    fn signed_reads_extend_from_access_width() {
        let mut memory = SparseMemory::new();
        memory.load_bytes(0, &[0x80, 0xFF]);
        assert_eq!(
            memory.read_signed(0, AccessSize::Byte),
            Ok(Word::new(0xFFFF_FF80))
        );
        assert_eq!(
            memory.read_signed(0, AccessSize::Halfword),
            Ok(Word::new(0xFFFF_FF80))
        );
    }

    #[test]
    fn partially_mapped_access_faults_without_side_effects() {
        let mut memory = SparseMemory::new();
        memory.map_zeroed(0x200, 2);
        assert_eq!(
            memory.write_unsigned(0x200, AccessSize::Word, Word::new(0xDEAD_BEEF)),
            Err(Fault::IllegalMemoryAccess {
                address: 0x200,
                size: 4
            })
        );
        assert_eq!(memory.read_unsigned(0x200, AccessSize::Halfword), Ok(Word::ZERO));
        assert!(memory.read_unsigned(0x201, AccessSize::Halfword).is_err());
    }

    #[test]
    fn range_wrapping_past_top_of_address_space_faults() {
        let mut memory = SparseMemory::new();
        memory.load_bytes(u32::MAX, &[0xAA]);
        assert!(memory.read_unsigned(u32::MAX, AccessSize::Halfword).is_err());
        assert_eq!(
            memory.read_unsigned(u32::MAX, AccessSize::Byte),
            Ok(Word::new(0xAA))
        );
    }
}
