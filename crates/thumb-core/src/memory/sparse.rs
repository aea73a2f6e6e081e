use std::collections::BTreeMap;

use super::Memory;

/// Address-to-byte map. Only inserted addresses are mapped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SparseMemory {
    bytes: BTreeMap<u32, u8>,
}

impl SparseMemory {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `len` zeroed bytes starting at `base`, keeping existing contents.
    ///
    /// The range is truncated at the top of the address space.
    pub fn map_zeroed(&mut self, base: u32, len: u32) {
        let end = base.saturating_add(len);
        for address in base..end {
            self.bytes.entry(address).or_insert(0);
        }
    }

    /// Maps and stores `data` starting at `base`.
    pub fn load_bytes(&mut self, base: u32, data: &[u8]) {
        let mut address = base;
        for byte in data {
            self.bytes.insert(address, *byte);
            match address.checked_add(1) {
                Some(next) => address = next,
                None => break,
            }
        }
    }

    /// `true` when `address` holds a byte.
    #[must_use]
    pub fn is_mapped(&self, address: u32) -> bool {
        self.bytes.contains_key(&address)
    }

    /// Number of mapped bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// `true` when nothing is mapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Memory for SparseMemory {
    fn byte(&self, address: u32) -> Option<u8> {
        self.bytes.get(&address).copied()
    }

    fn byte_mut(&mut self, address: u32) -> Option<&mut u8> {
        self.bytes.get_mut(&address)
    }
}
