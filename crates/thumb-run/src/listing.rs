//! Loading disassembly listings.
//!
//! The loader accepts `objdump -d` style text:
//!
//! ```text
//! 00008000 <main>:
//!     8000:	2001      	movs	r0, #1
//!     8002:	f000 f802 	bl	800a <helper>
//!     8010:	deadbeef 	.word	0xdeadbeef
//! ```
//!
//! Symbol headers name addresses, instruction lines carry an address, one or
//! more encoding groups, a mnemonic and operand text. Comments introduced by
//! `;` or `@` are dropped. Every other line (section banners, file format
//! notes, `...` elisions, blank lines) is ignored.
//!
//! Line numbers are kept so errors and traces point back at the listing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::errors::{ListingError, ListingErrorKind, LoadError, SourceLoc};

static SYMBOL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([0-9A-Fa-f]+)\s+<([^>]+)>:\s*$").expect("valid symbol pattern")
});

static INSTRUCTION_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*([0-9A-Fa-f]+):\s+((?:(?:[0-9A-Fa-f]{8}|[0-9A-Fa-f]{4}|[0-9A-Fa-f]{2})[ \t]+)+)([.A-Za-z][\w.]*)[ \t]*(.*)$",
    )
    .expect("valid instruction pattern")
});

/// One executable line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedInstruction {
    /// Address of the first encoding byte.
    pub address: u32,
    /// Encoding size in bytes; the sequential step after this instruction.
    pub width: u32,
    /// Mnemonic as written.
    pub mnemonic: String,
    /// Operand text with comments removed.
    pub operands: String,
    /// 1-indexed listing line.
    pub line: usize,
}

/// A loaded listing: instructions by address, symbols and the memory image.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    path: PathBuf,
    instructions: BTreeMap<u32, ListedInstruction>,
    symbols: BTreeMap<String, u32>,
    image: BTreeMap<u32, Vec<u8>>,
}

impl Program {
    /// Reads and parses a listing file.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] when the file cannot be read, or the first
    /// malformed line.
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content).map_err(LoadError::from)
    }

    /// Parses listing text. `path` is only used in error locations.
    ///
    /// # Errors
    ///
    /// Returns the first malformed line.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ListingError> {
        let mut program = Self {
            path: path.to_path_buf(),
            ..Self::default()
        };
        for (index, raw) in content.lines().enumerate() {
            program.parse_line(raw, index + 1)?;
        }
        debug!(
            path = %path.display(),
            instructions = program.instructions.len(),
            symbols = program.symbols.len(),
            "listing loaded"
        );
        Ok(program)
    }

    fn parse_line(&mut self, raw: &str, line: usize) -> Result<(), ListingError> {
        let text = strip_comment(raw);
        if let Some(captures) = SYMBOL_LINE.captures(text) {
            let address = self.hex(&captures[1], "symbol address", line)?;
            let name = captures[2].to_owned();
            if self.symbol(&name).is_some_and(|existing| existing != address) {
                return Err(self.error(ListingErrorKind::DuplicateSymbol { name, address }, line));
            }
            self.symbols.insert(name, address);
            return Ok(());
        }

        let Some(captures) = INSTRUCTION_LINE.captures(text) else {
            return Ok(());
        };
        let address = self.hex(&captures[1], "address", line)?;
        let bytes = self.encoding(&captures[2], line)?;
        let width = u32::try_from(bytes.len()).map_err(|_| {
            self.error(
                ListingErrorKind::UnsupportedEncoding(captures[2].trim().to_owned()),
                line,
            )
        })?;
        if self.image.contains_key(&address) {
            return Err(self.error(ListingErrorKind::DuplicateAddress(address), line));
        }
        self.image.insert(address, bytes);

        let mnemonic = &captures[3];
        if mnemonic.starts_with('.') {
            return Ok(());
        }
        self.instructions.insert(
            address,
            ListedInstruction {
                address,
                width,
                mnemonic: mnemonic.to_owned(),
                operands: captures[4].trim().to_owned(),
                line,
            },
        );
        Ok(())
    }

    /// Halfword groups are stored little-endian in listing order; a single
    /// eight-digit group is one little-endian word.
    fn encoding(&self, text: &str, line: usize) -> Result<Vec<u8>, ListingError> {
        let mut bytes = Vec::new();
        for group in text.split_whitespace() {
            let value = self.hex(group, "encoding", line)?;
            match group.len() {
                2 => bytes.extend_from_slice(&value.to_le_bytes()[..1]),
                4 => bytes.extend_from_slice(&value.to_le_bytes()[..2]),
                8 => bytes.extend_from_slice(&value.to_le_bytes()),
                _ => {
                    return Err(self.error(
                        ListingErrorKind::UnsupportedEncoding(group.to_owned()),
                        line,
                    ))
                }
            }
        }
        Ok(bytes)
    }

    fn hex(&self, text: &str, field: &'static str, line: usize) -> Result<u32, ListingError> {
        u32::from_str_radix(text, 16).map_err(|_| {
            self.error(
                ListingErrorKind::MalformedHex {
                    field,
                    text: text.to_owned(),
                },
                line,
            )
        })
    }

    fn error(&self, kind: ListingErrorKind, line: usize) -> ListingError {
        ListingError {
            kind,
            location: SourceLoc::new(self.path.clone(), line),
        }
    }

    /// The instruction listed at `address`.
    #[must_use]
    pub fn instruction(&self, address: u32) -> Option<&ListedInstruction> {
        self.instructions.get(&address)
    }

    /// Instructions in address order.
    pub fn instructions(&self) -> impl Iterator<Item = &ListedInstruction> {
        self.instructions.values()
    }

    /// Number of executable lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// `true` when nothing executable was listed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Address of a symbol header.
    #[must_use]
    pub fn symbol(&self, name: &str) -> Option<u32> {
        self.symbols.get(name).copied()
    }

    /// Encoded bytes by start address, data lines included.
    pub fn segments(&self) -> impl Iterator<Item = (u32, &[u8])> {
        self.image
            .iter()
            .map(|(address, bytes)| (*address, bytes.as_slice()))
    }

    /// Picks the first instruction to run.
    ///
    /// `requested` is either a `0x`-prefixed address or a symbol name.
    /// Without a request, `main`, then `_start`, then the lowest listed
    /// instruction is used.
    ///
    /// # Errors
    ///
    /// - [`LoadError::UnknownSymbol`] for an undefined requested symbol.
    /// - [`LoadError::Empty`] when nothing executable was listed.
    pub fn entry_point(&self, requested: Option<&str>) -> Result<u32, LoadError> {
        if let Some(requested) = requested {
            let address = requested
                .strip_prefix("0x")
                .or_else(|| requested.strip_prefix("0X"))
                .and_then(|digits| u32::from_str_radix(digits, 16).ok());
            return address
                .or_else(|| self.symbol(requested))
                .ok_or_else(|| LoadError::UnknownSymbol(requested.to_owned()));
        }
        self.symbol("main")
            .or_else(|| self.symbol("_start"))
            .or_else(|| self.instructions.keys().next().copied())
            .ok_or(LoadError::Empty)
    }
}

fn strip_comment(line: &str) -> &str {
    line.find([';', '@']).map_or(line, |at| &line[..at])
}
