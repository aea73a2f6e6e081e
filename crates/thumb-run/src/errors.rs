//! Errors raised while loading a listing or preparing a session.
//!
//! Listing errors carry the file and the 1-indexed line they come from and
//! format in the usual compiler style:
//! ```text
//! build/app.lst:42: error: address 0x8004 listed twice
//! ```

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Where in a listing a problem was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
    /// Listing path, empty for in-memory text.
    pub file: PathBuf,
    /// 1-indexed line number.
    pub line: usize,
}

impl SourceLoc {
    /// Creates a location.
    #[must_use]
    pub const fn new(file: PathBuf, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.as_os_str().is_empty() {
            write!(f, "line {}", self.line)
        } else {
            write!(f, "{}:{}", self.file.display(), self.line)
        }
    }
}

/// What went wrong on a listing line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingErrorKind {
    /// An address or encoding field is not valid hexadecimal.
    #[error("malformed {field} `{text}`")]
    MalformedHex {
        /// Which column failed.
        field: &'static str,
        /// Offending text.
        text: String,
    },
    /// Encoding groups that are neither bytes, halfwords nor one word.
    #[error("unsupported encoding `{0}`")]
    UnsupportedEncoding(String),
    /// Two lines claim the same address.
    #[error("address {0:#x} listed twice")]
    DuplicateAddress(u32),
    /// Two headers define the same symbol at different addresses.
    #[error("symbol `{name}` redefined at {address:#x}")]
    DuplicateSymbol {
        /// Symbol name.
        name: String,
        /// Address of the second definition.
        address: u32,
    },
}

/// A listing line that could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: error: {kind}")]
pub struct ListingError {
    /// What went wrong.
    pub kind: ListingErrorKind,
    /// Where.
    pub location: SourceLoc,
}

/// Every way loading a program or preparing a session can fail.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The listing could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Path that was opened.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A malformed listing line.
    #[error(transparent)]
    Listing(#[from] ListingError),
    /// The listing holds no instructions.
    #[error("listing contains no instructions")]
    Empty,
    /// The requested entry symbol is not defined.
    #[error("unknown entry symbol `{0}`")]
    UnknownSymbol(String),
    /// The engine could not be constructed.
    #[error("engine setup failed: {0}")]
    Engine(#[from] thumb_core::Fault),
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::{ListingError, ListingErrorKind, LoadError, SourceLoc};

    #[test]
    fn listing_errors_format_with_location() {
        let error = ListingError {
            kind: ListingErrorKind::DuplicateAddress(0x8004),
            location: SourceLoc::new(PathBuf::from("app.lst"), 42),
        };
        assert_eq!(
            error.to_string(),
            "app.lst:42: error: address 0x8004 listed twice"
        );
    }

    #[test]
    fn in_memory_locations_use_the_line_alone() {
        let error = LoadError::from(ListingError {
            kind: ListingErrorKind::UnsupportedEncoding("123".into()),
            location: SourceLoc::new(PathBuf::new(), 3),
        });
        assert_eq!(
            error.to_string(),
            "line 3: error: unsupported encoding `123`"
        );
    }

    #[test]
    fn symbol_errors_name_the_symbol() {
        assert_eq!(
            LoadError::UnknownSymbol("start".into()).to_string(),
            "unknown entry symbol `start`"
        );
    }
}
