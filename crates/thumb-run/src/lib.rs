//! Listing loader and run driver for the `thumb-core` engine.

use serde_json as _;
#[cfg(test)]
use tempfile as _;
use tracing_subscriber as _;

/// Load and setup error types.
pub mod errors;
/// `objdump`-style listing parser.
pub mod listing;
/// Program execution on one engine instance.
pub mod session;

pub use errors::{ListingError, ListingErrorKind, LoadError, SourceLoc};
pub use listing::{ListedInstruction, Program};
pub use session::{RunOutcome, Session, SessionConfig, StateSnapshot, StopReason};
