//! Crate error type.
//!
//! The page-session layer is deliberately fail-silent: a missing anchor
//! element leaves an injection pending, a malformed stored preference reads
//! as `false`, and a tree with nothing to fold is a silent no-op. Errors
//! exist only where the environment underneath can genuinely fail — markup
//! parsing and preference-file I/O.

use core::fmt;

/// Error raised by tree parsing or preference persistence.
#[derive(Debug)]
pub enum Error {
    /// Markup could not be parsed into a content tree, or a tree limit
    /// was exceeded. The message names the violated limit where relevant.
    Dom(String),
    /// The preference file could not be written.
    Store(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Dom(msg) => write!(f, "content tree: {}", msg),
            Error::Store(msg) => write!(f, "preference store: {}", msg),
        }
    }
}

impl std::error::Error for Error {}
