//! Compiler error taxonomy.
//!
//! Only two conditions are fatal to a compilation: markup that is not
//! well-formed, and a loop query that does not match the
//! `<ItemType> <var> in <collection>` grammar. Everything else the compiler
//! tolerates with a documented lenient default (missing directive attributes
//! resolve to the empty string, unregistered pipeline aliases pass the value
//! through, unrecognized directives are skipped).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompileError {
    /// Malformed markup. Aborts the whole compilation; no partial output.
    #[error("malformed markup at byte {position}: {message}")]
    Parse { position: usize, message: String },

    /// A `foreach`/`for` expression that does not match the three-part
    /// loop grammar.
    #[error("malformed loop query '{query}': expected '<ItemType> <var> in <collection>'")]
    MalformedQuery { query: String },
}

impl CompileError {
    pub(crate) fn parse(position: usize, message: impl std::fmt::Display) -> Self {
        CompileError::Parse {
            position,
            message: message.to_string(),
        }
    }
}

/// Errors raised by the generated-output discovery utility, which is the
/// only part of the crate that touches the filesystem.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid component pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("invalid generator settings in {path}: {message}")]
    Settings { path: String, message: String },

    #[error(transparent)]
    Compile(#[from] CompileError),
}
