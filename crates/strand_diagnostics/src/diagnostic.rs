//! Structured diagnostic messages with severity, codes, and a routing locus.

use crate::code::DiagnosticCode;
use crate::severity::Severity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a diagnostic is about.
///
/// The router has no source text, so instead of a span each diagnostic names
/// the routing object it concerns by its raw index.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Locus {
    /// The routing run as a whole.
    Run,
    /// A net, by index.
    Net(u32),
    /// A single driver-to-sink connection, by index.
    Connection {
        /// The owning net.
        net: u32,
        /// The connection index.
        connection: u32,
    },
    /// A routing unit in the resource graph, by index.
    Unit(u32),
    /// A pair of adjacent routing units.
    UnitPair(u32, u32),
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locus::Run => write!(f, "run"),
            Locus::Net(n) => write!(f, "net {n}"),
            Locus::Connection { net, connection } => {
                write!(f, "net {net}, connection {connection}")
            }
            Locus::Unit(u) => write!(f, "unit {u}"),
            Locus::UnitPair(a, b) => write!(f, "units {a} -> {b}"),
        }
    }
}

/// A structured diagnostic message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The severity level of this diagnostic.
    pub severity: Severity,
    /// The unique code identifying the type of diagnostic.
    pub code: DiagnosticCode,
    /// The main diagnostic message.
    pub message: String,
    /// The routing object this diagnostic concerns.
    pub locus: Locus,
    /// Explanatory footnotes (e.g., "note: ...").
    pub notes: Vec<String>,
    /// Actionable suggestions (e.g., "help: ...").
    pub help: Vec<String>,
}

impl Diagnostic {
    fn with_severity(
        severity: Severity,
        code: DiagnosticCode,
        message: impl Into<String>,
        locus: Locus,
    ) -> Self {
        Self {
            severity,
            code,
            message: message.into(),
            locus,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    /// Creates a new error diagnostic.
    pub fn error(code: DiagnosticCode, message: impl Into<String>, locus: Locus) -> Self {
        Self::with_severity(Severity::Error, code, message, locus)
    }

    /// Creates a new warning diagnostic.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>, locus: Locus) -> Self {
        Self::with_severity(Severity::Warning, code, message, locus)
    }

    /// Creates a new note diagnostic.
    pub fn note(code: DiagnosticCode, message: impl Into<String>, locus: Locus) -> Self {
        Self::with_severity(Severity::Note, code, message, locus)
    }

    /// Adds a note to this diagnostic.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Adds a help message to this diagnostic.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }
}
