//! Diagnostic creation, severity management, and terminal rendering.
//!
//! Routing problems are reported as structured [`Diagnostic`] messages that
//! carry a severity, a category-prefixed code, and a [`Locus`] naming the
//! net, connection, or routing unit involved. The thread-safe
//! [`DiagnosticSink`] accumulates them during a run, and
//! [`TerminalRenderer`] formats them for humans.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::{Diagnostic, Locus};
pub use renderer::{DiagnosticRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
