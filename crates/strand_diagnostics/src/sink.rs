//! Collects the diagnostics of one routing run.

use crate::code::DiagnosticCode;
use crate::diagnostic::Diagnostic;
use crate::severity::Severity;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Accumulates diagnostics from a routing run.
///
/// Shareable across threads. Per-severity counts are kept in atomics so
/// `has_errors` never takes the lock.
pub struct DiagnosticSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
    counts: [AtomicUsize; 3],
}

impl DiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self {
            diagnostics: Mutex::new(Vec::new()),
            counts: Default::default(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Diagnostic>> {
        // a panicking emitter cannot leave the vector half-written
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records a diagnostic.
    pub fn emit(&self, diag: Diagnostic) {
        self.counts[diag.severity.index()].fetch_add(1, Ordering::Relaxed);
        self.lock().push(diag);
    }

    /// Number of diagnostics of one severity emitted so far.
    pub fn count(&self, severity: Severity) -> usize {
        self.counts[severity.index()].load(Ordering::Relaxed)
    }

    /// Returns `true` once any error has been emitted.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Number of errors emitted so far.
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// Codes of every diagnostic, in emission order.
    pub fn codes(&self) -> Vec<DiagnosticCode> {
        self.lock().iter().map(|d| d.code).collect()
    }

    /// Drains the recorded diagnostics. Counts are not reset.
    pub fn take_all(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    /// A copy of the recorded diagnostics.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }
}

impl Default for DiagnosticSink {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Category;
    use crate::diagnostic::Locus;

    const UNREACHABLE: DiagnosticCode = DiagnosticCode::new(Category::Error, 401);
    const EXHAUSTED: DiagnosticCode = DiagnosticCode::new(Category::Warning, 410);
    const RELAXED: DiagnosticCode = DiagnosticCode::new(Category::Routing, 420);

    fn unreachable(net: u32) -> Diagnostic {
        Diagnostic::error(UNREACHABLE, "sink is unreachable", Locus::Net(net))
    }

    #[test]
    fn counts_by_severity() {
        let sink = DiagnosticSink::new();
        assert!(!sink.has_errors());
        sink.emit(Diagnostic::note(RELAXED, "relaxed", Locus::Net(2)));
        sink.emit(Diagnostic::warning(EXHAUSTED, "not converged", Locus::Run));
        assert!(!sink.has_errors());
        sink.emit(unreachable(2));
        assert_eq!(sink.count(Severity::Note), 1);
        assert_eq!(sink.count(Severity::Warning), 1);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.codes(), vec![RELAXED, EXHAUSTED, UNREACHABLE]);
    }

    #[test]
    fn take_all_keeps_counts() {
        let sink = DiagnosticSink::new();
        sink.emit(unreachable(0));
        assert_eq!(sink.take_all().len(), 1);
        assert!(sink.diagnostics().is_empty());
        assert!(sink.has_errors());
    }

    #[test]
    fn concurrent_emitters() {
        use std::sync::Arc;
        use std::thread;

        let sink = Arc::new(DiagnosticSink::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    for _ in 0..25 {
                        sink.emit(unreachable(t));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(sink.error_count(), 100);
        assert_eq!(sink.diagnostics().len(), 100);
    }
}
