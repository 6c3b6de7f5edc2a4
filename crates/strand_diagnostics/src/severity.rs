//! How serious a routing diagnostic is.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a routing diagnostic, least severe first.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Severity {
    /// Routing-policy information, such as a relaxed bounding box.
    Note,
    /// The run finished with a degraded result (no convergence, an
    /// incomplete repair, a skipped net).
    Warning,
    /// The run was aborted.
    Error,
}

impl Severity {
    /// Every severity, in ascending order.
    pub const ALL: [Severity; 3] = [Severity::Note, Severity::Warning, Severity::Error];

    /// Returns `true` for [`Error`](Severity::Error).
    pub fn is_error(self) -> bool {
        self == Severity::Error
    }

    /// Lowercase label used in rendered output.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Note => "note",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Dense index, used by per-severity counters.
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_is_sorted_and_indexed() {
        assert!(Severity::ALL.windows(2).all(|w| w[0] < w[1]));
        for (i, s) in Severity::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn only_error_aborts() {
        let fatal: Vec<_> = Severity::ALL.into_iter().filter(|s| s.is_error()).collect();
        assert_eq!(fatal, vec![Severity::Error]);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(Severity::Warning.to_string(), "warning");
        assert_eq!(Severity::Note.label(), "note");
    }
}
