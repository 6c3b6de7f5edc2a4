//! Stable identifiers for routing diagnostics.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Code family, shown as the first character of a code.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Conditions that abort a run (`E`).
    Error,
    /// Degraded results (`W`).
    Warning,
    /// Routing-policy notes (`R`).
    Routing,
}

impl Category {
    /// The prefix letter.
    pub fn prefix(self) -> char {
        match self {
            Category::Error => 'E',
            Category::Warning => 'W',
            Category::Routing => 'R',
        }
    }
}

/// A category plus a number, rendered like `E401` or `R420`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// Code family.
    pub category: Category,
    /// Number within the family, printed with three digits.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a code; usable in `const` items.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:03}", self.category.prefix(), self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_prefix_and_padded_number() {
        assert_eq!(DiagnosticCode::new(Category::Error, 401).to_string(), "E401");
        assert_eq!(DiagnosticCode::new(Category::Warning, 12).to_string(), "W012");
        assert_eq!(DiagnosticCode::new(Category::Routing, 420).to_string(), "R420");
    }

    #[test]
    fn serializes_as_parts() {
        let code = DiagnosticCode::new(Category::Routing, 420);
        let json = serde_json::to_string(&code).unwrap();
        assert_eq!(json, r#"{"category":"Routing","number":420}"#);
        let back: DiagnosticCode = serde_json::from_str(&json).unwrap();
        assert_eq!(code, back);
    }
}
