//! Common result and error types for the Strand router.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates a broken internal invariant (a bug in the router), not a
/// property of the design being routed. Design problems such as an
/// unreachable sink are reported through the router's own error type and the
/// diagnostic sink.
pub type StrandResult<T> = Result<T, InternalError>;

/// An internal router error indicating a defect, not a user input problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal router error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_format() {
        let err = InternalError::new("path lost its sink");
        assert_eq!(format!("{err}"), "internal router error: path lost its sink");
    }

    #[test]
    fn err_path() {
        let r: StrandResult<u32> = Err(InternalError::new("boom"));
        assert_eq!(r.unwrap_err().message, "boom");
    }

    #[test]
    fn from_string() {
        let err: InternalError = format!("unit {} vanished", 7).into();
        assert_eq!(err.message, "unit 7 vanished");
    }
}
