//! Common result and error types.

/// Result type for operations whose only failure mode is an internal bug.
pub type WeldResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Weld, not a user input problem.
///
/// Reaching one of these means an invariant the crates maintain among
/// themselves was broken.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
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
        let err = InternalError::new("port map out of sync");
        assert_eq!(format!("{err}"), "internal error: port map out of sync");
    }

    #[test]
    fn from_string() {
        let err: InternalError = "from string".to_string().into();
        assert_eq!(err.message, "from string");
    }
}
