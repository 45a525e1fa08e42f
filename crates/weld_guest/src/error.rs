//! Error types for guest construction and code generation.

/// Errors raised while building or generating a guest module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuestError {
    /// A statement or reference names a clock domain that was never declared.
    #[error("clock domain '{0}' is not defined")]
    UnknownDomain(String),

    /// A clock domain was declared twice.
    #[error("clock domain '{0}' is already defined")]
    DuplicateDomain(String),

    /// A signal has more than one driver (comb and sync, two domains, or two comb statements).
    #[error("signal '{signal}' is driven from more than one place")]
    MultipleDrivers {
        /// Name of the signal.
        signal: String,
    },

    /// A signal was declared with zero width.
    #[error("signal '{0}' has zero width")]
    ZeroWidth(String),

    /// A slice selects no bits or bits beyond its operand.
    #[error("slice [{start}..{end}] of a {width}-bit value in the driver of '{signal}' is out of range")]
    InvalidSlice {
        /// Name of the driven signal.
        signal: String,
        /// First bit (inclusive).
        start: u32,
        /// Last bit (exclusive).
        end: u32,
        /// Width of the sliced value.
        width: u32,
    },

    /// A concatenation has no parts.
    #[error("empty concatenation in the driver of '{0}'")]
    EmptyCat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unknown_domain() {
        let e = GuestError::UnknownDomain("pix".into());
        assert_eq!(e.to_string(), "clock domain 'pix' is not defined");
    }

    #[test]
    fn display_multiple_drivers() {
        let e = GuestError::MultipleDrivers {
            signal: "count".into(),
        };
        assert_eq!(
            e.to_string(),
            "signal 'count' is driven from more than one place"
        );
    }

    #[test]
    fn display_invalid_slice() {
        let e = GuestError::InvalidSlice {
            signal: "y".into(),
            start: 3,
            end: 1,
            width: 4,
        };
        assert_eq!(
            e.to_string(),
            "slice [3..1] of a 4-bit value in the driver of 'y' is out of range"
        );
    }
}
