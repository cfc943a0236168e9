// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for store and scheduler operations.

/// An error reported by a [`Store`](crate::Store) or [`Scheduler`](crate::Scheduler).
///
/// This is an opaque error type that can wrap any underlying error from a backend.
/// Use [`std::error::Error::source()`] to access the underlying cause if needed.
///
/// # Example
///
/// ```
/// use softcache_ports::Error;
///
/// let error = Error::from_message("connection reset");
/// ```
#[ohno::error]
pub struct Error {}

impl Error {
    /// Creates a new error from any type that can be converted to an error.
    ///
    /// # Examples
    ///
    /// ```
    /// use softcache_ports::Error;
    ///
    /// let io = std::io::Error::other("disk full");
    /// let error = Error::from_message(io);
    /// ```
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A specialized [`Result`] type for store and scheduler operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_cause() {
        let error = Error::from_message("scheduler unreachable");
        let display = format!("{error}");
        assert!(
            display.contains("scheduler unreachable"),
            "display output should contain the cause message, got: {display}"
        );
    }

    #[test]
    fn debug_contains_cause() {
        let error = Error::caused_by("write refused");
        let debug = format!("{error:?}");
        assert!(debug.contains("write refused"), "got: {debug}");
    }

    #[test]
    fn result_alias_propagates_errors() {
        fn fails() -> Result<bool> {
            Err(Error::from_message(std::io::Error::other("disk full")))
        }

        let err = fails().expect_err("should return an error");
        assert!(format!("{err}").contains("disk full"));
    }
}
