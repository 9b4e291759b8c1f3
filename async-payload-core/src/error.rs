//! Error types for payload failures and option parsing

use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::rc::Rc;

/// The failure of an async payload.
///
/// A shared handle to the error the payload produced. Cloning is cheap and
/// keeps pointing at the same error value, so the caller awaiting a dispatch
/// receives exactly the error the payload failed with (see [`ptr_eq`]).
///
/// [`ptr_eq`]: PayloadError::ptr_eq
#[derive(Clone)]
pub struct PayloadError {
    inner: Rc<dyn StdError + 'static>,
}

impl PayloadError {
    /// Wrap an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        Self {
            inner: Rc::new(error),
        }
    }

    /// Create an error from a bare message, for failures that have no error type.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns true if both handles refer to the same underlying error.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.inner, &b.inner)
    }

    /// Attempt to downcast the underlying error to a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// The text carried as the payload of an error action.
    ///
    /// Uses the `Display` output, falling back to `Debug` when that is empty
    /// or fails, and to an empty string when both fail. Never panics.
    pub fn message(&self) -> String {
        let mut out = String::new();
        if write!(out, "{}", self.inner).is_ok() && !out.is_empty() {
            return out;
        }

        out.clear();
        if write!(out, "{:?}", self.inner).is_ok() {
            return out;
        }

        String::new()
    }
}

impl fmt::Debug for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PayloadError").field(&self.inner).finish()
    }
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl<E> From<E> for PayloadError
where
    E: StdError + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

/// A failure described only by its text.
#[derive(thiserror::Error)]
#[error("{0}")]
struct Message(String);

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors produced while loading middleware options.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The options document was not valid JSON or had unexpected fields.
    #[error("invalid middleware options: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("the error message")]
    struct Boom;

    #[derive(Debug, thiserror::Error)]
    #[error("")]
    struct Silent;

    struct Broken;

    impl fmt::Debug for Broken {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl fmt::Display for Broken {
        fn fmt(&self, _f: &mut fmt::Formatter<'_>) -> fmt::Result {
            Err(fmt::Error)
        }
    }

    impl StdError for Broken {}

    #[test]
    fn test_message_prefers_display() {
        assert_eq!(PayloadError::new(Boom).message(), "the error message");
    }

    #[test]
    fn test_message_falls_back_to_debug() {
        assert_eq!(PayloadError::new(Silent).message(), "Silent");
    }

    #[test]
    fn test_message_never_fails() {
        assert_eq!(PayloadError::new(Broken).message(), "");
        assert_eq!(PayloadError::msg("").message(), "");
        assert_eq!(PayloadError::msg("nope").message(), "nope");
    }

    #[test]
    fn test_clone_keeps_identity() {
        let err = PayloadError::new(Boom);
        let copy = err.clone();
        assert!(PayloadError::ptr_eq(&err, &copy));
        assert!(!PayloadError::ptr_eq(&err, &PayloadError::new(Boom)));
        assert!(copy.downcast_ref::<Boom>().is_some());
    }

    #[test]
    fn test_config_error_display() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = ConfigError::from(err);
        assert!(err.to_string().starts_with("invalid middleware options"));
    }
}
