//! Top-level error wrapper types.

use crate::{ConfigError, ProviderError};

/// Every failure a Courier crate can report.
///
/// # Examples
///
/// ```
/// use courier_error::{ConfigError, CourierError};
///
/// let err: CourierError = ConfigError::new("missing field").into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum CourierErrorKind {
    /// Classified provider failure
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
}

/// Courier error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Courier Error: {}", _0)]
pub struct CourierError(Box<CourierErrorKind>);

impl CourierError {
    /// Create a new error from a kind.
    pub fn new(kind: CourierErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &CourierErrorKind {
        &self.0
    }
}

impl<T> From<T> for CourierError
where
    T: Into<CourierErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Courier operations.
///
/// # Examples
///
/// ```
/// use courier_error::{ConfigError, CourierResult};
///
/// fn load() -> CourierResult<()> {
///     Err(ConfigError::new("unreadable"))?
/// }
///
/// assert!(load().is_err());
/// ```
pub type CourierResult<T> = std::result::Result<T, CourierError>;
