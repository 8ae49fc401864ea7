use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::common::{atomic, Atomic};

/// Error kinds for ormhook operations.
///
/// The first group belongs to this crate (signal wiring, registry bookkeeping). The rest
/// are the host-side kinds a [`DatabaseProvider`](crate::database::DatabaseProvider) reports;
/// they travel through save, delete and query dispatch untouched.
///
/// # Examples
///
/// ```rust,ignore
/// use ormhook::errors::{OrmError, ErrorKind, OrmResult};
///
/// fn example() -> OrmResult<()> {
///     Err(OrmError::new("post matching query does not exist", ErrorKind::DoesNotExist))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Signal Errors
    /// The value handed to a signal is not a receiver for that signal's instance type
    InvalidReceiver,
    /// The receiver was never connected to the signal
    UnknownReceiver,

    // Registry Errors
    /// The model type has not been registered with the ORM
    ModelNotRegistered,
    /// The operation is not valid in the current context
    InvalidOperation,
    /// Configuration is missing or malformed
    InvalidConfiguration,

    // Host ORM Errors
    /// No row matched a `get` query
    DoesNotExist,
    /// A constraint (e.g. primary key uniqueness) was violated
    IntegrityError,
    /// The database connection is unavailable or closed
    ConnectionError,
    /// The query could not be executed
    QueryError,
    /// A row could not be mapped to or from a model
    ObjectMappingError,
    /// Error reported by a database backend
    BackendError,

    // Extension Errors - allows backend crates to plug in their own categories
    /// Error from an extension (e.g. a driver adapter)
    Extension(String),

    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidReceiver => write!(f, "Invalid receiver"),
            ErrorKind::UnknownReceiver => write!(f, "Unknown receiver"),
            ErrorKind::ModelNotRegistered => write!(f, "Model not registered"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InvalidConfiguration => write!(f, "Invalid configuration"),
            ErrorKind::DoesNotExist => write!(f, "Does not exist"),
            ErrorKind::IntegrityError => write!(f, "Integrity error"),
            ErrorKind::ConnectionError => write!(f, "Connection error"),
            ErrorKind::QueryError => write!(f, "Query error"),
            ErrorKind::ObjectMappingError => write!(f, "Object mapping error"),
            ErrorKind::BackendError => write!(f, "Backend error"),
            ErrorKind::Extension(name) => write!(f, "{} error", name),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

/// Custom ormhook error type.
///
/// `OrmError` carries a message, an [`ErrorKind`], an optional cause and the backtrace
/// captured where it was created.
///
/// # Examples
///
/// ```rust,ignore
/// use ormhook::errors::{OrmError, ErrorKind};
///
/// let err = OrmError::new("Unknown receiver", ErrorKind::UnknownReceiver);
///
/// let cause = OrmError::new("connection refused", ErrorKind::ConnectionError);
/// let err = OrmError::new_with_cause("Failed to open replica", ErrorKind::InvalidConfiguration, cause);
/// ```
#[derive(Clone)]
pub struct OrmError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<OrmError>>,
    backtrace: Atomic<Backtrace>,
}

impl OrmError {
    /// Creates a new `OrmError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        OrmError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `OrmError` wrapping the error that caused it.
    pub fn new_with_cause(message: &str, error_kind: ErrorKind, cause: OrmError) -> Self {
        OrmError {
            message: message.to_string(),
            error_kind,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&OrmError> {
        self.cause.as_deref()
    }

    /// Returns true when this error reports a `get` query that matched no row.
    pub fn is_does_not_exist(&self) -> bool {
        self.error_kind == ErrorKind::DoesNotExist
    }
}

impl Display for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for OrmError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for OrmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// `OrmResult<T>` is shorthand for `Result<T, OrmError>`.
pub type OrmResult<T> = Result<T, OrmError>;

#[cfg(feature = "serde")]
impl serde::de::Error for OrmError {
    fn custom<T: Display>(msg: T) -> Self {
        OrmError::new(&msg.to_string(), ErrorKind::InvalidConfiguration)
    }
}

impl From<std::num::ParseIntError> for OrmError {
    fn from(err: std::num::ParseIntError) -> Self {
        OrmError::new(
            &format!("Integer parsing error: {}", err),
            ErrorKind::InvalidConfiguration,
        )
    }
}

impl From<String> for OrmError {
    fn from(msg: String) -> Self {
        OrmError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for OrmError {
    fn from(msg: &str) -> Self {
        OrmError::new(msg, ErrorKind::InternalError)
    }
}
