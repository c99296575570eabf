use std::{fmt, io};

use crate::error::mongo::format_mongodb_error;

/// Crate-wide `Result` type using [`CursorError`] as the error.
pub type Result<T> = std::result::Result<T, CursorError>;

/// Top-level error type for cursor operations.
#[derive(Debug)]
pub enum CursorError {
    /// The cursor cannot serve the call in its current lifecycle state.
    State(StateError),

    /// The call itself was malformed.
    Validation(ValidationError),

    /// A round trip through the command-execution collaborator failed.
    Execution(ExecutionError),

    /// Connection-related errors.
    Connection(ConnectionError),

    /// Configuration errors.
    Config(ConfigError),

    /// I/O errors.
    Io(io::Error),

    /// MongoDB driver errors.
    MongoDb(mongodb::error::Error),
}

/// Lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The cursor reached CLOSED and will not fetch again.
    CursorClosed,

    /// The sort was changed after the query was dispatched.
    SortAfterQuery,
}

/// Invalid input supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Sort specification with an unsupported shape or direction token.
    InvalidSortSpecification(String),

    /// Any other invalid argument.
    InvalidArgument(String),
}

/// Execution-specific errors.
#[derive(Debug)]
pub enum ExecutionError {
    /// The server or transport rejected a command.
    CommandFailed(String),

    /// A reply did not have the shape the request expects.
    UnexpectedReply(String),

    /// The count query failed.
    CountFailed(String),
}

/// Connection-specific errors.
#[derive(Debug)]
pub enum ConnectionError {
    /// Failed to establish a connection.
    ConnectionFailed(String),

    /// Invalid connection URI.
    InvalidUri(String),

    /// Not currently connected to MongoDB.
    NotConnected,

    /// Ping command failed.
    PingFailed(String),
}

/// Configuration-specific errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Config file not found.
    FileNotFound(String),

    /// Invalid config format.
    InvalidFormat(String),

    /// Invalid field value.
    InvalidValue { field: String, value: String },
}

impl CursorError {
    /// True for closed-cursor and sort-after-query failures.
    pub fn is_state_error(&self) -> bool {
        matches!(self, CursorError::State(_))
    }

    /// True for malformed input.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, CursorError::Validation(_))
    }

    /// Shorthand for the closed-cursor error.
    pub fn closed() -> Self {
        CursorError::State(StateError::CursorClosed)
    }

    /// Shorthand for an invalid sort specification.
    pub fn invalid_sort(msg: impl Into<String>) -> Self {
        CursorError::Validation(ValidationError::InvalidSortSpecification(msg.into()))
    }
}

/* ========================= Display & Error impls ========================= */

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::State(e) => write!(f, "{e}"),
            CursorError::Validation(e) => write!(f, "{e}"),
            CursorError::Execution(e) => write!(f, "Execution error: {e}"),
            CursorError::Connection(e) => write!(f, "Connection error: {e}"),
            CursorError::Config(e) => write!(f, "Configuration error: {e}"),
            CursorError::Io(e) => write!(f, "I/O error: {e}"),
            CursorError::MongoDb(e) => format_mongodb_error(f, e),
        }
    }
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateError::CursorClosed => write!(f, "Cursor is closed"),
            StateError::SortAfterQuery => {
                write!(f, "Cursor sort cannot be changed after the query has run")
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidSortSpecification(msg) => {
                write!(f, "Invalid sort specification: {msg}")
            }
            ValidationError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
        }
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::CommandFailed(msg) => write!(f, "Command failed: {msg}"),
            ExecutionError::UnexpectedReply(msg) => write!(f, "Unexpected reply: {msg}"),
            ExecutionError::CountFailed(msg) => write!(f, "Count failed: {msg}"),
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionError::ConnectionFailed(msg) => write!(f, "Failed to connect: {msg}"),
            ConnectionError::InvalidUri(uri) => write!(f, "Invalid connection URI: {uri}"),
            ConnectionError::NotConnected => write!(f, "Not connected to MongoDB"),
            ConnectionError::PingFailed(msg) => write!(f, "Ping failed: {msg}"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {path}"),
            ConfigError::InvalidFormat(msg) => write!(f, "Invalid config format: {msg}"),
            ConfigError::InvalidValue { field, value } => {
                write!(f, "Invalid value '{value}' for field '{field}'")
            }
        }
    }
}

impl std::error::Error for CursorError {}
impl std::error::Error for StateError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ExecutionError {}
impl std::error::Error for ConnectionError {}
impl std::error::Error for ConfigError {}

/* ========================= Conversions to CursorError ========================= */

impl From<io::Error> for CursorError {
    fn from(err: io::Error) -> Self {
        CursorError::Io(err)
    }
}

impl From<mongodb::error::Error> for CursorError {
    fn from(err: mongodb::error::Error) -> Self {
        CursorError::MongoDb(err)
    }
}

impl From<StateError> for CursorError {
    fn from(err: StateError) -> Self {
        CursorError::State(err)
    }
}

impl From<ValidationError> for CursorError {
    fn from(err: ValidationError) -> Self {
        CursorError::Validation(err)
    }
}

impl From<ExecutionError> for CursorError {
    fn from(err: ExecutionError) -> Self {
        CursorError::Execution(err)
    }
}

impl From<ConnectionError> for CursorError {
    fn from(err: ConnectionError) -> Self {
        CursorError::Connection(err)
    }
}

impl From<ConfigError> for CursorError {
    fn from(err: ConfigError) -> Self {
        CursorError::Config(err)
    }
}
