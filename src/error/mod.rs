//! Error handling for cursor operations.
//!
//! Errors fall into two families that callers are expected to tell apart:
//! - State errors: the cursor is closed, or the sort was changed after the
//!   query already ran. These are a valid-but-stale cursor.
//! - Validation errors: a malformed sort specification or argument. These
//!   indicate an invalid call.
//!
//! Everything else (driver failures, malformed replies, configuration) is
//! carried by the remaining [`CursorError`] variants.
//!
//! # Example
//!
//! ```rust,no_run
//! use mongocursor::error::{CursorError, Failure, StateError};
//!
//! let err = CursorError::State(StateError::CursorClosed);
//! let failure = Failure::from(&err);
//! assert!(!failure.ok);
//! println!("{}", failure.to_json().unwrap());
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ConfigError, ConnectionError, CursorError, ExecutionError, Result, StateError,
    ValidationError,
};
pub use mongo::{ErrorInfo, Failure};
