//! mongocursor
//!
//! Client-side query cursors for the MongoDB wire protocol. A cursor takes a
//! declarative query (filter, projection, skip/limit, sort, hint, explain,
//! snapshot, no-timeout), runs it against a collection in request/reply
//! round trips, pages through the server cursor, and hands the documents
//! back in bulk, by push or by pull.
//!
//! # Modules
//!
//! - `cli`: Command-line interface and argument parsing
//! - `config`: Configuration management
//! - `connection`: MongoDB driver-backed collections
//! - `cursor`: Cursor state machine, request generation and sort handling
//! - `error`: Error types and the structured failure result
//! - `protocol`: Request/reply values and the collection trait
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use bson::doc;
//! use mongocursor::config::Config;
//! use mongocursor::connection::ConnectionManager;
//! use mongocursor::cursor::{Cursor, QueryDescriptor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let mut manager = ConnectionManager::new(config.connection.clone());
//!     manager.connect().await?;
//!
//!     let users = manager.collection("shop", "users", &config.cursor).await?;
//!     let query = QueryDescriptor::new(doc! { "status": "active" })
//!         .sort(vec![("age", "desc")])
//!         .limit(20);
//!
//!     let mut cursor = Cursor::new(Arc::new(users), query);
//!     for doc in cursor.to_array().await? {
//!         println!("{doc}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod error;
pub mod protocol;

// Re-export commonly used types
pub use config::Config;
pub use connection::{ConnectionManager, DriverCollection};
pub use cursor::{Cursor, CursorState, QueryDescriptor, SortSpec};
pub use error::{CursorError, Failure, Result};
pub use protocol::{CollectionHandle, Reply, WireRequest};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
