//! Wire-level request and reply values
//!
//! This module defines what a cursor sends to and receives from its
//! collection. The encoding of these values onto a socket is the job of
//! whatever implements [`CollectionHandle`]:
//! - `QueryRequest`: initial query, plain or wrapped selector
//! - `GetMoreRequest`: next batch for a live server cursor
//! - `KillCursorsRequest`: release of server cursors
//! - `Reply`: the batch (or acknowledgement) a request produces

use async_trait::async_trait;
use bson::Document;

use crate::error::Result;

/// Sentinel cursor id meaning "no open server resource".
pub const NO_CURSOR: i64 = 0;

/// Option bits carried by a query request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryFlags(u32);

impl QueryFlags {
    /// Default options; the server may time out idle cursors.
    pub const NONE: QueryFlags = QueryFlags(0);

    /// Ask the server not to time out the cursor.
    pub const NO_CURSOR_TIMEOUT: QueryFlags = QueryFlags(1 << 4);

    /// Raw bit value.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Check whether every bit of `other` is set.
    pub fn contains(self, other: QueryFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

/// Initial query request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// `<database>.<collection>`
    pub namespace: String,
    pub flags: QueryFlags,
    pub skip: u32,
    /// 0 = server default, negative = single batch of `|limit|` then close
    pub limit: i32,
    /// Filter document, or the wrapper carrying `query`/`orderby`/`$hint`/...
    pub selector: Document,
    pub projection: Option<Document>,
    /// True when `selector` is the wrapper form.
    pub wrapped: bool,
}

/// Page-fetch request for an open server cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct GetMoreRequest {
    pub namespace: String,
    pub number_to_return: i32,
    pub cursor_id: i64,
}

/// Release request for server cursors.
#[derive(Debug, Clone, PartialEq)]
pub struct KillCursorsRequest {
    pub cursor_ids: Vec<i64>,
}

/// Any request a cursor dispatches.
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Query(QueryRequest),
    GetMore(GetMoreRequest),
    KillCursors(KillCursorsRequest),
}

impl WireRequest {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            WireRequest::Query(_) => "query",
            WireRequest::GetMore(_) => "getMore",
            WireRequest::KillCursors(_) => "killCursors",
        }
    }
}

/// Reply to a request.
///
/// Query and page-fetch replies carry a batch and the cursor id the server
/// assigned (or [`NO_CURSOR`] once exhausted). Kill replies carry the
/// server's acknowledgement in `documents`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub cursor_id: i64,
    pub number_returned: i32,
    pub documents: Vec<Document>,
}

impl Reply {
    /// Build a reply whose `number_returned` matches the batch length.
    pub fn batch(cursor_id: i64, documents: Vec<Document>) -> Self {
        Self {
            cursor_id,
            number_returned: documents.len() as i32,
            documents,
        }
    }

    /// Reply without a batch, e.g. a kill acknowledgement.
    pub fn ack(result: Document) -> Self {
        Self {
            cursor_id: NO_CURSOR,
            number_returned: 1,
            documents: vec![result],
        }
    }
}

/// Source collection of a cursor.
///
/// Exposes the namespace parts used to address requests and the two
/// round-trip primitives a cursor consumes.
#[async_trait]
pub trait CollectionHandle: Send + Sync {
    /// Name of the owning database.
    fn database_name(&self) -> &str;

    /// Name of the collection.
    fn collection_name(&self) -> &str;

    /// Dispatch a request and wait for its reply.
    async fn execute(&self, request: WireRequest) -> Result<Reply>;

    /// Count documents matching `filter`.
    async fn count(&self, filter: &Document) -> Result<u64>;

    /// `<database>.<collection>`
    fn namespace(&self) -> String {
        format!("{}.{}", self.database_name(), self.collection_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_query_flags() {
        assert_eq!(QueryFlags::NONE.bits(), 0);
        assert_eq!(QueryFlags::NO_CURSOR_TIMEOUT.bits(), 16);
        assert!(QueryFlags::NO_CURSOR_TIMEOUT.contains(QueryFlags::NO_CURSOR_TIMEOUT));
        assert!(!QueryFlags::NONE.contains(QueryFlags::NO_CURSOR_TIMEOUT));
    }

    #[test]
    fn test_reply_batch_counts_documents() {
        let reply = Reply::batch(7, vec![doc! { "a": 1 }, doc! { "a": 2 }]);
        assert_eq!(reply.number_returned, 2);
        assert_eq!(reply.cursor_id, 7);

        let ack = Reply::ack(doc! { "ok": 1 });
        assert_eq!(ack.cursor_id, NO_CURSOR);
        assert_eq!(ack.documents.len(), 1);
    }
}
