//! Query cursors
//!
//! A [`Cursor`] turns a [`QueryDescriptor`] into a sequence of round trips
//! against its collection and exposes the resulting documents three ways:
//! - `to_array`: materialize everything
//! - `each`: push every document into a callback, then `None`
//! - `next_object` / `stream`: pull one document at a time
//!
//! Every method that talks to the server takes `&mut self`, so a cursor never
//! has more than one request in flight.

use std::fmt;
use std::sync::Arc;

use bson::Document;
use futures::Stream;
use tracing::{debug, trace, warn};

use crate::error::{CursorError, Result, StateError};
use crate::protocol::{CollectionHandle, NO_CURSOR, Reply, WireRequest};

pub mod command;
pub mod descriptor;
mod fetch;
pub mod sort;


pub use command::CommandBuilder;
pub use descriptor::{Hint, QueryDescriptor};
pub use sort::SortSpec;

/// Lifecycle state. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CursorState {
    /// Nothing sent yet
    Init,

    /// First batch received
    Open,

    /// No further fetching
    Closed,
}

/// Client-side cursor over one query.
pub struct Cursor {
    /// Source collection
    source: Arc<dyn CollectionHandle>,

    /// `<database>.<collection>`
    namespace: String,

    /// Query to run; frozen once `query_run` is set
    descriptor: QueryDescriptor,

    state: CursorState,

    /// Initial query has been dispatched
    query_run: bool,

    /// Server cursor handle, [`NO_CURSOR`] when none is held
    cursor_id: i64,

    /// Documents retrieved so far
    items: Vec<Document>,

    number_of_returned: u64,

    /// Expected total, fixed by the first round trip
    total_number_of_records: u64,

    /// Pull-iteration position in `items`
    index: usize,
}

impl Cursor {
    /// Create a cursor in INIT over `source`.
    pub fn new(source: Arc<dyn CollectionHandle>, descriptor: QueryDescriptor) -> Self {
        let namespace = source.namespace();
        Self {
            source,
            namespace,
            descriptor,
            state: CursorState::Init,
            query_run: false,
            cursor_id: NO_CURSOR,
            items: Vec::new(),
            number_of_returned: 0,
            total_number_of_records: 0,
            index: 0,
        }
    }

    /// Fetch every document, close the cursor and return the documents.
    ///
    /// Fails with [`StateError::CursorClosed`] if the cursor is already closed.
    pub async fn to_array(&mut self) -> Result<Vec<Document>> {
        if self.state == CursorState::Closed {
            return Err(CursorError::closed());
        }

        if let Err(e) = self.fetch_all_records(None).await {
            warn!("Fetching '{}' failed: {}", self.namespace, e);
            return Err(e);
        }

        let items = std::mem::take(&mut self.items);
        self.release().await;
        Ok(items)
    }

    /// Deliver every document to `callback`, followed by a final `None`.
    ///
    /// The cursor is closed before the `None` is delivered. Errors raised while
    /// fetching are returned as-is and no `None` is delivered in that case.
    pub async fn each<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(Option<Document>),
    {
        if self.state == CursorState::Closed {
            return Err(CursorError::closed());
        }

        while let Some(doc) = self.next_object().await? {
            callback(Some(doc));
            if !self.has_buffered() {
                break;
            }
        }

        self.release().await;
        callback(None);
        Ok(())
    }

    /// Pull the next document.
    ///
    /// The first call runs the query (counting matches first when the query is
    /// unbounded) and buffers every document it will yield. Later calls serve
    /// from that buffer. `Ok(None)` marks the end of the stream; a cursor
    /// that was closed with nothing left buffered fails with
    /// [`StateError::CursorClosed`].
    pub async fn next_object(&mut self) -> Result<Option<Document>> {
        match self.state {
            CursorState::Init => {
                let known_count = if self.descriptor.limit == 0 {
                    Some(self.count().await?)
                } else {
                    None
                };
                self.fetch_all_records(known_count).await?;
            }
            CursorState::Closed if self.items.is_empty() => {
                return Err(CursorError::closed());
            }
            _ => {}
        }

        Ok(self.take_buffered())
    }

    /// Documents as a [`Stream`], built on [`Cursor::next_object`].
    pub fn stream(&mut self) -> impl Stream<Item = Result<Document>> + '_ {
        futures::stream::try_unfold(self, |cursor| async move {
            let next = cursor.next_object().await?;
            Ok::<_, CursorError>(next.map(|doc| (doc, cursor)))
        })
    }

    /// Replace the sort specification.
    ///
    /// Only allowed before the query has been dispatched and while the cursor
    /// is not closed. The sort is validated when the query is built.
    pub fn sort(&mut self, spec: impl Into<SortSpec>) -> Result<&mut Self> {
        if self.state == CursorState::Closed {
            return Err(StateError::CursorClosed.into());
        }
        if self.query_run {
            return Err(StateError::SortAfterQuery.into());
        }

        self.descriptor.sort = Some(spec.into());
        Ok(self)
    }

    /// Two-argument sort: `[[key, direction]]`.
    pub fn sort_by(&mut self, key: &str, direction: impl Into<bson::Bson>) -> Result<&mut Self> {
        self.sort(SortSpec::keyed(key, direction))
    }

    /// Count documents matching the filter, ignoring skip and limit.
    pub async fn count(&self) -> Result<u64> {
        self.source.count(&self.descriptor.filter).await
    }

    /// Fetch the query plan.
    ///
    /// Runs a separate single-batch cursor with `explain` set and closes it
    /// afterwards. This cursor is left untouched.
    pub async fn explain(&self) -> Result<Option<Document>> {
        let mut plan_cursor = Cursor::new(self.source.clone(), self.descriptor.for_explain());
        let plan = plan_cursor.next_object().await;
        plan_cursor.release().await;
        plan
    }

    /// Release the server cursor, if one is held, and close.
    ///
    /// Idempotent: the cursor id is reset before the kill request goes out, so
    /// a second call never issues another kill. Returns the kill reply when a
    /// request was sent. The buffer is dropped as well.
    pub async fn close(&mut self) -> Result<Option<Reply>> {
        let cursor_id = std::mem::replace(&mut self.cursor_id, NO_CURSOR);
        self.advance_state(CursorState::Closed);
        self.items.clear();
        self.index = 0;

        if cursor_id == NO_CURSOR {
            return Ok(None);
        }

        debug!("Killing cursor {} on '{}'", cursor_id, self.namespace);
        let reply = self
            .send(WireRequest::KillCursors(command::kill_cursor(cursor_id)))
            .await?;
        Ok(Some(reply))
    }

    /// Close, logging instead of returning a failed kill.
    async fn release(&mut self) {
        let cursor_id = self.cursor_id;
        if let Err(e) = self.close().await {
            warn!("Failed to kill cursor {} on '{}': {}", cursor_id, self.namespace, e);
        }
    }

    fn take_buffered(&mut self) -> Option<Document> {
        if !self.has_buffered() {
            return None;
        }
        let doc = self.items[self.index].clone();
        self.index += 1;
        Some(doc)
    }

    // The buffer is already capped at |limit|, so it alone decides what is left.
    fn has_buffered(&self) -> bool {
        self.index < self.items.len()
    }

    fn advance_state(&mut self, next: CursorState) {
        if next > self.state {
            trace!("Cursor on '{}': {:?} -> {:?}", self.namespace, self.state, next);
            self.state = next;
        }
    }

    pub fn state(&self) -> CursorState {
        self.state
    }

    pub fn query_run(&self) -> bool {
        self.query_run
    }

    pub fn cursor_id(&self) -> i64 {
        self.cursor_id
    }

    pub fn items(&self) -> &[Document] {
        &self.items
    }

    pub fn number_of_returned(&self) -> u64 {
        self.number_of_returned
    }

    pub fn total_number_of_records(&self) -> u64 {
        self.total_number_of_records
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

/// Manual Debug implementation since the collection handle is a trait object
impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("namespace", &self.namespace)
            .field("descriptor", &self.descriptor)
            .field("state", &self.state)
            .field("query_run", &self.query_run)
            .field("cursor_id", &self.cursor_id)
            .field("number_of_returned", &self.number_of_returned)
            .field("total_number_of_records", &self.total_number_of_records)
            .field("index", &self.index)
            .finish()
    }
}
