//! Batch fetching
//!
//! Drives the INIT -> OPEN -> CLOSED round trips of a cursor:
//! - INIT: send the initial query, learn how many documents to expect,
//!   record the server cursor id and the first batch
//! - OPEN: issue page-fetch requests until the expected total is buffered
//!   or the server reports exhaustion
//! - CLOSED: refuse to fetch
//!
//! Pages are fetched in a loop over an owned buffer, one round trip at a time.

use bson::Document;
use tracing::{debug, trace, warn};

use crate::error::{CursorError, Result};
use crate::protocol::{NO_CURSOR, Reply, WireRequest};

use super::CursorState;
use super::command::CommandBuilder;

impl super::Cursor {
    /// Run the fetch protocol until nothing is outstanding.
    ///
    /// `known_count` is a total resolved by the caller before the first round
    /// trip; it replaces the count query an unbounded cursor would otherwise
    /// issue.
    pub(super) async fn fetch_all_records(&mut self, known_count: Option<u64>) -> Result<()> {
        loop {
            match self.state {
                CursorState::Init => {
                    self.fetch_first_batch(known_count).await?;
                    // Only unbounded queries page past the first batch.
                    if self.descriptor.limit != 0 || !self.has_outstanding() {
                        return Ok(());
                    }
                }
                CursorState::Open => {
                    if !self.has_outstanding() {
                        return Ok(());
                    }
                    if self.cursor_id == NO_CURSOR {
                        debug!(
                            "Server exhausted cursor on '{}' after {} of {} documents",
                            self.namespace, self.number_of_returned, self.total_number_of_records
                        );
                        self.advance_state(CursorState::Closed);
                        return Ok(());
                    }
                    if self.fetch_next_batch().await? == 0 {
                        warn!(
                            "Empty batch for live cursor {} on '{}'; stopping with {} of {} documents",
                            self.cursor_id,
                            self.namespace,
                            self.number_of_returned,
                            self.total_number_of_records
                        );
                        return Ok(());
                    }
                }
                CursorState::Closed => return Err(CursorError::closed()),
            }
        }
    }

    /// Initial round trip. Fixes the expected total and moves to OPEN.
    async fn fetch_first_batch(&mut self, known_count: Option<u64>) -> Result<()> {
        let request = CommandBuilder::new(&self.namespace, &self.descriptor).query()?;
        debug!(
            "Querying '{}' (skip {}, limit {}, wrapped {})",
            request.namespace, request.skip, request.limit, request.wrapped
        );

        let reply = self.send(WireRequest::Query(request)).await?;
        let number_returned = u64::try_from(reply.number_returned).unwrap_or(0);
        let limit = self.descriptor.limit;

        self.total_number_of_records = if limit > 0 {
            // Fewer than `limit` back means the server had no more to give.
            number_returned.min(limit as u64)
        } else if limit < 0 {
            // Single-batch request; the server closes the cursor after it.
            number_returned
        } else {
            match known_count {
                Some(count) => count,
                None => {
                    debug!("Counting matches for unbounded query on '{}'", self.namespace);
                    self.source.count(&self.descriptor.filter).await?
                }
            }
        };

        self.cursor_id = reply.cursor_id;
        self.query_run = true;
        let appended = self.append_batch(reply.documents);
        self.advance_state(CursorState::Open);

        debug!(
            "First batch on '{}': {} documents, expecting {}, cursor id {}",
            self.namespace, appended, self.total_number_of_records, self.cursor_id
        );
        Ok(())
    }

    /// One page-fetch round trip. Returns the number of documents appended.
    async fn fetch_next_batch(&mut self) -> Result<usize> {
        let request = CommandBuilder::new(&self.namespace, &self.descriptor).get_more(self.cursor_id);
        debug!(
            "getMore on '{}' for cursor {} (batch {})",
            request.namespace, request.cursor_id, request.number_to_return
        );

        let reply = self.send(WireRequest::GetMore(request)).await?;
        self.cursor_id = reply.cursor_id;
        let appended = self.append_batch(reply.documents);

        debug!(
            "Fetched {} documents (total: {} of {})",
            appended, self.number_of_returned, self.total_number_of_records
        );
        Ok(appended)
    }

    /// Send one request to the collection.
    pub(super) async fn send(&self, request: WireRequest) -> Result<Reply> {
        trace!("Sending {} to '{}'", request.kind(), self.namespace);
        self.source.execute(request).await
    }

    /// Buffer a batch, never holding more than `|limit|` documents when a limit is set.
    fn append_batch(&mut self, documents: Vec<Document>) -> usize {
        let cap = u64::from(self.descriptor.limit.unsigned_abs());
        let room = if cap > 0 {
            cap.saturating_sub(self.number_of_returned) as usize
        } else {
            usize::MAX
        };

        let before = self.items.len();
        self.items.extend(documents.into_iter().take(room));
        let appended = self.items.len() - before;
        self.number_of_returned += appended as u64;
        appended
    }

    fn has_outstanding(&self) -> bool {
        self.number_of_returned < self.total_number_of_records
    }
}
