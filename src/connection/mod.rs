//! Connection management for MongoDB
//!
//! This module provides the driver-backed side of the cursor engine:
//! - `ConnectionManager`: connects, pings and hands out collections
//! - `DriverCollection`: a [`CollectionHandle`] that maps cursor requests
//!   onto the `find`, `getMore`, `killCursors` and `explain` commands
//!
//! All commands of one `DriverCollection` run in a single client session so
//! that `getMore` and `killCursors` reach the cursor created by `find`.

use async_trait::async_trait;
use bson::{Bson, Document, doc};
use mongodb::{Client, ClientSession, Database, options::ClientOptions};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ConnectionConfig, CursorConfig};
use crate::error::{ConnectionError, ExecutionError, Result};
use crate::protocol::{
    CollectionHandle, GetMoreRequest, KillCursorsRequest, NO_CURSOR, QueryFlags, QueryRequest,
    Reply, WireRequest,
};

/// MongoDB connection manager
pub struct ConnectionManager {
    /// MongoDB client instance
    client: Option<Client>,

    /// Connection configuration
    config: ConnectionConfig,
}

impl ConnectionManager {
    /// Create a new, unconnected manager
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            client: None,
            config,
        }
    }

    /// Establish connection to MongoDB and verify it with a ping
    pub async fn connect(&mut self) -> Result<()> {
        let mut options = ClientOptions::parse(&self.config.uri)
            .await
            .map_err(|e| ConnectionError::InvalidUri(e.to_string()))?;

        let timeout = std::time::Duration::from_secs(self.config.timeout);
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        if let Some(app_name) = &self.config.app_name {
            options.app_name = Some(app_name.clone());
        }

        let client = Client::with_options(options)
            .map_err(|e| ConnectionError::ConnectionFailed(e.to_string()))?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| ConnectionError::PingFailed(e.to_string()))?;

        info!("Connected to {}", self.config.uri);
        self.client = Some(client);
        Ok(())
    }

    /// Drop the client
    pub async fn disconnect(&mut self) -> Result<()> {
        if let Some(client) = self.client.take() {
            client.shutdown().await;
            debug!("Disconnected");
        }
        Ok(())
    }

    /// Check if currently connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Get the MongoDB client
    pub fn get_client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ConnectionError::NotConnected.into())
    }

    /// Open a collection handle with its own session
    ///
    /// # Arguments
    /// * `database` - Database name
    /// * `collection` - Collection name
    /// * `cursor` - Cursor defaults (page size)
    pub async fn collection(
        &self,
        database: &str,
        collection: &str,
        cursor: &CursorConfig,
    ) -> Result<DriverCollection> {
        let client = self.get_client()?;
        let session = client.start_session().await?;
        Ok(DriverCollection {
            database: client.database(database),
            collection_name: collection.to_string(),
            batch_size: cursor.batch_size,
            session: Mutex::new(session),
        })
    }
}

/// Collection handle backed by the MongoDB driver
pub struct DriverCollection {
    database: Database,
    collection_name: String,
    /// Page size for unbounded queries, 0 = server default
    batch_size: u32,
    session: Mutex<ClientSession>,
}

impl DriverCollection {
    async fn run(&self, command: Document) -> Result<Document> {
        let mut session = self.session.lock().await;
        let reply = self
            .database
            .run_command(command)
            .session(&mut *session)
            .await?;
        Ok(reply)
    }

    async fn query(&self, request: QueryRequest) -> Result<Reply> {
        let parts = SelectorParts::from_request(&request);
        let find = find_command(&self.collection_name, &request, &parts, self.batch_size);

        if parts.snapshot {
            warn!("$snapshot is not supported by the find command; ignoring");
        }

        if parts.explain {
            let plan = self
                .run(doc! { "explain": find, "verbosity": "queryPlanner" })
                .await?;
            return Ok(Reply::batch(NO_CURSOR, vec![plan]));
        }

        let reply = self.run(find).await?;
        parse_cursor_reply(&reply, "firstBatch")
    }

    async fn get_more(&self, request: GetMoreRequest) -> Result<Reply> {
        let collection = collection_from_namespace(&request.namespace)
            .unwrap_or(self.collection_name.as_str());
        let mut command = doc! {
            "getMore": request.cursor_id,
            "collection": collection,
        };
        if request.number_to_return > 0 {
            command.insert("batchSize", i64::from(request.number_to_return));
        } else if self.batch_size > 0 {
            command.insert("batchSize", i64::from(self.batch_size));
        }

        let reply = self.run(command).await?;
        parse_cursor_reply(&reply, "nextBatch")
    }

    async fn kill_cursors(&self, request: KillCursorsRequest) -> Result<Reply> {
        let cursors: Vec<Bson> = request.cursor_ids.into_iter().map(Bson::Int64).collect();
        let reply = self
            .run(doc! {
                "killCursors": self.collection_name.as_str(),
                "cursors": cursors,
            })
            .await?;
        Ok(Reply::ack(reply))
    }
}

#[async_trait]
impl CollectionHandle for DriverCollection {
    fn database_name(&self) -> &str {
        self.database.name()
    }

    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn execute(&self, request: WireRequest) -> Result<Reply> {
        match request {
            WireRequest::Query(q) => self.query(q).await,
            WireRequest::GetMore(g) => self.get_more(g).await,
            WireRequest::KillCursors(k) => self.kill_cursors(k).await,
        }
    }

    async fn count(&self, filter: &Document) -> Result<u64> {
        let collection = self.database.collection::<Document>(&self.collection_name);
        let mut session = self.session.lock().await;
        collection
            .count_documents(filter.clone())
            .session(&mut *session)
            .await
            .map_err(|e| ExecutionError::CountFailed(e.to_string()).into())
    }
}

/// Query selector split back into its parts
#[derive(Debug, Default, PartialEq)]
struct SelectorParts {
    filter: Document,
    orderby: Option<Document>,
    hint: Option<Document>,
    explain: bool,
    snapshot: bool,
}

impl SelectorParts {
    fn from_request(request: &QueryRequest) -> Self {
        if !request.wrapped {
            return Self {
                filter: request.selector.clone(),
                ..Default::default()
            };
        }

        let selector = &request.selector;
        Self {
            filter: selector.get_document("query").cloned().unwrap_or_default(),
            orderby: selector.get_document("orderby").ok().cloned(),
            hint: selector.get_document("$hint").ok().cloned(),
            explain: selector.get_bool("$explain").unwrap_or(false),
            snapshot: selector.get_bool("$snapshot").unwrap_or(false),
        }
    }
}

/// Build the `find` command for a query request
fn find_command(
    collection: &str,
    request: &QueryRequest,
    parts: &SelectorParts,
    batch_size: u32,
) -> Document {
    let mut find = doc! {
        "find": collection,
        "filter": parts.filter.clone(),
    };

    if let Some(sort) = &parts.orderby {
        find.insert("sort", sort.clone());
    }
    if let Some(hint) = &parts.hint {
        find.insert("hint", hint.clone());
    }
    if let Some(projection) = &request.projection {
        find.insert("projection", projection.clone());
    }
    if request.skip > 0 {
        find.insert("skip", i64::from(request.skip));
    }

    match request.limit {
        0 => {
            if batch_size > 0 {
                find.insert("batchSize", i64::from(batch_size));
            }
        }
        n if n > 0 => {
            // The first batch must carry up to `limit` documents, like numberToReturn.
            find.insert("limit", i64::from(n));
            find.insert("batchSize", i64::from(n));
        }
        n => {
            find.insert("limit", i64::from(n.unsigned_abs()));
            find.insert("singleBatch", true);
        }
    }

    if request.flags.contains(QueryFlags::NO_CURSOR_TIMEOUT) {
        find.insert("noCursorTimeout", true);
    }

    find
}

/// Read `{cursor: {id, <batch_field>: [...]}}`
fn parse_cursor_reply(reply: &Document, batch_field: &str) -> Result<Reply> {
    let cursor = reply
        .get_document("cursor")
        .map_err(|e| ExecutionError::UnexpectedReply(format!("cursor: {e}")))?;

    let cursor_id = match cursor.get("id") {
        Some(Bson::Int64(id)) => *id,
        Some(Bson::Int32(id)) => i64::from(*id),
        other => {
            return Err(ExecutionError::UnexpectedReply(format!("cursor id: {other:?}")).into());
        }
    };

    let batch = cursor
        .get_array(batch_field)
        .map_err(|e| ExecutionError::UnexpectedReply(format!("{batch_field}: {e}")))?;

    let documents = batch
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Ok(doc.clone()),
            other => Err(ExecutionError::UnexpectedReply(format!(
                "non-document in {batch_field}: {other}"
            ))
            .into()),
        })
        .collect::<Result<Vec<Document>>>()?;

    Ok(Reply::batch(cursor_id, documents))
}

fn collection_from_namespace(namespace: &str) -> Option<&str> {
    namespace.split_once('.').map(|(_, collection)| collection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(selector: Document, wrapped: bool, limit: i32) -> QueryRequest {
        QueryRequest {
            namespace: "shop.users".to_string(),
            flags: QueryFlags::NONE,
            skip: 0,
            limit,
            selector,
            projection: None,
            wrapped,
        }
    }

    #[test]
    fn test_plain_selector_parts() {
        let req = request(doc! { "query": "literal field" }, false, 0);
        let parts = SelectorParts::from_request(&req);
        assert_eq!(parts.filter, doc! { "query": "literal field" });
        assert_eq!(parts.orderby, None);
        assert!(!parts.explain);
    }

    #[test]
    fn test_wrapped_selector_parts() {
        let req = request(
            doc! {
                "query": { "status": "active" },
                "orderby": { "age": -1 },
                "$hint": { "age": 1 },
                "$explain": true,
            },
            true,
            0,
        );
        let parts = SelectorParts::from_request(&req);
        assert_eq!(parts.filter, doc! { "status": "active" });
        assert_eq!(parts.orderby, Some(doc! { "age": -1 }));
        assert_eq!(parts.hint, Some(doc! { "age": 1 }));
        assert!(parts.explain);
        assert!(!parts.snapshot);
    }

    #[test]
    fn test_find_command_limits() {
        let parts = SelectorParts::default();

        let unbounded = find_command("users", &request(doc! {}, false, 0), &parts, 200);
        assert_eq!(unbounded.get_i64("batchSize").unwrap(), 200);
        assert!(unbounded.get("limit").is_none());

        let bounded = find_command("users", &request(doc! {}, false, 10), &parts, 200);
        assert_eq!(bounded.get_i64("limit").unwrap(), 10);
        assert_eq!(bounded.get_i64("batchSize").unwrap(), 10);

        // Larger than the server's default first batch of 101.
        let large = find_command("users", &request(doc! {}, false, 500), &parts, 0);
        assert_eq!(large.get_i64("limit").unwrap(), 500);
        assert_eq!(large.get_i64("batchSize").unwrap(), 500);
        assert!(bounded.get("singleBatch").is_none());

        let single = find_command("users", &request(doc! {}, false, -20), &parts, 0);
        assert_eq!(single.get_i64("limit").unwrap(), 20);
        assert!(single.get_bool("singleBatch").unwrap());
    }

    #[test]
    fn test_find_command_options() {
        let mut req = request(doc! { "query": { "a": 1 }, "orderby": { "a": 1 } }, true, 0);
        req.skip = 5;
        req.projection = Some(doc! { "a": 1, "_id": 0 });
        req.flags = QueryFlags::NO_CURSOR_TIMEOUT;
        let parts = SelectorParts::from_request(&req);

        let find = find_command("users", &req, &parts, 0);

        assert_eq!(find.get_str("find").unwrap(), "users");
        assert_eq!(find.get_document("filter").unwrap(), &doc! { "a": 1 });
        assert_eq!(find.get_document("sort").unwrap(), &doc! { "a": 1 });
        assert_eq!(find.get_i64("skip").unwrap(), 5);
        assert!(find.get_bool("noCursorTimeout").unwrap());
        assert!(find.get("batchSize").is_none());
    }

    #[test]
    fn test_parse_cursor_reply() {
        let reply = doc! {
            "cursor": {
                "id": 77_i64,
                "ns": "shop.users",
                "firstBatch": [ { "n": 1 }, { "n": 2 } ],
            },
            "ok": 1.0,
        };
        let parsed = parse_cursor_reply(&reply, "firstBatch").unwrap();
        assert_eq!(parsed.cursor_id, 77);
        assert_eq!(parsed.number_returned, 2);
        assert_eq!(parsed.documents[1], doc! { "n": 2 });
    }

    #[test]
    fn test_parse_cursor_reply_errors() {
        assert!(parse_cursor_reply(&doc! { "ok": 1 }, "firstBatch").is_err());
        let wrong_batch = doc! { "cursor": { "id": 0_i64, "nextBatch": [] } };
        assert!(parse_cursor_reply(&wrong_batch, "firstBatch").is_err());
        let bad_item = doc! { "cursor": { "id": 0_i64, "nextBatch": [1] } };
        assert!(parse_cursor_reply(&bad_item, "nextBatch").is_err());
    }

    #[test]
    fn test_collection_from_namespace() {
        assert_eq!(collection_from_namespace("shop.users"), Some("users"));
        assert_eq!(collection_from_namespace("shop.a.b"), Some("a.b"));
        assert_eq!(collection_from_namespace("plain"), None);
    }

    #[test]
    fn test_manager_starts_disconnected() {
        let manager = ConnectionManager::new(ConnectionConfig::default());
        assert!(!manager.is_connected());
        assert!(manager.get_client().is_err());
    }
}
