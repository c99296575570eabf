//! Query descriptor
//!
//! The declarative half of a cursor: what to fetch and how. A descriptor is
//! frozen once the owning cursor dispatches its first request.

use bson::Document;

use super::sort::SortSpec;

/// Index suggestion passed to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Hint {
    /// Index key pattern, e.g. `{age: 1}`.
    Keys(Document),

    /// Index referenced by name.
    Name(String),
}

impl From<Document> for Hint {
    fn from(keys: Document) -> Self {
        Hint::Keys(keys)
    }
}

impl From<&str> for Hint {
    fn from(name: &str) -> Self {
        Hint::Name(name.to_string())
    }
}

/// Everything a cursor needs to build its requests.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryDescriptor {
    /// Filter document
    pub filter: Document,

    /// Projection spec
    pub projection: Option<Document>,

    /// Number of matching documents to skip
    pub skip: u32,

    /// 0 = unbounded; negative asks for a single batch of `|limit|`
    pub limit: i32,

    /// Sort specification, normalized lazily
    pub sort: Option<SortSpec>,

    /// Index hint
    pub hint: Option<Hint>,

    /// Request the query plan instead of documents
    pub explain: bool,

    /// Request an isolated snapshot of the result set
    pub snapshot: bool,

    /// Ask the server not to time out the cursor
    pub no_timeout: bool,
}

impl QueryDescriptor {
    /// Create a descriptor matching `filter` with every option at its default.
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn skip(mut self, skip: u32) -> Self {
        self.skip = skip;
        self
    }

    pub fn limit(mut self, limit: i32) -> Self {
        self.limit = limit;
        self
    }

    pub fn sort(mut self, sort: impl Into<SortSpec>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn hint(mut self, hint: impl Into<Hint>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn explain(mut self, explain: bool) -> Self {
        self.explain = explain;
        self
    }

    pub fn snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn no_timeout(mut self, no_timeout: bool) -> Self {
        self.no_timeout = no_timeout;
        self
    }

    /// True when the selector must be wrapped to carry sort, hint, explain or snapshot.
    pub fn needs_wrapper(&self) -> bool {
        self.sort.is_some() || self.hint.is_some() || self.explain || self.snapshot
    }

    /// Descriptor for the one-shot plan query backing `Cursor::explain`.
    pub fn for_explain(&self) -> Self {
        Self {
            limit: -self.limit.saturating_abs(),
            explain: true,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn test_builder_defaults() {
        let desc = QueryDescriptor::new(doc! { "status": "active" });
        assert_eq!(desc.limit, 0);
        assert_eq!(desc.skip, 0);
        assert!(!desc.explain);
        assert!(!desc.needs_wrapper());
    }

    #[test]
    fn test_needs_wrapper() {
        let base = QueryDescriptor::new(doc! {});
        assert!(base.clone().sort("age").needs_wrapper());
        assert!(base.clone().hint("age_1").needs_wrapper());
        assert!(base.clone().explain(true).needs_wrapper());
        assert!(base.clone().snapshot(true).needs_wrapper());
        assert!(!base.limit(5).skip(2).no_timeout(true).needs_wrapper());
    }

    #[test]
    fn test_for_explain_negates_limit() {
        let desc = QueryDescriptor::new(doc! {}).limit(20).sort("age");
        let plan = desc.for_explain();
        assert_eq!(plan.limit, -20);
        assert!(plan.explain);
        assert_eq!(plan.sort, desc.sort);

        assert_eq!(QueryDescriptor::new(doc! {}).limit(-3).for_explain().limit, -3);
        assert_eq!(QueryDescriptor::new(doc! {}).for_explain().limit, 0);
    }
}
