//! Request generation
//!
//! Builds the requests a cursor sends. A [`CommandBuilder`] is a plain value
//! created per request from the descriptor and namespace; nothing here is
//! shared or mutated between requests.

use bson::{Document, doc};
use tracing::debug;

use crate::error::Result;
use crate::protocol::{GetMoreRequest, KillCursorsRequest, QueryFlags, QueryRequest};

use super::descriptor::{Hint, QueryDescriptor};

/// Request builder for one cursor's namespace.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    namespace: &'a str,
    descriptor: &'a QueryDescriptor,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(namespace: &'a str, descriptor: &'a QueryDescriptor) -> Self {
        Self {
            namespace,
            descriptor,
        }
    }

    /// Build the initial query request.
    ///
    /// The filter travels as-is unless sort, hint, explain or snapshot is set,
    /// in which case it is wrapped as `{query, orderby, $hint, $explain, $snapshot}`.
    /// Fails when the sort specification does not normalize.
    pub fn query(&self) -> Result<QueryRequest> {
        let desc = self.descriptor;
        let flags = if desc.no_timeout {
            QueryFlags::NO_CURSOR_TIMEOUT
        } else {
            QueryFlags::NONE
        };

        let (selector, wrapped) = if desc.needs_wrapper() {
            (self.wrapped_selector()?, true)
        } else {
            (desc.filter.clone(), false)
        };

        Ok(QueryRequest {
            namespace: self.namespace.to_string(),
            flags,
            skip: desc.skip,
            limit: desc.limit,
            selector,
            projection: desc.projection.clone(),
            wrapped,
        })
    }

    fn wrapped_selector(&self) -> Result<Document> {
        let desc = self.descriptor;
        let mut selector = doc! { "query": desc.filter.clone() };

        if let Some(sort) = &desc.sort {
            selector.insert("orderby", sort.normalize()?);
        }

        match &desc.hint {
            Some(Hint::Keys(keys)) => {
                selector.insert("$hint", keys.clone());
            }
            // Named hints are not forwarded in the wrapper.
            Some(Hint::Name(name)) => {
                debug!("Dropping index-name hint '{}' from query selector", name);
            }
            None => {}
        }

        if desc.explain {
            selector.insert("$explain", true);
        }
        if desc.snapshot {
            selector.insert("$snapshot", true);
        }

        Ok(selector)
    }

    /// Page-fetch request for `cursor_id`, sized by the descriptor's limit.
    pub fn get_more(&self, cursor_id: i64) -> GetMoreRequest {
        GetMoreRequest {
            namespace: self.namespace.to_string(),
            number_to_return: self.descriptor.limit,
            cursor_id,
        }
    }
}

/// Release request for a single server cursor.
pub fn kill_cursor(cursor_id: i64) -> KillCursorsRequest {
    KillCursorsRequest {
        cursor_ids: vec![cursor_id],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::SortSpec;

    const NS: &str = "shop.users";

    #[test]
    fn test_plain_query() {
        let desc = QueryDescriptor::new(doc! { "status": "active" })
            .projection(doc! { "name": 1 })
            .skip(5)
            .limit(10);
        let req = CommandBuilder::new(NS, &desc).query().unwrap();

        assert_eq!(req.namespace, "shop.users");
        assert_eq!(req.selector, doc! { "status": "active" });
        assert!(!req.wrapped);
        assert_eq!(req.skip, 5);
        assert_eq!(req.limit, 10);
        assert_eq!(req.projection, Some(doc! { "name": 1 }));
        assert_eq!(req.flags, QueryFlags::NONE);
    }

    #[test]
    fn test_wrapped_query_field_order() {
        let desc = QueryDescriptor::new(doc! { "status": "active" })
            .sort(vec![("age", "desc"), ("name", "asc")])
            .hint(doc! { "age": 1 })
            .explain(true)
            .snapshot(true);
        let req = CommandBuilder::new(NS, &desc).query().unwrap();

        assert!(req.wrapped);
        assert_eq!(
            req.selector,
            doc! {
                "query": { "status": "active" },
                "orderby": { "age": -1, "name": 1 },
                "$hint": { "age": 1 },
                "$explain": true,
                "$snapshot": true,
            }
        );
        let keys: Vec<&String> = req.selector.keys().collect();
        assert_eq!(keys, vec!["query", "orderby", "$hint", "$explain", "$snapshot"]);
    }

    #[test]
    fn test_named_hint_is_dropped() {
        let desc = QueryDescriptor::new(doc! { "a": 1 }).hint("a_1");
        let req = CommandBuilder::new(NS, &desc).query().unwrap();

        assert!(req.wrapped);
        assert_eq!(req.selector, doc! { "query": { "a": 1 } });
    }

    #[test]
    fn test_no_timeout_flag() {
        let desc = QueryDescriptor::new(doc! {}).no_timeout(true);
        let req = CommandBuilder::new(NS, &desc).query().unwrap();
        assert!(req.flags.contains(QueryFlags::NO_CURSOR_TIMEOUT));
    }

    #[test]
    fn test_invalid_sort_fails_generation() {
        let mut desc = QueryDescriptor::new(doc! {});
        desc.sort = Some(SortSpec::keyed("age", "sideways"));
        let err = CommandBuilder::new(NS, &desc).query().unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_get_more_and_kill() {
        let desc = QueryDescriptor::new(doc! {}).limit(25);
        let get_more = CommandBuilder::new(NS, &desc).get_more(99);
        assert_eq!(get_more.cursor_id, 99);
        assert_eq!(get_more.number_to_return, 25);
        assert_eq!(get_more.namespace, NS);

        assert_eq!(kill_cursor(99).cursor_ids, vec![99]);
    }
}
