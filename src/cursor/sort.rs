//! Sort specification normalization
//!
//! Accepts the loose shapes callers hand to `Cursor::sort` and turns them
//! into the ordered `field -> direction` document the server understands:
//! - a single field name: `"age"` -> `{age: 1}`
//! - a list of field names: `["age", "name"]` -> `{age: 1, name: 1}`
//! - a list of pairs: `[["age", "desc"], ["name", "asc"]]` -> `{age: -1, name: 1}`
//!
//! Validation is deferred until the query command is generated.

use bson::{Bson, Document};

use crate::error::{CursorError, Result};

/// Direction value for ascending order.
pub const ASCENDING: i32 = 1;

/// Direction value for descending order.
pub const DESCENDING: i32 = -1;

const ILLEGAL_SORT: &str =
    "must be of the form [['field1', '(ascending|descending)'], ['field2', '(ascending|descending)']]";

/// Unvalidated sort specification.
#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec(Bson);

impl SortSpec {
    /// Wrap an arbitrary BSON value. Its shape is checked by [`SortSpec::normalize`].
    pub fn from_bson(value: Bson) -> Self {
        Self(value)
    }

    /// Single `[[key, direction]]` specification.
    pub fn keyed(key: impl Into<String>, direction: impl Into<Bson>) -> Self {
        Self(Bson::Array(vec![Bson::Array(vec![
            Bson::String(key.into()),
            direction.into(),
        ])]))
    }

    /// The raw value as supplied.
    pub fn as_bson(&self) -> &Bson {
        &self.0
    }

    /// Produce the canonical ordered `field -> ±1` mapping.
    ///
    /// An already-built document is rejected: callers must use the string or
    /// list forms so that field order is explicit.
    pub fn normalize(&self) -> Result<Document> {
        let mut order = Document::new();

        match &self.0 {
            Bson::String(field) => {
                order.insert(field.as_str(), ASCENDING);
            }
            Bson::Array(elements) => {
                for element in elements {
                    match element {
                        Bson::String(field) => {
                            order.insert(field.as_str(), ASCENDING);
                        }
                        Bson::Array(pair) => match pair.as_slice() {
                            [Bson::String(field), direction] => {
                                order.insert(field.as_str(), parse_direction(direction)?);
                            }
                            _ => return Err(CursorError::invalid_sort(ILLEGAL_SORT)),
                        },
                        _ => return Err(CursorError::invalid_sort(ILLEGAL_SORT)),
                    }
                }
            }
            Bson::Document(_) => {
                return Err(CursorError::invalid_sort(
                    "an ordered mapping was supplied; use a field name or a list of [field, direction] pairs",
                ));
            }
            _ => return Err(CursorError::invalid_sort(ILLEGAL_SORT)),
        }

        Ok(order)
    }
}

/// Map a direction token onto `1` or `-1`.
///
/// Strings are matched case-insensitively against `ascending|asc|1` and
/// `descending|desc|-1`; numbers must be exactly `1` or `-1`.
pub fn parse_direction(token: &Bson) -> Result<i32> {
    let direction = match token {
        Bson::String(s) => match s.to_lowercase().as_str() {
            "ascending" | "asc" | "1" => Some(ASCENDING),
            "descending" | "desc" | "-1" => Some(DESCENDING),
            _ => None,
        },
        Bson::Int32(1) | Bson::Int64(1) => Some(ASCENDING),
        Bson::Int32(-1) | Bson::Int64(-1) => Some(DESCENDING),
        Bson::Double(d) if *d == 1.0 => Some(ASCENDING),
        Bson::Double(d) if *d == -1.0 => Some(DESCENDING),
        _ => None,
    };

    direction.ok_or_else(|| CursorError::invalid_sort(format!("illegal direction {token}, {ILLEGAL_SORT}")))
}

impl From<&str> for SortSpec {
    fn from(field: &str) -> Self {
        Self(Bson::String(field.to_string()))
    }
}

impl From<String> for SortSpec {
    fn from(field: String) -> Self {
        Self(Bson::String(field))
    }
}

impl From<Vec<&str>> for SortSpec {
    fn from(fields: Vec<&str>) -> Self {
        Self(Bson::Array(
            fields.into_iter().map(|f| Bson::String(f.to_string())).collect(),
        ))
    }
}

impl From<Vec<(&str, &str)>> for SortSpec {
    fn from(pairs: Vec<(&str, &str)>) -> Self {
        Self(Bson::Array(
            pairs
                .into_iter()
                .map(|(field, dir)| {
                    Bson::Array(vec![Bson::String(field.to_string()), Bson::String(dir.to_string())])
                })
                .collect(),
        ))
    }
}

impl From<Vec<(&str, i32)>> for SortSpec {
    fn from(pairs: Vec<(&str, i32)>) -> Self {
        Self(Bson::Array(
            pairs
                .into_iter()
                .map(|(field, dir)| Bson::Array(vec![Bson::String(field.to_string()), Bson::Int32(dir)]))
                .collect(),
        ))
    }
}

impl From<Document> for SortSpec {
    fn from(doc: Document) -> Self {
        Self(Bson::Document(doc))
    }
}

impl From<Bson> for SortSpec {
    fn from(value: Bson) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{bson, doc};

    #[test]
    fn test_single_field_is_ascending() {
        let order = SortSpec::from("age").normalize().unwrap();
        assert_eq!(order, doc! { "age": 1 });
    }

    #[test]
    fn test_field_list_keeps_order() {
        let order = SortSpec::from(vec!["name", "age"]).normalize().unwrap();
        let keys: Vec<&String> = order.keys().collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert_eq!(order, doc! { "name": 1, "age": 1 });
    }

    #[test]
    fn test_direction_pairs() {
        let order = SortSpec::from(vec![("age", "desc"), ("name", "asc")])
            .normalize()
            .unwrap();
        assert_eq!(order, doc! { "age": -1, "name": 1 });
        let keys: Vec<&String> = order.keys().collect();
        assert_eq!(keys, vec!["age", "name"]);
    }

    #[test]
    fn test_direction_synonyms_case_insensitive() {
        for token in ["ascending", "ASC", "Asc", "1"] {
            assert_eq!(parse_direction(&Bson::String(token.into())).unwrap(), 1);
        }
        for token in ["descending", "DESC", "Descending", "-1"] {
            assert_eq!(parse_direction(&Bson::String(token.into())).unwrap(), -1);
        }
        assert_eq!(parse_direction(&Bson::Int32(-1)).unwrap(), -1);
        assert_eq!(parse_direction(&Bson::Int64(1)).unwrap(), 1);
        assert_eq!(parse_direction(&Bson::Double(-1.0)).unwrap(), -1);
    }

    #[test]
    fn test_illegal_direction() {
        let err = SortSpec::keyed("age", "sideways").normalize().unwrap_err();
        assert!(err.is_validation_error());

        assert!(parse_direction(&Bson::Int32(2)).is_err());
        assert!(parse_direction(&Bson::Boolean(true)).is_err());
    }

    #[test]
    fn test_mixed_list() {
        let spec = SortSpec::from_bson(bson!(["a", ["b", -1], ["c", "ascending"]]));
        assert_eq!(spec.normalize().unwrap(), doc! { "a": 1, "b": -1, "c": 1 });
    }

    #[test]
    fn test_ordered_mapping_rejected() {
        let err = SortSpec::from(doc! { "age": 1 }).normalize().unwrap_err();
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_other_shapes_rejected() {
        assert!(SortSpec::from_bson(Bson::Int32(1)).normalize().is_err());
        assert!(SortSpec::from_bson(bson!([["age"]])).normalize().is_err());
        assert!(SortSpec::from_bson(bson!([["age", 1, 2]])).normalize().is_err());
        assert!(SortSpec::from_bson(bson!([[1, "asc"]])).normalize().is_err());
        assert!(SortSpec::from_bson(bson!([true])).normalize().is_err());
    }
}
