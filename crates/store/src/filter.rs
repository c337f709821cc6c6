use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::sort::compare_values;

/// Comparison operator of a single predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

/// `field <op> value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

impl Predicate {
    pub fn matches(&self, doc: &Value) -> bool {
        let ord = compare_values(doc.get(&self.field), Some(&self.value));
        match self.op {
            Op::Eq => ord == Ordering::Equal,
            Op::Ne => ord != Ordering::Equal,
            Op::Gt => ord == Ordering::Greater,
            Op::Gte => ord != Ordering::Less,
            Op::Lt => ord == Ordering::Less,
            Op::Lte => ord != Ordering::Greater,
        }
    }
}

/// An ordered conjunction of predicates. The empty filter matches everything.
///
/// Filters are built by callers and passed through to the store untouched;
/// their serialized form is stable, so it can key cursors and coalesced
/// requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with(field, Op::Eq, value)
    }

    pub fn with(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.predicates.iter().all(|p| p.matches(doc))
    }

    /// Canonical JSON form (predicate order preserved).
    pub fn to_canonical_json(&self) -> String {
        serde_json::to_string(&self.predicates).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_filter_matches_everything() {
        assert!(Filter::new().matches(&json!({})));
        assert!(Filter::new().matches(&json!({"a": 1})));
    }

    #[test]
    fn conjunction_of_equality_and_range() {
        let filter = Filter::new()
            .eq("follower", "0xabc")
            .with("rank", Op::Gte, 10);
        assert!(filter.matches(&json!({"follower": "0xabc", "rank": 10})));
        assert!(!filter.matches(&json!({"follower": "0xabc", "rank": 9})));
        assert!(!filter.matches(&json!({"follower": "0xdef", "rank": 50})));
        assert!(!filter.matches(&json!({"rank": 50})));
    }

    #[test]
    fn canonical_json_preserves_predicate_order() {
        let a = Filter::new().eq("x", 1).eq("y", 2);
        let b = Filter::new().eq("y", 2).eq("x", 1);
        assert_ne!(a.to_canonical_json(), b.to_canonical_json());
        assert_eq!(a.to_canonical_json(), a.clone().to_canonical_json());
    }
}
