use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity field carried by every stored document.
pub const ID_FIELD: &str = "_id";

/// Direction of a single sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    pub fn flip(self) -> Self {
        match self {
            Order::Asc => Order::Desc,
            Order::Desc => Order::Asc,
        }
    }
}

/// One field of a sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub order: Order,
}

/// A deterministic total order over a collection: a primary key plus a
/// tie-break on a unique field.
///
/// Repeated scans with the same filter and `SortSpec` return documents in
/// the same sequence, which is what makes offset-based cursors resumable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub primary: SortKey,
    pub tie_break: SortKey,
}

impl SortSpec {
    /// Sort by `field`, breaking ties on `_id` ascending.
    pub fn by(field: impl Into<String>, order: Order) -> Self {
        Self {
            primary: SortKey {
                field: field.into(),
                order,
            },
            tie_break: SortKey {
                field: ID_FIELD.to_string(),
                order: Order::Asc,
            },
        }
    }

    /// Insertion order. Store-assigned ids increase monotonically.
    pub fn insertion_order() -> Self {
        Self::by(ID_FIELD, Order::Asc)
    }

    /// The same order scanned from the opposite edge.
    pub fn reversed(&self) -> Self {
        Self {
            primary: SortKey {
                field: self.primary.field.clone(),
                order: self.primary.order.flip(),
            },
            tie_break: SortKey {
                field: self.tie_break.field.clone(),
                order: self.tie_break.order.flip(),
            },
        }
    }

    /// Stable textual form, e.g. `"createdAt:desc,_id:asc"`.
    pub fn fingerprint(&self) -> String {
        format!(
            "{}:{},{}:{}",
            self.primary.field,
            order_str(self.primary.order),
            self.tie_break.field,
            order_str(self.tie_break.order)
        )
    }

    /// Compare two documents under this order.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        compare_key(&self.primary, a, b).then_with(|| compare_key(&self.tie_break, a, b))
    }
}

fn order_str(order: Order) -> &'static str {
    match order {
        Order::Asc => "asc",
        Order::Desc => "desc",
    }
}

fn compare_key(key: &SortKey, a: &Value, b: &Value) -> Ordering {
    let ord = compare_values(a.get(&key.field), b.get(&key.field));
    match key.order {
        Order::Asc => ord,
        Order::Desc => ord.reverse(),
    }
}

/// Total order over JSON values: missing/null < bool < number < string < other.
///
/// Values of the "other" class (arrays, objects) compare by their JSON text.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.unwrap_or(&Value::Null);
    let b = b.unwrap_or(&Value::Null);
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Null, Value::Null) => Ordering::Equal,
        _ if rank(a) != rank(b) => rank(a).cmp(&rank(b)),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

fn rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) | Value::Object(_) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_sorts_before_present() {
        assert_eq!(
            compare_values(None, Some(&json!(0))),
            Ordering::Less,
            "missing field must sort first"
        );
        assert_eq!(compare_values(Some(&json!("a")), Some(&json!(5))), Ordering::Greater);
    }

    #[test]
    fn tie_break_orders_equal_primaries() {
        let sort = SortSpec::by("score", Order::Desc);
        let a = json!({"_id": "01", "score": 3});
        let b = json!({"_id": "02", "score": 3});
        let c = json!({"_id": "03", "score": 9});
        assert_eq!(sort.compare(&a, &b), Ordering::Less);
        assert_eq!(sort.compare(&c, &a), Ordering::Less);
    }

    #[test]
    fn reversed_flips_both_keys() {
        let sort = SortSpec::by("score", Order::Desc);
        let rev = sort.reversed();
        assert_eq!(rev.primary.order, Order::Asc);
        assert_eq!(rev.tie_break.order, Order::Desc);
        assert_eq!(rev.reversed(), sort);
        assert_eq!(sort.fingerprint(), "score:desc,_id:asc");
    }
}
