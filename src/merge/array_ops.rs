//! Array post-processing: deduplication, sorting and flattening

use super::SortDirection;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Remove repeated items, keeping the first occurrence.
///
/// With an identifier field, items are compared on that field only and
/// items lacking it are always kept. Otherwise whole values are compared by
/// their JSON text. Returns the number of items removed.
pub fn deduplicate(items: &mut Vec<Value>, identifier_field: Option<&str>) -> usize {
    let before = items.len();
    let mut seen = HashSet::<String>::new();

    items.retain(|item| match identifier_field {
        Some(field) => match item.as_object().and_then(|obj| obj.get(field)) {
            Some(id) => seen.insert(id.to_string()),
            None => true,
        },
        None => seen.insert(item.to_string()),
    });

    before - items.len()
}

/// Stable sort, either on the items themselves or on one of their fields.
///
/// Items missing the sort field go last in both directions.
pub fn sort_items(items: &mut [Value], field: Option<&str>, direction: SortDirection) {
    let directed = |ordering: Ordering| match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    };

    match field {
        Some(field) => items.sort_by(|a, b| {
            let a = a.as_object().and_then(|obj| obj.get(field));
            let b = b.as_object().and_then(|obj| obj.get(field));
            match (a, b) {
                (Some(a), Some(b)) => directed(compare_values(a, b)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        }),
        None => items.sort_by(|a, b| directed(compare_values(a, b))),
    }
}

/// Total order over JSON values: by type first, then naturally within a type.
///
/// Arrays and objects have no natural order and compare equal to their kind.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Splice nested arrays into their parent, down to `depth` levels.
///
/// `None` and `Some(0)` flatten completely.
pub fn flatten(items: Vec<Value>, depth: Option<usize>) -> Vec<Value> {
    let depth = match depth {
        Some(0) | None => usize::MAX,
        Some(depth) => depth,
    };
    flatten_into(items, depth, Vec::new())
}

fn flatten_into(items: Vec<Value>, depth: usize, mut out: Vec<Value>) -> Vec<Value> {
    for item in items {
        match item {
            Value::Array(nested) if depth > 0 => out = flatten_into(nested, depth - 1, out),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn values(v: Value) -> Vec<Value> {
        match v {
            Value::Array(items) => items,
            _ => panic!("expected array"),
        }
    }

    #[test]
    fn test_deduplicate_by_identifier_keeps_first() {
        let mut items = values(json!([
            {"id": 1, "name": "a"},
            {"id": 2, "name": "b"},
            {"id": 1, "name": "c"},
            {"name": "no id"},
            {"name": "no id"}
        ]));
        let removed = deduplicate(&mut items, Some("id"));

        assert_eq!(removed, 1);
        assert_eq!(
            Value::Array(items),
            json!([
                {"id": 1, "name": "a"},
                {"id": 2, "name": "b"},
                {"name": "no id"},
                {"name": "no id"}
            ])
        );
    }

    #[test]
    fn test_deduplicate_whole_values() {
        let mut items = values(json!([1, "1", 1, {"a": 1}, {"a": 1}]));
        assert_eq!(deduplicate(&mut items, None), 2);
        assert_eq!(Value::Array(items), json!([1, "1", {"a": 1}]));
    }

    #[test]
    fn test_sort_natural_ascending_and_descending() {
        let mut items = values(json!([3, 1, 2]));
        sort_items(&mut items, None, SortDirection::Asc);
        assert_eq!(Value::Array(items.clone()), json!([1, 2, 3]));

        sort_items(&mut items, None, SortDirection::Desc);
        assert_eq!(Value::Array(items), json!([3, 2, 1]));
    }

    #[test]
    fn test_sort_by_field_puts_missing_last() {
        let mut items = values(json!([
            {"n": 2},
            {"other": true},
            {"n": 1},
            "scalar"
        ]));
        sort_items(&mut items, Some("n"), SortDirection::Desc);
        assert_eq!(
            Value::Array(items),
            json!([{"n": 2}, {"n": 1}, {"other": true}, "scalar"])
        );
    }

    #[test]
    fn test_mixed_types_order_by_kind() {
        let mut items = values(json!(["b", 2, null, true, "a", 1]));
        sort_items(&mut items, None, SortDirection::Asc);
        assert_eq!(Value::Array(items), json!([null, true, 1, 2, "a", "b"]));
    }

    #[test]
    fn test_flatten_depths() {
        let nested = values(json!([1, [2, [3, [4]]]]));
        assert_eq!(
            Value::Array(flatten(nested.clone(), Some(1))),
            json!([1, 2, [3, [4]]])
        );
        assert_eq!(
            Value::Array(flatten(nested.clone(), None)),
            json!([1, 2, 3, 4])
        );
        assert_eq!(Value::Array(flatten(nested, Some(0))), json!([1, 2, 3, 4]));
    }
}
