//! Size and positional access over the supported collection kinds

use super::{CollectionKind, IterationError};
use serde_json::{json, Map, Value};

/// Number of items the collection yields under `kind`
///
/// Collections that do not match their declared kind are empty. A range
/// whose bounds are present but not numeric is an error.
pub fn size(collection: &Value, kind: CollectionKind) -> Result<usize, IterationError> {
    if collection.is_null() {
        return Ok(0);
    }

    let size = match kind {
        CollectionKind::Array => collection.as_array().map_or(0, Vec::len),
        CollectionKind::Object => keyed_len(collection).unwrap_or(0),
        CollectionKind::Range => match range_bounds(collection)? {
            Some((start, end)) => count_from_span(end - start + 1.0),
            None => 0,
        },
        CollectionKind::Custom => match collection {
            Value::Array(items) => items.len(),
            Value::Object(map) => map.len(),
            Value::Number(n) => count_from_span(n.as_f64().unwrap_or(0.0)),
            _ => 0,
        },
    };
    Ok(size)
}

/// Item at `index`, or `None` past the end
pub fn item_at(collection: &Value, index: usize, kind: CollectionKind) -> Option<Value> {
    match (kind, collection) {
        (_, Value::Null) => None,
        (CollectionKind::Array, Value::Array(items)) => items.get(index).cloned(),
        (CollectionKind::Array, _) => None,
        (CollectionKind::Object, _) => keyed_item(collection, index),
        (CollectionKind::Range, _) => {
            let start = collection.get("start")?;
            collection.get("end")?;
            Some(offset(start, index))
        }
        (CollectionKind::Custom, Value::Array(items)) => items.get(index).cloned(),
        (CollectionKind::Custom, Value::Object(map)) => pair(map, index),
        (CollectionKind::Custom, Value::Number(_)) => Some(Value::from(index)),
        (CollectionKind::Custom, _) => None,
    }
}

/// Arrays count as keyed collections with their indices as keys
fn keyed_len(collection: &Value) -> Option<usize> {
    match collection {
        Value::Object(map) => Some(map.len()),
        Value::Array(items) => Some(items.len()),
        _ => None,
    }
}

fn keyed_item(collection: &Value, index: usize) -> Option<Value> {
    match collection {
        Value::Object(map) => pair(map, index),
        Value::Array(items) => items
            .get(index)
            .map(|value| json!({"key": index.to_string(), "value": value})),
        _ => None,
    }
}

fn pair(map: &Map<String, Value>, index: usize) -> Option<Value> {
    map.iter()
        .nth(index)
        .map(|(key, value)| json!({"key": key, "value": value}))
}

fn range_bounds(collection: &Value) -> Result<Option<(f64, f64)>, IterationError> {
    let (Some(start), Some(end)) = (collection.get("start"), collection.get("end")) else {
        return Ok(None);
    };
    let as_bound = |v: &Value| match v {
        Value::Null => Some(0.0),
        other => other.as_f64(),
    };
    match (as_bound(start), as_bound(end)) {
        (Some(s), Some(e)) => Ok(Some((s, e))),
        _ => Err(IterationError::InvalidRange {
            start: start.clone(),
            end: end.clone(),
        }),
    }
}

fn count_from_span(span: f64) -> usize {
    if span.is_finite() && span > 0.0 {
        span.ceil() as usize
    } else {
        0
    }
}

/// `start + index`, staying integral when the start is
fn offset(start: &Value, index: usize) -> Value {
    let integral = start
        .as_i64()
        .and_then(|s| i64::try_from(index).ok().and_then(|i| s.checked_add(i)));
    if let Some(value) = integral {
        return Value::from(value);
    }
    match start.as_f64() {
        Some(s) => json!(s + index as f64),
        None => Value::from(index),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_size_and_items() {
        let c = json!(["a", "b", "c"]);
        assert_eq!(size(&c, CollectionKind::Array).unwrap(), 3);
        assert_eq!(item_at(&c, 1, CollectionKind::Array), Some(json!("b")));
        assert_eq!(item_at(&c, 3, CollectionKind::Array), None);
    }

    #[test]
    fn test_mismatched_kind_is_empty() {
        assert_eq!(size(&json!({"a": 1}), CollectionKind::Array).unwrap(), 0);
        assert_eq!(size(&json!("text"), CollectionKind::Object).unwrap(), 0);
        assert_eq!(size(&Value::Null, CollectionKind::Range).unwrap(), 0);
    }

    #[test]
    fn test_object_items_are_key_value_pairs_in_order() {
        let c = json!({"zeta": 1, "alpha": 2});
        assert_eq!(size(&c, CollectionKind::Object).unwrap(), 2);
        assert_eq!(
            item_at(&c, 0, CollectionKind::Object),
            Some(json!({"key": "zeta", "value": 1}))
        );
        assert_eq!(
            item_at(&c, 1, CollectionKind::Object),
            Some(json!({"key": "alpha", "value": 2}))
        );
    }

    #[test]
    fn test_arrays_iterated_as_objects_use_index_keys() {
        let c = json!([true]);
        assert_eq!(
            item_at(&c, 0, CollectionKind::Object),
            Some(json!({"key": "0", "value": true}))
        );
    }

    #[test]
    fn test_range_is_inclusive() {
        let c = json!({"start": 3, "end": 6});
        assert_eq!(size(&c, CollectionKind::Range).unwrap(), 4);
        assert_eq!(item_at(&c, 0, CollectionKind::Range), Some(json!(3)));
        assert_eq!(item_at(&c, 3, CollectionKind::Range), Some(json!(6)));
    }

    #[test]
    fn test_range_near_i64_max_falls_back_to_floats() {
        let c = json!({"start": 9_223_372_036_854_775_000_i64, "end": i64::MAX});
        assert!(size(&c, CollectionKind::Range).unwrap() > 900);
        assert_eq!(
            item_at(&c, 700, CollectionKind::Range),
            Some(json!(9_223_372_036_854_775_700_i64))
        );
        let past = item_at(&c, 900, CollectionKind::Range).unwrap();
        assert_eq!(past.as_f64(), Some(9_223_372_036_854_775_000_i64 as f64 + 900.0));
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let c = json!({"start": 5, "end": 1});
        assert_eq!(size(&c, CollectionKind::Range).unwrap(), 0);
    }

    #[test]
    fn test_range_without_bounds_is_empty() {
        assert_eq!(size(&json!({"start": 1}), CollectionKind::Range).unwrap(), 0);
    }

    #[test]
    fn test_non_numeric_range_is_an_error() {
        let c = json!({"start": "a", "end": 3});
        assert!(matches!(
            size(&c, CollectionKind::Range),
            Err(IterationError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_custom_kind_adapts_to_the_value() {
        assert_eq!(size(&json!([1, 2]), CollectionKind::Custom).unwrap(), 2);
        assert_eq!(size(&json!({"a": 1}), CollectionKind::Custom).unwrap(), 1);
        assert_eq!(size(&json!(4), CollectionKind::Custom).unwrap(), 4);
        assert_eq!(size(&json!(-2), CollectionKind::Custom).unwrap(), 0);
        assert_eq!(size(&json!("x"), CollectionKind::Custom).unwrap(), 0);

        assert_eq!(item_at(&json!(4), 2, CollectionKind::Custom), Some(json!(2)));
        assert_eq!(
            item_at(&json!({"a": 1}), 0, CollectionKind::Custom),
            Some(json!({"key": "a", "value": 1}))
        );
    }
}
