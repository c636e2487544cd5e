//! Object merge strategies and key prefixing

use super::{KeyPrefixOptions, MergeStats};
use serde_json::{Map, Value};

/// View every input as an object: null becomes `{}`, arrays and scalars
/// are wrapped as `{ "value": input }`.
pub(crate) fn coerce_objects(inputs: &Map<String, Value>) -> Vec<Map<String, Value>> {
    inputs
        .values()
        .map(|input| match input {
            Value::Null => Map::new(),
            Value::Object(obj) => obj.clone(),
            other => {
                let mut wrapped = Map::new();
                wrapped.insert("value".to_string(), other.clone());
                wrapped
            }
        })
        .collect()
}

/// Later objects overwrite earlier ones key for key
pub(crate) fn merge_replace(objects: Vec<Map<String, Value>>) -> Map<String, Value> {
    objects.into_iter().fold(Map::new(), |mut acc, obj| {
        acc.extend(obj);
        acc
    })
}

/// The first occurrence of a key wins; each later occurrence is a conflict
pub(crate) fn merge_keep(objects: Vec<Map<String, Value>>, stats: &mut MergeStats) -> Map<String, Value> {
    let mut acc = Map::new();
    for obj in objects {
        for (key, value) in obj {
            if acc.contains_key(&key) {
                stats.conflicts += 1;
            } else {
                acc.insert(key, value);
            }
        }
    }
    acc
}

/// Recursive merge of `source` into `target`.
///
/// Nested objects are merged; any other collision is overwritten by the
/// source value and counted as a conflict.
pub fn deep_merge(target: &mut Map<String, Value>, source: Map<String, Value>, stats: &mut MergeStats) {
    for (key, incoming) in source {
        if let Some(existing) = target.get_mut(&key) {
            match (existing, incoming) {
                (Value::Object(existing), Value::Object(nested)) => {
                    deep_merge(existing, nested, stats);
                }
                (existing, incoming) => {
                    stats.conflicts += 1;
                    *existing = incoming;
                }
            }
        } else {
            target.insert(key, incoming);
        }
    }
}

/// Prefix each key with the prefix of the longest configured source name
/// it starts with; keys matching no source are left alone.
pub fn apply_key_prefixes(value: Value, options: &KeyPrefixOptions) -> Value {
    let Value::Object(obj) = value else {
        return value;
    };

    let prefixed = obj
        .into_iter()
        .map(|(key, value)| {
            let matched = options
                .prefixes
                .iter()
                .filter(|(source, _)| key.starts_with(source.as_str()))
                .max_by_key(|(source, _)| source.len());
            let key = match matched {
                Some((_, prefix)) => format!("{prefix}{}{key}", options.separator),
                None => key,
            };
            (key, value)
        })
        .collect();

    Value::Object(prefixed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_coercion_wraps_non_objects() {
        let inputs = obj(json!({"a": null, "b": [1], "c": 5, "d": {"k": 1}}));
        let objects = coerce_objects(&inputs);
        assert_eq!(Value::Object(objects[0].clone()), json!({}));
        assert_eq!(Value::Object(objects[1].clone()), json!({"value": [1]}));
        assert_eq!(Value::Object(objects[2].clone()), json!({"value": 5}));
        assert_eq!(Value::Object(objects[3].clone()), json!({"k": 1}));
    }

    #[test]
    fn test_keep_counts_conflicts() {
        let mut stats = MergeStats::default();
        let merged = merge_keep(
            vec![obj(json!({"a": 1, "b": 2})), obj(json!({"b": 3, "c": 4}))],
            &mut stats,
        );
        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2, "c": 4}));
        assert_eq!(stats.conflicts, 1);
    }

    #[test]
    fn test_deep_merge_recurses_and_overwrites_leaves() {
        let mut stats = MergeStats::default();
        let mut target = obj(json!({"nested": {"x": 1, "y": 2}, "list": [1]}));
        deep_merge(
            &mut target,
            obj(json!({"nested": {"y": 3, "z": 4}, "list": [2]})),
            &mut stats,
        );
        assert_eq!(
            Value::Object(target),
            json!({"nested": {"x": 1, "y": 3, "z": 4}, "list": [2]})
        );
        assert_eq!(stats.conflicts, 2);
    }

    #[test]
    fn test_longest_prefix_wins() {
        let options = KeyPrefixOptions {
            enabled: true,
            prefixes: BTreeMap::from([
                ("user".to_string(), "u".to_string()),
                ("user_profile".to_string(), "up".to_string()),
            ]),
            separator: ".".to_string(),
        };
        let result = apply_key_prefixes(
            json!({"user_profile_name": 1, "user_id": 2, "order": 3}),
            &options,
        );
        assert_eq!(
            result,
            json!({"up.user_profile_name": 1, "u.user_id": 2, "order": 3})
        );
    }

    #[test]
    fn test_prefixing_leaves_non_objects_untouched() {
        let options = KeyPrefixOptions::default();
        assert_eq!(apply_key_prefixes(json!([1]), &options), json!([1]));
    }
}
