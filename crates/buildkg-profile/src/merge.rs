//! Deep merge of raw YAML mappings

use serde_yaml::{Mapping, Value};

/// Merge `child` onto `base`.
///
/// Child keys come first, in the child's order. When both sides hold a
/// mapping for the same key the two are merged recursively; otherwise the
/// child's value replaces the base value outright (lists are not
/// concatenated). Keys only present in `base` follow, in base order.
pub fn deep_merge(base: &Mapping, child: &Mapping) -> Mapping {
    let mut merged = Mapping::new();

    for (key, value) in child {
        let combined = match (base.get(key), value) {
            (Some(Value::Mapping(base_map)), Value::Mapping(child_map)) => {
                Value::Mapping(deep_merge(base_map, child_map))
            }
            _ => value.clone(),
        };
        merged.insert(key.clone(), combined);
    }

    for (key, value) in base {
        if !merged.contains_key(key) {
            merged.insert(key.clone(), value.clone());
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn yaml(text: &str) -> Mapping {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn test_child_scalar_wins() {
        let base = yaml("name: base\nversion: '1.0'\n");
        let child = yaml("name: child\n");
        let merged = deep_merge(&base, &child);

        assert_eq!(merged.get("name"), Some(&Value::String("child".into())));
        assert_eq!(merged.get("version"), Some(&Value::String("1.0".into())));
    }

    #[test]
    fn test_nested_mappings_merge() {
        let base = yaml("parsing:\n  system_message: base\n  deontic_modalities: [must, may]\n");
        let child = yaml("parsing:\n  system_message: child\n");
        let merged = deep_merge(&base, &child);

        let parsing = merged.get("parsing").and_then(Value::as_mapping).unwrap();
        assert_eq!(parsing.get("system_message"), Some(&Value::String("child".into())));
        assert!(parsing.get("deontic_modalities").is_some());
    }

    #[test]
    fn test_lists_are_replaced_not_concatenated() {
        let base = yaml("types: [a, b, c]\n");
        let child = yaml("types: [x]\n");
        let merged = deep_merge(&base, &child);

        let types = merged.get("types").and_then(Value::as_sequence).unwrap();
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn test_mapping_replaced_by_scalar() {
        let base = yaml("ontology:\n  root_node: Entity\n");
        let child = yaml("ontology: null\n");
        let merged = deep_merge(&base, &child);
        assert_eq!(merged.get("ontology"), Some(&Value::Null));
    }

    #[test]
    fn test_key_order_child_first_then_base_only() {
        let base = yaml("a: 1\nb: 2\nc: 3\n");
        let child = yaml("c: 30\nz: 26\n");
        let merged = deep_merge(&base, &child);

        let keys: Vec<&str> = merged.keys().filter_map(Value::as_str).collect();
        assert_eq!(keys, vec!["c", "z", "a", "b"]);
    }

    fn value_strategy() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            any::<i64>().prop_map(|n| Value::Number(n.into())),
            "[a-z]{0,6}".prop_map(Value::String),
            any::<bool>().prop_map(Value::Bool),
        ];
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop::collection::vec(("[a-d]", inner), 0..4).prop_map(|entries| {
                let mut map = Mapping::new();
                for (key, value) in entries {
                    map.insert(Value::String(key), value);
                }
                Value::Mapping(map)
            })
        })
    }

    fn mapping_strategy() -> impl Strategy<Value = Mapping> {
        prop::collection::vec(("[a-e]", value_strategy()), 0..5).prop_map(|entries| {
            let mut map = Mapping::new();
            for (key, value) in entries {
                map.insert(Value::String(key), value);
            }
            map
        })
    }

    proptest! {
        #[test]
        fn prop_merge_is_idempotent(x in mapping_strategy()) {
            prop_assert_eq!(deep_merge(&x, &x), x);
        }

        #[test]
        fn prop_merged_is_fixed_under_empty_child(
            base in mapping_strategy(),
            child in mapping_strategy(),
        ) {
            let merged = deep_merge(&base, &child);
            let again = deep_merge(&merged, &Mapping::new());
            // YAML text keeps key order, which Mapping equality ignores
            prop_assert_eq!(
                serde_yaml::to_string(&again).unwrap(),
                serde_yaml::to_string(&merged).unwrap()
            );
            prop_assert_eq!(again, merged);
        }

        #[test]
        fn prop_child_non_mapping_values_win(
            base in mapping_strategy(),
            child in mapping_strategy(),
        ) {
            let merged = deep_merge(&base, &child);
            for (key, value) in &child {
                let both_maps = value.is_mapping()
                    && base.get(key).is_some_and(Value::is_mapping);
                if !both_maps {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
            }
        }

        #[test]
        fn prop_base_only_keys_survive(
            base in mapping_strategy(),
            child in mapping_strategy(),
        ) {
            let merged = deep_merge(&base, &child);
            for (key, value) in &base {
                if !child.contains_key(key) {
                    prop_assert_eq!(merged.get(key), Some(value));
                }
            }
        }
    }
}
