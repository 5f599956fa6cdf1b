//! `@state:` reference resolution

use crate::state::StateStore;
use crate::value::DynamicValue;
use tracing::debug;

/// Prefix marking a prop value as a reference into the state store
pub const STATE_PREFIX: &str = "@state:";

/// Key named by a `@state:<key>` string, if `raw` is one
pub fn state_key(raw: &DynamicValue) -> Option<&str> {
    raw.as_str().and_then(|s| s.strip_prefix(STATE_PREFIX))
}

/// Resolve one value.
///
/// `@state:<key>` strings are replaced by the store's value for `key`. With no
/// store, or no such key, the literal string comes back unchanged. Everything
/// else passes through.
pub fn resolve_value(raw: &DynamicValue, store: Option<&StateStore>) -> DynamicValue {
    let Some(key) = state_key(raw) else {
        return raw.clone();
    };
    match store.and_then(|store| store.get_value(key)) {
        Some(value) => {
            debug!("Resolved {}{} -> {}", STATE_PREFIX, key, value);
            value.clone()
        }
        None => {
            debug!("Unresolved state reference {}{}", STATE_PREFIX, key);
            raw.clone()
        }
    }
}

/// [`resolve_value`] applied through arrays and objects
pub fn resolve_deep(raw: &DynamicValue, store: Option<&StateStore>) -> DynamicValue {
    match raw {
        DynamicValue::Array(items) => {
            DynamicValue::Array(items.iter().map(|item| resolve_deep(item, store)).collect())
        }
        DynamicValue::Object(map) => DynamicValue::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_deep(v, store)))
                .collect(),
        ),
        other => resolve_value(other, store),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BindingType, StateBinding, StateConfiguration};

    fn store() -> StateStore {
        StateStore::new(
            &StateConfiguration::default()
                .binding(StateBinding::new("username", BindingType::String).with_default("alice")),
        )
    }

    #[test]
    fn test_plain_values_pass_through() {
        let store = store();
        for raw in [
            DynamicValue::from("username"),
            DynamicValue::from("state:username"),
            DynamicValue::Int(3),
            DynamicValue::Null,
        ] {
            assert_eq!(resolve_value(&raw, Some(&store)), raw);
            assert_eq!(resolve_value(&raw, None), raw);
        }
    }

    #[test]
    fn test_state_lookup() {
        let store = store();
        let raw = DynamicValue::from("@state:username");
        assert_eq!(resolve_value(&raw, Some(&store)), DynamicValue::from("alice"));
    }

    #[test]
    fn test_missing_key_keeps_literal() {
        let store = store();
        let raw = DynamicValue::from("@state:nickname");
        assert_eq!(resolve_value(&raw, Some(&store)), raw);
        let raw = DynamicValue::from("@state:username");
        assert_eq!(resolve_value(&raw, None), raw);
    }

    #[test]
    fn test_deep_resolution() {
        let store = store();
        let raw = crate::value::decode(br#"{"user": "@state:username", "tags": ["@state:username", 1]}"#)
            .unwrap();
        let resolved = resolve_deep(&raw, Some(&store));
        assert_eq!(resolved.get("user"), Some(&DynamicValue::from("alice")));
        assert_eq!(
            resolved.get("tags"),
            Some(&DynamicValue::Array(vec![
                DynamicValue::from("alice"),
                DynamicValue::Int(1)
            ]))
        );
    }
}
