//! State configuration wire types and type coercion

use crate::action::ActionDescriptor;
use crate::value::{DynamicValue, ValueMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Declared type of a state binding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingType {
    String,
    Number,
    Boolean,
    Object,
    Array,
}

impl BindingType {
    /// Value a binding starts with when it declares no default
    pub fn zero_value(self) -> DynamicValue {
        match self {
            Self::String => DynamicValue::String(String::new()),
            Self::Number => DynamicValue::Int(0),
            Self::Boolean => DynamicValue::Bool(false),
            Self::Object => DynamicValue::Object(ValueMap::new()),
            Self::Array => DynamicValue::Array(Vec::new()),
        }
    }

    /// Coerce an incoming value to this type.
    ///
    /// | type | rule |
    /// |---|---|
    /// | string | display string of the value |
    /// | number | numbers pass; strings parse (integer first, then float); else `0` |
    /// | boolean | booleans pass; strings are `true` iff they equal "true" ignoring case; else `false` |
    /// | object / array | passes if already that shape; else empty |
    pub fn coerce(self, value: DynamicValue) -> DynamicValue {
        match (self, value) {
            (Self::String, DynamicValue::String(s)) => DynamicValue::String(s),
            (Self::String, other) => DynamicValue::String(other.to_display_string()),

            (Self::Number, n @ (DynamicValue::Int(_) | DynamicValue::Float(_))) => n,
            (Self::Number, DynamicValue::String(s)) => parse_number(&s),
            (Self::Number, _) => DynamicValue::Int(0),

            (Self::Boolean, DynamicValue::Bool(b)) => DynamicValue::Bool(b),
            (Self::Boolean, DynamicValue::String(s)) => {
                DynamicValue::Bool(s.eq_ignore_ascii_case("true"))
            }
            (Self::Boolean, _) => DynamicValue::Bool(false),

            (Self::Object, obj @ DynamicValue::Object(_)) => obj,
            (Self::Array, arr @ DynamicValue::Array(_)) => arr,
            (ty @ (Self::Object | Self::Array), _) => ty.zero_value(),
        }
    }
}

fn parse_number(raw: &str) -> DynamicValue {
    let trimmed = raw.trim();
    if let Ok(i) = trimmed.parse::<i64>() {
        return DynamicValue::Int(i);
    }
    match trimmed.parse::<f64>() {
        Ok(f) if f.is_finite() => DynamicValue::Float(f),
        _ => DynamicValue::Int(0),
    }
}

/// One named, typed slot in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateBinding {
    /// Mirrors the map key; the map key wins when they differ
    #[serde(default)]
    pub key: String,
    #[serde(rename = "type")]
    pub binding_type: BindingType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<DynamicValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub computed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
}

impl StateBinding {
    /// Plain binding
    pub fn new(key: impl Into<String>, binding_type: BindingType) -> Self {
        Self {
            key: key.into(),
            binding_type,
            default_value: None,
            computed: None,
            expression: None,
        }
    }

    /// Computed binding evaluated from `expression`
    pub fn computed(
        key: impl Into<String>,
        binding_type: BindingType,
        expression: impl Into<String>,
    ) -> Self {
        Self {
            computed: Some(true),
            expression: Some(expression.into()),
            ..Self::new(key, binding_type)
        }
    }

    /// Set the default value (builder pattern)
    pub fn with_default(mut self, value: impl Into<DynamicValue>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Marked computed on the wire, whether or not it has an expression
    pub fn declares_computed(&self) -> bool {
        self.computed == Some(true)
    }

    /// Initial value: the default coerced to the binding type, or the zero value
    pub fn initial_value(&self) -> DynamicValue {
        match &self.default_value {
            Some(value) => self.binding_type.coerce(value.clone()),
            None => self.binding_type.zero_value(),
        }
    }
}

/// Action fired when a key's value changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateWatcher {
    pub key: String,
    pub action: ActionDescriptor,
}

/// `state` block of a component node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateConfiguration {
    #[serde(default)]
    pub bindings: BTreeMap<String, StateBinding>,
    #[serde(default)]
    pub watchers: Vec<StateWatcher>,
}

impl StateConfiguration {
    /// Add a binding under its own key (builder pattern)
    pub fn binding(mut self, binding: StateBinding) -> Self {
        self.bindings.insert(binding.key.clone(), binding);
        self
    }

    /// Add a watcher (builder pattern)
    pub fn watch(mut self, key: impl Into<String>, action: ActionDescriptor) -> Self {
        self.watchers.push(StateWatcher {
            key: key.into(),
            action,
        });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(BindingType::String, DynamicValue::Int(42), DynamicValue::from("42") ; "int to string")]
    #[test_case(BindingType::String, DynamicValue::Null, DynamicValue::from("") ; "null to string")]
    #[test_case(BindingType::String, DynamicValue::Bool(true), DynamicValue::from("true") ; "bool to string")]
    #[test_case(BindingType::Number, DynamicValue::from("42"), DynamicValue::Int(42) ; "integral string")]
    #[test_case(BindingType::Number, DynamicValue::from(" 2.5 "), DynamicValue::Float(2.5) ; "float string")]
    #[test_case(BindingType::Number, DynamicValue::from("abc"), DynamicValue::Int(0) ; "garbage string")]
    #[test_case(BindingType::Number, DynamicValue::from("inf"), DynamicValue::Int(0) ; "infinite string")]
    #[test_case(BindingType::Number, DynamicValue::Float(1.5), DynamicValue::Float(1.5) ; "float passes")]
    #[test_case(BindingType::Number, DynamicValue::Bool(true), DynamicValue::Int(0) ; "bool to number")]
    #[test_case(BindingType::Boolean, DynamicValue::from("TRUE"), DynamicValue::Bool(true) ; "true string")]
    #[test_case(BindingType::Boolean, DynamicValue::from("yes"), DynamicValue::Bool(false) ; "other string")]
    #[test_case(BindingType::Boolean, DynamicValue::Int(1), DynamicValue::Bool(false) ; "number to bool")]
    #[test_case(BindingType::Object, DynamicValue::Array(vec![]), DynamicValue::Object(ValueMap::new()) ; "array to object")]
    #[test_case(BindingType::Array, DynamicValue::from("x"), DynamicValue::Array(vec![]) ; "string to array")]
    fn test_coercion(ty: BindingType, input: DynamicValue, expected: DynamicValue) {
        assert_eq!(ty.coerce(input), expected);
    }

    #[test]
    fn test_binding_wire_names() {
        let binding: StateBinding = serde_json::from_str(
            r#"{"key": "total", "type": "number", "defaultValue": "3", "computed": true, "expression": "a + b"}"#,
        )
        .unwrap();
        assert_eq!(binding.binding_type, BindingType::Number);
        assert!(binding.declares_computed());
        assert_eq!(binding.initial_value(), DynamicValue::Int(3));
    }

    #[test]
    fn test_configuration_defaults() {
        let config: StateConfiguration = serde_json::from_str("{}").unwrap();
        assert!(config.bindings.is_empty());
        assert!(config.watchers.is_empty());
    }

    #[test]
    fn test_zero_values() {
        assert_eq!(
            StateBinding::new("flag", BindingType::Boolean).initial_value(),
            DynamicValue::Bool(false)
        );
        assert_eq!(
            StateBinding::new("items", BindingType::Array).initial_value(),
            DynamicValue::Array(vec![])
        );
    }
}
