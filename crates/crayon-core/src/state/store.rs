//! Reactive state store.
//!
//! The store owns the current value of every binding. Plain bindings change
//! through [`StateStore::set_value`]; computed bindings are re-evaluated after
//! every accepted write, in dependency order. Watchers are not run by the
//! store: `set_value` returns a [`WatcherEvent`] per matching watcher and the
//! caller (normally the action dispatcher) decides what to do with them.

use super::binding::{StateBinding, StateConfiguration, StateWatcher};
use super::expression::Expr;
use crate::action::ActionDescriptor;
use crate::value::{DynamicValue, ValueMap};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// A watcher whose key changed
#[derive(Debug, Clone, PartialEq)]
pub struct WatcherEvent {
    pub key: String,
    pub old_value: DynamicValue,
    pub new_value: DynamicValue,
    pub action: ActionDescriptor,
}

/// Prefix of the watcher context references a watcher action may use:
/// `@watch:key`, `@watch:oldValue` and `@watch:newValue`
pub const WATCH_PREFIX: &str = "@watch:";

impl WatcherEvent {
    /// The watcher's action with every `@watch:` reference in its payload
    /// replaced by this event's key or values. Unknown names stay literal.
    pub fn bound_action(&self) -> ActionDescriptor {
        let mut action = self.action.clone();
        for value in action.payload.values_mut() {
            *value = self.bind(value);
        }
        action
    }

    fn bind(&self, raw: &DynamicValue) -> DynamicValue {
        match raw {
            DynamicValue::String(s) => match s.strip_prefix(WATCH_PREFIX) {
                Some("key") => DynamicValue::String(self.key.clone()),
                Some("oldValue") => self.old_value.clone(),
                Some("newValue") => self.new_value.clone(),
                _ => raw.clone(),
            },
            DynamicValue::Array(items) => {
                DynamicValue::Array(items.iter().map(|item| self.bind(item)).collect())
            }
            DynamicValue::Object(map) => DynamicValue::Object(
                map.iter().map(|(k, v)| (k.clone(), self.bind(v))).collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Result of [`StateStore::set_value`]
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    /// No binding with that key
    UnknownKey,
    /// The binding is computed and cannot be written
    ComputedKey,
    /// Value stored (possibly unchanged)
    Applied {
        old_value: DynamicValue,
        new_value: DynamicValue,
        events: Vec<WatcherEvent>,
    },
}

impl SetOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// True when the stored value differs from the previous one
    pub fn changed(&self) -> bool {
        match self {
            Self::Applied {
                old_value,
                new_value,
                ..
            } => !old_value.loose_eq(new_value),
            _ => false,
        }
    }

    /// Watcher events to dispatch, empty unless applied and changed
    pub fn into_events(self) -> Vec<WatcherEvent> {
        match self {
            Self::Applied { events, .. } => events,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
struct ComputedBinding {
    key: String,
    expr: Expr,
}

/// Live values for one rendered tree
#[derive(Debug, Clone)]
pub struct StateStore {
    values: ValueMap,
    bindings: BTreeMap<String, StateBinding>,
    watchers: Vec<StateWatcher>,
    /// Computed bindings in evaluation order
    plan: Vec<ComputedBinding>,
    /// Keys that are computed, including ones whose expression failed to parse
    computed_keys: BTreeSet<String>,
}

impl StateStore {
    /// Seed every binding, evaluate computed bindings once and arm watchers.
    pub fn new(configuration: &StateConfiguration) -> Self {
        let mut values = ValueMap::new();
        let mut bindings = BTreeMap::new();
        let mut computed_keys = BTreeSet::new();
        let mut parsed = BTreeMap::new();

        for (key, binding) in &configuration.bindings {
            if !binding.key.is_empty() && binding.key != *key {
                debug!(
                    "Binding declared under '{}' names itself '{}'; using map key",
                    key, binding.key
                );
            }
            values.insert(key.clone(), binding.initial_value());

            if binding.declares_computed() {
                match binding.expression.as_deref() {
                    Some(source) => {
                        computed_keys.insert(key.clone());
                        match Expr::parse(source) {
                            Ok(expr) => {
                                parsed.insert(key.clone(), expr);
                            }
                            Err(e) => warn!(
                                "Computed binding '{}' has an invalid expression: {}",
                                key, e
                            ),
                        }
                    }
                    None => warn!(
                        "Binding '{}' is marked computed but has no expression; treating as plain",
                        key
                    ),
                }
            }
            bindings.insert(key.clone(), binding.clone());
        }

        let plan = evaluation_order(parsed);
        let mut store = Self {
            values,
            bindings,
            watchers: configuration.watchers.clone(),
            plan,
            computed_keys,
        };
        store.recompute();
        debug!(
            "Initialized state store with {} bindings ({} computed), {} watchers",
            store.bindings.len(),
            store.computed_keys.len(),
            store.watchers.len()
        );
        store
    }

    /// Write a plain binding.
    ///
    /// Unknown and computed keys are rejected with a warning and leave the
    /// store untouched. Accepted values are coerced to the binding type, then
    /// computed bindings are refreshed. One event is returned per watcher on
    /// `key` when the stored value actually changed.
    pub fn set_value(&mut self, key: &str, value: DynamicValue) -> SetOutcome {
        let Some(binding) = self.bindings.get(key) else {
            warn!("No binding found for key '{}'", key);
            return SetOutcome::UnknownKey;
        };
        if self.computed_keys.contains(key) {
            warn!("Cannot set value for computed binding '{}'", key);
            return SetOutcome::ComputedKey;
        }

        let new_value = binding.binding_type.coerce(value);
        let old_value = self
            .values
            .insert(key.to_string(), new_value.clone())
            .unwrap_or_default();
        debug!("State '{}': {} -> {}", key, old_value, new_value);

        self.recompute();

        let events = if old_value.loose_eq(&new_value) {
            Vec::new()
        } else {
            self.watchers
                .iter()
                .filter(|watcher| watcher.key == key)
                .map(|watcher| WatcherEvent {
                    key: key.to_string(),
                    old_value: old_value.clone(),
                    new_value: new_value.clone(),
                    action: watcher.action.clone(),
                })
                .collect()
        };

        SetOutcome::Applied {
            old_value,
            new_value,
            events,
        }
    }

    pub fn get_value(&self, key: &str) -> Option<&DynamicValue> {
        self.values.get(key)
    }

    /// All current values
    pub fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Current values as one object, for scripts and serialization
    pub fn snapshot(&self) -> DynamicValue {
        DynamicValue::Object(self.values.clone())
    }

    pub fn binding(&self, key: &str) -> Option<&StateBinding> {
        self.bindings.get(key)
    }

    pub fn is_computed(&self, key: &str) -> bool {
        self.computed_keys.contains(key)
    }

    pub fn watchers(&self) -> &[StateWatcher] {
        &self.watchers
    }

    fn recompute(&mut self) {
        for computed in &self.plan {
            let Some(binding) = self.bindings.get(&computed.key) else {
                continue;
            };
            match computed.expr.evaluate(&self.values) {
                Ok(result) => {
                    let result = binding.binding_type.coerce(result);
                    self.values.insert(computed.key.clone(), result);
                }
                Err(e) => warn!(
                    "Error computing '{}': {}; keeping previous value",
                    computed.key, e
                ),
            }
        }
    }
}

/// Order computed bindings so each comes after the computed bindings it
/// reads. Bindings on a cycle are dropped from the plan and keep their default.
fn evaluation_order(parsed: BTreeMap<String, Expr>) -> Vec<ComputedBinding> {
    let deps: BTreeMap<String, BTreeSet<String>> = parsed
        .iter()
        .map(|(key, expr)| {
            let reads = expr
                .identifiers()
                .into_iter()
                .filter(|id| parsed.contains_key(id))
                .collect();
            (key.clone(), reads)
        })
        .collect();

    let mut ordered = Vec::with_capacity(parsed.len());
    let mut done = BTreeSet::new();
    let mut pending: BTreeSet<String> = parsed.keys().cloned().collect();

    // Kahn-style: repeatedly take every binding whose computed inputs are done
    loop {
        let ready: Vec<String> = pending
            .iter()
            .filter(|key| deps[*key].iter().all(|dep| done.contains(dep)))
            .cloned()
            .collect();
        if ready.is_empty() {
            break;
        }
        for key in ready {
            pending.remove(&key);
            done.insert(key.clone());
            ordered.push(key);
        }
    }

    if !pending.is_empty() {
        warn!(
            "Computed bindings form a cycle and will keep their defaults: {}",
            pending.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }

    let mut parsed = parsed;
    ordered
        .into_iter()
        .filter_map(|key| parsed.remove(&key).map(|expr| ComputedBinding { key, expr }))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::state::BindingType;

    fn cart() -> StateConfiguration {
        StateConfiguration::default()
            .binding(StateBinding::new("price", BindingType::Number).with_default(10))
            .binding(StateBinding::new("qty", BindingType::Number).with_default(1))
            .binding(StateBinding::computed("total", BindingType::Number, "subtotal + 5"))
            .binding(StateBinding::computed("subtotal", BindingType::Number, "price * qty"))
    }

    #[test]
    fn test_initial_computed_values_follow_dependencies() {
        let store = StateStore::new(&cart());
        assert_eq!(store.get_value("subtotal"), Some(&DynamicValue::Int(10)));
        assert_eq!(store.get_value("total"), Some(&DynamicValue::Int(15)));
    }

    #[test]
    fn test_set_value_recomputes() {
        let mut store = StateStore::new(&cart());
        let outcome = store.set_value("qty", DynamicValue::from("3"));
        assert!(outcome.is_applied());
        assert!(outcome.changed());
        assert_eq!(store.get_value("qty"), Some(&DynamicValue::Int(3)));
        assert_eq!(store.get_value("total"), Some(&DynamicValue::Int(35)));
    }

    #[test]
    fn test_rejects_computed_and_unknown_keys() {
        let mut store = StateStore::new(&cart());
        assert_eq!(
            store.set_value("total", DynamicValue::Int(1)),
            SetOutcome::ComputedKey
        );
        assert_eq!(store.get_value("total"), Some(&DynamicValue::Int(15)));
        assert_eq!(
            store.set_value("nope", DynamicValue::Int(1)),
            SetOutcome::UnknownKey
        );
        assert!(store.get_value("nope").is_none());
    }

    #[test]
    fn test_failing_expression_keeps_prior_value() {
        let config = StateConfiguration::default()
            .binding(StateBinding::new("a", BindingType::Number).with_default(4))
            .binding(StateBinding::new("b", BindingType::Number))
            .binding(
                StateBinding::computed("ratio", BindingType::Number, "a / b").with_default(-1),
            )
            .binding(StateBinding::computed("double", BindingType::Number, "a * 2"));
        let mut store = StateStore::new(&config);
        assert_eq!(store.get_value("ratio"), Some(&DynamicValue::Int(-1)));
        assert_eq!(store.get_value("double"), Some(&DynamicValue::Int(8)));

        store.set_value("b", DynamicValue::Int(2));
        assert_eq!(store.get_value("ratio"), Some(&DynamicValue::Int(2)));

        store.set_value("b", DynamicValue::Int(0));
        assert_eq!(store.get_value("ratio"), Some(&DynamicValue::Int(2)));
    }

    #[test]
    fn test_watcher_event_binds_context() {
        let mut action = ActionDescriptor::new("onChange", ActionKind::ApiCall)
            .with("url", "https://api.example.com/log")
            .with("note", "@watch:unknown");
        action.payload.insert(
            "body".into(),
            crate::value::decode(br#"{"field": "@watch:key", "from": "@watch:oldValue", "to": ["@watch:newValue"]}"#)
                .unwrap(),
        );
        let event = WatcherEvent {
            key: "qty".into(),
            old_value: DynamicValue::Int(1),
            new_value: DynamicValue::Int(3),
            action,
        };

        let bound = event.bound_action();
        let body = bound.payload.get("body").unwrap();
        assert_eq!(body.get("field"), Some(&DynamicValue::from("qty")));
        assert_eq!(body.get("from"), Some(&DynamicValue::Int(1)));
        assert_eq!(
            body.get("to"),
            Some(&DynamicValue::Array(vec![DynamicValue::Int(3)]))
        );
        assert_eq!(
            bound.payload.get("note"),
            Some(&DynamicValue::from("@watch:unknown"))
        );
        let original = event.action.payload.get("body").unwrap();
        assert_eq!(original.get("field"), Some(&DynamicValue::from("@watch:key")));
    }

    #[test]
    fn test_cycle_keeps_defaults() {
        let config = StateConfiguration::default()
            .binding(StateBinding::computed("x", BindingType::Number, "y + 1").with_default(1))
            .binding(StateBinding::computed("y", BindingType::Number, "x + 1").with_default(2))
            .binding(StateBinding::computed("z", BindingType::String, "'ok'"));
        let store = StateStore::new(&config);
        assert_eq!(store.get_value("x"), Some(&DynamicValue::Int(1)));
        assert_eq!(store.get_value("y"), Some(&DynamicValue::Int(2)));
        assert_eq!(store.get_value("z"), Some(&DynamicValue::from("ok")));
    }

    #[test]
    fn test_invalid_expression_is_still_read_only() {
        let config = StateConfiguration::default().binding(
            StateBinding::computed("broken", BindingType::String, "1 +").with_default("d"),
        );
        let mut store = StateStore::new(&config);
        assert!(store.is_computed("broken"));
        assert_eq!(
            store.set_value("broken", DynamicValue::from("x")),
            SetOutcome::ComputedKey
        );
        assert_eq!(store.get_value("broken"), Some(&DynamicValue::from("d")));
    }

    #[test]
    fn test_computed_without_expression_is_plain() {
        let mut binding = StateBinding::new("loose", BindingType::String);
        binding.computed = Some(true);
        let config = StateConfiguration::default().binding(binding);
        let mut store = StateStore::new(&config);
        assert!(!store.is_computed("loose"));
        assert!(store.set_value("loose", DynamicValue::from("ok")).is_applied());
    }

    #[test]
    fn test_watcher_events_only_on_change() {
        let config = StateConfiguration::default()
            .binding(StateBinding::new("name", BindingType::String).with_default("a"))
            .watch(
                "name",
                ActionDescriptor::new("onChange", ActionKind::Share).with("text", "changed"),
            );
        let mut store = StateStore::new(&config);

        let events = store.set_value("name", DynamicValue::from("b")).into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].old_value, DynamicValue::from("a"));
        assert_eq!(events[0].new_value, DynamicValue::from("b"));
        assert_eq!(events[0].key, "name");

        assert!(store
            .set_value("name", DynamicValue::from("b"))
            .into_events()
            .is_empty());
    }

    #[test]
    fn test_snapshot() {
        let store = StateStore::new(&cart());
        let snapshot = store.snapshot();
        assert_eq!(snapshot.get("price"), Some(&DynamicValue::Int(10)));
        assert_eq!(snapshot.as_object().map(|m| m.len()), Some(4));
    }
}
