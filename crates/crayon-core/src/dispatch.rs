//! Action dispatcher.
//!
//! An [`ActionDispatcher`] is built explicitly with the collaborators it may
//! call and is passed by reference to whoever raises actions. Dispatch never
//! fails: malformed or unsupported actions are logged and dropped, and the
//! returned [`DispatchOutcome`] records what happened for callers that care.
//!
//! # Example
//!
//! ```rust
//! use crayon_config::DispatchConfig;
//! use crayon_core::action::ActionDescriptor;
//! use crayon_core::dispatch::ActionDispatcher;
//! use crayon_core::state::{BindingType, StateBinding, StateConfiguration, StateStore};
//! use crayon_core::value::DynamicValue;
//!
//! let config = StateConfiguration::default()
//!     .binding(StateBinding::new("count", BindingType::Number));
//! let mut store = StateStore::new(&config);
//! let dispatcher = ActionDispatcher::new(&DispatchConfig::default());
//!
//! dispatcher.dispatch(&ActionDescriptor::state_update("count", "42"), Some(&mut store));
//! assert_eq!(store.get_value("count"), Some(&DynamicValue::Int(42)));
//! ```

use crate::action::{Action, ActionDescriptor, ActionError, ActionKind};
use crate::effects::{ApiCaller, NavigationEvent, ScriptRunner, ShareSink};
use crate::render::resolve::resolve_deep;
use crate::state::StateStore;
use crate::value::DynamicValue;
use crayon_config::DispatchConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Effect that was carried out
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ApiCall { url: String },
    Navigation { target: String },
    Script { result: DynamicValue },
    Share { text: String },
    StateUpdate { key: String, changed: bool },
    /// Unknown action tag, logged and skipped
    Ignored { tag: String },
}

/// Everything one dispatch did, including watcher cascades
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    pub effects: Vec<Effect>,
    pub dropped: Vec<ActionError>,
}

impl DispatchOutcome {
    /// True when no action was dropped
    pub fn is_clean(&self) -> bool {
        self.dropped.is_empty()
    }

    /// Number of state writes that changed a value
    pub fn state_changes(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, Effect::StateUpdate { changed: true, .. }))
            .count()
    }
}

/// Interprets actions against a store and injected collaborators
#[derive(Clone)]
pub struct ActionDispatcher {
    api: Option<Arc<dyn ApiCaller>>,
    scripts: Option<Arc<dyn ScriptRunner>>,
    share: Option<Arc<dyn ShareSink>>,
    navigation: Option<mpsc::UnboundedSender<NavigationEvent>>,
    max_watcher_depth: usize,
    generation: u64,
}

impl std::fmt::Debug for ActionDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionDispatcher")
            .field("api", &self.api.is_some())
            .field("scripts", &self.scripts.is_some())
            .field("share", &self.share.is_some())
            .field("navigation", &self.navigation.is_some())
            .field("max_watcher_depth", &self.max_watcher_depth)
            .field("generation", &self.generation)
            .finish()
    }
}

impl ActionDispatcher {
    /// Dispatcher with no collaborators; only `STATE_UPDATE` has an effect
    pub fn new(config: &DispatchConfig) -> Self {
        Self {
            api: None,
            scripts: None,
            share: None,
            navigation: None,
            max_watcher_depth: config.max_watcher_depth,
            generation: 0,
        }
    }

    pub fn with_api_caller(mut self, api: Arc<dyn ApiCaller>) -> Self {
        self.api = Some(api);
        self
    }

    pub fn with_script_runner(mut self, scripts: Arc<dyn ScriptRunner>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn with_share_sink(mut self, share: Arc<dyn ShareSink>) -> Self {
        self.share = Some(share);
        self
    }

    pub fn with_navigation(mut self, sender: mpsc::UnboundedSender<NavigationEvent>) -> Self {
        self.navigation = Some(sender);
        self
    }

    /// Generation stamped onto API requests so stale results can be dropped
    pub fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Perform one action. Watcher events raised by state updates are
    /// dispatched in turn, up to the configured depth.
    pub fn dispatch(
        &self,
        descriptor: &ActionDescriptor,
        store: Option<&mut StateStore>,
    ) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        self.run(descriptor, store, 0, &mut outcome);
        outcome
    }

    /// Write a value the user entered into a bound input. Behaves like a
    /// `STATE_UPDATE` except the value is taken literally.
    pub fn write(&self, store: &mut StateStore, key: &str, value: DynamicValue) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        self.apply_write(store, key, value, 0, &mut outcome);
        outcome
    }

    fn apply_write(
        &self,
        store: &mut StateStore,
        key: &str,
        value: DynamicValue,
        depth: usize,
        outcome: &mut DispatchOutcome,
    ) {
        let result = store.set_value(key, value);
        if !result.is_applied() {
            return;
        }
        outcome.effects.push(Effect::StateUpdate {
            key: key.to_string(),
            changed: result.changed(),
        });

        for event in result.into_events() {
            if depth + 1 > self.max_watcher_depth {
                warn!(
                    "Watcher cascade on '{}' exceeded depth {}; stopping",
                    event.key, self.max_watcher_depth
                );
                outcome.dropped.push(ActionError::WatcherDepthExceeded {
                    depth: self.max_watcher_depth,
                    key: event.key,
                });
                continue;
            }
            debug!(
                "Watcher on '{}' fired ({} -> {})",
                event.key, event.old_value, event.new_value
            );
            self.run(&event.bound_action(), Some(&mut *store), depth + 1, outcome);
        }
    }

    fn run(
        &self,
        descriptor: &ActionDescriptor,
        mut store: Option<&mut StateStore>,
        depth: usize,
        outcome: &mut DispatchOutcome,
    ) {
        debug!(
            "Dispatching {} (trigger '{}', depth {})",
            descriptor.kind, descriptor.trigger, depth
        );

        let action = match Action::from_descriptor(descriptor) {
            Ok(action) => action,
            Err(e) => {
                warn!("Dropping action: {}", e);
                outcome.dropped.push(e);
                return;
            }
        };

        match action {
            Action::UpdateState { key, value } => {
                let Some(store) = store.as_deref_mut() else {
                    warn!("Dropping STATE_UPDATE for '{}': no state store", key);
                    outcome.dropped.push(ActionError::NoStore(key));
                    return;
                };
                let value = resolve_deep(&value, Some(&*store));
                self.apply_write(store, &key, value, depth, outcome);
            }
            Action::ApiCall(mut request) => {
                let Some(api) = &self.api else {
                    warn!("Dropping API_CALL to {}: no API collaborator", request.url);
                    outcome.dropped.push(ActionError::NoCollaborator(ActionKind::ApiCall));
                    return;
                };
                request.generation = self.generation;
                request.body = request
                    .body
                    .as_ref()
                    .map(|body| resolve_deep(body, store.as_deref()));
                info!("API call {} {}", request.method.as_str(), request.url);
                outcome.effects.push(Effect::ApiCall {
                    url: request.url.clone(),
                });
                api.call(request);
            }
            Action::Navigate { target } => {
                let Some(sender) = &self.navigation else {
                    warn!("Dropping NAVIGATION to '{}': no navigation channel", target);
                    outcome
                        .dropped
                        .push(ActionError::NoCollaborator(ActionKind::Navigation));
                    return;
                };
                info!("Navigating to '{}'", target);
                if sender
                    .send(NavigationEvent {
                        target: target.clone(),
                    })
                    .is_err()
                {
                    warn!("Navigation receiver dropped; '{}' not delivered", target);
                    outcome.dropped.push(ActionError::ChannelClosed);
                    return;
                }
                outcome.effects.push(Effect::Navigation { target });
            }
            Action::RunScript { script } => {
                let Some(scripts) = &self.scripts else {
                    warn!("Dropping script action: no script runner");
                    outcome.dropped.push(ActionError::NoCollaborator(ActionKind::Script));
                    return;
                };
                let state = store
                    .as_deref()
                    .map(StateStore::snapshot)
                    .unwrap_or(DynamicValue::Null);
                match scripts.run(&script, &state) {
                    Ok(result) => {
                        info!("Script finished");
                        outcome.effects.push(Effect::Script { result });
                    }
                    Err(e) => {
                        error!("Script failed: {}", e);
                        outcome.dropped.push(ActionError::Script(e.to_string()));
                    }
                }
            }
            Action::Share { text } => {
                let Some(share) = &self.share else {
                    warn!("Dropping SHARE: no share collaborator");
                    outcome.dropped.push(ActionError::NoCollaborator(ActionKind::Share));
                    return;
                };
                info!("Sharing {} characters", text.chars().count());
                share.share(&text);
                outcome.effects.push(Effect::Share { text });
            }
            Action::Unknown(tag) => {
                warn!("Ignoring unknown action type '{}'", tag);
                outcome.effects.push(Effect::Ignored { tag });
            }
        }
    }
}
