//! Render session: one displayed tree, its store and its event loop.
//!
//! A [`RenderSession`] is owned by the UI thread. User interactions come in
//! through [`RenderSession::handle`]; results of background effects arrive as
//! [`SessionMessage`]s on the session inbox and are applied by
//! [`RenderSession::pump`], so the store is only ever touched by its owner.
//!
//! Every tree shown gets a new generation. Background results tagged with an
//! older generation are dropped.
//!
//! # Example
//!
//! ```rust
//! use crayon_config::DispatchConfig;
//! use crayon_core::dispatch::ActionDispatcher;
//! use crayon_core::node::ComponentNode;
//! use crayon_core::session::{RenderSession, UiEvent};
//!
//! let tree = ComponentNode::from_json(br#"{
//!     "id": "root", "type": "SduiVStack",
//!     "children": [{"id": "t1", "type": "SduiTextField", "props": {"text": "@state:username"}}],
//!     "state": {"bindings": {"username": {"key": "username", "type": "string", "defaultValue": ""}}}
//! }"#).unwrap();
//!
//! let mut session = RenderSession::new(tree, ActionDispatcher::new(&DispatchConfig::default()));
//! session.handle(UiEvent::text_changed("t1", "bob"));
//! assert!(session.render().outline().contains("\"bob\""));
//! ```

use crate::dispatch::{ActionDispatcher, DispatchOutcome};
use crate::node::{ComponentKind, ComponentNode};
use crate::render::{node_action, resolve_value, state_key, Element, Renderer};
use crate::state::StateStore;
use crate::value::DynamicValue;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Sender half of a session inbox
pub type InboxSender = mpsc::UnboundedSender<SessionMessage>;
/// Receiver half of a session inbox
pub type InboxReceiver = mpsc::UnboundedReceiver<SessionMessage>;

/// Create a session inbox. Hand the sender to background collaborators
/// before building the session with [`RenderSession::with_inbox`].
pub fn inbox() -> (InboxSender, InboxReceiver) {
    mpsc::unbounded_channel()
}

/// User interaction with a rendered element
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Tap on a button (or any node carrying an action)
    Tap { id: String },
    /// New contents of a text field
    TextChanged { id: String, text: String },
    /// Picker selection
    PickerSelected { id: String, value: String },
    /// Image chosen in an image uploader
    ImagePicked { id: String, url: String },
}

impl UiEvent {
    pub fn tap(id: impl Into<String>) -> Self {
        Self::Tap { id: id.into() }
    }

    pub fn text_changed(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::TextChanged {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn picker_selected(id: impl Into<String>, value: impl Into<String>) -> Self {
        Self::PickerSelected {
            id: id.into(),
            value: value.into(),
        }
    }

    pub fn image_picked(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ImagePicked {
            id: id.into(),
            url: url.into(),
        }
    }

    pub fn target(&self) -> &str {
        match self {
            Self::Tap { id }
            | Self::TextChanged { id, .. }
            | Self::PickerSelected { id, .. }
            | Self::ImagePicked { id, .. } => id,
        }
    }
}

/// Result of a background effect, posted to the session inbox
#[derive(Debug, Clone, PartialEq)]
pub enum SessionMessage {
    /// An `API_CALL` finished
    ApiResult {
        generation: u64,
        url: String,
        result_key: Option<String>,
        result: Result<DynamicValue, String>,
    },
}

/// What one [`RenderSession::pump`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpReport {
    /// Messages taken from the inbox, whatever became of them
    pub consumed: usize,
    /// Results written to the store
    pub applied: usize,
}

/// One displayed tree with its store, dispatcher and inbox
#[derive(Debug)]
pub struct RenderSession {
    tree: ComponentNode,
    store: Option<StateStore>,
    dispatcher: ActionDispatcher,
    generation: u64,
    inbox_tx: InboxSender,
    inbox_rx: InboxReceiver,
    revision: u64,
    rendered_revision: Option<u64>,
}

impl RenderSession {
    /// Session with its own inbox
    pub fn new(tree: ComponentNode, dispatcher: ActionDispatcher) -> Self {
        Self::with_inbox(tree, dispatcher, inbox())
    }

    /// Session using an inbox created with [`inbox`]
    pub fn with_inbox(
        tree: ComponentNode,
        mut dispatcher: ActionDispatcher,
        (inbox_tx, inbox_rx): (InboxSender, InboxReceiver),
    ) -> Self {
        let tree = tree.with_path_ids();
        let store = tree.state.as_ref().map(StateStore::new);
        dispatcher.set_generation(1);
        debug!(
            "Render session started for '{}' ({} nodes, store: {})",
            tree.id,
            tree.node_count(),
            store.is_some()
        );
        Self {
            tree,
            store,
            dispatcher,
            generation: 1,
            inbox_tx,
            inbox_rx,
            revision: 0,
            rendered_revision: None,
        }
    }

    /// Show a new tree. Its store is built fresh and results still in flight
    /// for the old tree will be discarded.
    pub fn replace_tree(&mut self, tree: ComponentNode) {
        self.tree = tree.with_path_ids();
        self.store = self.tree.state.as_ref().map(StateStore::new);
        self.generation += 1;
        self.dispatcher.set_generation(self.generation);
        self.revision += 1;
        info!(
            "Replaced displayed tree with '{}' (generation {})",
            self.tree.id, self.generation
        );
    }

    /// Sender for background collaborators
    pub fn inbox(&self) -> InboxSender {
        self.inbox_tx.clone()
    }

    pub fn tree(&self) -> &ComponentNode {
        &self.tree
    }

    pub fn store(&self) -> Option<&StateStore> {
        self.store.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bumped on every change that affects rendering
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True when something changed since the last [`render`](Self::render)
    pub fn needs_render(&self) -> bool {
        self.rendered_revision != Some(self.revision)
    }

    /// Resolve the current tree against the current store
    pub fn render(&mut self) -> Element {
        self.rendered_revision = Some(self.revision);
        Renderer::render(&self.tree, self.store.as_ref())
    }

    /// Apply one user interaction
    pub fn handle(&mut self, event: UiEvent) -> DispatchOutcome {
        let Some(node) = self.tree.find(event.target()).cloned() else {
            warn!("Event for unknown element '{}'", event.target());
            return DispatchOutcome::default();
        };

        let mut outcome = DispatchOutcome::default();
        match event {
            UiEvent::Tap { id } => {
                if node.kind == ComponentKind::Button && !self.button_is_active(&node) {
                    debug!("Ignoring tap on inactive button '{}'", id);
                    return outcome;
                }
                match node_action(&node) {
                    Some(action) => outcome = self.dispatcher.dispatch(&action, self.store.as_mut()),
                    None => debug!("Tap on '{}' has no action", id),
                }
            }
            UiEvent::TextChanged { text, .. } => {
                outcome = self.write_bound(&node, "text", DynamicValue::String(text));
            }
            UiEvent::PickerSelected { value, .. } => {
                outcome = self.write_bound(&node, "selectedValue", DynamicValue::String(value));
            }
            UiEvent::ImagePicked { url, .. } => {
                outcome = self.write_bound(&node, "imageUrl", DynamicValue::String(url));
            }
        }

        if !outcome.effects.is_empty() {
            self.revision += 1;
        }
        outcome
    }

    /// Drain the inbox. Every message counts as consumed; only fresh,
    /// successful results with a key and a store count as applied.
    pub fn pump(&mut self) -> PumpReport {
        let mut report = PumpReport::default();
        while let Ok(message) = self.inbox_rx.try_recv() {
            report.consumed += 1;
            match message {
                SessionMessage::ApiResult {
                    generation,
                    url,
                    result_key,
                    result,
                } => {
                    if generation != self.generation {
                        debug!(
                            "Dropping stale result from {} (generation {}, current {})",
                            url, generation, self.generation
                        );
                        continue;
                    }
                    let value = match result {
                        Ok(value) => value,
                        Err(e) => {
                            warn!("API call to {} failed: {}", url, e);
                            continue;
                        }
                    };
                    let (Some(key), Some(store)) = (result_key, self.store.as_mut()) else {
                        debug!("API result from {} has nowhere to go", url);
                        continue;
                    };
                    let outcome = self.dispatcher.write(store, &key, value);
                    if !outcome.effects.is_empty() {
                        self.revision += 1;
                    }
                    report.applied += 1;
                }
            }
        }
        report
    }

    fn button_is_active(&self, node: &ComponentNode) -> bool {
        let store = self.store.as_ref();
        let flag = |key: &str, default: bool| {
            node.props
                .get(key)
                .map(|raw| resolve_value(raw, store))
                .and_then(|value| value.as_bool())
                .unwrap_or(default)
        };
        flag("enabled", true) && !flag("loading", false)
    }

    /// Write an input's new value into its bound key, then raise the node's
    /// own action if it has one.
    fn write_bound(&mut self, node: &ComponentNode, prop: &str, value: DynamicValue) -> DispatchOutcome {
        let binding = node.props.get(prop).and_then(state_key).map(str::to_string);

        let mut outcome = match (binding, self.store.as_mut()) {
            (Some(key), Some(store)) => self.dispatcher.write(store, &key, value),
            (Some(key), None) => {
                warn!("'{}' is bound to '{}' but the tree has no state", node.id, key);
                DispatchOutcome::default()
            }
            (None, _) => {
                debug!("'{}' edited without a state binding", node.id);
                DispatchOutcome::default()
            }
        };

        if let Some(action) = node_action(node) {
            let more = self.dispatcher.dispatch(&action, self.store.as_mut());
            outcome.effects.extend(more.effects);
            outcome.dropped.extend(more.dropped);
        }
        outcome
    }
}
