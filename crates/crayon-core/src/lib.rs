//! # Crayon Core
//!
//! Engine for server-driven UI: component trees arrive as JSON, are rendered
//! against a reactive state store, and raise actions that update the store
//! or trigger external effects.
//!
//! ## Layers
//!
//! - [`value`]: the dynamic JSON-shaped value everything is built from
//! - [`node`], [`action`], [`style`]: the wire model of a UI tree
//! - [`state`]: typed bindings, computed expressions and watchers
//! - [`dispatch`]: turns actions into store writes and effects
//! - [`render`]: resolves `@state:` references into an element tree
//! - [`session`]: one displayed tree, its store and its event loop
//! - [`validation`], [`chat`]: the asynchronous chat and validation flows
//! - [`http`]: reqwest-backed chat, validation and API-call collaborators
//!
//! ## Quick Start
//!
//! ```rust
//! use crayon_config::DispatchConfig;
//! use crayon_core::{ActionDispatcher, ComponentNode, RenderSession, UiEvent};
//!
//! let tree = ComponentNode::from_json(br#"{
//!     "id": "root", "type": "SduiVStack",
//!     "state": {"bindings": {"count": {"key": "count", "type": "number", "defaultValue": 0}}},
//!     "children": [
//!         {"id": "label", "type": "SduiText", "props": {"text": "@state:count"}},
//!         {"id": "inc", "type": "SduiButton", "props": {"title": "+"},
//!          "action": {"trigger": "onClick", "type": "STATE_UPDATE", "payload": {"key": "count", "value": 1}}}
//!     ]
//! }"#).unwrap();
//!
//! let mut session = RenderSession::new(tree, ActionDispatcher::new(&DispatchConfig::default()));
//! session.handle(UiEvent::tap("inc"));
//! assert!(session.render().outline().contains("Text #label \"1\""));
//! ```

pub mod action;
pub mod chat;
pub mod dispatch;
pub mod effects;
pub mod error;
pub mod http;
pub mod node;
pub mod render;
pub mod session;
pub mod state;
pub mod style;
pub mod test_support;
pub mod validation;
pub mod value;

pub use action::{Action, ActionDescriptor, ActionError, ActionKind};
pub use chat::{ChatClient, ChatError, ChatFlow, ChatRequest, ChatResponse, ChatTurn};
pub use dispatch::{ActionDispatcher, DispatchOutcome, Effect};
pub use effects::{ApiCaller, ApiRequest, NavigationEvent, ScriptError, ScriptRunner, ShareSink};
pub use error::{CrayonError, CrayonResult};
pub use http::{
    HttpApiCaller, HttpChatClient, HttpComponentValidator, HttpError, HttpExecutor, HttpMethod,
};
pub use node::{ComponentKind, ComponentNode, FALLBACK_NODE_ID};
pub use render::{Element, Renderer};
pub use session::{PumpReport, RenderSession, SessionMessage, UiEvent};
pub use state::{
    BindingType, SetOutcome, StateBinding, StateConfiguration, StateStore, StateWatcher,
    WatcherEvent,
};
pub use style::{StyleDescriptor, StyleProps};
pub use validation::{
    ComponentValidator, StepStatus, ValidationController, ValidationError, ValidationObserver,
    ValidationOutcome, ValidationPipeline, ValidationReport, ValidationResult, ValidationStep,
};
pub use value::{DynamicValue, ValueError, ValueMap};
