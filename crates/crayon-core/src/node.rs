//! Component tree model.
//!
//! A [`ComponentNode`] is the decoded form of one element of a server-sent UI
//! description. Trees are immutable values: helpers such as
//! [`ComponentNode::with_path_ids`] return new trees rather than editing in
//! place.

use crate::action::ActionDescriptor;
use crate::state::StateConfiguration;
use crate::style::StyleDescriptor;
use crate::value::{DynamicValue, ValueError, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Id of the node built by [`ComponentNode::fallback`]
pub const FALLBACK_NODE_ID: &str = "fallback_response";

/// Known component kinds plus a forward-compatible catch-all
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    VStack,
    HStack,
    Text,
    Image,
    Button,
    TextField,
    Icon,
    Picker,
    ImageUploader,
    Spacer,
    /// Tag this build does not know; re-encodes unchanged
    Unknown(String),
}

impl ComponentKind {
    /// Wire tag for this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::VStack => "SduiVStack",
            Self::HStack => "SduiHStack",
            Self::Text => "SduiText",
            Self::Image => "SduiImage",
            Self::Button => "SduiButton",
            Self::TextField => "SduiTextField",
            Self::Icon => "SduiIcon",
            Self::Picker => "SduiPicker",
            Self::ImageUploader => "SduiImageUploader",
            Self::Spacer => "SduiSpacer",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown(_))
    }
}

impl From<String> for ComponentKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "SduiVStack" => Self::VStack,
            "SduiHStack" => Self::HStack,
            "SduiText" => Self::Text,
            "SduiImage" => Self::Image,
            "SduiButton" => Self::Button,
            "SduiTextField" => Self::TextField,
            "SduiIcon" => Self::Icon,
            "SduiPicker" => Self::Picker,
            "SduiImageUploader" => Self::ImageUploader,
            "SduiSpacer" => Self::Spacer,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<&str> for ComponentKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One node of a server-driven UI tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    /// Unique within one tree; may be empty on the wire
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub props: ValueMap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<StyleDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ActionDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<StateConfiguration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ComponentNode>>,
}

impl ComponentNode {
    /// Create a bare node
    pub fn new(id: impl Into<String>, kind: impl Into<ComponentKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            props: ValueMap::new(),
            style: None,
            action: None,
            state: None,
            children: None,
        }
    }

    /// Set a prop (builder pattern)
    pub fn prop(mut self, key: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.props.insert(key.into(), value.into());
        self
    }

    /// Append a child (builder pattern)
    pub fn child(mut self, child: ComponentNode) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    /// Attach an action (builder pattern)
    pub fn with_action(mut self, action: ActionDescriptor) -> Self {
        self.action = Some(action);
        self
    }

    /// Attach a state configuration (builder pattern)
    pub fn with_state(mut self, state: StateConfiguration) -> Self {
        self.state = Some(state);
        self
    }

    /// Decode a node from JSON bytes
    pub fn from_json(bytes: &[u8]) -> Result<Self, ValueError> {
        serde_json::from_slice(bytes).map_err(|e| ValueError::Decoding(e.to_string()))
    }

    /// Decode a node from an already-decoded dynamic value, such as the
    /// `node_state_tree` of a chat response
    pub fn from_value(value: &DynamicValue) -> Result<Self, ValueError> {
        let bytes = crate::value::encode(value)?;
        Self::from_json(&bytes)
    }

    /// Encode as compact JSON
    pub fn to_json(&self) -> Result<Vec<u8>, ValueError> {
        serde_json::to_vec(self).map_err(|e| ValueError::Encoding(e.to_string()))
    }

    pub fn children(&self) -> &[ComponentNode] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Depth-first lookup by id
    pub fn find(&self, id: &str) -> Option<&ComponentNode> {
        if self.id == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Number of nodes in this subtree
    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(Self::node_count).sum::<usize>()
    }

    /// Copy of the tree where every empty id is replaced by its path:
    /// `root`, `root.0`, `root.0.1`, ...
    pub fn with_path_ids(&self) -> ComponentNode {
        self.with_path_ids_at("root")
    }

    fn with_path_ids_at(&self, path: &str) -> ComponentNode {
        let mut node = self.clone();
        if node.id.is_empty() {
            node.id = path.to_string();
        }
        node.children = self.children.as_ref().map(|children| {
            children
                .iter()
                .enumerate()
                .map(|(index, child)| child.with_path_ids_at(&format!("{path}.{index}")))
                .collect()
        });
        node
    }

    /// Tree shown when a chat response carries no usable node tree: a titled
    /// column holding the chat message as plain text.
    pub fn fallback(message: impl Into<String>) -> ComponentNode {
        let message: String = message.into();
        let mut title_style = ValueMap::new();
        title_style.insert("fontSize".into(), DynamicValue::Int(20));
        title_style.insert("fontWeight".into(), DynamicValue::from("bold"));

        ComponentNode::new(FALLBACK_NODE_ID, ComponentKind::VStack)
            .prop("spacing", 16)
            .child(
                ComponentNode::new("response_title", ComponentKind::Text)
                    .prop("text", "Chat Response")
                    .prop("style", title_style),
            )
            .child(
                ComponentNode::new("response_content", ComponentKind::Text)
                    .prop("text", message),
            )
    }
}
