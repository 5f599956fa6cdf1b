//! Node → element mapping

use super::element::{ButtonSize, ButtonVariant, Element, IconPosition, PickerOption};
use super::resolve::{resolve_value, state_key};
use crate::action::ActionDescriptor;
use crate::node::{ComponentKind, ComponentNode};
use crate::state::StateStore;
use crate::style::StyleProps;
use crate::value::DynamicValue;
use tracing::{debug, warn};

const DEFAULT_STACK_SPACING: f64 = 8.0;
const DEFAULT_ICON_SIZE: f64 = 16.0;
const DEFAULT_UPLOADER_PLACEHOLDER: &str = "Tap to upload image";
const DEFAULT_ALLOWED_TYPES: [&str; 2] = ["jpg", "png"];

/// Resolving reader over one node's props
struct Props<'a> {
    node: &'a ComponentNode,
    store: Option<&'a StateStore>,
}

impl<'a> Props<'a> {
    fn raw(&self, key: &str) -> Option<&'a DynamicValue> {
        self.node.props.get(key)
    }

    fn get(&self, key: &str) -> Option<DynamicValue> {
        self.raw(key)
            .map(|raw| resolve_value(raw, self.store))
            .filter(|value| !value.is_null())
    }

    fn string(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| value.to_display_string())
    }

    fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|value| value.as_f64())
    }

    fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|value| value.as_bool())
    }

    /// State key the prop is bound to, for two-way inputs
    fn binding(&self, key: &str) -> Option<String> {
        self.raw(key).and_then(state_key).map(str::to_string)
    }

    fn style(&self) -> StyleProps {
        StyleProps::from_value(self.raw("style"))
    }
}

/// Action a node raises: its own `action`, else an `action` prop
pub fn node_action(node: &ComponentNode) -> Option<ActionDescriptor> {
    if let Some(action) = &node.action {
        return Some(action.clone());
    }
    let raw = node.props.get("action")?;
    match serde_json::from_value::<ActionDescriptor>(serde_json::Value::from(raw.clone())) {
        Ok(action) => Some(action),
        Err(e) => {
            warn!("Ignoring malformed action prop on '{}': {}", node.id, e);
            None
        }
    }
}

/// Turns component trees into element trees
pub struct Renderer;

impl Renderer {
    /// Render `node` and its children. Unknown kinds become
    /// [`Element::Empty`]; mistyped props fall back to their defaults.
    pub fn render(node: &ComponentNode, store: Option<&StateStore>) -> Element {
        let props = Props { node, store };
        let id = node.id.clone();

        match &node.kind {
            ComponentKind::VStack => Element::VStack {
                id,
                spacing: props.number("spacing").unwrap_or(DEFAULT_STACK_SPACING),
                children: Self::render_children(node, store),
            },
            ComponentKind::HStack => Element::HStack {
                id,
                spacing: props.number("spacing").unwrap_or(DEFAULT_STACK_SPACING),
                children: Self::render_children(node, store),
            },
            ComponentKind::Text => Element::Text {
                id,
                text: props.string("text").unwrap_or_default(),
                style: props.style(),
            },
            ComponentKind::Image => Element::Image {
                id,
                url: props.string("url").unwrap_or_default(),
                style: props.style(),
            },
            ComponentKind::Button => Element::Button {
                id,
                title: props.string("title").unwrap_or_default(),
                enabled: props.boolean("enabled").unwrap_or(true),
                loading: props.boolean("loading").unwrap_or(false),
                icon: props.string("icon"),
                icon_position: props
                    .string("iconPosition")
                    .and_then(|raw| IconPosition::parse(&raw))
                    .unwrap_or_default(),
                accessibility_label: props.string("accessibilityLabel"),
                tooltip: props.string("tooltip"),
                size: props
                    .string("size")
                    .and_then(|raw| ButtonSize::parse(&raw))
                    .unwrap_or_default(),
                variant: props
                    .string("variant")
                    .and_then(|raw| ButtonVariant::parse(&raw))
                    .unwrap_or_default(),
                color: props.string("color"),
                action: node_action(node),
            },
            ComponentKind::TextField => Element::TextField {
                id,
                text: props.string("text").unwrap_or_default(),
                placeholder: props.string("placeholder").unwrap_or_default(),
                is_secure: props.boolean("isSecure").unwrap_or(false),
                is_disabled: props.boolean("isDisabled").unwrap_or(false),
                keyboard_type: props
                    .string("keyboardType")
                    .unwrap_or_else(|| "default".to_string()),
                binding: props.binding("text"),
                style: props.style(),
            },
            ComponentKind::Icon => Element::Icon {
                id,
                name: props.string("name").unwrap_or_default(),
                size: props.number("size").unwrap_or(DEFAULT_ICON_SIZE),
                color: props.string("color"),
            },
            ComponentKind::Picker => Element::Picker {
                id,
                selected_value: props.string("selectedValue").unwrap_or_default(),
                options: picker_options(props.get("options")),
                placeholder: props.string("placeholder"),
                binding: props.binding("selectedValue"),
            },
            ComponentKind::ImageUploader => Element::ImageUploader {
                id,
                image_url: props.string("imageUrl"),
                placeholder: props
                    .string("placeholder")
                    .unwrap_or_else(|| DEFAULT_UPLOADER_PLACEHOLDER.to_string()),
                max_size: props.get("maxSize").and_then(|v| v.as_i64()),
                allowed_types: props
                    .get("allowedTypes")
                    .and_then(|v| {
                        v.as_array().map(|items| {
                            items
                                .iter()
                                .filter_map(|item| item.as_str().map(str::to_string))
                                .collect()
                        })
                    })
                    .unwrap_or_else(|| DEFAULT_ALLOWED_TYPES.map(String::from).to_vec()),
                binding: props.binding("imageUrl"),
            },
            ComponentKind::Spacer => Element::Spacer {
                id,
                min_length: props.number("minLength"),
            },
            ComponentKind::Unknown(tag) => {
                debug!("Rendering unknown component '{}' as empty", tag);
                Element::Empty {
                    id,
                    kind: tag.clone(),
                }
            }
        }
    }

    fn render_children(node: &ComponentNode, store: Option<&StateStore>) -> Vec<Element> {
        node.children()
            .iter()
            .map(|child| Self::render(child, store))
            .collect()
    }
}

fn picker_options(raw: Option<DynamicValue>) -> Vec<PickerOption> {
    let Some(DynamicValue::Array(items)) = raw else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let label = item.get("label")?.as_str()?;
            let value = item.get("value")?.as_str()?;
            Some(PickerOption {
                label: label.to_string(),
                value: value.to_string(),
            })
        })
        .collect()
}
