//! Platform-neutral element tree produced by the renderer

use crate::action::ActionDescriptor;
use crate::style::StyleProps;
use serde::Serialize;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IconPosition {
    #[default]
    Left,
    Right,
}

impl IconPosition {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl ButtonSize {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "small" => Some(Self::Small),
            "medium" => Some(Self::Medium),
            "large" => Some(Self::Large),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonVariant {
    #[default]
    Default,
    Bordered,
    Primary,
    Danger,
}

impl ButtonVariant {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "default" => Some(Self::Default),
            "bordered" => Some(Self::Bordered),
            "primary" => Some(Self::Primary),
            "danger" => Some(Self::Danger),
            _ => None,
        }
    }
}

/// Entry of a picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerOption {
    pub label: String,
    pub value: String,
}

/// One rendered element.
///
/// `binding` fields hold the state key an input writes back to when its prop
/// was a `@state:` reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum Element {
    VStack {
        id: String,
        spacing: f64,
        children: Vec<Element>,
    },
    HStack {
        id: String,
        spacing: f64,
        children: Vec<Element>,
    },
    Text {
        id: String,
        text: String,
        #[serde(skip_serializing_if = "StyleProps::is_empty")]
        style: StyleProps,
    },
    Image {
        id: String,
        url: String,
        #[serde(skip_serializing_if = "StyleProps::is_empty")]
        style: StyleProps,
    },
    Button {
        id: String,
        title: String,
        enabled: bool,
        loading: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        icon: Option<String>,
        icon_position: IconPosition,
        #[serde(skip_serializing_if = "Option::is_none")]
        accessibility_label: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tooltip: Option<String>,
        size: ButtonSize,
        variant: ButtonVariant,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<ActionDescriptor>,
    },
    TextField {
        id: String,
        text: String,
        placeholder: String,
        is_secure: bool,
        is_disabled: bool,
        keyboard_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        binding: Option<String>,
        #[serde(skip_serializing_if = "StyleProps::is_empty")]
        style: StyleProps,
    },
    Icon {
        id: String,
        name: String,
        size: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<String>,
    },
    Picker {
        id: String,
        selected_value: String,
        options: Vec<PickerOption>,
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        binding: Option<String>,
    },
    ImageUploader {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        placeholder: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        max_size: Option<i64>,
        allowed_types: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        binding: Option<String>,
    },
    Spacer {
        id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        min_length: Option<f64>,
    },
    /// Unknown component kind; renders nothing
    Empty { id: String, kind: String },
}

impl Element {
    pub fn id(&self) -> &str {
        match self {
            Self::VStack { id, .. }
            | Self::HStack { id, .. }
            | Self::Text { id, .. }
            | Self::Image { id, .. }
            | Self::Button { id, .. }
            | Self::TextField { id, .. }
            | Self::Icon { id, .. }
            | Self::Picker { id, .. }
            | Self::ImageUploader { id, .. }
            | Self::Spacer { id, .. }
            | Self::Empty { id, .. } => id,
        }
    }

    pub fn children(&self) -> &[Element] {
        match self {
            Self::VStack { children, .. } | Self::HStack { children, .. } => children,
            _ => &[],
        }
    }

    /// Depth-first lookup by id
    pub fn find(&self, id: &str) -> Option<&Element> {
        if self.id() == id {
            return Some(self);
        }
        self.children().iter().find_map(|child| child.find(id))
    }

    /// Indented one-line-per-element outline
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.write_outline(&mut out, 0);
        out
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let line = match self {
            Self::VStack { id, spacing, .. } => format!("VStack #{id} spacing={spacing}"),
            Self::HStack { id, spacing, .. } => format!("HStack #{id} spacing={spacing}"),
            Self::Text { id, text, .. } => format!("Text #{id} {text:?}"),
            Self::Image { id, url, .. } => format!("Image #{id} {url}"),
            Self::Button {
                id,
                title,
                enabled,
                loading,
                ..
            } => {
                let mut line = format!("Button #{id} {title:?}");
                if !enabled {
                    line.push_str(" [disabled]");
                }
                if *loading {
                    line.push_str(" [loading]");
                }
                line
            }
            Self::TextField {
                id, text, binding, ..
            } => match binding {
                Some(key) => format!("TextField #{id} {text:?} <-> @{key}"),
                None => format!("TextField #{id} {text:?}"),
            },
            Self::Icon { id, name, size, .. } => format!("Icon #{id} {name} size={size}"),
            Self::Picker {
                id,
                selected_value,
                options,
                ..
            } => format!(
                "Picker #{id} {selected_value:?} of {} options",
                options.len()
            ),
            Self::ImageUploader { id, image_url, .. } => match image_url {
                Some(url) => format!("ImageUploader #{id} {url}"),
                None => format!("ImageUploader #{id} (empty)"),
            },
            Self::Spacer { id, .. } => format!("Spacer #{id}"),
            Self::Empty { id, kind } => format!("Empty #{id} ({kind})"),
        };
        let _ = writeln!(out, "{indent}{line}");
        for child in self.children() {
            child.write_outline(out, depth + 1);
        }
    }
}
