//! Style data attached to nodes.
//!
//! Styles are carried through to elements as plain data; mapping them onto
//! platform colors and fonts is the host's business.

use crate::value::{DynamicValue, ValueMap};
use serde::{Deserialize, Serialize};

/// Node-level style descriptor (`style` on the wire)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<ValueMap>,
}

/// Visual properties read from a node's `style` prop
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyleProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
}

impl StyleProps {
    /// Extract style props from the `style` prop value. Anything that is not
    /// an object yields the empty style; mistyped entries are skipped.
    pub fn from_value(value: Option<&DynamicValue>) -> Self {
        let Some(map) = value.and_then(DynamicValue::as_object) else {
            return Self::default();
        };
        let string = |key: &str| map.get(key).and_then(DynamicValue::as_str).map(str::to_string);
        let number = |key: &str| map.get(key).and_then(DynamicValue::as_f64);

        Self {
            foreground_color: string("foregroundColor"),
            background_color: string("backgroundColor"),
            font_size: number("fontSize"),
            font_weight: string("fontWeight"),
            padding: number("padding"),
            corner_radius: number("cornerRadius"),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::decode;

    #[test]
    fn test_extracts_known_keys() {
        let raw = decode(
            br##"{"foregroundColor": "#ff0000", "fontSize": 20, "padding": 4.5, "cornerRadius": "big"}"##,
        )
        .unwrap();
        let style = StyleProps::from_value(Some(&raw));
        assert_eq!(style.foreground_color.as_deref(), Some("#ff0000"));
        assert_eq!(style.font_size, Some(20.0));
        assert_eq!(style.padding, Some(4.5));
        assert_eq!(style.corner_radius, None);
    }

    #[test]
    fn test_non_object_is_empty() {
        assert!(StyleProps::from_value(Some(&DynamicValue::Int(3))).is_empty());
        assert!(StyleProps::from_value(None).is_empty());
    }
}
