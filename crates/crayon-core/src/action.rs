//! Declarative action descriptors and their typed interpretation.
//!
//! On the wire an action is `{trigger, type, payload}` with an open `type`
//! tag. [`ActionKind`] closes the tag set (keeping unknown tags intact) and
//! [`Action::from_descriptor`] checks the payload keys each kind needs.

use crate::effects::ApiRequest;
use crate::http::HttpMethod;
use crate::value::{DynamicValue, ValueMap};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Effect kinds an action can name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionKind {
    /// `API_CALL`
    ApiCall,
    /// `NAVIGATION`
    Navigation,
    /// `JAVASCRIPT`: a script handed to the sandboxed script runner
    Script,
    /// `SHARE`
    Share,
    /// `STATE_UPDATE`
    StateUpdate,
    /// Tag this build does not know; re-encodes unchanged
    Unknown(String),
}

impl ActionKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::ApiCall => "API_CALL",
            Self::Navigation => "NAVIGATION",
            Self::Script => "JAVASCRIPT",
            Self::Share => "SHARE",
            Self::StateUpdate => "STATE_UPDATE",
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<String> for ActionKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "API_CALL" => Self::ApiCall,
            "NAVIGATION" => Self::Navigation,
            "JAVASCRIPT" => Self::Script,
            "SHARE" => Self::Share,
            "STATE_UPDATE" => Self::StateUpdate,
            _ => Self::Unknown(tag),
        }
    }
}

impl From<&str> for ActionKind {
    fn from(tag: &str) -> Self {
        Self::from(tag.to_string())
    }
}

impl From<ActionKind> for String {
    fn from(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire form of an action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// UI event that raises the action, e.g. `onClick`, `onChange`
    #[serde(default)]
    pub trigger: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    #[serde(default)]
    pub payload: ValueMap,
}

impl ActionDescriptor {
    pub fn new(trigger: impl Into<String>, kind: impl Into<ActionKind>) -> Self {
        Self {
            trigger: trigger.into(),
            kind: kind.into(),
            payload: ValueMap::new(),
        }
    }

    /// Add a payload entry (builder pattern)
    pub fn with(mut self, key: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// `STATE_UPDATE` of `key` to `value`
    pub fn state_update(key: impl Into<String>, value: impl Into<DynamicValue>) -> Self {
        let key: String = key.into();
        Self::new("onChange", ActionKind::StateUpdate)
            .with("key", key)
            .with("value", value)
    }
}

/// Errors raised while interpreting or performing an action.
///
/// None of these reach the user; the dispatcher logs them and drops the action.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    /// Required payload key is absent
    #[error("{kind} action is missing payload key '{key}'")]
    MissingPayload { kind: ActionKind, key: &'static str },

    /// Payload key is present with the wrong shape
    #[error("{kind} action payload key '{key}' must be {expected}")]
    InvalidPayload {
        kind: ActionKind,
        key: &'static str,
        expected: &'static str,
    },

    /// STATE_UPDATE raised where no store exists
    #[error("No state store to update '{0}'")]
    NoStore(String),

    /// The dispatcher was built without a collaborator for this kind
    #[error("No collaborator configured for {0} actions")]
    NoCollaborator(ActionKind),

    /// The navigation receiver has been dropped
    #[error("Navigation channel closed")]
    ChannelClosed,

    /// Watcher cascade went deeper than the configured limit
    #[error("Watcher cascade exceeded depth {depth} at key '{key}'")]
    WatcherDepthExceeded { depth: usize, key: String },

    /// Script runner reported a failure
    #[error("Script failed: {0}")]
    Script(String),
}

impl ActionError {
    fn missing(kind: &ActionKind, key: &'static str) -> Self {
        Self::MissingPayload {
            kind: kind.clone(),
            key,
        }
    }

    fn invalid(kind: &ActionKind, key: &'static str, expected: &'static str) -> Self {
        Self::InvalidPayload {
            kind: kind.clone(),
            key,
            expected,
        }
    }
}

/// An action whose payload has been checked
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ApiCall(ApiRequest),
    Navigate { target: String },
    RunScript { script: String },
    Share { text: String },
    UpdateState { key: String, value: DynamicValue },
    /// Unknown tag, kept for logging
    Unknown(String),
}

impl Action {
    /// Interpret a descriptor, checking the payload keys its kind requires.
    pub fn from_descriptor(descriptor: &ActionDescriptor) -> Result<Self, ActionError> {
        let kind = &descriptor.kind;
        let payload = &descriptor.payload;

        match kind {
            ActionKind::ApiCall => {
                let url = required_str(kind, payload, "url")?;
                let method = match optional_str(kind, payload, "method")? {
                    Some(raw) => HttpMethod::parse(raw)
                        .ok_or_else(|| ActionError::invalid(kind, "method", "an HTTP method"))?,
                    None => HttpMethod::Get,
                };
                let result_key = optional_str(kind, payload, "resultKey")?.map(str::to_string);
                Ok(Self::ApiCall(ApiRequest {
                    url: url.to_string(),
                    method,
                    body: payload.get("body").cloned(),
                    result_key,
                    generation: 0,
                }))
            }
            ActionKind::Navigation => Ok(Self::Navigate {
                target: required_str(kind, payload, "target")?.to_string(),
            }),
            ActionKind::Script => Ok(Self::RunScript {
                script: required_str(kind, payload, "script")?.to_string(),
            }),
            ActionKind::Share => Ok(Self::Share {
                text: required_str(kind, payload, "text")?.to_string(),
            }),
            ActionKind::StateUpdate => {
                let key = required_str(kind, payload, "key")?.to_string();
                let value = payload
                    .get("value")
                    .cloned()
                    .ok_or_else(|| ActionError::missing(kind, "value"))?;
                Ok(Self::UpdateState { key, value })
            }
            ActionKind::Unknown(raw) => Ok(Self::Unknown(raw.clone())),
        }
    }
}

fn required_str<'a>(
    kind: &ActionKind,
    payload: &'a ValueMap,
    key: &'static str,
) -> Result<&'a str, ActionError> {
    optional_str(kind, payload, key)?.ok_or_else(|| ActionError::missing(kind, key))
}

fn optional_str<'a>(
    kind: &ActionKind,
    payload: &'a ValueMap,
    key: &'static str,
) -> Result<Option<&'a str>, ActionError> {
    match payload.get(key) {
        None | Some(DynamicValue::Null) => Ok(None),
        Some(DynamicValue::String(s)) => Ok(Some(s)),
        Some(_) => Err(ActionError::invalid(kind, key, "a string")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("API_CALL", ActionKind::ApiCall ; "api call")]
    #[test_case("NAVIGATION", ActionKind::Navigation ; "navigation")]
    #[test_case("JAVASCRIPT", ActionKind::Script ; "script")]
    #[test_case("SHARE", ActionKind::Share ; "share")]
    #[test_case("STATE_UPDATE", ActionKind::StateUpdate ; "state update")]
    fn test_known_tags(tag: &str, expected: ActionKind) {
        let kind = ActionKind::from(tag);
        assert_eq!(kind, expected);
        assert_eq!(String::from(kind), tag);
    }

    #[test]
    fn test_unknown_tag_round_trips() {
        let json = r#"{"trigger":"onClick","type":"OPEN_CAMERA","payload":{"x":1}}"#;
        let descriptor: ActionDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.kind, ActionKind::Unknown("OPEN_CAMERA".into()));
        assert_eq!(serde_json::to_string(&descriptor).unwrap(), json);
    }

    #[test]
    fn test_trigger_and_payload_default() {
        let descriptor: ActionDescriptor = serde_json::from_str(r#"{"type": "SHARE"}"#).unwrap();
        assert!(descriptor.trigger.is_empty());
        assert!(descriptor.payload.is_empty());
        assert_eq!(
            Action::from_descriptor(&descriptor),
            Err(ActionError::MissingPayload {
                kind: ActionKind::Share,
                key: "text"
            })
        );
    }

    #[test]
    fn test_api_call_payload() {
        let descriptor = ActionDescriptor::new("onClick", ActionKind::ApiCall)
            .with("url", "https://api.example.com/items")
            .with("method", "post")
            .with("resultKey", "items");
        let Action::ApiCall(request) = Action::from_descriptor(&descriptor).unwrap() else {
            panic!("expected api call");
        };
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.result_key.as_deref(), Some("items"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_mistyped_payload_rejected() {
        let descriptor = ActionDescriptor::new("onClick", ActionKind::Navigation).with("target", 7);
        assert!(matches!(
            Action::from_descriptor(&descriptor),
            Err(ActionError::InvalidPayload { key: "target", .. })
        ));

        let descriptor = ActionDescriptor::new("onClick", ActionKind::ApiCall)
            .with("url", "https://x")
            .with("method", "TELEPORT");
        assert!(Action::from_descriptor(&descriptor).is_err());
    }

    #[test]
    fn test_state_update_accepts_any_value() {
        let descriptor = ActionDescriptor::state_update("count", DynamicValue::Null);
        assert_eq!(
            Action::from_descriptor(&descriptor).unwrap(),
            Action::UpdateState {
                key: "count".into(),
                value: DynamicValue::Null
            }
        );

        let missing = ActionDescriptor::new("onChange", ActionKind::StateUpdate).with("key", "count");
        assert!(matches!(
            Action::from_descriptor(&missing),
            Err(ActionError::MissingPayload { key: "value", .. })
        ));
    }
}
