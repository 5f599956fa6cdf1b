//! Chat turns: send a message, get a tree to display.
//!
//! The [`ChatClient`] seam talks to the generation backend. [`ChatFlow`] wraps
//! one client, optionally validates returned component code, and always hands
//! back something renderable: the decoded `node_state_tree`, or a fallback
//! tree that shows the assistant's message as plain text.

use crate::node::ComponentNode;
use crate::validation::{ValidationObserver, ValidationPipeline, ValidationReport};
use crate::value::{DynamicValue, ValueMap};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Outgoing chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// App the conversation belongs to (part of the URL, not the body)
    #[serde(skip)]
    pub app_id: String,
    /// Model override (query parameter, not the body)
    #[serde(skip)]
    pub model: Option<String>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_url: Option<String>,
}

impl ChatRequest {
    pub fn new(app_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            model: None,
            message: message.into(),
            screenshot_url: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_screenshot(mut self, url: impl Into<String>) -> Self {
        self.screenshot_url = Some(url.into());
        self
    }
}

/// Backend answer to one chat message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
    #[serde(default)]
    pub has_code_change: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_state_tree: Option<ValueMap>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typescript_code: Option<String>,
    #[serde(default)]
    pub version_number: i64,
    #[serde(default)]
    pub requested_components: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChatResponse {
    /// The node tree to display. Falls back to a plain-text tree carrying
    /// the message when there is no tree or it does not decode.
    pub fn tree(&self) -> ComponentNode {
        let Some(raw) = &self.node_state_tree else {
            debug!("Chat response has no node tree; using fallback");
            return ComponentNode::fallback(self.message.clone());
        };
        match ComponentNode::from_value(&DynamicValue::Object(raw.clone())) {
            Ok(tree) => tree,
            Err(e) => {
                warn!("Chat response node tree did not decode: {}", e);
                ComponentNode::fallback(self.message.clone())
            }
        }
    }
}

/// Chat transport failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChatError {
    #[error("Chat request failed: {0}")]
    Transport(String),

    #[error("Chat service answered with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Could not decode chat response: {0}")]
    Decode(String),

    #[error("Chat turn cancelled")]
    Cancelled,
}

/// Generation backend
#[async_trait]
pub trait ChatClient: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}

/// Result of one chat turn
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub response: ChatResponse,
    /// Tree to display (decoded or fallback)
    pub tree: ComponentNode,
    /// Present when the response carried component code and a pipeline was set
    pub validation: Option<ValidationReport>,
}

/// Sends messages and prepares their results for display
pub struct ChatFlow<C> {
    client: C,
    validation: Option<ValidationPipeline>,
}

impl<C: ChatClient> ChatFlow<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            validation: None,
        }
    }

    /// Validate returned component code with `pipeline`
    pub fn with_validation(mut self, pipeline: ValidationPipeline) -> Self {
        self.validation = Some(pipeline);
        self
    }

    /// Run one turn. Network failures are errors; a missing or broken tree
    /// is not.
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        observer: &mut dyn ValidationObserver,
    ) -> Result<ChatTurn, ChatError> {
        info!("Sending chat message for app {}", request.app_id);
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ChatError::Cancelled),
            response = self.client.send(request) => response?,
        };

        if let Some(error) = &response.error {
            warn!("Chat service reported: {}", error);
        }
        if !response.requested_components.is_empty() {
            info!(
                "Backend requested unavailable components: {}",
                response.requested_components.join(", ")
            );
        }

        let validation = match (&self.validation, &response.typescript_code) {
            (Some(pipeline), Some(code)) => Some(pipeline.run(code, cancel, observer).await),
            _ => None,
        };

        let tree = response.tree();
        debug!(
            "Chat turn produced tree '{}' with {} nodes (version {})",
            tree.id,
            tree.node_count(),
            response.version_number
        );
        Ok(ChatTurn {
            response,
            tree,
            validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FALLBACK_NODE_ID;
    use crate::test_support::mocks::{MockChatClient, MockComponentValidator};
    use crate::validation::{NoopObserver, ValidationOutcome};
    use crayon_config::ValidationConfig;
    use std::sync::Arc;

    fn response(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_body_omits_routing_fields() {
        let request = ChatRequest::new("app-1", "hi").with_model("m");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body, serde_json::json!({"message": "hi"}));

        let request = request.with_screenshot("https://img/1.png");
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["screenshot_url"], "https://img/1.png");
    }

    #[test]
    fn test_response_decodes_snake_case() {
        let response = response(
            r#"{"message": "done", "has_code_change": true, "version_number": 3,
                "requested_components": ["SduiMap"],
                "node_state_tree": {"id": "root", "type": "SduiText", "props": {"text": "hi"}}}"#,
        );
        assert!(response.has_code_change);
        assert_eq!(response.version_number, 3);
        assert_eq!(response.tree().id, "root");
    }

    #[test]
    fn test_missing_or_broken_tree_falls_back() {
        let plain = response(r#"{"message": "no ui this time"}"#);
        let tree = plain.tree();
        assert_eq!(tree.id, FALLBACK_NODE_ID);
        assert_eq!(
            tree.find("response_content")
                .and_then(|node| node.props.get("text")),
            Some(&DynamicValue::from("no ui this time"))
        );

        let broken = response(r#"{"message": "m", "node_state_tree": {"id": 5}}"#);
        assert_eq!(broken.tree().id, FALLBACK_NODE_ID);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flow_validates_code() {
        let client = MockChatClient::replying(response(
            r#"{"message": "ok", "typescript_code": "export default 1"}"#,
        ));
        let pipeline = ValidationPipeline::new(
            Arc::new(MockComponentValidator::answering(true, true)),
            &ValidationConfig::default(),
        );
        let flow = ChatFlow::new(client).with_validation(pipeline);

        let turn = flow
            .send(
                &ChatRequest::new("app", "make a form"),
                &CancellationToken::new(),
                &mut NoopObserver,
            )
            .await
            .unwrap();

        assert_eq!(
            turn.validation.map(|report| report.outcome),
            Some(ValidationOutcome::Completed)
        );
        assert_eq!(turn.tree.id, FALLBACK_NODE_ID);
    }

    #[tokio::test]
    async fn test_flow_propagates_transport_errors() {
        let flow = ChatFlow::new(MockChatClient::failing(ChatError::Transport("down".into())));
        let result = flow
            .send(
                &ChatRequest::new("app", "hi"),
                &CancellationToken::new(),
                &mut NoopObserver,
            )
            .await;
        assert_eq!(result, Err(ChatError::Transport("down".into())));
    }
}
