//! Recording collaborators for testing
//!
//! Every mock keeps what it was asked to do behind a `Mutex` so tests can
//! assert on it after the fact, and can be configured to fail.
//!
//! # Example
//!
//! ```rust
//! use crayon_config::DispatchConfig;
//! use crayon_core::action::{ActionDescriptor, ActionKind};
//! use crayon_core::dispatch::ActionDispatcher;
//! use crayon_core::test_support::mocks::MockShareSink;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(MockShareSink::new());
//! let dispatcher = ActionDispatcher::new(&DispatchConfig::default()).with_share_sink(sink.clone());
//!
//! dispatcher.dispatch(&ActionDescriptor::new("onClick", ActionKind::Share).with("text", "hi"), None);
//! assert_eq!(sink.shared(), vec!["hi".to_string()]);
//! ```

use crate::chat::{ChatClient, ChatError, ChatRequest, ChatResponse};
use crate::effects::{ApiCaller, ApiRequest, ScriptError, ScriptRunner, ShareSink};
use crate::validation::{
    ComponentValidator, FailureReason, StepStatus, ValidationError, ValidationObserver,
    ValidationResult, ValidationStep,
};
use crate::value::DynamicValue;
use async_trait::async_trait;
use std::sync::Mutex;

fn recorded<T: Clone>(items: &Mutex<Vec<T>>) -> Vec<T> {
    items.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

fn record<T>(items: &Mutex<Vec<T>>, item: T) {
    items.lock().unwrap_or_else(|e| e.into_inner()).push(item);
}

// ============================================================================
// Effects
// ============================================================================

/// Records API requests without sending them
#[derive(Debug, Default)]
pub struct MockApiCaller {
    calls: Mutex<Vec<ApiRequest>>,
}

impl MockApiCaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        recorded(&self.calls)
    }
}

impl ApiCaller for MockApiCaller {
    fn call(&self, request: ApiRequest) {
        record(&self.calls, request);
    }
}

/// Records scripts and answers with a fixed result or error
#[derive(Debug)]
pub struct MockScriptRunner {
    scripts: Mutex<Vec<String>>,
    result: Result<DynamicValue, ScriptError>,
}

impl Default for MockScriptRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockScriptRunner {
    /// Runner whose scripts all return `null`
    pub fn new() -> Self {
        Self::returning(DynamicValue::Null)
    }

    pub fn returning(value: DynamicValue) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            result: Ok(value),
        }
    }

    /// Runner whose scripts all raise `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            scripts: Mutex::new(Vec::new()),
            result: Err(ScriptError::Runtime(message.into())),
        }
    }

    pub fn scripts(&self) -> Vec<String> {
        recorded(&self.scripts)
    }
}

impl ScriptRunner for MockScriptRunner {
    fn run(&self, script: &str, _state: &DynamicValue) -> Result<DynamicValue, ScriptError> {
        record(&self.scripts, script.to_string());
        self.result.clone()
    }
}

/// Records shared text
#[derive(Debug, Default)]
pub struct MockShareSink {
    shared: Mutex<Vec<String>>,
}

impl MockShareSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Vec<String> {
        recorded(&self.shared)
    }
}

impl ShareSink for MockShareSink {
    fn share(&self, text: &str) {
        record(&self.shared, text.to_string());
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Validator with a canned answer
#[derive(Debug)]
pub struct MockComponentValidator {
    answer: Result<ValidationResult, ValidationError>,
    codes: Mutex<Vec<String>>,
}

impl MockComponentValidator {
    pub fn answering(typecheck: bool, serialize: bool) -> Self {
        Self {
            answer: Ok(ValidationResult {
                typecheck,
                serialize,
            }),
            codes: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ValidationError) -> Self {
        Self {
            answer: Err(error),
            codes: Mutex::new(Vec::new()),
        }
    }

    /// Component code received so far
    pub fn codes(&self) -> Vec<String> {
        recorded(&self.codes)
    }
}

#[async_trait]
impl ComponentValidator for MockComponentValidator {
    async fn validate(&self, component_code: &str) -> Result<ValidationResult, ValidationError> {
        record(&self.codes, component_code.to_string());
        self.answer.clone()
    }
}

/// Observer that records every callback
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingObserver {
    pub transitions: Vec<(usize, StepStatus)>,
    pub completed: usize,
    pub failures: Vec<FailureReason>,
}

impl ValidationObserver for RecordingObserver {
    fn on_step_changed(&mut self, index: usize, step: &ValidationStep) {
        self.transitions.push((index, step.status));
    }

    fn on_completed(&mut self) {
        self.completed += 1;
    }

    fn on_failed(&mut self, reason: &FailureReason) {
        self.failures.push(reason.clone());
    }
}

// ============================================================================
// Chat
// ============================================================================

/// Chat backend with a canned reply
#[derive(Debug)]
pub struct MockChatClient {
    reply: Result<ChatResponse, ChatError>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChatClient {
    pub fn replying(response: ChatResponse) -> Self {
        Self {
            reply: Ok(response),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: ChatError) -> Self {
        Self {
            reply: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        recorded(&self.requests)
    }
}

#[async_trait]
impl ChatClient for MockChatClient {
    async fn send(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        record(&self.requests, request.clone());
        self.reply.clone()
    }
}
