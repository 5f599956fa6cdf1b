//! Collaborator seams for the effects actions can trigger.
//!
//! The dispatcher never performs I/O itself. API calls, script execution and
//! sharing go through the traits below; navigation goes out on a channel. The
//! `http` module and the `crayon-lua` crate provide the production
//! implementations, `test_support::mocks` provides recording ones.

use crate::http::HttpMethod;
use crate::value::DynamicValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A request raised by an `API_CALL` action
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub url: String,
    pub method: HttpMethod,
    /// JSON body for methods that carry one
    pub body: Option<DynamicValue>,
    /// State key that receives the decoded response body
    pub result_key: Option<String>,
    /// Session generation the request was raised in
    pub generation: u64,
}

/// Performs `API_CALL` effects.
///
/// Implementations must return promptly: long-running work belongs on a
/// background task that reports back through the session inbox.
pub trait ApiCaller: Send + Sync {
    fn call(&self, request: ApiRequest);
}

/// Script execution failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    /// Script did not compile
    #[error("Script syntax error: {0}")]
    Syntax(String),

    /// Script raised an error while running
    #[error("Script runtime error: {0}")]
    Runtime(String),

    /// Script exceeded a sandbox limit
    #[error("Script exceeded {0} limit")]
    LimitExceeded(&'static str),

    /// Sandbox could not be set up
    #[error("Script sandbox unavailable: {0}")]
    Sandbox(String),
}

/// Runs opaque scripts in a sandbox.
///
/// `state` is a read-only snapshot of the store (an object, or `null` when the
/// tree has no state).
pub trait ScriptRunner: Send + Sync {
    fn run(&self, script: &str, state: &DynamicValue) -> Result<DynamicValue, ScriptError>;
}

/// Receives text from `SHARE` actions
pub trait ShareSink: Send + Sync {
    fn share(&self, text: &str);
}

/// Destination raised by a `NAVIGATION` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationEvent {
    pub target: String,
}
