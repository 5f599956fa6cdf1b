//! Crate-level error aggregate
//!
//! Each concern keeps its own error enum. [`CrayonError`] wraps them for
//! callers that drive several concerns at once and want a single `?` type.

use crate::action::ActionError;
use crate::chat::ChatError;
use crate::effects::ScriptError;
use crate::http::HttpError;
use crate::state::ExpressionError;
use crate::validation::ValidationError;
use crate::value::ValueError;
use crayon_config::ConfigError;
use thiserror::Error;

/// Any error the engine can produce
#[derive(Debug, Error)]
pub enum CrayonError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias using [`CrayonError`]
pub type CrayonResult<T> = Result<T, CrayonError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_tree(bytes: &[u8]) -> CrayonResult<crate::node::ComponentNode> {
        Ok(crate::node::ComponentNode::from_json(bytes)?)
    }

    #[test]
    fn test_question_mark_converts() {
        let err = decode_tree(b"not json").unwrap_err();
        assert!(matches!(err, CrayonError::Value(ValueError::Decoding(_))));
    }

    #[test]
    fn test_display_is_transparent() {
        let err = CrayonError::from(HttpError::Timeout);
        assert_eq!(err.to_string(), "Request timed out");
    }
}
