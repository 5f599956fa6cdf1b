//! HTTP collaborators against a mock server

use crayon_config::{ChatConfig, DispatchConfig, ValidationConfig};
use crayon_core::chat::{ChatClient, ChatError, ChatRequest};
use crayon_core::effects::{ApiCaller, ApiRequest};
use crayon_core::http::{HttpApiCaller, HttpChatClient, HttpComponentValidator, HttpMethod};
use crayon_core::session::{self, RenderSession, SessionMessage, UiEvent};
use crayon_core::validation::{ComponentValidator, ValidationError, ValidationResult};
use crayon_core::{ActionDispatcher, ComponentNode, DynamicValue};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn chat_client(server: &MockServer, model: Option<&str>) -> HttpChatClient {
    HttpChatClient::new(&ChatConfig {
        base_url: format!("{}/api/apps", server.uri()),
        model: model.map(str::to_string),
        timeout_secs: Some(5),
    })
}

fn validator(server: &MockServer) -> HttpComponentValidator {
    HttpComponentValidator::new(&ValidationConfig {
        endpoint: format!("{}/api/valid", server.uri()),
        timeout_secs: 5,
        ..Default::default()
    })
}

// ============================================================================
// Chat
// ============================================================================

#[tokio::test]
async fn test_chat_posts_message_and_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/app-1/chat"))
        .and(query_param("model", "gpt-4o"))
        .and(body_json(json!({"message": "make a login form"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Here you go",
            "has_code_change": true,
            "version_number": 2,
            "requested_components": [],
            "node_state_tree": {"id": "root", "type": "SduiVStack", "children": []}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = chat_client(&server, Some("gpt-4o"));
    let response = client
        .send(&ChatRequest::new("app-1", "make a login form"))
        .await
        .unwrap();

    assert!(response.has_code_change);
    assert_eq!(response.version_number, 2);
    assert_eq!(response.tree().id, "root");
}

#[tokio::test]
async fn test_chat_request_model_overrides_default() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/apps/app-1/chat"))
        .and(query_param("model", "local"))
        .and(body_json(json!({"message": "hi", "screenshot_url": "https://img/s.png"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = chat_client(&server, Some("gpt-4o"));
    let request = ChatRequest::new("app-1", "hi")
        .with_model("local")
        .with_screenshot("https://img/s.png");
    let response = client.send(&request).await.unwrap();
    assert_eq!(response.message, "ok");
}

#[tokio::test]
async fn test_chat_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = chat_client(&server, None)
        .send(&ChatRequest::new("app-1", "hi"))
        .await;
    assert_eq!(
        result,
        Err(ChatError::Status {
            status: 503,
            body: "overloaded".into()
        })
    );
}

// ============================================================================
// Validation
// ============================================================================

#[tokio::test]
async fn test_validator_maps_typecheck_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/valid"))
        .and(body_json(json!({"componentCode": "<U>x</U>"})))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "any": {"isValid": true}})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = validator(&server).validate("<U>x</U>").await;
    assert_eq!(
        result,
        Ok(ValidationResult {
            typecheck: true,
            serialize: false
        })
    );
}

#[tokio::test]
async fn test_validator_maps_serialize_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "any": {"json": {"id": "root"}, "stateManager": {}}
        })))
        .mount(&server)
        .await;

    let result = validator(&server).validate("code").await;
    assert_eq!(
        result,
        Ok(ValidationResult {
            typecheck: false,
            serialize: true
        })
    );
}

#[tokio::test]
async fn test_validator_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/valid"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    assert_eq!(
        validator(&server).validate("code").await,
        Err(ValidationError::Status(500))
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "any": {}})))
        .mount(&server)
        .await;
    assert_eq!(
        validator(&server).validate("code").await,
        Err(ValidationError::UnexpectedPayload)
    );

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;
    assert!(matches!(
        validator(&server).validate("code").await,
        Err(ValidationError::Decode(_))
    ));
}

// ============================================================================
// API calls
// ============================================================================

#[tokio::test]
async fn test_api_caller_posts_result_to_inbox() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/search"))
        .and(body_json(json!({"query": "rust"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": 3})))
        .expect(1)
        .mount(&server)
        .await;

    let (tx, mut rx) = session::inbox();
    let caller = HttpApiCaller::new(tokio::runtime::Handle::current(), tx);
    let mut body = crayon_core::ValueMap::new();
    body.insert("query".into(), DynamicValue::from("rust"));

    caller.call(ApiRequest {
        url: format!("{}/search", server.uri()),
        method: HttpMethod::Post,
        body: Some(DynamicValue::Object(body)),
        result_key: Some("results".into()),
        generation: 4,
    });

    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let SessionMessage::ApiResult {
        generation,
        result_key,
        result,
        ..
    } = message;
    assert_eq!(generation, 4);
    assert_eq!(result_key.as_deref(), Some("results"));
    let value = result.unwrap();
    assert_eq!(value.get("hits"), Some(&DynamicValue::Int(3)));
}

#[tokio::test]
async fn test_api_caller_reports_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let (tx, mut rx) = session::inbox();
    let caller = HttpApiCaller::new(tokio::runtime::Handle::current(), tx);
    caller.call(ApiRequest {
        url: format!("{}/missing", server.uri()),
        method: HttpMethod::Get,
        body: None,
        result_key: None,
        generation: 1,
    });

    let message = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let SessionMessage::ApiResult { result, .. } = message;
    assert_eq!(result, Err("status 404".to_string()));
}

#[tokio::test]
async fn test_session_applies_api_result_after_pump() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/greeting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("hello from the server")))
        .mount(&server)
        .await;

    let tree = ComponentNode::from_json(
        json!({
            "id": "root", "type": "SduiVStack",
            "children": [
                {"id": "load", "type": "SduiButton", "props": {"title": "Load"},
                 "action": {"trigger": "onClick", "type": "API_CALL",
                            "payload": {"url": format!("{}/greeting", server.uri()), "resultKey": "greeting"}}},
                {"id": "out", "type": "SduiText", "props": {"text": "@state:greeting"}}
            ],
            "state": {"bindings": {"greeting": {"key": "greeting", "type": "string"}}}
        })
        .to_string()
        .as_bytes(),
    )
    .unwrap();

    let (tx, rx) = session::inbox();
    let api = Arc::new(HttpApiCaller::new(tokio::runtime::Handle::current(), tx.clone()));
    let dispatcher = ActionDispatcher::new(&DispatchConfig::default()).with_api_caller(api);
    let mut session = RenderSession::with_inbox(tree, dispatcher, (tx, rx));

    session.handle(UiEvent::tap("load"));
    let mut applied = 0;
    for _ in 0..100 {
        applied += session.pump().applied;
        if applied > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(applied, 1);
    assert!(session.render().outline().contains("hello from the server"));
}
