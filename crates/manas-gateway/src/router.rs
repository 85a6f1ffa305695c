use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::handler::ChatHandler;
use crate::handlers::{chat_handler, health_handler};
use crate::server::AppState;

/// Router with the chat and health routes, permissive CORS, and a request
/// body limit of `max_body_size` bytes.
pub fn build_router(handler: Arc<dyn ChatHandler>, max_body_size: usize) -> Router {
    let state = AppState {
        handler,
        started_at: Instant::now(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/chat", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(RequestBodyLimitLayer::new(max_body_size))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::handler::{HandlerError, HandlerFuture};

    /// Replies from a script; `Err` entries fail that call.
    #[derive(Default)]
    struct ScriptedHandler {
        script: Mutex<Vec<Result<String, String>>>,
        calls: AtomicUsize,
    }

    impl ScriptedHandler {
        fn new(script: Vec<Result<String, String>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script),
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl ChatHandler for ScriptedHandler {
        fn answer(&self, prompt: String) -> HandlerFuture<'_> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut script = self.script.lock().unwrap();
                if script.is_empty() {
                    Ok(format!("echo: {prompt}"))
                } else {
                    script.remove(0)
                }
            };
            Box::pin(async move { next.map_err(HandlerError::Internal) })
        }
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn send(app: Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[tokio::test]
    async fn chat_returns_response() {
        let handler = ScriptedHandler::new(vec![Ok("The soul is eternal.".into())]);
        let app = build_router(handler.clone(), 1_048_576);

        let (status, json) = send(app, chat_request(r#"{"prompt":"What is the soul?"}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"response": "The soul is eternal."}));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_prompt_rejected_without_calling_handler() {
        let handler = ScriptedHandler::new(vec![]);
        for body in ["{}", r#"{"prompt":null}"#, r#"{"prompt":""}"#] {
            let app = build_router(handler.clone(), 1_048_576);
            let (status, json) = send(app, chat_request(body)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "body: {body}");
            assert_eq!(json, serde_json::json!({"error": "Prompt is missing"}));
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn whitespace_prompt_is_answered() {
        let handler = ScriptedHandler::new(vec![]);
        let app = build_router(handler.clone(), 1_048_576);

        let (status, json) = send(app, chat_request(r#"{"prompt":"   "}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"response": "echo:    "}));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_body_rejected() {
        let handler = ScriptedHandler::new(vec![]);
        let app = build_router(handler.clone(), 1_048_576);

        let (status, json) = send(app, chat_request("{not json")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            json["error"]
                .as_str()
                .unwrap()
                .starts_with("invalid request body")
        );
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handler_failure_is_500_and_server_keeps_serving() {
        let handler = ScriptedHandler::new(vec![
            Err("model 'gemma3:4b' not found".into()),
            Ok("recovered".into()),
        ]);
        let app = build_router(handler, 1_048_576);

        let (status, json) = send(app.clone(), chat_request(r#"{"prompt":"q1"}"#)).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "model 'gemma3:4b' not found");

        let (status, json) = send(app, chat_request(r#"{"prompt":"q2"}"#)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["response"], "recovered");
    }

    #[tokio::test]
    async fn invalid_input_from_handler_is_400() {
        struct Rejecting;
        impl ChatHandler for Rejecting {
            fn answer(&self, _prompt: String) -> HandlerFuture<'_> {
                Box::pin(async { Err(HandlerError::InvalidInput("Prompt is missing".into())) })
            }
        }
        let app = build_router(Arc::new(Rejecting), 1_048_576);

        let (status, _) = send(app, chat_request(r#"{"prompt":"x"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let app = build_router(ScriptedHandler::new(vec![]), 1_048_576);
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let (status, json) = send(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert!(json["uptime_secs"].is_u64());
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let app = build_router(ScriptedHandler::new(vec![]), 1_048_576);
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/api/chat")
            .header("origin", "http://example.org")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert!(resp.status().is_success());
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "*"
        );
    }

    #[tokio::test]
    async fn body_size_limit() {
        let handler = ScriptedHandler::new(vec![]);
        let app = build_router(handler.clone(), 64);
        let oversized = format!(r#"{{"prompt":"{}"}}"#, "a".repeat(128));

        let resp = app.oneshot(chat_request(&oversized)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn get_on_chat_not_allowed() {
        let app = build_router(ScriptedHandler::new(vec![]), 1_048_576);
        let req = Request::builder()
            .uri("/api/chat")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
