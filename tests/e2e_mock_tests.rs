//! End-to-End Mock Tests
//!
//! Full relay flows over a real WebSocket, with the completion endpoint
//! replaced by a wiremock server where a remote path is needed.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voice_relay_gateway::config::{ApiCredential, CompletionConfig};
use voice_relay_gateway::{ServerConfig, routes, state::AppState};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper function to create a minimal test configuration
fn create_test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        rate_limit_requests_per_second: 100000, // Disable for tests
        max_connections_per_ip: 1000,
        ..Default::default()
    }
}

fn remote_completion(server: &MockServer) -> CompletionConfig {
    CompletionConfig {
        api_key: ApiCredential::new("gsk_test_key"),
        api_url: format!("{}/openai/v1/chat/completions", server.uri()),
        timeout_seconds: 2,
        ..Default::default()
    }
}

/// Bind the relay on an ephemeral port and return its address and state.
async fn spawn_server(config: ServerConfig) -> (SocketAddr, Arc<AppState>) {
    let app_state = AppState::new(config).unwrap();
    let app = routes::create_router(app_state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    (addr, app_state)
}

async fn connect(addr: SocketAddr, path: &str) -> WsClient {
    let (ws, _) = connect_async(format!("ws://{addr}{path}"))
        .await
        .expect("Should connect");
    ws
}

async fn send_json(ws: &mut WsClient, value: Value) {
    ws.send(Message::text(value.to_string())).await.unwrap();
}

/// Wait for the next JSON text message, skipping control frames.
async fn next_json(ws: &mut WsClient) -> Value {
    let deadline = Duration::from_secs(5);
    loop {
        let msg = timeout(deadline, ws.next())
            .await
            .expect("Timed out waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");
        match msg {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("Unexpected message: {other:?}"),
        }
    }
}

/// Assert nothing arrives within a short window.
async fn assert_silent(ws: &mut WsClient) {
    let result = timeout(Duration::from_millis(300), ws.next()).await;
    assert!(result.is_err(), "Expected no message, got {result:?}");
}

// =============================================================================
// Protocol Tests
// =============================================================================

#[tokio::test]
async fn test_ping_pong() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut ws).await, json!({"type": "pong"}));
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn test_malformed_message_returns_error_and_keeps_channel() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/ws").await;

    ws.send(Message::text("definitely not json".to_string()))
        .await
        .unwrap();
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "error", "message": "Failed to process message"})
    );
    assert_silent(&mut ws).await;

    // Channel is still usable
    send_json(&mut ws, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut ws).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_unknown_type_is_ignored() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "subscribe", "topic": "news"})).await;
    assert_silent(&mut ws).await;
}

#[tokio::test]
async fn test_binary_frame_carrying_json() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/").await;

    ws.send(Message::binary(br#"{"type":"ping"}"#.to_vec()))
        .await
        .unwrap();
    assert_eq!(next_json(&mut ws).await, json!({"type": "pong"}));
}

// =============================================================================
// Fallback Replies
// =============================================================================

#[tokio::test]
async fn test_transcription_without_credential_uses_fallback() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "Hello there"})).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "ai_response", "text": "Hello! How are you doing today?"})
    );

    send_json(&mut ws, json!({"type": "transcription", "text": "weather today"})).await;
    assert_eq!(
        next_json(&mut ws).await["text"],
        "I don't have access to current weather data, but I hope you're having a nice day!"
    );
}

#[tokio::test]
async fn test_back_to_back_transcriptions_answered_in_order() {
    let (addr, _state) = spawn_server(create_test_config()).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "thanks a lot"})).await;
    send_json(&mut ws, json!({"type": "transcription", "text": "goodbye"})).await;

    assert_eq!(
        next_json(&mut ws).await["text"],
        "You're very welcome! Is there anything else I can help you with?"
    );
    assert_eq!(
        next_json(&mut ws).await["text"],
        "Goodbye! It was nice talking with you. Have a great day!"
    );
}

// =============================================================================
// Remote Completion
// =============================================================================

#[tokio::test]
async fn test_remote_reply_is_relayed_verbatim() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .and(header("authorization", "Bearer gsk_test_key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "chatcmpl-123",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": "Sure, here's a fun fact about otters."}
            }]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ServerConfig {
        completion: remote_completion(&mock_server),
        ..create_test_config()
    };
    let (addr, _state) = spawn_server(config).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "tell me about otters"})).await;
    assert_eq!(
        next_json(&mut ws).await,
        json!({"type": "ai_response", "text": "Sure, here's a fun fact about otters."})
    );
}

#[tokio::test]
async fn test_upstream_500_falls_back() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ServerConfig {
        completion: remote_completion(&mock_server),
        ..create_test_config()
    };
    let (addr, _state) = spawn_server(config).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "Hello there"})).await;
    assert_eq!(
        next_json(&mut ws).await["text"],
        "Hello! How are you doing today?"
    );
}

#[tokio::test]
async fn test_slow_upstream_does_not_block_ping() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({"choices": []})),
        )
        .mount(&mock_server)
        .await;

    let config = ServerConfig {
        completion: CompletionConfig {
            timeout_seconds: 1,
            ..remote_completion(&mock_server)
        },
        ..create_test_config()
    };
    let (addr, _state) = spawn_server(config).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "help"})).await;
    send_json(&mut ws, json!({"type": "ping"})).await;

    // Pong overtakes the pending reply
    assert_eq!(next_json(&mut ws).await, json!({"type": "pong"}));
    // The bounded remote attempt then falls back
    assert_eq!(
        next_json(&mut ws).await["text"],
        "I'm here to help! What would you like to know or discuss?"
    );
}

// =============================================================================
// Connection Lifecycle
// =============================================================================

#[tokio::test]
async fn test_per_ip_limit_and_release() {
    let config = ServerConfig {
        max_connections_per_ip: 1,
        ..create_test_config()
    };
    let (addr, state) = spawn_server(config).await;

    let mut first = connect(addr, "/").await;
    send_json(&mut first, json!({"type": "ping"})).await;
    next_json(&mut first).await;
    assert_eq!(state.ws_connection_count(), 1);

    match connect_async(format!("ws://{addr}/")).await {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status(), 429),
        Err(e) => panic!("Expected HTTP 429 rejection, got {e}"),
        Ok(_) => panic!("Second connection should be rejected"),
    }

    first.close(None).await.unwrap();
    timeout(Duration::from_secs(5), async {
        while state.ws_connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Slot should be released after disconnect");

    let mut again = connect(addr, "/").await;
    send_json(&mut again, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut again).await, json!({"type": "pong"}));
}

#[tokio::test]
async fn test_close_with_pending_reply_drops_it() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/v1/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(3))
                .set_body_json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "Too late"}}]
                })),
        )
        .mount(&mock_server)
        .await;

    let config = ServerConfig {
        completion: CompletionConfig {
            timeout_seconds: 10,
            ..remote_completion(&mock_server)
        },
        ..create_test_config()
    };
    let (addr, state) = spawn_server(config).await;
    let mut ws = connect(addr, "/").await;

    send_json(&mut ws, json!({"type": "transcription", "text": "tell me a story"})).await;

    // Wait until the upstream call is in flight
    timeout(Duration::from_secs(5), async {
        while mock_server
            .received_requests()
            .await
            .is_none_or(|requests| requests.is_empty())
        {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Upstream should receive the completion request");

    ws.close(None).await.unwrap();

    // The slot is released long before the upstream would answer
    timeout(Duration::from_secs(2), async {
        while state.ws_connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Closing with a pending reply should release the slot");

    // The server keeps serving new channels
    let mut next = connect(addr, "/").await;
    send_json(&mut next, json!({"type": "ping"})).await;
    assert_eq!(next_json(&mut next).await, json!({"type": "pong"}));
    assert_silent(&mut next).await;
}

#[tokio::test]
async fn test_idle_channel_is_closed() {
    let config = ServerConfig {
        idle_timeout_seconds: 1,
        ..create_test_config()
    };
    let (addr, state) = spawn_server(config).await;
    let mut ws = connect(addr, "/").await;

    let closed = timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "Idle channel should be closed by the server");

    timeout(Duration::from_secs(5), async {
        while state.ws_connection_count() > 0 {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("Idle close should release the slot");
}
