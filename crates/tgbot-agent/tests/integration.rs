//! Integration tests for the tgbot-agent crate.
//!
//! A one-shot HTTP responder on localhost plays the completion endpoint so
//! request construction, status handling and answer extraction run end to
//! end without network access.

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use tgbot_agent::{
    AgentError, ChatRequest, Completion, ConversationHistory, LlmClient, LlmClientConfig, Message,
};

/// Serve a single response and return the request head and JSON body.
async fn fake_endpoint(status: u16, payload: Value) -> (String, JoinHandle<(String, Value)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}/v1", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                l.to_ascii_lowercase()
                    .strip_prefix("content-length:")
                    .map(|v| v.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);
        while buf.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            buf.extend_from_slice(&chunk[..n]);
        }
        let body: Value =
            serde_json::from_slice(&buf[header_end..header_end + content_length]).unwrap();

        let text = payload.to_string();
        let reason = if status == 200 { "OK" } else { "Error" };
        let reply = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{text}",
            text.len()
        );
        socket.write_all(reply.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();
        (head, body)
    });

    (base, handle)
}

fn client(base: &str) -> LlmClient {
    LlmClient::new(LlmClientConfig::openai_compatible("sk-local", "test-model", base)).unwrap()
}

#[tokio::test]
async fn complete_returns_first_choice_text() {
    let (base, server) = fake_endpoint(
        200,
        json!({"choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi there"}}]}),
    )
    .await;

    let request = ChatRequest::new(vec![Message::system("sys"), Message::user("hello")]);
    let answer = client(&base).complete(&request).await.unwrap();
    assert_eq!(answer, "Hi there");

    let (head, body) = server.await.unwrap();
    assert!(head.starts_with("POST /v1/chat/completions HTTP/1.1"));
    assert!(head.to_ascii_lowercase().contains("authorization: bearer sk-local"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hello");
}

#[tokio::test]
async fn non_success_status_is_request_failure() {
    let (base, server) = fake_endpoint(401, json!({"error": {"message": "bad key"}})).await;

    let err = client(&base)
        .complete(&ChatRequest::new(vec![Message::user("x")]))
        .await
        .unwrap_err();
    match err {
        AgentError::LlmRequestFailed { reason } => assert!(reason.contains("401")),
        other => panic!("expected LlmRequestFailed, got {other:?}"),
    }
    server.await.unwrap();
}

#[tokio::test]
async fn history_feeds_follow_up_requests() {
    let history = ConversationHistory::new(10);
    history.push(5, Message::user("first"));
    history.push(5, Message::assistant("answer"));
    history.push(5, Message::user("second"));

    let (base, server) = fake_endpoint(
        200,
        json!({"choices": [{"message": {"role": "assistant", "content": "ok"}}]}),
    )
    .await;

    let mut messages = vec![Message::system("sys")];
    messages.extend(history.snapshot(5));
    client(&base)
        .complete(&ChatRequest::new(messages))
        .await
        .unwrap();

    let (_, body) = server.await.unwrap();
    let sent = body["messages"].as_array().unwrap();
    assert_eq!(sent.len(), 4);
    assert_eq!(sent[3]["content"], "second");
}
