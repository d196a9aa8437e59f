use futures::StreamExt;
use mockito::Matcher;
use serde_json::json;
use tubechat_client::{ConversationGateway, GatewayConfig, GatewayError, HttpGateway};
use tubechat_types::{ConversationId, MessageRole, MessageStatus};

fn gateway_for(server: &mockito::Server) -> HttpGateway {
    HttpGateway::new(GatewayConfig::new(server.url())).unwrap()
}

#[tokio::test]
async fn test_resolve_conversation_found() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/get_chat_id")
        .match_body(Matcher::Json(json!({ "channel_id": "UC1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("\"conv-1\"")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let id = gateway.resolve_conversation("UC1").await.unwrap();

    assert_eq!(id, Some(ConversationId::new("conv-1")));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_resolve_conversation_missing() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/get_chat_id")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("null")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    assert_eq!(gateway.resolve_conversation("UC1").await.unwrap(), None);
}

#[tokio::test]
async fn test_create_conversation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/initiate")
        .match_body(Matcher::Json(json!({ "channel_id": "UC1" })))
        .with_status(200)
        .with_body("\"conv-2\"")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let id = gateway.create_conversation("UC1").await.unwrap();

    assert_eq!(id.as_str(), "conv-2");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_conversation_without_id_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/initiate")
        .with_status(200)
        .with_body("")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let err = gateway.create_conversation("UC1").await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingData(_)));
}

#[tokio::test]
async fn test_fetch_history_stamps_channel() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/history")
        .match_body(Matcher::Json(json!({ "chat_id": "conv-1" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                {"id": "m1", "role": "user", "content": "Hi", "status": "COMPLETED",
                 "created_at": "2024-02-01T12:00:00.000001"},
                {"id": "m2", "role": "assistant", "content": "Hello!", "status": "completed",
                 "additional_kwargs": {}, "status_reason": null}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let history = gateway
        .fetch_history("UC1", &ConversationId::new("conv-1"))
        .await
        .unwrap();

    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, "m1");
    assert_eq!(history[0].role, MessageRole::User);
    assert_eq!(history[1].role, MessageRole::Assistant);
    assert!(history.iter().all(|m| m.channel_id == "UC1"));
    assert!(history.iter().all(|m| m.status == MessageStatus::Completed));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_channel_and_list() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/onboard/channel_details/")
        .match_body(Matcher::Json(json!({ "channel_id": "UC1" })))
        .with_status(200)
        .with_body(json!({"_id": "UC1", "title": "One", "status": "active"}).to_string())
        .create_async()
        .await;
    server
        .mock("POST", "/onboard/channels")
        .with_status(200)
        .with_body(
            json!([
                {"_id": "UC1", "title": "One", "status": "active"},
                {"id": "UC2", "title": "Two", "channel_status": "Inactive"}
            ])
            .to_string(),
        )
        .create_async()
        .await;

    let gateway = gateway_for(&server);

    let channel = gateway.fetch_channel("UC1").await.unwrap();
    assert_eq!(channel.title, "One");
    assert!(channel.is_active());

    let channels = gateway.list_channels().await.unwrap();
    assert_eq!(channels.len(), 2);
    assert!(!channels[1].is_active());
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/onboard/channel_details/")
        .with_status(500)
        .with_body("{\"detail\":\"boom\"}")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    match gateway.fetch_channel("UC1").await {
        Err(GatewayError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected status error, got {:?}", other.map(|c| c.id)),
    }
}

#[tokio::test]
async fn test_cookie_is_forwarded() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/onboard/channels")
        .match_header("cookie", "session=abc")
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let gateway =
        HttpGateway::new(GatewayConfig::new(server.url()).with_cookie("session=abc")).unwrap();
    assert!(gateway.list_channels().await.unwrap().is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_message_stream_yields_payloads() {
    let mut server = mockito::Server::new_async().await;
    let body = concat!(
        ": connected\n\n",
        "data: {\"id\":\"abc\",\"content\":\"Hel\",\"status\":\"IN_PROGRESS\"}\n\n",
        "data: {\"id\":\"abc\",\"content\":\"Hello!\",\"status\":\"COMPLETED\"}\n\n",
    );
    let mock = server
        .mock("GET", Matcher::Regex(r"^/chat/conv-1/message_stream".to_string()))
        .match_query(Matcher::UrlEncoded(
            "user_message".to_string(),
            "hi there".to_string(),
        ))
        .match_header("accept", "text/event-stream")
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let stream = gateway
        .open_message_stream(&ConversationId::new("conv-1"), "hi there")
        .await
        .unwrap();
    let payloads: Vec<String> = stream.map(|p| p.unwrap()).collect().await;

    assert_eq!(payloads.len(), 2);
    assert!(payloads[1].contains("Hello!"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_message_stream_rejected_by_backend() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", Matcher::Regex(r"^/chat/missing/message_stream".to_string()))
        .with_status(400)
        .with_body("{\"detail\":\"Chat not found\"}")
        .create_async()
        .await;

    let gateway = gateway_for(&server);
    let result = gateway
        .open_message_stream(&ConversationId::new("missing"), "hi")
        .await;

    assert!(matches!(result, Err(GatewayError::Status { status: 400, .. })));
}
