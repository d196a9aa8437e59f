use tubechat_types::{
    normalize_status, Conversation, ConversationId, Message, MessageRole, MessageStatus,
    WireMessage, WireStatus, PLACEHOLDER_ID,
};

#[test]
fn test_message_serializes_with_frontend_field_names() {
    let msg = Message::user("chan-1", "Hello");
    let json = serde_json::to_value(&msg).unwrap();

    assert_eq!(json["channelId"], "chan-1");
    assert_eq!(json["role"], "user");
    assert_eq!(json["status"], "in_progress");
    assert!(json.get("createdAt").is_some());
}

#[test]
fn test_message_accepts_snake_case_aliases() {
    let json = r#"{
        "id": "m1",
        "content": "hi",
        "role": "USER",
        "channel_id": "chan",
        "created_at": "2024-01-01T00:00:00Z",
        "status": "COMPLETED"
    }"#;
    let msg: Message = serde_json::from_str(json).unwrap();

    assert_eq!(msg.role, MessageRole::User);
    assert_eq!(msg.status, MessageStatus::Completed);
    assert_eq!(msg.channel_id, "chan");
}

#[test]
fn test_conversation_id_is_transparent() {
    let id: ConversationId = serde_json::from_str("\"65f0c0ffee\"").unwrap();
    assert_eq!(id.as_str(), "65f0c0ffee");
    assert_eq!(id.to_string(), "65f0c0ffee");
    assert_eq!(serde_json::to_string(&id).unwrap(), "\"65f0c0ffee\"");
}

#[test]
fn test_conversation_with_history() {
    let conversation = Conversation::new(ConversationId::new("c1"), "chan")
        .with_history(vec![Message::user("chan", "first")]);

    assert_eq!(conversation.history.len(), 1);
    assert_eq!(conversation.channel_id, "chan");
}

#[test]
fn test_stream_record_without_id_targets_placeholder() {
    let wire = WireMessage::parse(r#"{"content":"partial"}"#).unwrap();
    let (msg, status) = wire.into_message("chan", PLACEHOLDER_ID);

    assert!(msg.is_placeholder());
    assert_eq!(status, WireStatus::Known(MessageStatus::InProgress));
}

#[test]
fn test_every_status_name_round_trips_through_normalization() {
    for status in MessageStatus::ALL {
        let upper = status.as_str().to_uppercase();
        assert_eq!(normalize_status(&upper), WireStatus::Known(status));

        let qualified = format!("ChatResponseStatusEnum.{upper}");
        assert_eq!(normalize_status(&qualified), WireStatus::Known(status));
    }
}
