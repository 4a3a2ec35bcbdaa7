use super::{EventKind, Notification, RawEvent, decode};

#[test]
fn test_decode_message_line() {
    let event = decode(r#"{"id":"abc","time":1000,"event":"message","message":"hi"}"#).unwrap();
    assert_eq!(event.id, "abc");
    assert_eq!(event.time, 1000);
    assert_eq!(event.kind, EventKind::Message);
    assert_eq!(event.message, "hi");
}

#[test]
fn test_message_event_becomes_notification() {
    let event = decode(r#"{"id":"abc","time":1000,"event":"message","message":"hi"}"#).unwrap();
    let notification = event.into_delivery(7).unwrap();
    assert_eq!(
        notification,
        Notification {
            id: "abc".to_string(),
            subscription_id: 7,
            time: 1000,
            message: "hi".to_string(),
            delivered: false,
        }
    );
}

#[test]
fn test_keepalive_and_open_are_not_delivered() {
    let keepalive =
        decode(r#"{"id":"k1","time":1001,"event":"keepalive","message":""}"#).unwrap();
    assert_eq!(keepalive.kind, EventKind::Keepalive);
    assert!(keepalive.into_delivery(1).is_none());

    let open = decode(r#"{"id":"o1","time":1002,"event":"open","message":""}"#).unwrap();
    assert_eq!(open.kind, EventKind::Open);
    assert!(open.into_delivery(1).is_none());
}

#[test]
fn test_unknown_kind_is_kept_and_ignored() {
    let event =
        decode(r#"{"id":"p1","time":1003,"event":"poll_request","message":""}"#).unwrap();
    assert_eq!(event.kind, EventKind::Other("poll_request".to_string()));
    assert_eq!(event.kind.as_str(), "poll_request");
    assert!(event.into_delivery(1).is_none());
}

#[test]
fn test_poll_conversion_ignores_kind() {
    let event = RawEvent {
        id: "b".to_string(),
        time: 5,
        kind: EventKind::Keepalive,
        message: "still here".to_string(),
    };
    let notification = event.into_notification(3);
    assert_eq!(notification.id, "b");
    assert_eq!(notification.subscription_id, 3);
    assert!(!notification.delivered);
}

#[test]
fn test_malformed_json_fails() {
    let err = decode("{\"id\":\"abc\",").unwrap_err();
    assert_eq!(err.line, "{\"id\":\"abc\",");
}

#[test]
fn test_missing_field_fails() {
    let err = decode(r#"{"id":"abc","time":1000,"event":"message"}"#).unwrap_err();
    assert!(err.to_string().contains("message"));

    assert!(decode(r#"{"time":1000,"event":"message","message":"hi"}"#).is_err());
    assert!(decode(r#"{"id":"abc","event":"message","message":"hi"}"#).is_err());
    assert!(decode(r#"{"id":"abc","time":1000,"message":"hi"}"#).is_err());
}

#[test]
fn test_extra_fields_are_ignored() {
    let event = decode(
        r#"{"id":"x","time":9,"event":"message","topic":"alerts","message":"disk full","priority":4}"#,
    )
    .unwrap();
    assert_eq!(event.message, "disk full");
}

#[test]
fn test_wrong_type_fails() {
    assert!(decode(r#"{"id":"abc","time":"soon","event":"message","message":"hi"}"#).is_err());
}

#[test]
fn test_blank_line_fails() {
    let err = decode("").unwrap_err();
    assert_eq!(err.line, "");
    assert!(decode("   ").is_err());
}

#[test]
fn test_invalid_utf8_is_a_parse_error() {
    let line: &[u8] = b"{\"id\":\"\xff\xfe\",\"time\":1,\"event\":\"message\",\"message\":\"hi\"}";
    let err = decode(line).unwrap_err();
    assert!(err.line.starts_with("{\"id\":\""));
    assert!(err.line.contains('\u{FFFD}'));
}
