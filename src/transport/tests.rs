use wiremock::matchers::{body_string, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::http::parse_poll_body;
use super::{ApiClient, SinceCursor, TopicEndpoint};
use crate::config::ClientSettings;
use crate::utils::error::{Error, TransportError};
use crate::utils::testing::refused_base_url;

fn client() -> ApiClient {
    ApiClient::new(&ClientSettings::default()).expect("build client")
}

#[test]
fn test_endpoint_urls() {
    let endpoint = TopicEndpoint::new("https://ntfy.example/", "alerts");
    assert_eq!(endpoint.base_url(), "https://ntfy.example");
    assert_eq!(endpoint.topic(), "alerts");
    assert_eq!(endpoint.publish_url(), "https://ntfy.example/alerts");
    assert_eq!(endpoint.poll_url(), "https://ntfy.example/alerts/json?poll=1");
    assert_eq!(
        endpoint.stream_url(SinceCursor::All),
        "https://ntfy.example/alerts/json?since=all"
    );
    assert_eq!(
        endpoint.stream_url(SinceCursor::At(1_700_000_000)),
        "https://ntfy.example/alerts/json?since=1700000000"
    );
}

#[test]
fn test_since_cursor_parsing_and_advance() {
    assert_eq!(SinceCursor::from(0), SinceCursor::All);
    assert_eq!(SinceCursor::from(42), SinceCursor::At(42));
    assert_eq!("all".parse::<SinceCursor>().unwrap(), SinceCursor::All);
    assert_eq!("1000".parse::<SinceCursor>().unwrap(), SinceCursor::At(1000));
    assert!("yesterday".parse::<SinceCursor>().is_err());

    assert_eq!(SinceCursor::All.advance(10), SinceCursor::At(10));
    assert_eq!(SinceCursor::At(10).advance(5), SinceCursor::At(10));
    assert_eq!(SinceCursor::At(10).advance(12), SinceCursor::At(12));
    assert_eq!(SinceCursor::All.advance(0), SinceCursor::All);
}

#[test]
fn test_parse_poll_body_trims_surrounding_whitespace() {
    let body = "\n  {\"id\":\"a\",\"time\":1,\"event\":\"message\",\"message\":\"one\"}\r\n{\"id\":\"b\",\"time\":2,\"event\":\"message\",\"message\":\"two\"}  \n\n";
    let notifications = parse_poll_body(4, body.as_bytes()).unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0].id, "a");
    assert_eq!(notifications[1].id, "b");
    assert!(notifications.iter().all(|n| n.subscription_id == 4));
}

#[test]
fn test_parse_poll_body_rejects_interior_blank_line() {
    let body = concat!(
        r#"{"id":"a","time":1,"event":"message","message":"one"}"#,
        "\n\n",
        r#"{"id":"b","time":2,"event":"message","message":"two"}"#,
    );
    let err = parse_poll_body(4, body.as_bytes()).unwrap_err();
    assert_eq!(err.line, "");
}

#[tokio::test]
async fn test_publish_puts_raw_message() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/alerts"))
        .and(body_string("disk full"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client()
        .publish(&server.uri(), "alerts", "disk full")
        .await
        .expect("publish");
}

#[tokio::test]
async fn test_publish_non_2xx_fails_with_status_and_url() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/alerts"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let err = client()
        .publish(&server.uri(), "alerts", "hi")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
    assert_eq!(err.url(), format!("{}/alerts", server.uri()));
}

#[tokio::test]
async fn test_publish_connection_refused_fails() {
    let uri = refused_base_url();

    let err = client().publish(&uri, "alerts", "hi").await.unwrap_err();
    assert!(matches!(err, TransportError::Request { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn test_poll_preserves_line_order() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"id":"a","time":1000,"event":"message","message":"first"}"#,
        "\n",
        r#"{"id":"b","time":1001,"event":"message","message":"second"}"#,
        "\n",
        r#"{"id":"c","time":1002,"event":"message","message":"third"}"#,
        "\n",
    );
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .and(query_param("poll", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(1)
        .mount(&server)
        .await;

    let notifications = client().poll(7, &server.uri(), "alerts").await.unwrap();
    let ids: Vec<&str> = notifications.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(notifications[1].message, "second");
    assert_eq!(notifications[1].time, 1001);
    assert!(notifications.iter().all(|n| n.subscription_id == 7 && !n.delivered));
}

#[tokio::test]
async fn test_poll_does_not_filter_event_kind() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"id":"a","time":1,"event":"message","message":"hi"}"#,
        "\n",
        r#"{"id":"b","time":2,"event":"keepalive","message":""}"#,
    );
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let notifications = client().poll(1, &server.uri(), "alerts").await.unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[1].id, "b");
}

#[tokio::test]
async fn test_poll_empty_body_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let notifications = client().poll(1, &server.uri(), "alerts").await.unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn test_poll_whitespace_body_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("  \n \n"))
        .mount(&server)
        .await;

    let notifications = client().poll(1, &server.uri(), "alerts").await.unwrap();
    assert!(notifications.is_empty());
}

#[tokio::test]
async fn test_poll_non_2xx_fails_without_notifications() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(500).set_body_string(
            r#"{"id":"a","time":1,"event":"message","message":"hi"}"#,
        ))
        .mount(&server)
        .await;

    let err = client().poll(1, &server.uri(), "alerts").await.unwrap_err();
    match err {
        Error::Transport(TransportError::Status { status, url }) => {
            assert_eq!(status, 500);
            assert!(url.ends_with("/alerts/json?poll=1"));
        }
        other => panic!("Expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_malformed_line_fails() {
    let server = MockServer::start().await;
    let body = concat!(
        r#"{"id":"a","time":1,"event":"message","message":"hi"}"#,
        "\n",
        "not json",
    );
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = client().poll(1, &server.uri(), "alerts").await.unwrap_err();
    match err {
        Error::Parse(parse) => assert_eq!(parse.line, "not json"),
        other => panic!("Expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_invalid_utf8_line_is_a_parse_error() {
    let server = MockServer::start().await;
    let mut body = br#"{"id":"a","time":1,"event":"message","message":"hi"}"#.to_vec();
    body.extend_from_slice(b"\n{\"id\":\"\xff\xfe\"}");
    Mock::given(method("GET"))
        .and(path("/alerts/json"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(&server)
        .await;

    let err = client().poll(1, &server.uri(), "alerts").await.unwrap_err();
    match err {
        Error::Parse(parse) => assert!(parse.line.contains('\u{FFFD}')),
        other => panic!("Expected parse error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_poll_connection_refused_fails() {
    let err = client().poll(1, &refused_base_url(), "alerts").await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Request { .. })));
}
