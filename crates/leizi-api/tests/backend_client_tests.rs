use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use leizi_api::{ApiError, BackendClient, SftpListRequest};
use leizi_types::{BackendEndpoint, ConnectionConfig, SavedConnection, SessionKind};

fn client_for(server: &MockServer) -> BackendClient {
    BackendClient::new(BackendEndpoint::new(server.uri()))
}

#[tokio::test]
async fn test_serial_ports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/serial/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ports": ["/dev/ttyS0", "/dev/ttyUSB0"]})))
        .expect(1)
        .mount(&server)
        .await;

    let ports = client_for(&server).serial_ports().await.unwrap();
    assert_eq!(ports, vec!["/dev/ttyS0", "/dev/ttyUSB0"]);
}

#[tokio::test]
async fn test_sftp_list_sends_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sftp/list"))
        .and(body_json(json!({
            "host": "10.0.0.5",
            "port": 22,
            "username": "u",
            "password": "p",
            "path": "/var/log"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": ["syslog", "auth.log"]})))
        .expect(1)
        .mount(&server)
        .await;

    let config = ConnectionConfig::network("10.0.0.5", 22)
        .with_username("u")
        .with_password("p");
    let request = SftpListRequest::for_connection(&config, "/var/log");
    let files = client_for(&server).sftp_list(&request).await.unwrap();
    assert_eq!(files, vec!["syslog", "auth.log"]);
}

#[tokio::test]
async fn test_sftp_error_carries_backend_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/sftp/list"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "Authentication failed."})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .sftp_list(&SftpListRequest::new("10.0.0.5"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(500));
    match err {
        ApiError::Backend { message, .. } => assert_eq!(message, "Authentication failed."),
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_plain_text_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/serial/ports"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&server)
        .await;

    let err = client_for(&server).serial_ports().await.unwrap_err();
    match err {
        ApiError::Backend { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[tokio::test]
async fn test_undecodable_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/serial/ports"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"devices": []})))
        .mount(&server)
        .await;

    let err = client_for(&server).serial_ports().await.unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_remote_config_round_trip() {
    let server = MockServer::start().await;
    let document = json!({"theme": "dark", "fontSize": 14});
    Mock::given(method("GET"))
        .and(path("/api/config"))
        .respond_with(ResponseTemplate::new(200).set_body_json(document.clone()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/config"))
        .and(body_json(document.clone()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.remote_config().await.unwrap(), document);
    client.save_remote_config(&document).await.unwrap();
}

#[tokio::test]
async fn test_remote_shortcuts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/shortcut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "router": {"kind": "telnet", "host": "192.168.1.1", "port": 23},
            "console": {"kind": "serial", "device": "/dev/ttyUSB0", "baudrate": 115200}
        })))
        .mount(&server)
        .await;

    let shortcuts = client_for(&server).remote_shortcuts().await.unwrap();
    assert_eq!(shortcuts.len(), 2);
    assert_eq!(shortcuts["router"].kind, SessionKind::Telnet);
    assert_eq!(shortcuts["console"].baudrate, Some(115200));
}

#[tokio::test]
async fn test_empty_shortcut_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/shortcut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    assert!(client_for(&server).remote_shortcuts().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_save_shortcuts_rejects_unexpected_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/shortcut"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "busy"})))
        .mount(&server)
        .await;

    let mut shortcuts = BTreeMap::new();
    shortcuts.insert(
        "lab".to_string(),
        SavedConnection::from_config(SessionKind::Ssh, &ConnectionConfig::network("lab.local", 22)),
    );
    let err = client_for(&server)
        .save_remote_shortcuts(&shortcuts)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Decode { .. }));
}

#[tokio::test]
async fn test_unreachable_backend() {
    let client = BackendClient::new(BackendEndpoint::new("http://127.0.0.1:1"));
    assert!(matches!(client.serial_ports().await, Err(ApiError::Request(_))));
}
