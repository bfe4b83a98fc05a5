//! HttpJoinService against a one-shot local HTTP server.

use join_core::{HttpJoinService, JoinPayload, JoinResponse, JoinService, ServiceError};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct OneShotServer {
    base_url: String,
    handle: JoinHandle<String>,
}

impl OneShotServer {
    /// Serves exactly one request with the given status line and body, and
    /// returns the raw request head when joined.
    fn start(status: &str, body: &str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("local addr").port();
        let status = status.to_string();
        let body = body.to_string();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("accept");
            let head = read_head(&stream);
            let mut stream = stream;
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream
                .write_all(response.as_bytes())
                .expect("write response");
            stream.flush().ok();
            head
        });

        Self {
            base_url: format!("http://127.0.0.1:{}/api", port),
            handle,
        }
    }

    fn request_head(self) -> String {
        self.handle.join().expect("server thread")
    }
}

fn read_head(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut head = String::new();
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).expect("read request line");
        if read == 0 || line == "\r\n" {
            break;
        }
        head.push_str(&line);
    }
    head
}

fn service(base_url: &str, token: Option<&str>) -> HttpJoinService {
    HttpJoinService::new(
        base_url,
        token.map(str::to_string),
        Duration::from_secs(5),
    )
    .expect("service")
}

#[test]
fn ready_response_is_decoded_and_request_is_authenticated() {
    let server = OneShotServer::start(
        "200 OK",
        r#"{"ready":true,"payload":{"joinUrl":"https://meet.example/abc","meetingId":"abc"}}"#,
    );
    let response = service(&server.base_url, Some("tok-123"))
        .join_class("S1")
        .expect("join_class");

    let mut expected = JoinPayload::new("https://meet.example/abc");
    expected
        .metadata
        .insert("meetingId".to_string(), serde_json::json!("abc"));
    assert_eq!(response, JoinResponse::ready(expected));

    let head = server.request_head();
    let lower = head.to_ascii_lowercase();
    assert!(head.starts_with("GET /api/bookings/S1/join HTTP/1.1"), "{}", head);
    assert!(lower.contains("authorization: bearer tok-123"), "{}", head);
}

#[test]
fn not_ready_response_is_decoded() {
    let server = OneShotServer::start(
        "200 OK",
        r#"{"ready":false,"message":"teacher has not joined yet"}"#,
    );
    let response = service(&server.base_url, None)
        .join_class("S1")
        .expect("join_class");
    assert_eq!(response, JoinResponse::not_ready("teacher has not joined yet"));

    let head = server.request_head().to_ascii_lowercase();
    assert!(!head.contains("authorization:"), "{}", head);
}

#[test]
fn http_error_status_is_service_error() {
    let server = OneShotServer::start("503 Service Unavailable", r#"{"error":"down"}"#);
    let err = service(&server.base_url, None)
        .join_class("S1")
        .unwrap_err();
    assert_eq!(err, ServiceError::Status { status: 503 });
    server.request_head();
}

#[test]
fn undecodable_body_is_decode_error() {
    let server = OneShotServer::start("200 OK", "<html>maintenance</html>");
    let err = service(&server.base_url, None)
        .join_class("S1")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Decode(_)), "{:?}", err);
    server.request_head();
}

#[test]
fn refused_connection_is_transport_error() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        listener.local_addr().expect("local addr").port()
    };
    let err = service(&format!("http://127.0.0.1:{}/api", port), None)
        .join_class("S1")
        .unwrap_err();
    assert!(matches!(err, ServiceError::Transport(_)), "{:?}", err);
}
