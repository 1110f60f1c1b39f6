use binlog_relay::delivery::{HttpSink, Sink};
use binlog_relay::Error;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts a single request, answers with `status` and hands back the
/// request head and body.
async fn serve_once(status: u16) -> (String, JoinHandle<(String, String)>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];

        let head_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers were complete");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().unwrap())
            })
            .unwrap_or(0);

        while buf.len() < head_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body was complete");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8_lossy(&buf[head_end..head_end + content_length]).to_string();

        let response = format!(
            "HTTP/1.1 {} Test\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        (head, body)
    });

    (format!("http://{}", addr), handle)
}

const PAYLOAD: &str = r#"{"before":null,"after":{"id":1},"source":{"table":"orders"}}"#;

#[tokio::test]
async fn test_posts_payload_to_group_url() {
    let (base_url, server) = serve_once(200).await;
    let sink = HttpSink::new(format!("{}/", base_url), Duration::from_secs(5)).unwrap();

    sink.deliver("shop", PAYLOAD).await.unwrap();

    let (head, body) = server.await.unwrap();
    assert!(head.starts_with("POST /shop HTTP/1.1\r\n"), "head: {}", head);
    assert!(head.to_ascii_lowercase().contains("content-type: application/json"));
    assert_eq!(body, PAYLOAD);
}

#[tokio::test]
async fn test_non_success_status_is_reported() {
    let (base_url, server) = serve_once(503).await;
    let sink = HttpSink::new(base_url, Duration::from_secs(5)).unwrap();

    let result = sink.deliver("shop", PAYLOAD).await;
    assert!(matches!(result, Err(Error::Rejected { status: 503, .. })));

    server.await.unwrap();
}

#[tokio::test]
async fn test_unreachable_sink_is_an_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let sink = HttpSink::new(format!("http://{}", addr), Duration::from_secs(2)).unwrap();
    let result = sink.deliver("shop", PAYLOAD).await;
    assert!(matches!(result, Err(Error::Http(_))));
}
