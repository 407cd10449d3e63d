//! Tiny one-shot HTTP server for exercising the streaming backends.
#![allow(dead_code)]

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the fake server saw
#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: String,
    pub body: String,
}

/// Serve exactly one request, answering with `status` and streaming `chunks`.
///
/// Returns the base URL and a receiver for the captured request.
pub async fn serve_once(
    status: &'static str,
    content_type: &'static str,
    chunks: Vec<&'static str>,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    serve_paced(status, content_type, chunks, Duration::ZERO).await
}

/// Like [`serve_once`], but waits `pause` before writing each chunk
pub async fn serve_paced(
    status: &'static str,
    content_type: &'static str,
    chunks: Vec<&'static str>,
    pause: Duration,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut raw = Vec::new();
        let mut buf = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break raw.len();
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|l| {
                let lower = l.to_ascii_lowercase();
                lower
                    .strip_prefix("content-length:")
                    .map(|v| v.trim().parse::<usize>().unwrap_or(0))
            })
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&buf[..n]);
        }

        let mut head_lines = head.lines();
        let request_line = head_lines.next().unwrap_or_default().to_string();
        let headers = head_lines.collect::<Vec<_>>().join("\n");
        let body = String::from_utf8_lossy(&raw[header_end..]).to_string();

        let response_head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
            status, content_type
        );
        socket.write_all(response_head.as_bytes()).await.unwrap();
        for chunk in chunks {
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
            // The client may hang up early, e.g. after a read timeout
            if socket.write_all(chunk.as_bytes()).await.is_err() {
                break;
            }
            let _ = socket.flush().await;
        }
        let _ = socket.shutdown().await;

        let _ = tx.send(CapturedRequest {
            request_line,
            headers,
            body,
        });
    });

    (format!("http://{}", addr), rx)
}
