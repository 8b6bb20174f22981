//! Shared fakes for tests: an in-memory sink, a fake broker link and a
//! one-shot HTTP responder standing in for InfluxDB and a scripted MQTT
//! broker.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use crate::broker::BrokerLink;
use crate::storage::PointSink;
use crate::utils::error::{BrokerError, StorageError};

/// Records every batch it is handed; can be switched to reject writes.
#[derive(Clone, Default)]
pub struct MemorySink {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let sink = Self::default();
        sink.set_failing(true);
        sink
    }

    /// Every write hangs for `delay` before completing.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl PointSink for MemorySink {
    async fn write_lines(&self, lines: &[String]) -> Result<(), StorageError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(StorageError::Rejected {
                status: 503,
                body: "storage unavailable".to_string(),
            });
        }
        self.batches.lock().unwrap().push(lines.to_vec());
        Ok(())
    }
}

/// Counts close calls; can be made to never finish closing.
#[derive(Clone, Default)]
pub struct FakeLink {
    pub closes: Arc<AtomicUsize>,
    pub hang: bool,
}

impl FakeLink {
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrokerLink for FakeLink {
    async fn close(&mut self) -> Result<(), BrokerError> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Serve exactly one HTTP request with `status_line` and an empty body.
/// Returns the base URL and a receiver yielding the raw request text.
pub async fn spawn_http_stub(status_line: &'static str) -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            if request_complete(&raw) {
                break;
            }
        }

        let response = format!("HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        stream.write_all(response.as_bytes()).await.unwrap();
        stream.shutdown().await.ok();
        let _ = tx.send(String::from_utf8_lossy(&raw).into_owned());
    });

    (format!("http://{addr}"), rx)
}

fn request_complete(raw: &[u8]) -> bool {
    let text = String::from_utf8_lossy(raw);
    let Some(header_end) = text.find("\r\n\r\n") else {
        return false;
    };
    let content_length = text[..header_end]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
    raw.len() >= header_end + 4 + content_length
}

/// Read one MQTT control packet: (first header byte, body).
pub async fn read_packet(stream: &mut TcpStream) -> (u8, Vec<u8>) {
    let header = stream.read_u8().await.unwrap();
    let mut remaining = 0usize;
    let mut shift = 0;
    loop {
        let byte = stream.read_u8().await.unwrap();
        remaining |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    let mut body = vec![0u8; remaining];
    stream.read_exact(&mut body).await.unwrap();
    (header, body)
}

pub fn publish_packet(topic: &str, payload: &[u8]) -> Vec<u8> {
    let remaining = 2 + topic.len() + payload.len();
    assert!(remaining < 128);
    let mut packet = vec![0x30, remaining as u8];
    packet.extend_from_slice(&(topic.len() as u16).to_be_bytes());
    packet.extend_from_slice(topic.as_bytes());
    packet.extend_from_slice(payload);
    packet
}

/// Scripted broker: accept one client, ack its connect and subscription
/// with `suback_code`, publish `payload`, then report what came back.
pub async fn spawn_scripted_broker(
    suback_code: u8,
    payload: &'static [u8],
) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    spawn_flooding_broker(suback_code, payload, 1).await
}

/// Like `spawn_scripted_broker`, but publishes `payload` `count` times in
/// one burst.
pub async fn spawn_flooding_broker(
    suback_code: u8,
    payload: &'static [u8],
    count: usize,
) -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut seen = accept_session(&mut stream, suback_code).await;

        let mut burst = Vec::new();
        for _ in 0..count {
            burst.extend_from_slice(&publish_packet("alzette/machine/data", payload));
        }
        stream.write_all(&burst).await.unwrap();

        let (last, _) = read_packet(&mut stream).await;
        seen.push(last & 0xf0);
        seen
    });

    (format!("mqtt://{addr}"), handle)
}

/// Broker that acks one session, hangs up, then acks the client's next
/// session and waits for its DISCONNECT. Reports every packet type read.
pub async fn spawn_reconnecting_broker() -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut first, _) = listener.accept().await.unwrap();
        let mut seen = accept_session(&mut first, 0x01).await;
        first.shutdown().await.ok();
        drop(first);

        let (mut second, _) = listener.accept().await.unwrap();
        seen.extend(accept_session(&mut second, 0x01).await);

        let (last, _) = read_packet(&mut second).await;
        seen.push(last & 0xf0);
        seen
    });

    (format!("mqtt://{addr}"), handle)
}

/// CONNECT -> CONNACK, SUBSCRIBE -> SUBACK(`suback_code`).
async fn accept_session(stream: &mut TcpStream, suback_code: u8) -> Vec<u8> {
    let mut seen = Vec::new();

    let (connect, _) = read_packet(stream).await;
    seen.push(connect & 0xf0);
    stream.write_all(&[0x20, 0x02, 0x00, 0x00]).await.unwrap();

    let (subscribe, body) = read_packet(stream).await;
    seen.push(subscribe & 0xf0);
    stream
        .write_all(&[0x90, 0x03, body[0], body[1], suback_code])
        .await
        .unwrap();

    seen
}
