//! Shared helpers for the loopback integration tests.
//!
//! Each test starts its own broker on ephemeral ports and drives it with
//! raw MQTT frames over `std::net::TcpStream`.

#![allow(dead_code)] // Not every test file uses every helper

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use mqboard::broker::Broker;
use mqboard::config::Config;

/// Default time to wait for an expected frame.
pub const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// Time to wait when asserting that nothing arrives.
pub const QUIET_TIMEOUT: Duration = Duration::from_millis(300);

pub struct TestBroker {
    pub mqtt_addr: SocketAddr,
    pub http_addr: SocketAddr,
}

/// Start a broker with default settings on ephemeral loopback ports.
pub fn start_broker() -> TestBroker {
    start_broker_with(|_| {})
}

/// Start a broker after tweaking its configuration.
pub fn start_broker_with(tweak: impl FnOnce(&mut Config)) -> TestBroker {
    let mut config = Config::default();
    config.server.bind = "127.0.0.1:0".parse().unwrap();
    config.http.bind = "127.0.0.1:0".parse().unwrap();
    tweak(&mut config);

    let mut broker = Broker::new(config).expect("failed to start broker");
    let mqtt_addr = broker.mqtt_addr();
    let http_addr = broker.http_addr();

    std::thread::spawn(move || {
        let _ = broker.run();
    });

    TestBroker {
        mqtt_addr,
        http_addr,
    }
}

/// A raw MQTT client: a TCP stream plus a residual frame buffer.
pub struct TestClient {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl TestClient {
    /// Open a TCP connection without sending anything.
    pub fn open(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).expect("connect");
        stream
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        stream.set_nodelay(true).unwrap();
        Self {
            stream,
            buf: Vec::new(),
        }
    }

    /// Open a connection and complete the CONNECT/CONNACK exchange.
    pub fn connect(addr: SocketAddr, client_id: &str) -> Self {
        let mut client = Self::open(addr);
        client.send(&connect_packet(client_id, 0));
        client.expect_frame(&[0x20, 0x02, 0x00, 0x00]);
        client
    }

    pub fn send(&mut self, bytes: &[u8]) {
        self.stream.write_all(bytes).expect("send");
    }

    /// Read one complete MQTT frame, or None on timeout / peer close.
    pub fn read_frame(&mut self, timeout: Duration) -> Option<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(total) = frame_total_len(&self.buf) {
                if self.buf.len() >= total {
                    let rest = self.buf.split_off(total);
                    return Some(std::mem::replace(&mut self.buf, rest));
                }
            }
            if Instant::now() >= deadline {
                return None;
            }

            let mut chunk = [0u8; 1024];
            match self.stream.read(&mut chunk) {
                Ok(0) => return None,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue
                }
                Err(_) => return None,
            }
        }
    }

    /// Read a frame and assert it equals the expected bytes.
    pub fn expect_frame(&mut self, expected: &[u8]) {
        let frame = self
            .read_frame(READ_TIMEOUT)
            .unwrap_or_else(|| panic!("expected frame {:02X?}, got nothing", expected));
        assert_eq!(frame, expected, "unexpected frame");
    }

    /// Assert that no frame arrives within the quiet window.
    pub fn expect_silence(&mut self) {
        if let Some(frame) = self.read_frame(QUIET_TIMEOUT) {
            panic!("expected silence, got frame {:02X?}", frame);
        }
    }

    /// True once the broker has closed the connection.
    pub fn wait_for_close(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; 1024];
        while Instant::now() < deadline {
            match self.stream.read(&mut chunk) {
                Ok(0) => return true,
                Ok(_) => continue,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue
                }
                Err(_) => return true,
            }
        }
        false
    }

    /// SUBSCRIBE to one filter and assert the SUBACK grant.
    pub fn subscribe(&mut self, packet_id: u16, filter: &str, qos: u8) {
        self.send(&subscribe_packet(packet_id, filter, qos));
        let expected_qos = if qos <= 2 { qos } else { 0 };
        let mut expected = vec![0x90, 0x03];
        expected.extend_from_slice(&packet_id.to_be_bytes());
        expected.push(expected_qos);
        self.expect_frame(&expected);
    }
}

/// Total frame length once the fixed header is decodable.
fn frame_total_len(buf: &[u8]) -> Option<usize> {
    if buf.len() < 2 {
        return None;
    }
    let mut value = 0usize;
    let mut multiplier = 1usize;
    for (i, &byte) in buf[1..].iter().take(4).enumerate() {
        value += ((byte & 0x7F) as usize) * multiplier;
        if byte & 0x80 == 0 {
            return Some(1 + (i + 1) + value);
        }
        multiplier *= 128;
    }
    None
}

// === Frame builders ===

fn push_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u16).to_be_bytes());
    buf.extend_from_slice(s.as_bytes());
}

fn with_fixed_header(first_byte: u8, body: Vec<u8>) -> Vec<u8> {
    assert!(body.len() < 128, "test frames stay single-length-byte");
    let mut frame = vec![first_byte, body.len() as u8];
    frame.extend_from_slice(&body);
    frame
}

pub fn connect_packet(client_id: &str, keep_alive: u16) -> Vec<u8> {
    let mut body = Vec::new();
    push_string(&mut body, "MQTT");
    body.push(0x04); // protocol level
    body.push(0x02); // clean session
    body.extend_from_slice(&keep_alive.to_be_bytes());
    push_string(&mut body, client_id);
    with_fixed_header(0x10, body)
}

pub fn connect_packet_with_will(
    client_id: &str,
    keep_alive: u16,
    will_topic: &str,
    will_payload: &[u8],
    will_qos: u8,
    will_retain: bool,
) -> Vec<u8> {
    let mut flags = 0x02 | 0x04 | (will_qos << 3);
    if will_retain {
        flags |= 0x20;
    }
    let mut body = Vec::new();
    push_string(&mut body, "MQTT");
    body.push(0x04);
    body.push(flags);
    body.extend_from_slice(&keep_alive.to_be_bytes());
    push_string(&mut body, client_id);
    push_string(&mut body, will_topic);
    body.extend_from_slice(&(will_payload.len() as u16).to_be_bytes());
    body.extend_from_slice(will_payload);
    with_fixed_header(0x10, body)
}

pub fn publish_packet(
    topic: &str,
    payload: &[u8],
    qos: u8,
    retain: bool,
    dup: bool,
    packet_id: Option<u16>,
) -> Vec<u8> {
    let mut first = 0x30 | (qos << 1);
    if retain {
        first |= 0x01;
    }
    if dup {
        first |= 0x08;
    }
    let mut body = Vec::new();
    push_string(&mut body, topic);
    if let Some(pid) = packet_id {
        body.extend_from_slice(&pid.to_be_bytes());
    }
    body.extend_from_slice(payload);
    with_fixed_header(first, body)
}

pub fn subscribe_packet(packet_id: u16, filter: &str, qos: u8) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&packet_id.to_be_bytes());
    push_string(&mut body, filter);
    body.push(qos);
    with_fixed_header(0x82, body)
}

pub fn unsubscribe_packet(packet_id: u16, filter: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&packet_id.to_be_bytes());
    push_string(&mut body, filter);
    with_fixed_header(0xA2, body)
}

pub const PINGREQ: [u8; 2] = [0xC0, 0x00];
pub const PINGRESP: [u8; 2] = [0xD0, 0x00];
pub const DISCONNECT: [u8; 2] = [0xE0, 0x00];

/// Plain HTTP GET against the status listener.
/// Returns (status line, body).
pub fn http_get(addr: SocketAddr, path: &str) -> (String, String) {
    let mut stream = TcpStream::connect(addr).expect("connect http");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    write!(stream, "GET {} HTTP/1.1\r\nHost: test\r\n\r\n", path).unwrap();

    let mut response = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => response.extend_from_slice(&chunk[..n]),
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("http read error: {}", e),
        }
    }

    let text = String::from_utf8(response).expect("utf-8 response");
    let status_line = text.lines().next().unwrap_or("").to_string();
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status_line, body)
}

/// Extract the packet id of a PUBLISH frame with QoS > 0.
pub fn publish_packet_id(frame: &[u8]) -> u16 {
    assert_eq!(frame[0] >> 4, 3, "not a PUBLISH frame");
    let qos = (frame[0] >> 1) & 0x03;
    assert!(qos > 0, "QoS 0 PUBLISH has no packet id");
    // Single-byte remaining length in all test frames
    let topic_len = u16::from_be_bytes([frame[2], frame[3]]) as usize;
    let pid_at = 4 + topic_len;
    u16::from_be_bytes([frame[pid_at], frame[pid_at + 1]])
}
