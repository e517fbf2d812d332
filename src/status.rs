//! HTTP status surface for the dashboard.
//!
//! Serves `GET /mqtt_data` (a JSON snapshot of recent messages, the retained
//! store, and connected clients) and `GET /` (a minimal page that polls the
//! snapshot). Connections are polled by the broker loop itself, so every
//! snapshot observes state between MQTT events, never mid-dispatch.

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use mio::net::TcpStream;
use serde::Serialize;

/// Upper bound on a request head; anything larger is dropped.
const MAX_REQUEST_BYTES: usize = 8192;

/// Root page: renders the snapshot and refreshes it every 2000 ms.
const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>mqboard</title></head>
<body>
<h1>mqboard</h1>
<pre id="data">loading...</pre>
<script>
async function poll() {
  try {
    const res = await fetch('/mqtt_data');
    document.getElementById('data').textContent =
      JSON.stringify(await res.json(), null, 2);
  } catch (e) {
    document.getElementById('data').textContent = 'broker unreachable';
  }
}
poll();
setInterval(poll, 2000);
</script>
</body>
</html>
"#;

/// The `/mqtt_data` response body. Every field is present even when empty.
#[derive(Debug, Serialize)]
pub struct Snapshot {
    #[serde(rename = "messageLog")]
    pub message_log: Vec<SnapshotMessage>,
    /// BTreeMap so the rendered object has a stable topic order.
    #[serde(rename = "retainedMessages")]
    pub retained_messages: BTreeMap<String, String>,
    #[serde(rename = "connectedClients")]
    pub connected_clients: Vec<SnapshotClient>,
    pub wifi_ssid: String,
    pub wifi_ip: String,
}

#[derive(Debug, Serialize)]
pub struct SnapshotMessage {
    pub topic: String,
    pub payload: String,
    /// Monotonic milliseconds since broker start.
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
pub struct SnapshotClient {
    pub id: String,
    /// Milliseconds since the client's last activity.
    #[serde(rename = "lastSeen")]
    pub last_seen: u64,
    #[serde(rename = "subscribedTopics")]
    pub subscribed_topics: Vec<String>,
}

/// One dashboard HTTP connection: read the request head, send one response,
/// close.
pub struct HttpConn {
    pub socket: TcpStream,
    pub write_interest: bool,
    read_buf: Vec<u8>,
    response: Vec<u8>,
    written: usize,
    peer_closed: bool,
}

impl HttpConn {
    pub fn new(socket: TcpStream) -> Self {
        Self {
            socket,
            write_interest: false,
            read_buf: Vec::new(),
            response: Vec::new(),
            written: 0,
            peer_closed: false,
        }
    }

    /// Read until the socket would block. Returns true once the request
    /// head is complete.
    pub fn read_request(&mut self) -> io::Result<bool> {
        let mut chunk = [0u8; 1024];
        loop {
            match self.socket.read(&mut chunk) {
                Ok(0) => {
                    self.peer_closed = true;
                    break;
                }
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    if self.read_buf.len() > MAX_REQUEST_BYTES {
                        return Err(io::ErrorKind::InvalidData.into());
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(self.head_complete())
    }

    fn head_complete(&self) -> bool {
        self.read_buf.windows(4).any(|w| w == b"\r\n\r\n")
    }

    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// First line of the request, e.g. `GET /mqtt_data HTTP/1.1`.
    pub fn request_line(&self) -> Option<&str> {
        let end = self.read_buf.windows(2).position(|w| w == b"\r\n")?;
        std::str::from_utf8(&self.read_buf[..end]).ok()
    }

    pub fn set_response(&mut self, response: Vec<u8>) {
        self.response = response;
        self.written = 0;
    }

    pub fn has_response(&self) -> bool {
        !self.response.is_empty()
    }

    /// Write the response. Ok(true) once everything is on the wire.
    pub fn flush(&mut self) -> io::Result<bool> {
        while self.written < self.response.len() {
            match self.socket.write(&self.response[self.written..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(true)
    }
}

/// Build the full HTTP response for a request line.
pub fn respond(request_line: &str, snapshot: &Snapshot) -> Vec<u8> {
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    if method != "GET" {
        return http_response(
            405,
            "Method Not Allowed",
            "text/plain; charset=utf-8",
            "Only GET is supported",
        );
    }

    match path {
        "/" | "/index.html" => http_response(200, "OK", "text/html; charset=utf-8", INDEX_HTML),
        "/mqtt_data" => {
            let body = match serde_json::to_string(snapshot) {
                Ok(json) => json,
                Err(e) => {
                    log::error!("Failed to serialize status snapshot: {}", e);
                    "{}".to_string()
                }
            };
            http_response(200, "OK", "application/json", &body)
        }
        _ => http_response(
            404,
            "Not Found",
            "text/plain; charset=utf-8",
            "Use / or /mqtt_data",
        ),
    }
}

fn http_response(status: u16, status_text: &str, content_type: &str, body: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 {} {}\r\n\
         Content-Type: {}\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        status_text,
        content_type,
        body.len(),
        body
    )
    .into_bytes()
}
