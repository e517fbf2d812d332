//! Per-client session state and buffer management.

use std::io::{self, Read, Write};
use std::time::{Duration, Instant};

use ahash::AHashMap;
use mio::net::TcpStream;
use mio::Token;

use crate::error::Result;
use crate::packet::{self, Packet, QoS, Will};
use crate::qos::{InboundQoS2, OutboundInFlight};

/// Initial read buffer size; grows by doubling.
const INITIAL_BUFFER_SIZE: usize = 1024;

/// Connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the first packet, which must be CONNECT.
    AwaitConnect,
    /// CONNECT accepted; normal packet dispatch.
    Connected,
    /// Terminal; the broker loop reaps the session.
    Closed,
}

/// One connected (or connecting) MQTT client.
///
/// The session exclusively owns its TCP stream. All QoS tables and the
/// subscription list die with the session.
pub struct Session {
    pub token: Token,
    pub socket: TcpStream,
    pub state: SessionState,
    /// Client identifier from CONNECT; empty means an anonymous
    /// per-connection identity.
    pub client_id: String,
    /// Keep-alive from CONNECT, seconds; 0 disables the timeout.
    pub keep_alive: u16,
    /// Last will, armed until a clean DISCONNECT clears it.
    pub will: Option<Will>,
    /// Time of the last well-formed inbound packet.
    pub last_seen: Instant,
    /// Filters this session holds, with granted QoS. Mirrored in the
    /// broker-wide subscription index.
    pub subscriptions: Vec<(String, QoS)>,
    /// Outbound QoS 1/2 messages awaiting acknowledgement, by packet id.
    pub outbound: AHashMap<u16, OutboundInFlight>,
    /// Inbound QoS 2 messages awaiting PUBREL, by packet id.
    pub inbound_qos2: AHashMap<u16, InboundQoS2>,
    /// Whether the socket is currently registered for writable events.
    pub write_interest: bool,

    peer_closed: bool,
    next_packet_id: u16,
    read_buf: Vec<u8>,
    read_pos: usize,
    write_queue: WriteQueue,
}

impl Session {
    pub fn new(token: Token, socket: TcpStream) -> Self {
        Self {
            token,
            socket,
            state: SessionState::AwaitConnect,
            client_id: String::new(),
            keep_alive: 0,
            will: None,
            last_seen: Instant::now(),
            subscriptions: Vec::new(),
            outbound: AHashMap::new(),
            inbound_qos2: AHashMap::new(),
            write_interest: false,
            peer_closed: false,
            next_packet_id: 1,
            read_buf: vec![0u8; INITIAL_BUFFER_SIZE],
            read_pos: 0,
            write_queue: WriteQueue::new(),
        }
    }

    /// Drain the socket into the read buffer until it would block.
    /// A clean end-of-stream is recorded in `peer_closed`, not returned as
    /// an error, so already-buffered packets still get processed.
    pub fn read(&mut self) -> io::Result<()> {
        loop {
            if self.read_pos >= self.read_buf.len() {
                let new_size = self.read_buf.len() * 2;
                self.read_buf.resize(new_size, 0);
            }

            match self.socket.read(&mut self.read_buf[self.read_pos..]) {
                Ok(0) => {
                    self.peer_closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.read_pos += n;
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// True once the peer has closed its end of the stream.
    pub fn peer_closed(&self) -> bool {
        self.peer_closed
    }

    /// Try to decode the next packet from the read buffer.
    pub fn decode_next(&mut self, max_packet_size: usize) -> Result<Option<Packet>> {
        if self.read_pos == 0 {
            return Ok(None);
        }

        let data = &self.read_buf[..self.read_pos];
        match packet::decode_packet(data, max_packet_size)? {
            Some((packet, consumed)) => {
                self.read_buf.copy_within(consumed..self.read_pos, 0);
                self.read_pos -= consumed;
                Ok(Some(packet))
            }
            None => Ok(None),
        }
    }

    /// Next outbound packet id: wraps from 65535 to 1, never 0, and skips
    /// ids still held by an in-flight outbound message.
    pub fn allocate_packet_id(&mut self) -> u16 {
        loop {
            let id = self.next_packet_id;
            self.next_packet_id = if id == u16::MAX { 1 } else { id + 1 };
            if !self.outbound.contains_key(&id) {
                return id;
            }
        }
    }

    /// Encode a packet into the outgoing queue. The broker flushes it.
    pub fn queue_packet(&mut self, packet: &Packet) {
        self.write_queue.push_packet(packet);
    }

    /// Write queued bytes to the socket.
    /// Returns Ok(true) when the queue is fully drained.
    pub fn flush(&mut self) -> io::Result<bool> {
        self.write_queue.write_to(&mut self.socket)
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.write_queue.is_empty()
    }

    /// Record inbound activity for the keep-alive clock.
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// True when the client exceeded 1.5x its keep-alive interval.
    pub fn keep_alive_expired(&self, now: Instant) -> bool {
        if self.keep_alive == 0 || self.state != SessionState::Connected {
            return false;
        }
        let limit = Duration::from_millis(u64::from(self.keep_alive) * 1500);
        now.duration_since(self.last_seen) > limit
    }

    #[cfg(test)]
    fn set_next_packet_id(&mut self, id: u16) {
        self.next_packet_id = id;
    }
}

/// Outgoing byte queue with a flush cursor.
///
/// One thread owns every buffer, so this is a plain Vec with a read
/// position that resets whenever the queue fully drains.
struct WriteQueue {
    buf: Vec<u8>,
    pos: usize,
}

impl WriteQueue {
    fn new() -> Self {
        Self {
            buf: Vec::new(),
            pos: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn push_packet(&mut self, packet: &Packet) {
        packet::encode_packet(packet, &mut self.buf);
    }

    /// Write as much as possible. Ok(true) when drained, Ok(false) when the
    /// writer would block with bytes still queued.
    fn write_to(&mut self, writer: &mut impl Write) -> io::Result<bool> {
        while self.pos < self.buf.len() {
            match writer.write(&self.buf[self.pos..]) {
                Ok(0) => return Err(io::ErrorKind::WriteZero.into()),
                Ok(n) => self.pos += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(false),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        self.buf.clear();
        self.pos = 0;
        Ok(true)
    }
}
