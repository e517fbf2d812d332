//! The broker event loop.
//!
//! One thread, one mio `Poll`, owning every session, the subscription
//! index, the retained store and the message log. Each `run_once` pass
//! handles socket readiness, then drives the QoS retransmission tick,
//! Keep-Alive enforcement, and session reaping (which fires any armed LWT).
//! Dashboard HTTP connections are polled by the same loop, so snapshots
//! always observe state between MQTT events.

use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use ahash::AHashMap;
use bytes::Bytes;
use log::{debug, info, warn};
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Token};

use crate::config::Config;
use crate::error::Result;
use crate::message_log::MessageLog;
use crate::packet::{ConnackCode, Connect, Packet, Publish, QoS, Suback, Subscribe, Unsubscribe};
use crate::qos::{InboundQoS2, OutboundInFlight, OutboundPhase};
use crate::retained::RetainedStore;
use crate::session::{Session, SessionState};
use crate::status::{self, HttpConn, Snapshot, SnapshotClient, SnapshotMessage};
use crate::subscription::SubscriptionIndex;
use crate::topic;

/// Token for the MQTT listener socket.
const MQTT_LISTENER: Token = Token(0);

/// Token for the status HTTP listener socket.
const HTTP_LISTENER: Token = Token(1);

/// First token handed to an accepted connection.
const FIRST_CONN: usize = 2;

/// Poll timeout; also bounds the QoS tick granularity.
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

/// Single-threaded MQTT broker with a status HTTP surface.
pub struct Broker {
    poll: Poll,
    mqtt_listener: TcpListener,
    http_listener: TcpListener,
    mqtt_addr: SocketAddr,
    http_addr: SocketAddr,
    /// All live sessions, keyed by their stable token.
    sessions: AHashMap<Token, Session>,
    /// Dashboard connections, same token space as sessions.
    http_conns: AHashMap<Token, HttpConn>,
    subscriptions: SubscriptionIndex,
    retained: RetainedStore,
    message_log: MessageLog,
    next_token: usize,
    start: Instant,
    qos_timeout: Duration,
    max_qos_retries: u8,
    max_packet_size: usize,
    config: Config,
}

impl Broker {
    /// Bind both listeners and set up the poll registry.
    pub fn new(config: Config) -> Result<Self> {
        let poll = Poll::new()?;

        let mut mqtt_listener = TcpListener::bind(config.server.bind)?;
        let mqtt_addr = mqtt_listener.local_addr()?;
        poll.registry()
            .register(&mut mqtt_listener, MQTT_LISTENER, Interest::READABLE)?;

        let mut http_listener = TcpListener::bind(config.http.bind)?;
        let http_addr = http_listener.local_addr()?;
        poll.registry()
            .register(&mut http_listener, HTTP_LISTENER, Interest::READABLE)?;

        info!("mqboard MQTT listener on {}", mqtt_addr);
        info!("mqboard status endpoint on http://{}/mqtt_data", http_addr);

        Ok(Self {
            poll,
            mqtt_listener,
            http_listener,
            mqtt_addr,
            http_addr,
            sessions: AHashMap::new(),
            http_conns: AHashMap::new(),
            subscriptions: SubscriptionIndex::new(),
            retained: RetainedStore::new(),
            message_log: MessageLog::new(config.mqtt.message_log_capacity),
            next_token: FIRST_CONN,
            start: Instant::now(),
            qos_timeout: Duration::from_millis(config.mqtt.qos_timeout_ms),
            max_qos_retries: config.mqtt.max_qos_retries,
            max_packet_size: config.limits.max_packet_size as usize,
            config,
        })
    }

    /// Actual MQTT listener address (useful with an ephemeral bind port).
    pub fn mqtt_addr(&self) -> SocketAddr {
        self.mqtt_addr
    }

    /// Actual status listener address.
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Run the event loop. Only loop-level faults return.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.run_once()?;
        }
    }

    /// One pass: poll readiness, dispatch, timers, reap.
    pub fn run_once(&mut self) -> Result<()> {
        let mut events = Events::with_capacity(256);
        self.poll.poll(&mut events, Some(POLL_TIMEOUT))?;

        for event in events.iter() {
            let token = event.token();
            match token {
                MQTT_LISTENER => self.accept_mqtt()?,
                HTTP_LISTENER => self.accept_http()?,
                _ => {
                    if self.sessions.contains_key(&token) {
                        if event.is_readable() {
                            self.session_readable(token);
                        }
                        if event.is_writable() {
                            self.flush_session(token);
                        }
                    } else if self.http_conns.contains_key(&token) {
                        if event.is_readable() {
                            self.http_readable(token);
                        }
                        if event.is_writable() {
                            self.http_flush(token);
                        }
                    }
                }
            }
        }

        let now = Instant::now();
        self.tick_qos(now);
        self.check_keep_alive(now);
        self.reap_sessions();

        Ok(())
    }

    fn next_token(&mut self) -> Token {
        let token = Token(self.next_token);
        self.next_token += 1;
        token
    }

    fn accept_mqtt(&mut self) -> Result<()> {
        loop {
            match self.mqtt_listener.accept() {
                Ok((mut socket, addr)) => {
                    let token = self.next_token();
                    self.poll
                        .registry()
                        .register(&mut socket, token, Interest::READABLE)?;
                    debug!("Accepted MQTT connection from {}", addr);
                    self.sessions.insert(token, Session::new(token, socket));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    fn accept_http(&mut self) -> Result<()> {
        loop {
            match self.http_listener.accept() {
                Ok((mut socket, _addr)) => {
                    let token = self.next_token();
                    self.poll
                        .registry()
                        .register(&mut socket, token, Interest::READABLE)?;
                    self.http_conns.insert(token, HttpConn::new(socket));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    // === MQTT session handling ===

    fn session_readable(&mut self, token: Token) {
        {
            let Some(session) = self.sessions.get_mut(&token) else {
                return;
            };
            if let Err(e) = session.read() {
                debug!("Read error on session {:?}: {}", token, e);
                session.state = SessionState::Closed;
                return;
            }
        }

        loop {
            let Some(session) = self.sessions.get_mut(&token) else {
                return;
            };
            if session.state == SessionState::Closed {
                break;
            }
            match session.decode_next(self.max_packet_size) {
                Ok(Some(packet)) => {
                    session.touch(Instant::now());
                    self.handle_packet(token, packet);
                }
                Ok(None) => break,
                Err(e) => {
                    // Malformed frame: close silently, MQTT 3.1.1 has no
                    // generic error packet
                    debug!("Protocol error on session {:?}: {}", token, e);
                    session.state = SessionState::Closed;
                    break;
                }
            }
        }

        if let Some(session) = self.sessions.get_mut(&token) {
            if session.peer_closed() && session.state != SessionState::Closed {
                // Ungraceful close: the will, if armed, fires at reap time
                session.state = SessionState::Closed;
            }
        }

        self.flush_session(token);
    }

    fn handle_packet(&mut self, token: Token, packet: Packet) {
        let state = match self.sessions.get(&token) {
            Some(session) => session.state,
            None => return,
        };

        match state {
            SessionState::AwaitConnect => match packet {
                Packet::Connect(connect) => self.handle_connect(token, connect),
                _ => {
                    debug!("First packet was not CONNECT on {:?}", token);
                    self.close_session(token);
                }
            },
            SessionState::Connected => match packet {
                Packet::Connect(_) => {
                    debug!("Second CONNECT on {:?}", token);
                    self.close_session(token);
                }
                Packet::Publish(publish) => self.handle_publish(token, publish),
                Packet::Puback { packet_id } => self.handle_puback(token, packet_id),
                Packet::Pubrec { packet_id } => self.handle_pubrec(token, packet_id),
                Packet::Pubrel { packet_id } => self.handle_pubrel(token, packet_id),
                Packet::Pubcomp { packet_id } => self.handle_pubcomp(token, packet_id),
                Packet::Subscribe(subscribe) => self.handle_subscribe(token, subscribe),
                Packet::Unsubscribe(unsub) => self.handle_unsubscribe(token, unsub),
                Packet::Pingreq => {
                    if let Some(session) = self.sessions.get_mut(&token) {
                        session.queue_packet(&Packet::Pingresp);
                    }
                }
                Packet::Disconnect => self.handle_disconnect(token),
                _ => {
                    debug!("Unexpected packet from {:?}", token);
                    self.close_session(token);
                }
            },
            SessionState::Closed => {}
        }
    }

    fn handle_connect(&mut self, token: Token, connect: Connect) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };

        // Credentials are accepted syntactically; no validation policy here
        if let Some(username) = &connect.username {
            debug!(
                "Client '{}' supplied username '{}' (ignored)",
                connect.client_id, username
            );
        }

        session.client_id = connect.client_id;
        session.keep_alive = connect.keep_alive;
        session.will = connect.will;
        session.state = SessionState::Connected;
        session.queue_packet(&Packet::Connack {
            code: ConnackCode::Accepted,
        });

        info!(
            "Client '{}' connected (keep_alive={}s, will={})",
            session.client_id,
            session.keep_alive,
            session.will.is_some()
        );
    }

    fn handle_publish(&mut self, token: Token, publish: Publish) {
        match publish.qos {
            QoS::AtMostOnce => {
                self.deliver_inbound(&publish.topic, &publish.payload, publish.retain, publish.qos);
            }
            QoS::AtLeastOnce => {
                let Some(packet_id) = publish.packet_id else {
                    self.close_session(token);
                    return;
                };
                self.deliver_inbound(&publish.topic, &publish.payload, publish.retain, publish.qos);
                if let Some(session) = self.sessions.get_mut(&token) {
                    session.queue_packet(&Packet::Puback { packet_id });
                }
            }
            QoS::ExactlyOnce => {
                let Some(packet_id) = publish.packet_id else {
                    self.close_session(token);
                    return;
                };
                let Some(session) = self.sessions.get_mut(&token) else {
                    return;
                };
                // A DUP retransmission of a held message must not overwrite
                // it, and must not deliver a second time
                let already_held = session.inbound_qos2.contains_key(&packet_id);
                if !(already_held && publish.dup) {
                    session.inbound_qos2.insert(
                        packet_id,
                        InboundQoS2 {
                            topic: publish.topic.clone(),
                            payload: publish.payload.clone(),
                            retain: publish.retain,
                            packet_id,
                            last_send: Instant::now(),
                        },
                    );
                }
                // Delivery waits for PUBREL
                session.queue_packet(&Packet::Pubrec { packet_id });
            }
        }
    }

    fn handle_puback(&mut self, token: Token, packet_id: u16) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };
        let acked = matches!(
            session.outbound.get(&packet_id),
            Some(msg) if msg.phase == OutboundPhase::AwaitPubAck
        );
        if acked {
            session.outbound.remove(&packet_id);
        } else {
            warn!(
                "Unexpected PUBACK (packet {}) from '{}'",
                packet_id, session.client_id
            );
        }
    }

    fn handle_pubrec(&mut self, token: Token, packet_id: u16) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };
        if let Some(msg) = session.outbound.get_mut(&packet_id) {
            if msg.phase == OutboundPhase::AwaitPubRec {
                msg.phase = OutboundPhase::AwaitPubComp;
                msg.last_send = Instant::now();
                msg.retries = 0;
            }
        }
        // PUBREL goes out whether or not the id is known: idempotent reply
        session.queue_packet(&Packet::Pubrel { packet_id });
    }

    fn handle_pubrel(&mut self, token: Token, packet_id: u16) {
        let held = self
            .sessions
            .get_mut(&token)
            .and_then(|s| s.inbound_qos2.remove(&packet_id));

        if let Some(msg) = held {
            // The exactly-once moment: release the message to subscribers
            self.deliver_inbound(&msg.topic, &msg.payload, msg.retain, QoS::ExactlyOnce);
        }

        // PUBCOMP even for an unknown id
        if let Some(session) = self.sessions.get_mut(&token) {
            session.queue_packet(&Packet::Pubcomp { packet_id });
        }
    }

    fn handle_pubcomp(&mut self, token: Token, packet_id: u16) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };
        let completed = matches!(
            session.outbound.get(&packet_id),
            Some(msg) if msg.phase == OutboundPhase::AwaitPubComp
        );
        if completed {
            session.outbound.remove(&packet_id);
        } else {
            warn!(
                "Unexpected PUBCOMP (packet {}) from '{}'",
                packet_id, session.client_id
            );
        }
    }

    fn handle_subscribe(&mut self, token: Token, subscribe: Subscribe) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };

        let mut return_codes = Vec::with_capacity(subscribe.filters.len());
        for (filter, requested) in &subscribe.filters {
            let granted = granted_qos(*requested);

            // Session list mirrors the index; identical filter replaces
            if let Some(entry) = session
                .subscriptions
                .iter_mut()
                .find(|(f, _)| f == filter)
            {
                entry.1 = granted;
            } else {
                session.subscriptions.push((filter.clone(), granted));
            }
            self.subscriptions.subscribe(token, filter, granted);

            return_codes.push(granted as u8);
        }

        session.queue_packet(&Packet::Suback(Suback {
            packet_id: subscribe.packet_id,
            return_codes,
        }));

        // Replay retained messages at the granted QoS, RETAIN=1
        let mut replays: Vec<(Bytes, Bytes, QoS)> = Vec::new();
        for (filter, requested) in &subscribe.filters {
            let granted = granted_qos(*requested);
            for (stored_topic, stored_payload) in self.retained.iter() {
                if topic::matches(stored_topic, filter) {
                    replays.push((
                        Bytes::copy_from_slice(stored_topic.as_bytes()),
                        stored_payload.clone(),
                        granted,
                    ));
                }
            }
        }
        for (stored_topic, payload, qos) in replays {
            self.deliver_to(token, &stored_topic, &payload, qos, true);
        }

        self.flush_session(token);
    }

    fn handle_unsubscribe(&mut self, token: Token, unsub: Unsubscribe) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };
        for filter in &unsub.filters {
            session.subscriptions.retain(|(f, _)| f != filter);
            self.subscriptions.unsubscribe(token, filter);
        }
        session.queue_packet(&Packet::Unsuback {
            packet_id: unsub.packet_id,
        });
    }

    fn handle_disconnect(&mut self, token: Token) {
        if let Some(session) = self.sessions.get_mut(&token) {
            debug!("Client '{}' disconnected cleanly", session.client_id);
            // A clean DISCONNECT suppresses the will
            session.will = None;
            session.state = SessionState::Closed;
        }
    }

    fn close_session(&mut self, token: Token) {
        if let Some(session) = self.sessions.get_mut(&token) {
            session.state = SessionState::Closed;
        }
    }

    // === Routing ===

    /// Accept an inbound message for delivery: retain semantics, the status
    /// log, then fan-out to matching subscribers.
    fn deliver_inbound(
        &mut self,
        topic: &Bytes,
        payload: &Bytes,
        retain: bool,
        publisher_qos: QoS,
    ) {
        let topic_str = String::from_utf8_lossy(topic).into_owned();

        if retain {
            self.retained.apply(&topic_str, payload);
        }
        let now_ms = self.now_ms();
        self.message_log.push(&topic_str, payload, now_ms);

        let targets = self.subscriptions.matching(&topic_str);
        for (sub_token, granted) in targets {
            // Effective QoS is capped by the subscriber's grant
            let effective = publisher_qos.min(granted);
            self.deliver_to(sub_token, topic, payload, effective, false);
        }
    }

    /// Send one PUBLISH to one session, tracking it if QoS > 0.
    fn deliver_to(&mut self, token: Token, topic: &Bytes, payload: &Bytes, qos: QoS, retain: bool) {
        let Some(session) = self.sessions.get_mut(&token) else {
            return;
        };
        if session.state != SessionState::Connected {
            return;
        }

        let packet_id = if qos == QoS::AtMostOnce {
            None
        } else {
            let pid = session.allocate_packet_id();
            session.outbound.insert(
                pid,
                OutboundInFlight::new(topic.clone(), payload.clone(), qos, retain, pid),
            );
            Some(pid)
        };

        session.queue_packet(&Packet::Publish(Publish {
            dup: false,
            qos,
            retain,
            topic: topic.clone(),
            packet_id,
            payload: payload.clone(),
        }));

        self.flush_session(token);
    }

    // === Timers ===

    /// Walk the QoS tables: resend overdue packets, close sessions whose
    /// retransmission budget is spent.
    fn tick_qos(&mut self, now: Instant) {
        let timeout = self.qos_timeout;
        let max_retries = self.max_qos_retries;
        let mut flush_tokens: Vec<Token> = Vec::new();

        for session in self.sessions.values_mut() {
            if session.state != SessionState::Connected {
                continue;
            }

            let mut resend: Vec<Packet> = Vec::new();
            let mut exhausted = false;
            for msg in session.outbound.values_mut() {
                if !msg.retransmit_due(now, timeout) {
                    continue;
                }
                if msg.retries < max_retries {
                    msg.retries += 1;
                    msg.last_send = now;
                    match msg.phase {
                        OutboundPhase::AwaitPubAck | OutboundPhase::AwaitPubRec => {
                            resend.push(Packet::Publish(msg.to_publish(true)));
                        }
                        OutboundPhase::AwaitPubComp => {
                            resend.push(Packet::Pubrel {
                                packet_id: msg.packet_id,
                            });
                        }
                    }
                } else {
                    exhausted = true;
                    break;
                }
            }

            if exhausted {
                warn!(
                    "Retransmission budget exhausted for '{}', closing",
                    session.client_id
                );
                session.state = SessionState::Closed;
                continue;
            }

            // Inbound QoS 2: nudge the client with another PUBREC.
            // No retry ceiling; the client controls this handshake.
            let mut pubrecs: Vec<u16> = Vec::new();
            for msg in session.inbound_qos2.values_mut() {
                if msg.retransmit_due(now, timeout) {
                    msg.last_send = now;
                    pubrecs.push(msg.packet_id);
                }
            }

            if resend.is_empty() && pubrecs.is_empty() {
                continue;
            }
            for packet in &resend {
                session.queue_packet(packet);
            }
            for packet_id in pubrecs {
                session.queue_packet(&Packet::Pubrec { packet_id });
            }
            flush_tokens.push(session.token);
        }

        for token in flush_tokens {
            self.flush_session(token);
        }
    }

    fn check_keep_alive(&mut self, now: Instant) {
        for session in self.sessions.values_mut() {
            if session.keep_alive_expired(now) {
                info!("Keep-alive timeout for '{}', closing", session.client_id);
                session.state = SessionState::Closed;
            }
        }
    }

    /// Destroy Closed sessions: prune their index entries first, then fire
    /// the will if it is still armed.
    fn reap_sessions(&mut self) {
        let closed: Vec<Token> = self
            .sessions
            .iter()
            .filter(|(_, s)| s.state == SessionState::Closed)
            .map(|(t, _)| *t)
            .collect();

        for token in closed {
            self.subscriptions.remove_session(token);

            let Some(mut session) = self.sessions.remove(&token) else {
                continue;
            };
            let _ = self.poll.registry().deregister(&mut session.socket);
            let will = session.will.take();
            debug!("Session '{}' reaped", session.client_id);
            drop(session);

            if let Some(will) = will {
                info!("Publishing will to '{}'", will.topic);
                let will_topic = Bytes::copy_from_slice(will.topic.as_bytes());
                self.deliver_inbound(&will_topic, &will.message, will.retain, will.qos);
            }
        }
    }

    // === Socket writes ===

    /// Flush a session's outgoing queue, tracking writable interest so a
    /// slow client resumes on the next writable event.
    fn flush_session(&mut self, token: Token) {
        let result = match self.sessions.get_mut(&token) {
            Some(session) => session.flush(),
            None => return,
        };

        match result {
            Ok(true) => {
                if let Some(session) = self.sessions.get_mut(&token) {
                    if session.write_interest {
                        session.write_interest = false;
                        let _ = self.poll.registry().reregister(
                            &mut session.socket,
                            token,
                            Interest::READABLE,
                        );
                    }
                }
            }
            Ok(false) => {
                if let Some(session) = self.sessions.get_mut(&token) {
                    if !session.write_interest {
                        session.write_interest = true;
                        let _ = self.poll.registry().reregister(
                            &mut session.socket,
                            token,
                            Interest::READABLE | Interest::WRITABLE,
                        );
                    }
                }
            }
            Err(e) => {
                debug!("Write error on session {:?}: {}", token, e);
                if let Some(session) = self.sessions.get_mut(&token) {
                    session.state = SessionState::Closed;
                }
            }
        }
    }

    // === Status HTTP ===

    fn http_readable(&mut self, token: Token) {
        let outcome = match self.http_conns.get_mut(&token) {
            Some(conn) => conn.read_request(),
            None => return,
        };

        match outcome {
            Ok(true) => {
                let line = self
                    .http_conns
                    .get(&token)
                    .and_then(|c| c.request_line().map(str::to_string));
                let Some(line) = line else {
                    self.close_http(token);
                    return;
                };
                let snapshot = self.snapshot(Instant::now());
                let response = status::respond(&line, &snapshot);
                if let Some(conn) = self.http_conns.get_mut(&token) {
                    conn.set_response(response);
                }
                self.http_flush(token);
            }
            Ok(false) => {
                let gone = self
                    .http_conns
                    .get(&token)
                    .map(|c| c.peer_closed())
                    .unwrap_or(true);
                if gone {
                    self.close_http(token);
                }
            }
            Err(e) => {
                debug!("HTTP read error on {:?}: {}", token, e);
                self.close_http(token);
            }
        }
    }

    fn http_flush(&mut self, token: Token) {
        let result = match self.http_conns.get_mut(&token) {
            Some(conn) if conn.has_response() => conn.flush(),
            Some(_) => return,
            None => return,
        };

        match result {
            Ok(true) => self.close_http(token),
            Ok(false) => {
                if let Some(conn) = self.http_conns.get_mut(&token) {
                    if !conn.write_interest {
                        conn.write_interest = true;
                        let _ = self.poll.registry().reregister(
                            &mut conn.socket,
                            token,
                            Interest::READABLE | Interest::WRITABLE,
                        );
                    }
                }
            }
            Err(e) => {
                debug!("HTTP write error on {:?}: {}", token, e);
                self.close_http(token);
            }
        }
    }

    fn close_http(&mut self, token: Token) {
        if let Some(mut conn) = self.http_conns.remove(&token) {
            let _ = self.poll.registry().deregister(&mut conn.socket);
        }
    }

    /// Build the dashboard snapshot from current broker state.
    fn snapshot(&self, now: Instant) -> Snapshot {
        Snapshot {
            message_log: self
                .message_log
                .iter()
                .map(|r| SnapshotMessage {
                    topic: r.topic.clone(),
                    payload: r.payload.clone(),
                    timestamp: r.timestamp_ms,
                })
                .collect(),
            retained_messages: self
                .retained
                .iter()
                .map(|(t, p)| (t.clone(), String::from_utf8_lossy(p).into_owned()))
                .collect(),
            connected_clients: self
                .sessions
                .values()
                .filter(|s| s.state == SessionState::Connected)
                .map(|s| SnapshotClient {
                    id: s.client_id.clone(),
                    last_seen: now.saturating_duration_since(s.last_seen).as_millis() as u64,
                    subscribed_topics: s.subscriptions.iter().map(|(f, _)| f.clone()).collect(),
                })
                .collect(),
            wifi_ssid: self.config.network.ssid.clone(),
            wifi_ip: self.config.network.ip.clone(),
        }
    }

    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// SUBSCRIBE grants the requested QoS when it is a valid level, QoS 0
/// otherwise. A 0x80 failure code is never emitted.
fn granted_qos(requested: u8) -> QoS {
    match requested {
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_granted_qos_falls_back_to_zero() {
        assert_eq!(granted_qos(0), QoS::AtMostOnce);
        assert_eq!(granted_qos(1), QoS::AtLeastOnce);
        assert_eq!(granted_qos(2), QoS::ExactlyOnce);
        assert_eq!(granted_qos(3), QoS::AtMostOnce);
        assert_eq!(granted_qos(0x80), QoS::AtMostOnce);
    }
}
