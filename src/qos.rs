//! In-flight QoS 1/2 bookkeeping.
//!
//! The outbound table tracks messages this broker sent with QoS > 0 until
//! the terminal acknowledgement arrives; the inbound table tracks QoS 2
//! publishes received from a client until its PUBREL releases them to
//! subscribers. Both tables live on the owning `Session`; the broker's
//! periodic tick drives retransmission.

use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::packet::{Publish, QoS};

/// Which acknowledgement an outbound in-flight message is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundPhase {
    /// QoS 1: waiting for PUBACK.
    AwaitPubAck,
    /// QoS 2: waiting for PUBREC.
    AwaitPubRec,
    /// QoS 2: PUBREL sent, waiting for PUBCOMP.
    AwaitPubComp,
}

/// An outbound PUBLISH with QoS > 0 awaiting its handshake.
#[derive(Debug, Clone)]
pub struct OutboundInFlight {
    pub topic: Bytes,
    pub payload: Bytes,
    pub qos: QoS,
    pub retain: bool,
    pub packet_id: u16,
    pub phase: OutboundPhase,
    pub last_send: Instant,
    pub retries: u8,
}

impl OutboundInFlight {
    pub fn new(topic: Bytes, payload: Bytes, qos: QoS, retain: bool, packet_id: u16) -> Self {
        let phase = match qos {
            QoS::ExactlyOnce => OutboundPhase::AwaitPubRec,
            _ => OutboundPhase::AwaitPubAck,
        };
        Self {
            topic,
            payload,
            qos,
            retain,
            packet_id,
            phase,
            last_send: Instant::now(),
            retries: 0,
        }
    }

    /// True once the retransmission timeout has elapsed.
    pub fn retransmit_due(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_send) >= timeout
    }

    /// Rebuild the PUBLISH for (re)transmission.
    pub fn to_publish(&self, dup: bool) -> Publish {
        Publish {
            dup,
            qos: self.qos,
            retain: self.retain,
            topic: self.topic.clone(),
            packet_id: Some(self.packet_id),
            payload: self.payload.clone(),
        }
    }
}

/// An inbound QoS 2 PUBLISH held back until PUBREL arrives.
///
/// Its only phase is "PUBREC sent": the entry exists exactly while the
/// broker waits for the client's PUBREL.
#[derive(Debug, Clone)]
pub struct InboundQoS2 {
    pub topic: Bytes,
    pub payload: Bytes,
    pub retain: bool,
    pub packet_id: u16,
    pub last_send: Instant,
}

impl InboundQoS2 {
    pub fn retransmit_due(&self, now: Instant, timeout: Duration) -> bool {
        now.duration_since(self.last_send) >= timeout
    }
}
