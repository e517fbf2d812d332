//! mqboard - an embedded-scale MQTT 3.1.1 broker with a status dashboard.
//!
//! The broker runs a single-threaded, non-blocking event loop that owns
//! every client session, the subscription index, and the retained store.
//! It speaks the MQTT 3.1.1 subset IoT fleets actually use (QoS 0/1/2,
//! retained messages, last wills, keep-alive) and exposes a JSON snapshot
//! of recent traffic for a dashboard UI.

pub mod broker;
pub mod config;
pub mod error;
pub mod message_log;
pub mod packet;
pub mod qos;
pub mod retained;
pub mod session;
pub mod status;
pub mod subscription;
pub mod topic;
