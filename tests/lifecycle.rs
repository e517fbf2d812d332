//! Session lifecycle: wills, keep-alive, unsubscribe, and the
//! close-on-protocol-error paths.

mod common;

use std::time::Duration;

use common::*;

#[test]
fn will_fires_on_ungraceful_close() {
    let broker = start_broker();
    let mut subscriber = TestClient::connect(broker.mqtt_addr, "sub");
    subscriber.subscribe(1, "bye", 0);

    let mut doomed = TestClient::open(broker.mqtt_addr);
    doomed.send(&connect_packet_with_will("doomed", 0, "bye", b"gone", 0, false));
    doomed.expect_frame(&[0x20, 0x02, 0x00, 0x00]);

    // TCP close without DISCONNECT
    drop(doomed);

    subscriber.expect_frame(&[
        0x30, 0x09, 0x00, 0x03, b'b', b'y', b'e', b'g', b'o', b'n', b'e',
    ]);
}

#[test]
fn will_is_suppressed_by_clean_disconnect() {
    let broker = start_broker();
    let mut subscriber = TestClient::connect(broker.mqtt_addr, "sub");
    subscriber.subscribe(1, "bye", 0);

    let mut leaving = TestClient::open(broker.mqtt_addr);
    leaving.send(&connect_packet_with_will("leaving", 0, "bye", b"gone", 0, false));
    leaving.expect_frame(&[0x20, 0x02, 0x00, 0x00]);

    leaving.send(&DISCONNECT);
    drop(leaving);

    subscriber.expect_silence();
}

#[test]
fn retained_will_lands_in_the_retained_store() {
    let broker = start_broker();

    let mut doomed = TestClient::open(broker.mqtt_addr);
    doomed.send(&connect_packet_with_will("doomed", 0, "bye", b"gone", 0, true));
    doomed.expect_frame(&[0x20, 0x02, 0x00, 0x00]);
    drop(doomed);

    // Give the broker a moment to reap and publish the will
    std::thread::sleep(Duration::from_millis(200));

    // A later subscriber sees the will as a retained message
    let mut subscriber = TestClient::connect(broker.mqtt_addr, "sub");
    subscriber.subscribe(1, "bye", 0);
    subscriber.expect_frame(&[
        0x31, 0x09, 0x00, 0x03, b'b', b'y', b'e', b'g', b'o', b'n', b'e',
    ]);
}

#[test]
fn silent_client_is_closed_after_keep_alive_grace() {
    let broker = start_broker();
    let mut client = TestClient::open(broker.mqtt_addr);
    client.send(&connect_packet("quiet", 1));
    client.expect_frame(&[0x20, 0x02, 0x00, 0x00]);

    // 1.5 x 1s grace, then the broker closes the stream
    assert!(
        client.wait_for_close(Duration::from_secs(4)),
        "broker should close a silent client"
    );
}

#[test]
fn pings_keep_a_session_alive() {
    let broker = start_broker();
    let mut client = TestClient::open(broker.mqtt_addr);
    client.send(&connect_packet("pinger", 1));
    client.expect_frame(&[0x20, 0x02, 0x00, 0x00]);

    // Well past 1.5s of wall time, but never silent for that long
    for _ in 0..4 {
        std::thread::sleep(Duration::from_millis(600));
        client.send(&PINGREQ);
        client.expect_frame(&PINGRESP);
    }
}

#[test]
fn unsubscribe_stops_delivery() {
    let broker = start_broker();
    let mut subscriber = TestClient::connect(broker.mqtt_addr, "sub");
    subscriber.subscribe(1, "t", 0);

    let mut publisher = TestClient::connect(broker.mqtt_addr, "pub");
    publisher.send(&publish_packet("t", b"one", 0, false, false, None));
    subscriber.read_frame(READ_TIMEOUT).expect("first delivery");

    subscriber.send(&unsubscribe_packet(2, "t"));
    subscriber.expect_frame(&[0xB0, 0x02, 0x00, 0x02]);

    publisher.send(&publish_packet("t", b"two", 0, false, false, None));
    subscriber.expect_silence();
}

#[test]
fn first_packet_other_than_connect_closes() {
    let broker = start_broker();
    let mut client = TestClient::open(broker.mqtt_addr);

    client.send(&PINGREQ);
    assert!(client.wait_for_close(Duration::from_secs(2)));
}

#[test]
fn second_connect_closes_the_session() {
    let broker = start_broker();
    let mut client = TestClient::connect(broker.mqtt_addr, "twice");

    client.send(&connect_packet("twice", 0));
    assert!(client.wait_for_close(Duration::from_secs(2)));
}

#[test]
fn malformed_remaining_length_closes_the_session() {
    let broker = start_broker();
    let mut client = TestClient::connect(broker.mqtt_addr, "bad");

    // A fifth continuation byte in the Remaining Length field
    client.send(&[0x30, 0x80, 0x80, 0x80, 0x80, 0x01]);
    assert!(client.wait_for_close(Duration::from_secs(2)));
}

#[test]
fn oversized_packet_closes_the_session() {
    let broker = start_broker_with(|c| c.limits.max_packet_size = 64);
    let mut client = TestClient::connect(broker.mqtt_addr, "big");

    // Remaining Length 100 against a 64 byte cap
    client.send(&[0x30, 0x64]);
    assert!(client.wait_for_close(Duration::from_secs(2)));
}

#[test]
fn broker_survives_a_subscriber_vanishing() {
    let broker = start_broker();

    let mut casualty = TestClient::connect(broker.mqtt_addr, "casualty");
    casualty.subscribe(1, "t", 0);

    let mut witness = TestClient::connect(broker.mqtt_addr, "witness");
    witness.subscribe(1, "t", 0);

    drop(casualty);
    // Let the broker reap the dead session (and prune its index entries)
    std::thread::sleep(Duration::from_millis(200));

    let mut publisher = TestClient::connect(broker.mqtt_addr, "pub");
    publisher.send(&publish_packet("t", b"x", 0, false, false, None));

    // Delivery continues to the remaining subscriber, broker stays healthy
    witness.read_frame(READ_TIMEOUT).expect("delivery");
    publisher.send(&PINGREQ);
    publisher.expect_frame(&PINGRESP);
}
