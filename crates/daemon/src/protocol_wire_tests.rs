// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;

#[test]
fn encode_decode_round_trips_a_response() {
    let response = ControlResponse::ok(serde_json::json!({ "n": 1 }));
    let bytes = encode(&response).expect("encode");
    let decoded: ControlResponse = decode(&bytes).expect("decode");
    assert_eq!(decoded.ok, response.ok);
    assert_eq!(decoded.data, response.data);
}

#[test]
fn encode_rejects_messages_over_the_size_limit() {
    let huge = ControlResponse::ok(serde_json::json!("x".repeat(MAX_MESSAGE_SIZE + 1)));
    let err = encode(&huge).expect_err("should be too large");
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn write_then_read_message_round_trips_over_a_duplex_stream() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let request = ControlRequest::RuntimeMetrics;
    let bytes = encode(&request).expect("encode");
    write_message(&mut client, &bytes).await.expect("write");

    let read_back = read_message(&mut server).await.expect("read");
    let decoded: ControlRequest = decode(&read_back).expect("decode");
    assert!(matches!(decoded, ControlRequest::RuntimeMetrics));
}

#[tokio::test]
async fn read_request_then_write_response_round_trips() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let request = ControlRequest::ListJobs;
    let bytes = encode(&request).expect("encode");
    write_message(&mut client, &bytes).await.expect("write");

    let decoded = read_request(&mut server, Duration::from_secs(1)).await.expect("read_request");
    assert!(matches!(decoded, ControlRequest::ListJobs));

    let response = ControlResponse::ok_empty();
    write_response(&mut server, &response, Duration::from_secs(1)).await.expect("write_response");

    let read_back = read_message(&mut client).await.expect("read");
    let decoded_response: ControlResponse = decode(&read_back).expect("decode");
    assert!(decoded_response.ok);
}

#[tokio::test]
async fn read_message_on_a_closed_stream_reports_connection_closed() {
    let (client, mut server) = tokio::io::duplex(4096);
    drop(client);

    let err = read_message(&mut server).await.expect_err("should fail");
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn read_request_times_out_when_nothing_is_sent() {
    let (_client, mut server) = tokio::io::duplex(4096);

    let err = read_request(&mut server, Duration::from_millis(20)).await.expect_err("should time out");
    assert!(matches!(err, ProtocolError::Timeout));
}

#[tokio::test]
async fn read_message_rejects_a_length_prefix_over_the_size_limit() {
    let (mut client, mut server) = tokio::io::duplex(4096);

    let oversized_len = (MAX_MESSAGE_SIZE as u32) + 1;
    tokio::io::AsyncWriteExt::write_all(&mut client, &oversized_len.to_be_bytes())
        .await
        .expect("write length prefix");

    let err = read_message(&mut server).await.expect_err("should reject");
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[test]
fn protocol_version_matches_the_crate_version() {
    assert_eq!(PROTOCOL_VERSION, env!("CARGO_PKG_VERSION"));
}
