//! End-to-end Kafka pipeline: captured bytes in, telemetry rows out.

use rstest::rstest;

use tapframe::{
    ConnectionDecoder, Direction, ProtocolKind, StitchConfig,
    testing::{
        encode_produce_req_body, encode_produce_resp_body, encode_record, encode_record_batch,
        encode_req_frame, encode_resp_frame,
    },
};

fn produce_exchange(version: i16, correlation_id: i32, topic: &str) -> (Vec<u8>, Vec<u8>) {
    let flexible = version >= 9;
    let records = vec![
        encode_record(0, 0, Some(b"key-a"), Some(b"value-a")),
        encode_record(15, 1, None, Some(b"value-b")),
    ];
    let batch = encode_record_batch(100, &records);
    let req_body = encode_produce_req_body(version, flexible, topic, 3, &batch);
    let resp_body = encode_produce_resp_body(version, flexible, topic, 3, 0, 100);
    (
        encode_req_frame(0, version, correlation_id, Some("orders-svc"), flexible, &req_body),
        encode_resp_frame(correlation_id, flexible, &resp_body),
    )
}

#[rstest]
#[case::v0(0)]
#[case::v1(1)]
#[case::v2(2)]
#[case::v5(5)]
#[case::v8(8)]
#[case::v9(9)]
fn produce_round_trip_across_every_version_gate(#[case] version: i16) {
    let (req, resp) = produce_exchange(version, 7, "orders");
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    assert_eq!(conn.consume(Direction::Request, &req, 1_000).frames_parsed, 1);
    assert_eq!(conn.consume(Direction::Response, &resp, 2_000).frames_parsed, 1);
    let result = conn.stitch();
    assert_eq!(result.error_count, 0, "version {version} should decode cleanly");
    assert_eq!(result.records.len(), 1);
    let entry = &result.records[0];
    assert_eq!(entry.command, "produce");
    assert_eq!(entry.status, 0);
    assert_eq!(entry.latency_ns, 1_000);
    assert!(entry.request_body.contains("orders"));
}

#[test]
fn responses_arriving_before_stitching_are_queued_not_lost() {
    let (req, resp) = produce_exchange(7, 1, "t");
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    // Response bytes observed first: stitching waits for the request.
    conn.consume(Direction::Response, &resp, 500);
    assert!(conn.stitch().records.is_empty());
    conn.consume(Direction::Request, &req, 400);
    let result = conn.stitch();
    assert_eq!(result.records.len(), 1);
}

#[test]
fn mid_stream_attachment_recovers_at_the_next_frame() {
    // Capture begins inside frame 1, in the client-id string; only frame 2
    // should survive. ASCII bytes read as an absurd length prefix, which
    // must not stall the stream waiting for more data.
    let (req1, _) = produce_exchange(7, 1, "t");
    let (req2, resp2) = produce_exchange(7, 2, "t");
    let mut buf = req1[14..24].to_vec();
    buf.extend_from_slice(&req2);
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    let summary = conn.consume(Direction::Request, &buf, 10);
    assert_eq!(summary.frames_parsed, 1);
    assert!(summary.invalid_starts >= 1);
    conn.consume(Direction::Response, &resp2, 20);
    let result = conn.stitch();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.records[0].latency_ns, 10);
}

#[test]
fn pipelined_requests_keep_their_fifo_pairing() {
    let exchanges: Vec<_> = (0..4)
        .map(|id| produce_exchange(7, id, &format!("topic-{id}")))
        .collect();
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    let mut req_stream = Vec::new();
    let mut resp_stream = Vec::new();
    for (req, resp) in &exchanges {
        req_stream.extend_from_slice(req);
        resp_stream.extend_from_slice(resp);
    }
    assert_eq!(conn.consume(Direction::Request, &req_stream, 100).frames_parsed, 4);
    assert_eq!(conn.consume(Direction::Response, &resp_stream, 300).frames_parsed, 4);
    let result = conn.stitch();
    assert_eq!(result.records.len(), 4);
    for (id, entry) in result.records.iter().enumerate() {
        assert!(entry.request_body.contains(&format!("topic-{id}")));
    }
}

#[test]
fn lost_response_is_detected_by_correlation_skew() {
    let (req1, _) = produce_exchange(7, 1, "t");
    let (req2, resp2) = produce_exchange(7, 2, "t");
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    conn.consume(Direction::Request, &req1, 10);
    conn.consume(Direction::Request, &req2, 20);
    conn.consume(Direction::Response, &resp2, 30);
    let result = conn.stitch();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.error_count, 1);
}

#[test]
fn stale_requests_expire_past_the_retention_bound() {
    let (req_old, _) = produce_exchange(7, 1, "t");
    let (req_new, resp_new) = produce_exchange(7, 2, "t");
    let config = StitchConfig { retention_ns: 1_000 };
    let mut conn = ConnectionDecoder::with_config(ProtocolKind::Kafka, "broker-1:9092", config);
    conn.consume(Direction::Request, &req_old, 100);
    conn.consume(Direction::Request, &req_new, 100_000);
    conn.consume(Direction::Response, &resp_new, 100_050);
    // Head-of-line: correlation skew already evicts request 1 when
    // response 2 is inspected, before retention even applies.
    let result = conn.stitch();
    assert_eq!(result.records.len(), 1);
    assert_eq!(result.error_count, 1);
    assert_eq!(conn.queued(Direction::Request), 0);
}

#[test]
fn close_reports_every_unmatched_frame() {
    let (req, _) = produce_exchange(7, 1, "t");
    let (req2, _) = produce_exchange(7, 2, "t");
    let mut conn = ConnectionDecoder::new(ProtocolKind::Kafka, "broker-1:9092");
    conn.consume(Direction::Request, &req, 10);
    conn.consume(Direction::Request, &req2, 20);
    assert_eq!(conn.close(), 2);
}
