use rstest::rstest;

use super::PacketDecoder;
use crate::{
    decode::DecodeError,
    kafka::types::ApiKey,
    testing::{
        encode_produce_req_body, encode_produce_resp_body, encode_record, encode_record_batch,
        put_i16, put_i32, put_nullable_string, put_unsigned_varint, put_varint,
    },
};

fn req_header_bytes(api_key: i16, api_version: i16, correlation_id: i32) -> Vec<u8> {
    let mut buf = Vec::new();
    put_i16(&mut buf, api_key);
    put_i16(&mut buf, api_version);
    put_i32(&mut buf, correlation_id);
    put_nullable_string(&mut buf, Some("client-1"));
    buf
}

#[test]
fn req_header_decodes_and_latches_api_info() {
    let buf = req_header_bytes(0, 7, 41);
    let mut decoder = PacketDecoder::new(&buf);
    let header = decoder.extract_req_header().expect("valid header");
    assert_eq!(header.api_key, ApiKey::Produce);
    assert_eq!(header.api_version, 7);
    assert_eq!(header.correlation_id, 41);
    assert_eq!(header.client_id.as_deref(), Some("client-1"));
}

#[test]
fn flexible_req_header_skips_tagged_fields() {
    let mut buf = req_header_bytes(0, 9, 41);
    // One tagged field: tag 0, three payload bytes.
    put_unsigned_varint(&mut buf, 1);
    put_unsigned_varint(&mut buf, 0);
    put_unsigned_varint(&mut buf, 3);
    buf.extend_from_slice(&[0xaa, 0xbb, 0xcc]);
    let mut decoder = PacketDecoder::new(&buf);
    decoder.extract_req_header().expect("valid flexible header");
    assert_eq!(decoder.remaining(), 0);
}

#[rstest]
#[case::unknown_api_key(99, 1)]
#[case::gap_api_key(21, 1)]
fn unrecognised_api_key_is_unsupported(#[case] api_key: i16, #[case] version: i16) {
    let buf = req_header_bytes(api_key, version, 0);
    let mut decoder = PacketDecoder::new(&buf);
    assert!(matches!(
        decoder.extract_req_header(),
        Err(DecodeError::Unsupported { .. })
    ));
}

#[rstest]
#[case::negative(-1)]
#[case::future(10)]
fn implausible_version_is_unsupported(#[case] version: i16) {
    let buf = req_header_bytes(0, version, 0);
    let mut decoder = PacketDecoder::new(&buf);
    assert!(matches!(
        decoder.extract_req_header(),
        Err(DecodeError::Unsupported { .. })
    ));
}

#[test]
fn negative_correlation_id_is_malformed() {
    let buf = req_header_bytes(0, 1, -5);
    let mut decoder = PacketDecoder::new(&buf);
    assert!(matches!(
        decoder.extract_req_header(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[test]
fn record_message_round_trips_deltas_and_payloads() {
    let buf = encode_record(250, 3, Some(b"k1"), Some(b"hello"));
    let mut decoder = PacketDecoder::new(&buf);
    let record = decoder.extract_record_message().expect("valid record");
    assert_eq!(record.timestamp_delta, 250);
    assert_eq!(record.offset_delta, 3);
    assert_eq!(record.key.as_deref(), Some(&b"k1"[..]));
    assert_eq!(record.value.as_deref(), Some(&b"hello"[..]));
    assert_eq!(decoder.remaining(), 0);
}

#[test]
fn record_message_discards_trailing_headers_via_the_length_mark() {
    // Append header bytes inside the declared record length.
    let mut record = encode_record(0, 0, None, Some(b"v"));
    // Rebuild with a fake two-byte trailer counted in the declared length.
    let inner: Vec<u8> = record.split_off(1);
    let mut rebuilt = Vec::new();
    put_varint(&mut rebuilt, inner.len() as i64 + 2);
    rebuilt.extend_from_slice(&inner);
    rebuilt.extend_from_slice(&[0x01, 0x02]);
    let mut decoder = PacketDecoder::new(&rebuilt);
    let parsed = decoder.extract_record_message().expect("valid record");
    assert_eq!(parsed.value.as_deref(), Some(&b"v"[..]));
    assert_eq!(decoder.remaining(), 0);
}

#[test]
fn record_batch_decodes_nested_records() {
    let records = vec![
        encode_record(0, 0, Some(b"a"), Some(b"first")),
        encode_record(10, 1, None, Some(b"second")),
    ];
    let buf = encode_record_batch(7, &records);
    let mut decoder = PacketDecoder::new(&buf);
    let batch = decoder.extract_record_batch().expect("valid batch");
    assert_eq!(batch.base_offset, 7);
    assert_eq!(batch.records.len(), 2);
    assert_eq!(batch.records[1].value.as_deref(), Some(&b"second"[..]));
    assert_eq!(decoder.remaining(), 0);
}

#[rstest]
#[case::legacy_magic(1)]
#[case::unknown_magic(3)]
fn non_v2_magic_is_unsupported(#[case] magic: u8) {
    let mut buf = encode_record_batch(0, &[encode_record(0, 0, None, Some(b"v"))]);
    // Magic sits after base offset (8), length (4), and leader epoch (4).
    buf[16] = magic;
    let mut decoder = PacketDecoder::new(&buf);
    assert!(matches!(
        decoder.extract_record_batch(),
        Err(DecodeError::Unsupported { .. })
    ));
}

#[test]
fn batch_length_mismatch_is_internal() {
    let mut buf = encode_record_batch(0, &[encode_record(0, 0, None, Some(b"v"))]);
    // Inflate the declared batch length past the real record bytes.
    let declared = i32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
    buf[8..12].copy_from_slice(&(declared + 2).to_be_bytes());
    buf.extend_from_slice(&[0x00, 0x00]);
    let mut decoder = PacketDecoder::new(&buf);
    assert!(matches!(
        decoder.extract_record_batch(),
        Err(DecodeError::Internal { .. })
    ));
}

#[test]
fn truncated_batch_is_retryable() {
    let buf = encode_record_batch(0, &[encode_record(0, 0, None, Some(b"v"))]);
    let mut decoder = PacketDecoder::new(&buf[..buf.len() - 3]);
    assert!(matches!(
        decoder.extract_record_batch(),
        Err(DecodeError::InsufficientData { .. })
    ));
}

#[rstest]
#[case::v0(0, false)]
#[case::v3_transactional_id(3, false)]
#[case::v8(8, false)]
#[case::v9_flexible(9, true)]
fn produce_request_decodes_across_version_gates(#[case] version: i16, #[case] flexible: bool) {
    let batch = encode_record_batch(0, &[encode_record(0, 0, Some(b"k"), Some(b"v"))]);
    let body = encode_produce_req_body(version, flexible, "events", 2, &batch);
    let mut decoder = PacketDecoder::new(&body);
    decoder.set_api_info(ApiKey::Produce, version);
    let request = decoder.extract_produce_req().expect("valid produce request");
    assert_eq!(request.acks, -1);
    assert_eq!(request.timeout_ms, 30_000);
    assert_eq!(request.topics.len(), 1);
    assert_eq!(request.topics[0].name, "events");
    assert_eq!(request.topics[0].partitions[0].index, 2);
    assert_eq!(request.topics[0].partitions[0].batches[0].records.len(), 1);
    assert_eq!(decoder.remaining(), 0);
}

#[rstest]
#[case::v0_no_throttle(0)]
#[case::v1_throttle(1)]
#[case::v2_log_append_time(2)]
#[case::v5_log_start_offset(5)]
#[case::v8_record_errors(8)]
#[case::v9_flexible(9)]
fn produce_response_decodes_across_version_gates(#[case] version: i16) {
    let flexible = version >= 9;
    let body = encode_produce_resp_body(version, flexible, "events", 2, 0, 88);
    let mut decoder = PacketDecoder::new(&body);
    decoder.set_api_info(ApiKey::Produce, version);
    let response = decoder.extract_produce_resp().expect("valid produce response");
    assert_eq!(response.topics.len(), 1);
    let partition = &response.topics[0].partitions[0];
    assert_eq!(partition.index, 2);
    assert_eq!(partition.error_code, 0);
    assert_eq!(partition.base_offset, 88);
    assert_eq!(decoder.remaining(), 0);
}

#[test]
fn produce_response_surfaces_partition_errors() {
    // Error code 7: request timed out.
    let body = encode_produce_resp_body(8, false, "events", 0, 7, -1);
    let mut decoder = PacketDecoder::new(&body);
    decoder.set_api_info(ApiKey::Produce, 8);
    let response = decoder.extract_produce_resp().expect("valid produce response");
    assert_eq!(response.first_error_code(), Some(7));
}
