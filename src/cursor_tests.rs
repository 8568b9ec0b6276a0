use proptest::prelude::*;
use rstest::rstest;

use super::{BinaryCursor, zigzag_decode, zigzag_encode};
use crate::decode::DecodeError;

#[test]
fn fixed_width_reads_advance_in_order() {
    let buf = [0x00, 0x01, 0xff, 0xfe, 0x00, 0x00, 0x00, 0x2a];
    let mut cursor = BinaryCursor::new(&buf);
    assert_eq!(cursor.extract_i16(), Ok(1));
    assert_eq!(cursor.extract_i16(), Ok(-2));
    assert_eq!(cursor.extract_i32(), Ok(42));
    assert_eq!(cursor.remaining(), 0);
}

#[test]
fn drained_buffer_reports_insufficient_data() {
    let buf = [0x00, 0x01];
    let mut cursor = BinaryCursor::new(&buf);
    assert_eq!(
        cursor.extract_i32(),
        Err(DecodeError::InsufficientData { have: 2, need: 4 })
    );
    // A failed read consumes nothing.
    assert_eq!(cursor.position(), 0);
}

#[rstest]
#[case::single_group(&[0x07], 7)]
#[case::two_groups(&[0xac, 0x02], 300)]
#[case::max_u32(&[0xff, 0xff, 0xff, 0xff, 0x0f], u32::MAX)]
fn unsigned_varint_decodes_base_128_groups(#[case] bytes: &[u8], #[case] expected: u32) {
    let mut cursor = BinaryCursor::new(bytes);
    assert_eq!(cursor.extract_unsigned_varint(), Ok(expected));
}

#[test]
fn unsigned_varint_rejects_missing_terminator_within_ceiling() {
    // Five continuation groups with no terminating byte: 35-bit ceiling hit.
    let bytes = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
    let mut cursor = BinaryCursor::new(&bytes);
    assert!(matches!(
        cursor.extract_unsigned_varint(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[rstest]
#[case::zero(&[0x00], 0)]
#[case::minus_one(&[0x01], -1)]
#[case::one(&[0x02], 1)]
#[case::minus_two(&[0x03], -2)]
#[case::large(&[0xfe, 0xff, 0xff, 0xff, 0x0f], i32::MAX)]
fn signed_varint_undoes_zigzag(#[case] bytes: &[u8], #[case] expected: i32) {
    let mut cursor = BinaryCursor::new(bytes);
    assert_eq!(cursor.extract_varint(), Ok(expected));
}

#[test]
fn varlong_covers_the_full_64_bit_range() {
    // i64::MIN zigzag-encodes to u64::MAX: ten groups, last payload 0x01.
    let bytes = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
    let mut cursor = BinaryCursor::new(&bytes);
    assert_eq!(cursor.extract_varlong(), Ok(i64::MIN));
}

#[rstest]
#[case::present(&[0x00, 0x05, b'h', b'e', b'l', b'l', b'o'], Some("hello"))]
#[case::empty(&[0x00, 0x00], Some(""))]
#[case::null(&[0xff, 0xff], None)]
fn nullable_string_uses_minus_one_sentinel(#[case] bytes: &[u8], #[case] expected: Option<&str>) {
    let mut cursor = BinaryCursor::new(bytes);
    assert_eq!(
        cursor.extract_nullable_string(),
        Ok(expected.map(String::from))
    );
}

#[test]
fn non_nullable_string_rejects_negative_length() {
    let bytes = [0xff, 0xff];
    let mut cursor = BinaryCursor::new(&bytes);
    assert!(matches!(
        cursor.extract_length_prefixed_string(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[rstest]
#[case::null(&[0x00], None)]
#[case::empty(&[0x01], Some(""))]
#[case::present(&[0x03, b'o', b'k'], Some("ok"))]
fn compact_nullable_string_offsets_length_by_one(
    #[case] bytes: &[u8],
    #[case] expected: Option<&str>,
) {
    let mut cursor = BinaryCursor::new(bytes);
    assert_eq!(
        cursor.extract_compact_nullable_string(),
        Ok(expected.map(String::from))
    );
}

#[test]
fn compact_string_rejects_null_sentinel() {
    let bytes = [0x00];
    let mut cursor = BinaryCursor::new(&bytes);
    assert!(matches!(
        cursor.extract_compact_string(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[rstest]
#[case::absent(&[0x01], None)]
#[case::empty(&[0x00], Some(&[][..]))]
#[case::present(&[0x04, 0xde, 0xad], Some(&[0xde, 0xad][..]))]
fn zigzag_bytes_distinguish_absent_from_empty(#[case] bytes: &[u8], #[case] expected: Option<&[u8]>) {
    let mut cursor = BinaryCursor::new(bytes);
    assert_eq!(
        cursor.extract_bytes_zigzag(),
        Ok(expected.map(<[u8]>::to_vec))
    );
}

#[test]
fn zigzag_bytes_reject_length_below_minus_one() {
    // Zigzag 0x03 decodes to -2.
    let bytes = [0x03];
    let mut cursor = BinaryCursor::new(&bytes);
    assert!(matches!(
        cursor.extract_bytes_zigzag(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[test]
fn read_crossing_innermost_mark_is_malformed() {
    let buf = [0x01, 0x02, 0x03, 0x04];
    let mut cursor = BinaryCursor::new(&buf);
    cursor.mark_offset(2).expect("mark within buffer");
    assert_eq!(cursor.extract_u8(), Ok(0x01));
    assert!(matches!(
        cursor.extract_u16(),
        Err(DecodeError::Malformed { .. })
    ));
}

#[test]
fn jump_skips_unconsumed_trailing_bytes() {
    let buf = [0x01, 0x02, 0x03, 0x04];
    let mut cursor = BinaryCursor::new(&buf);
    cursor.mark_offset(3).expect("mark within buffer");
    assert_eq!(cursor.extract_u8(), Ok(0x01));
    assert_eq!(cursor.jump_to_offset(), Ok(2));
    assert_eq!(cursor.extract_u8(), Ok(0x04));
}

#[test]
fn jump_past_captured_bytes_is_retryable() {
    let buf = [0x01, 0x02];
    let mut cursor = BinaryCursor::new(&buf);
    cursor.mark_offset(10).expect("mark may exceed capture");
    assert!(matches!(
        cursor.jump_to_offset(),
        Err(DecodeError::InsufficientData { .. })
    ));
}

#[test]
fn jump_without_mark_is_internal() {
    let mut cursor = BinaryCursor::new(&[]);
    assert_eq!(
        cursor.jump_to_offset(),
        Err(DecodeError::Internal {
            reason: "jump without an outstanding mark",
        })
    );
}

#[test]
fn inner_mark_cannot_exceed_enclosing_mark() {
    let buf = [0u8; 8];
    let mut cursor = BinaryCursor::new(&buf);
    cursor.mark_offset(4).expect("outer mark");
    assert!(matches!(
        cursor.mark_offset(6),
        Err(DecodeError::Malformed { .. })
    ));
}

proptest! {
    #[test]
    fn zigzag_round_trips(value in any::<i64>()) {
        prop_assert_eq!(zigzag_decode(zigzag_encode(value)), value);
    }

    #[test]
    fn zigzag_encodes_small_magnitudes_compactly(value in -64i64..64) {
        prop_assert!(zigzag_encode(value) < 128);
    }
}
