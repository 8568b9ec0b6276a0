//! Helpers for explicit network byte-order conversions.
//!
//! These helpers keep Clippy expectations scoped to the conversion points so
//! protocol code can remain explicit about wire endianness without repeating
//! lint annotations. Both protocols this crate decodes put multi-byte
//! integers on the wire big-endian.

/// Parse a network-order `u16` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use tapframe::byte_order::read_network_u16;
///
/// assert_eq!(read_network_u16([0x12, 0x34]), 0x1234);
/// ```
#[must_use]
pub fn read_network_u16(bytes: [u8; 2]) -> u16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u16::from_be_bytes(bytes)
}

/// Parse a network-order `u32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use tapframe::byte_order::read_network_u32;
///
/// assert_eq!(read_network_u32([0x12, 0x34, 0x56, 0x78]), 0x1234_5678);
/// ```
#[must_use]
pub fn read_network_u32(bytes: [u8; 4]) -> u32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u32::from_be_bytes(bytes)
}

/// Parse a network-order `u64` from its on-wire representation.
#[must_use]
pub fn read_network_u64(bytes: [u8; 8]) -> u64 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    u64::from_be_bytes(bytes)
}

/// Parse a network-order `i16` from its on-wire representation.
#[must_use]
pub fn read_network_i16(bytes: [u8; 2]) -> i16 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    i16::from_be_bytes(bytes)
}

/// Parse a network-order `i32` from its on-wire representation.
///
/// # Examples
///
/// ```
/// use tapframe::byte_order::read_network_i32;
///
/// assert_eq!(read_network_i32([0xff, 0xff, 0xff, 0xff]), -1);
/// ```
#[must_use]
pub fn read_network_i32(bytes: [u8; 4]) -> i32 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    i32::from_be_bytes(bytes)
}

/// Parse a network-order `i64` from its on-wire representation.
#[must_use]
pub fn read_network_i64(bytes: [u8; 8]) -> i64 {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    i64::from_be_bytes(bytes)
}

/// Serialise a `u16` in network byte order (big-endian).
#[must_use]
pub fn write_network_u16(value: u16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Serialise a `u32` in network byte order (big-endian).
#[must_use]
pub fn write_network_u32(value: u32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Serialise an `i16` in network byte order (big-endian).
#[must_use]
pub fn write_network_i16(value: i16) -> [u8; 2] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Serialise an `i32` in network byte order (big-endian).
#[must_use]
pub fn write_network_i32(value: i32) -> [u8; 4] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

/// Serialise an `i64` in network byte order (big-endian).
#[must_use]
pub fn write_network_i64(value: i64) -> [u8; 8] {
    #[expect(
        clippy::big_endian_bytes,
        reason = "Network byte order requires big-endian bytes."
    )]
    value.to_be_bytes()
}

#[cfg(test)]
mod tests {
    //! Round-trip tests for network byte-order conversion helpers.

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case::u16(&write_network_u16(0x1234)[..], &[0x12, 0x34])]
    #[case::u32(&write_network_u32(0x1234_5678)[..], &[0x12, 0x34, 0x56, 0x78])]
    #[case::i16_negative(&write_network_i16(-2)[..], &[0xff, 0xfe])]
    #[case::i32_negative(&write_network_i32(-1)[..], &[0xff, 0xff, 0xff, 0xff])]
    fn network_order_writes_most_significant_byte_first(
        #[case] written: &[u8],
        #[case] expected: &[u8],
    ) {
        assert_eq!(written, expected);
    }

    #[rstest]
    #[case::zero(0)]
    #[case::negative(-987_654_321_012_345)]
    #[case::min(i64::MIN)]
    #[case::max(i64::MAX)]
    fn i64_round_trips(#[case] value: i64) {
        assert_eq!(read_network_i64(write_network_i64(value)), value);
    }

    #[test]
    fn unsigned_and_signed_reads_agree_on_bit_pattern() {
        let bytes = [0x80, 0x00, 0x00, 0x01];
        assert_eq!(read_network_u32(bytes), 0x8000_0001);
        assert_eq!(read_network_i32(bytes), i32::MIN + 1);
        assert_eq!(read_network_u64([0xff; 8]), u64::MAX);
        assert_eq!(read_network_i64([0xff; 8]), -1);
    }
}
