//! Field-level Kafka payload decoding.
//!
//! [`PacketDecoder`] layers protocol knowledge over [`BinaryCursor`]: which
//! fields exist at which api version, when the compact (flexible) encodings
//! apply, and how record batches nest. One decoder is built per payload;
//! for responses the caller seeds it with the paired request's api info via
//! [`PacketDecoder::set_api_info`] before decoding, because a response body
//! is uninterpretable without the version the client negotiated.

use crate::{
    cursor::BinaryCursor,
    decode::{DecodeError, DecodeResult},
    kafka::types::{
        ApiKey, ProduceReqPartition, ProduceReqTopic, ProduceRequest, ProduceRespPartition,
        ProduceRespTopic, ProduceResponse, RecordBatch, RecordError, RecordMessage, RequestHeader,
    },
};

/// The only record-batch magic this engine decodes.
const RECORD_BATCH_MAGIC_V2: i8 = 2;

pub struct PacketDecoder<'a> {
    cursor: BinaryCursor<'a>,
    api_key: Option<ApiKey>,
    api_version: i16,
    is_flexible: bool,
}

impl<'a> PacketDecoder<'a> {
    /// Wrap one packet payload (the bytes after the length prefix).
    #[must_use]
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            cursor: BinaryCursor::new(payload),
            api_key: None,
            api_version: 0,
            is_flexible: false,
        }
    }

    /// Seed the session api info, normally taken from the paired request.
    /// Request decoding calls this itself from the parsed header.
    pub fn set_api_info(&mut self, api_key: ApiKey, api_version: i16) {
        self.api_key = Some(api_key);
        self.api_version = api_version;
        self.is_flexible = api_key.is_flexible(api_version);
    }

    /// Bytes left in the payload.
    #[must_use]
    pub fn remaining(&self) -> usize { self.cursor.remaining() }

    /// The seeded api key, once known.
    #[must_use]
    pub const fn api_key(&self) -> Option<ApiKey> { self.api_key }

    /// The seeded api version.
    #[must_use]
    pub const fn api_version(&self) -> i16 { self.api_version }

    // Version-sensitive field helpers. Body-level strings switch between
    // the fixed and compact encodings on the flexible flag; header-level
    // client ids stay fixed-width in every version.

    fn extract_body_string(&mut self) -> DecodeResult<String> {
        if self.is_flexible {
            self.cursor.extract_compact_string()
        } else {
            self.cursor.extract_length_prefixed_string()
        }
    }

    fn extract_body_nullable_string(&mut self) -> DecodeResult<Option<String>> {
        if self.is_flexible {
            self.cursor.extract_compact_nullable_string()
        } else {
            self.cursor.extract_nullable_string()
        }
    }

    /// Skip a flexible-version tagged-field section: a count followed by
    /// (tag, size, bytes) triples. Tags this engine does not model are
    /// discarded wholesale.
    fn extract_tagged_fields(&mut self) -> DecodeResult<()> {
        let count = self.cursor.extract_unsigned_varint()?;
        for _ in 0..count {
            let _tag = self.cursor.extract_unsigned_varint()?;
            let size = self.cursor.extract_unsigned_varint()?;
            self.cursor.extract_bytes(size as usize)?;
        }
        Ok(())
    }

    fn maybe_extract_tagged_fields(&mut self) -> DecodeResult<()> {
        if self.is_flexible {
            self.extract_tagged_fields()?;
        }
        Ok(())
    }

    /// Fixed-count array: 32-bit signed count, `-1` absent, `0` empty.
    fn extract_array<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Option<Vec<T>>> {
        let count = self.cursor.extract_i32()?;
        if count == -1 {
            return Ok(None);
        }
        let count = usize::try_from(count).map_err(|_| DecodeError::Malformed {
            reason: "array count below -1",
        })?;
        let mut items = Vec::with_capacity(count.min(self.cursor.remaining()));
        for _ in 0..count {
            items.push(element(self)?);
        }
        Ok(Some(items))
    }

    /// Compact array: unsigned-varint `count + 1`, `0` absent.
    fn extract_compact_array<T>(
        &mut self,
        mut element: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Option<Vec<T>>> {
        let encoded = self.cursor.extract_unsigned_varint()?;
        let Some(count) = encoded.checked_sub(1) else {
            return Ok(None);
        };
        let count = count as usize;
        let mut items = Vec::with_capacity(count.min(self.cursor.remaining()));
        for _ in 0..count {
            items.push(element(self)?);
        }
        Ok(Some(items))
    }

    fn extract_body_array<T>(
        &mut self,
        element: impl FnMut(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<Vec<T>> {
        let items = if self.is_flexible {
            self.extract_compact_array(element)?
        } else {
            self.extract_array(element)?
        };
        Ok(items.unwrap_or_default())
    }

    /// Decode the request header and latch the session api info from it.
    ///
    /// # Errors
    /// Unrecognised api keys and implausible versions are
    /// [`DecodeError::Unsupported`]; a negative correlation id is
    /// [`DecodeError::Malformed`].
    pub fn extract_req_header(&mut self) -> DecodeResult<RequestHeader> {
        let raw_key = self.cursor.extract_i16()?;
        let api_key = ApiKey::from_wire(raw_key).ok_or(DecodeError::Unsupported {
            reason: "unrecognised api key",
        })?;
        let api_version = self.cursor.extract_i16()?;
        if !api_key.version_in_range(api_version) {
            return Err(DecodeError::Unsupported {
                reason: "api version outside the plausible range",
            });
        }
        self.set_api_info(api_key, api_version);
        let correlation_id = self.cursor.extract_i32()?;
        if correlation_id < 0 {
            return Err(DecodeError::Malformed {
                reason: "negative correlation id",
            });
        }
        // The client id predates flexible versions and stays fixed-width.
        let client_id = self.cursor.extract_nullable_string()?;
        self.maybe_extract_tagged_fields()?;
        Ok(RequestHeader {
            api_key,
            api_version,
            correlation_id,
            client_id,
        })
    }

    /// Decode the response header. Requires api info to have been seeded.
    ///
    /// # Errors
    /// Propagates cursor failures; a negative correlation id is
    /// [`DecodeError::Malformed`].
    pub fn extract_resp_header(&mut self) -> DecodeResult<i32> {
        let correlation_id = self.cursor.extract_i32()?;
        if correlation_id < 0 {
            return Err(DecodeError::Malformed {
                reason: "negative correlation id",
            });
        }
        self.maybe_extract_tagged_fields()?;
        Ok(correlation_id)
    }

    /// Decode one record: varint length, deltas, key and value. Record
    /// headers trail the value and are discarded via the length mark.
    ///
    /// # Errors
    /// Propagates cursor failures; a negative declared length is
    /// [`DecodeError::Malformed`].
    pub fn extract_record_message(&mut self) -> DecodeResult<RecordMessage> {
        let len = self.cursor.extract_varint()?;
        let len = usize::try_from(len).map_err(|_| DecodeError::Malformed {
            reason: "negative record length",
        })?;
        self.cursor.mark_offset(len)?;
        let _attributes = self.cursor.extract_i8()?;
        let timestamp_delta = self.cursor.extract_varlong()?;
        let offset_delta = self.cursor.extract_varint()?;
        let key = self.cursor.extract_bytes_zigzag()?;
        let value = self.cursor.extract_bytes_zigzag()?;
        self.cursor.jump_to_offset()?;
        Ok(RecordMessage {
            timestamp_delta,
            offset_delta,
            key,
            value,
        })
    }

    /// Decode one v2 record batch.
    ///
    /// # Errors
    /// Magic bytes other than 2 are [`DecodeError::Unsupported`]. A declared
    /// batch length that disagrees with the bytes the records actually
    /// consumed is [`DecodeError::Internal`]: the two length accountings
    /// come from the same producer and must agree.
    pub fn extract_record_batch(&mut self) -> DecodeResult<RecordBatch> {
        let base_offset = self.cursor.extract_i64()?;
        let batch_length = self.cursor.extract_i32()?;
        let batch_length = usize::try_from(batch_length).map_err(|_| DecodeError::Malformed {
            reason: "negative record batch length",
        })?;
        self.cursor.mark_offset(batch_length)?;
        let _partition_leader_epoch = self.cursor.extract_i32()?;
        let magic = self.cursor.extract_i8()?;
        if magic < RECORD_BATCH_MAGIC_V2 {
            return Err(DecodeError::Unsupported {
                reason: "legacy message-set magic below 2",
            });
        }
        if magic > RECORD_BATCH_MAGIC_V2 {
            return Err(DecodeError::Unsupported {
                reason: "unknown record batch magic above 2",
            });
        }
        let _crc = self.cursor.extract_i32()?;
        let attributes = self.cursor.extract_i16()?;
        let last_offset_delta = self.cursor.extract_i32()?;
        let first_timestamp = self.cursor.extract_i64()?;
        let max_timestamp = self.cursor.extract_i64()?;
        let producer_id = self.cursor.extract_i64()?;
        let producer_epoch = self.cursor.extract_i16()?;
        let base_sequence = self.cursor.extract_i32()?;
        let record_count = self.cursor.extract_i32()?;
        let record_count = usize::try_from(record_count).map_err(|_| DecodeError::Malformed {
            reason: "negative record count",
        })?;
        let mut records = Vec::with_capacity(record_count.min(self.cursor.remaining()));
        for _ in 0..record_count {
            records.push(self.extract_record_message()?);
        }
        if self.cursor.jump_to_offset()? != 0 {
            return Err(DecodeError::Internal {
                reason: "record batch length disagrees with consumed bytes",
            });
        }
        Ok(RecordBatch {
            base_offset,
            attributes,
            last_offset_delta,
            first_timestamp,
            max_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            records,
        })
    }

    /// Decode the record-batch blob of one partition: a byte length followed
    /// by back-to-back batches filling it exactly.
    fn extract_record_batches(&mut self) -> DecodeResult<Vec<RecordBatch>> {
        let size = if self.is_flexible {
            // Compact nullable bytes: varint stores length + 1, 0 is null.
            let encoded = self.cursor.extract_unsigned_varint()?;
            match encoded.checked_sub(1) {
                None => return Ok(Vec::new()),
                Some(size) => size as usize,
            }
        } else {
            let size = self.cursor.extract_i32()?;
            if size == -1 {
                return Ok(Vec::new());
            }
            usize::try_from(size).map_err(|_| DecodeError::Malformed {
                reason: "record blob length below -1",
            })?
        };
        self.cursor.mark_offset(size)?;
        let mut batches = Vec::new();
        while self.cursor.bytes_until_mark().is_some_and(|left| left > 0) {
            batches.push(self.extract_record_batch()?);
        }
        self.cursor.jump_to_offset()?;
        Ok(batches)
    }

    /// Decode a produce request body. Requires a produce request header to
    /// have been decoded first (it seeds the version gates).
    ///
    /// # Errors
    /// Propagates failures from any nested field.
    pub fn extract_produce_req(&mut self) -> DecodeResult<ProduceRequest> {
        let transactional_id = if self.api_version >= 3 {
            self.extract_body_nullable_string()?
        } else {
            None
        };
        let acks = self.cursor.extract_i16()?;
        let timeout_ms = self.cursor.extract_i32()?;
        let topics = self.extract_body_array(Self::extract_produce_req_topic)?;
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceRequest {
            transactional_id,
            acks,
            timeout_ms,
            topics,
        })
    }

    fn extract_produce_req_topic(&mut self) -> DecodeResult<ProduceReqTopic> {
        let name = self.extract_body_string()?;
        let partitions = self.extract_body_array(Self::extract_produce_req_partition)?;
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceReqTopic { name, partitions })
    }

    fn extract_produce_req_partition(&mut self) -> DecodeResult<ProduceReqPartition> {
        let index = self.cursor.extract_i32()?;
        let batches = self.extract_record_batches()?;
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceReqPartition { index, batches })
    }

    /// Decode a produce response body with the seeded api info. Every
    /// version threshold is an explicit conditional.
    ///
    /// # Errors
    /// Propagates failures from any nested field.
    pub fn extract_produce_resp(&mut self) -> DecodeResult<ProduceResponse> {
        let topics = self.extract_body_array(Self::extract_produce_resp_topic)?;
        let throttle_time_ms = if self.api_version >= 1 {
            self.cursor.extract_i32()?
        } else {
            0
        };
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceResponse {
            topics,
            throttle_time_ms,
        })
    }

    fn extract_produce_resp_topic(&mut self) -> DecodeResult<ProduceRespTopic> {
        let name = self.extract_body_string()?;
        let partitions = self.extract_body_array(Self::extract_produce_resp_partition)?;
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceRespTopic { name, partitions })
    }

    fn extract_produce_resp_partition(&mut self) -> DecodeResult<ProduceRespPartition> {
        let index = self.cursor.extract_i32()?;
        let error_code = self.cursor.extract_i16()?;
        let base_offset = self.cursor.extract_i64()?;
        let log_append_time_ms = if self.api_version >= 2 {
            self.cursor.extract_i64()?
        } else {
            -1
        };
        let log_start_offset = if self.api_version >= 5 {
            self.cursor.extract_i64()?
        } else {
            -1
        };
        let (record_errors, error_message) = if self.api_version >= 8 {
            let errors = self.extract_body_array(Self::extract_record_error)?;
            let message = self.extract_body_nullable_string()?;
            (errors, message)
        } else {
            (Vec::new(), None)
        };
        self.maybe_extract_tagged_fields()?;
        Ok(ProduceRespPartition {
            index,
            error_code,
            base_offset,
            log_append_time_ms,
            log_start_offset,
            record_errors,
            error_message,
        })
    }

    fn extract_record_error(&mut self) -> DecodeResult<RecordError> {
        let batch_index = self.cursor.extract_i32()?;
        let error_message = self.extract_body_nullable_string()?;
        self.maybe_extract_tagged_fields()?;
        Ok(RecordError {
            batch_index,
            error_message,
        })
    }
}

#[cfg(test)]
#[path = "decoder_tests.rs"]
mod tests;
