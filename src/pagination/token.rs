//! Page token codec
//!
//! A page token is the protobuf wire encoding of the message
//! `{ int64 start = 1; int32 size = 2; }`, base64 encoded with the standard
//! alphabet. Zero-valued fields are omitted, exactly as a protobuf runtime
//! would do, so tokens stay interchangeable with protobuf-speaking clients.
//!
//! The token is not a secret and carries no authorization data: it is only
//! self-describing, not tamper-proof.

use crate::error::{Error, Result};
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine as _;
use bytes::{Buf, BufMut, BytesMut};

const START_FIELD: u64 = 1;
const SIZE_FIELD: u64 = 2;
const WIRE_TYPE_VARINT: u64 = 0;
const MAX_VARINT_LEN: usize = 10;

/// Cursor into a stable, ordered result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageToken {
    /// Zero-based offset of the first item of the next page
    pub start: i64,
    /// Page size that produced this token
    pub size: i32,
}

impl PageToken {
    /// Create a new page token
    pub fn new(start: i64, size: i32) -> Self {
        Self { start, size }
    }

    /// Encode this token into its opaque string form
    ///
    /// Encoding is deterministic: the same `(start, size)` always yields the
    /// same string.
    pub fn encode(&self) -> String {
        let mut buf = BytesMut::with_capacity(2 * (1 + MAX_VARINT_LEN));

        if self.start != 0 {
            put_varint(&mut buf, START_FIELD << 3 | WIRE_TYPE_VARINT);
            put_varint(&mut buf, self.start as u64);
        }
        if self.size != 0 {
            // int32 is sign-extended to 64 bits on the wire
            put_varint(&mut buf, SIZE_FIELD << 3 | WIRE_TYPE_VARINT);
            put_varint(&mut buf, i64::from(self.size) as u64);
        }

        STANDARD.encode(&buf)
    }

    /// Decode a token previously produced by [`PageToken::encode`]
    ///
    /// The empty string is not a token; callers treat it as "first page"
    /// before ever reaching this function.
    pub fn decode(token: &str) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::malformed_token("empty page token"));
        }

        let raw = STANDARD
            .decode(token)
            .or_else(|_| URL_SAFE.decode(token))
            .map_err(|e| Error::malformed_token(format!("invalid base64: {e}")))?;

        let mut buf = raw.as_slice();
        let mut decoded = PageToken::default();

        while buf.has_remaining() {
            let key = get_varint(&mut buf)?;
            let (field, wire_type) = (key >> 3, key & 0x7);

            if wire_type != WIRE_TYPE_VARINT {
                return Err(Error::malformed_token(format!(
                    "unexpected wire type {wire_type} for field {field}"
                )));
            }

            let value = get_varint(&mut buf)?;
            match field {
                START_FIELD => decoded.start = value as i64,
                SIZE_FIELD => {
                    decoded.size = i32::try_from(value as i64)
                        .map_err(|_| Error::malformed_token("page size out of range"))?;
                }
                other => {
                    return Err(Error::malformed_token(format!("unexpected field {other}")));
                }
            }
        }

        decoded.validate()?;
        Ok(decoded)
    }

    /// A negative offset could read rows outside the scoped range, so it is
    /// rejected instead of clamped.
    fn validate(&self) -> Result<()> {
        if self.start < 0 {
            return Err(Error::malformed_token("negative start offset"));
        }
        if self.size <= 0 {
            return Err(Error::malformed_token("page size must be positive"));
        }
        Ok(())
    }
}

fn put_varint(buf: &mut BytesMut, mut value: u64) {
    while value >= 0x80 {
        buf.put_u8((value as u8 & 0x7f) | 0x80);
        value >>= 7;
    }
    buf.put_u8(value as u8);
}

fn get_varint(buf: &mut &[u8]) -> Result<u64> {
    let mut value = 0u64;

    for i in 0..MAX_VARINT_LEN {
        if !buf.has_remaining() {
            return Err(Error::malformed_token("truncated varint"));
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    Err(Error::malformed_token("varint too long"))
}
