//! Little-endian framing of requests and responses.
//!
//! Request: `{msg_type, request_id, target}` then the payload.
//! Response: `{msg_type, request_id, result, timestamp_ms}` then the
//! payload. Every field is a little-endian `u32` unless noted.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{LinkError, LinkResult};

pub const REQUEST_HEADER_LEN: usize = 12;
pub const RESPONSE_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestHeader {
    pub msg_type: u32,
    pub request_id: u32,
    pub target: u32,
}

impl RequestHeader {
    /// Split a request into its header and payload.
    pub fn decode(bytes: &[u8]) -> LinkResult<(Self, &[u8])> {
        if bytes.len() < REQUEST_HEADER_LEN {
            return Err(LinkError::Truncated {
                what: "request header",
                needed: REQUEST_HEADER_LEN,
                len: bytes.len(),
            });
        }
        let header = Self {
            msg_type: LittleEndian::read_u32(&bytes[0..4]),
            request_id: LittleEndian::read_u32(&bytes[4..8]),
            target: LittleEndian::read_u32(&bytes[8..12]),
        };
        Ok((header, &bytes[REQUEST_HEADER_LEN..]))
    }

    /// Encode a request with `payload` appended.
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0; REQUEST_HEADER_LEN];
        LittleEndian::write_u32(&mut bytes[0..4], self.msg_type);
        LittleEndian::write_u32(&mut bytes[4..8], self.request_id);
        LittleEndian::write_u32(&mut bytes[8..12], self.target);
        bytes.extend_from_slice(payload);
        bytes
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseHeader {
    pub msg_type: u32,
    pub request_id: u32,
    pub result: u32,
    pub timestamp_ms: u32,
}

impl ResponseHeader {
    pub fn success(&self) -> bool {
        self.result != 0
    }

    pub fn decode(bytes: &[u8]) -> LinkResult<(Self, &[u8])> {
        if bytes.len() < RESPONSE_HEADER_LEN {
            return Err(LinkError::Truncated {
                what: "response header",
                needed: RESPONSE_HEADER_LEN,
                len: bytes.len(),
            });
        }
        let header = Self {
            msg_type: LittleEndian::read_u32(&bytes[0..4]),
            request_id: LittleEndian::read_u32(&bytes[4..8]),
            result: LittleEndian::read_u32(&bytes[8..12]),
            timestamp_ms: LittleEndian::read_u32(&bytes[12..16]),
        };
        Ok((header, &bytes[RESPONSE_HEADER_LEN..]))
    }
}

/// Sequential reader over a payload.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> LinkResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(LinkError::Truncated {
                what,
                needed: self.pos + n,
                len: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self, what: &'static str) -> LinkResult<u8> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16(&mut self, what: &'static str) -> LinkResult<u16> {
        Ok(LittleEndian::read_u16(self.take(2, what)?))
    }

    pub fn u32(&mut self, what: &'static str) -> LinkResult<u32> {
        Ok(LittleEndian::read_u32(self.take(4, what)?))
    }

    pub fn i32(&mut self, what: &'static str) -> LinkResult<i32> {
        Ok(LittleEndian::read_i32(self.take(4, what)?))
    }

    pub fn f32(&mut self, what: &'static str) -> LinkResult<f32> {
        Ok(LittleEndian::read_f32(self.take(4, what)?))
    }

    pub fn bytes(&mut self, n: usize, what: &'static str) -> LinkResult<&'a [u8]> {
        self.take(n, what)
    }

    /// Everything not read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        rest
    }
}

/// Outbound message under construction.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    pub fn response(msg_type: u32, request_id: u32, success: bool, timestamp_ms: u32) -> Self {
        let mut frame = Self {
            bytes: Vec::with_capacity(64),
        };
        frame
            .put_u32(msg_type)
            .put_u32(request_id)
            .put_u32(u32::from(success))
            .put_u32(timestamp_ms);
        frame
    }

    pub fn put_u8(&mut self, v: u8) -> &mut Self {
        self.bytes.push(v);
        self
    }

    pub fn put_u16(&mut self, v: u16) -> &mut Self {
        let mut buf = [0; 2];
        LittleEndian::write_u16(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn put_u32(&mut self, v: u32) -> &mut Self {
        let mut buf = [0; 4];
        LittleEndian::write_u32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn put_i32(&mut self, v: i32) -> &mut Self {
        let mut buf = [0; 4];
        LittleEndian::write_i32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn put_f32(&mut self, v: f32) -> &mut Self {
        let mut buf = [0; 4];
        LittleEndian::write_f32(&mut buf, v);
        self.bytes.extend_from_slice(&buf);
        self
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Little-endian payload builder for requests.
pub fn payload(words: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0; words.len() * 4];
    LittleEndian::write_u32_into(words, &mut bytes);
    bytes
}
