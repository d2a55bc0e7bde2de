//! TLS record layer header.
//!
//! Record layer framing (RFC 8446 §5.1):
//!
//! ```text
//! +------+---------+---------+---------------------+
//! | type | version (2 BE)    | length (2 BE)       |  payload (length bytes)
//! +------+---------+---------+---------------------+
//! ```

/// Size of a record header on the wire.
pub const HEADER_SIZE: usize = 5;

/// Content type of handshake records.
pub const CONTENT_TYPE_HANDSHAKE: u8 = 22;

/// Largest record payload that may be split.
///
/// Matches the protocol's own plaintext fragment ceiling (2^14), which also
/// bounds how much the pull path ever allocates.
pub const MAX_FRAGMENT_PAYLOAD: usize = 1 << 14;

/// Decoded record header. `version` is opaque and copied verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordHeader {
    pub record_type: u8,
    pub version: [u8; 2],
    pub length: u16,
}

impl RecordHeader {
    /// Decode a header. Any five bytes decode; eligibility is judged elsewhere.
    pub fn decode(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self {
            record_type: bytes[0],
            version: [bytes[1], bytes[2]],
            length: u16::from_be_bytes([bytes[3], bytes[4]]),
        }
    }

    /// Decode from the front of `data`, or `None` when fewer than
    /// [`HEADER_SIZE`] bytes are available.
    pub fn peek(data: &[u8]) -> Option<Self> {
        let head: &[u8; HEADER_SIZE] = data.get(..HEADER_SIZE)?.try_into().ok()?;
        Some(Self::decode(head))
    }

    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let len = self.length.to_be_bytes();
        [self.record_type, self.version[0], self.version[1], len[0], len[1]]
    }

    /// Same type and version, different length.
    pub fn with_length(&self, length: u16) -> Self {
        Self { length, ..*self }
    }

    pub fn is_handshake(&self) -> bool {
        self.record_type == CONTENT_TYPE_HANDSHAKE
    }

    pub fn payload_len(&self) -> usize {
        usize::from(self.length)
    }
}
