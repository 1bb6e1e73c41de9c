//! Response log framing
//!
//! Each stored response is one frame:
//!
//! ```text
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of payload)
//! +------------------+
//! | Payload          | (JSON-encoded response)
//! +------------------+
//! ```
//!
//! A frame cut short by a crash while appending is a torn tail: reading stops
//! there. A complete frame whose checksum does not match is corruption.

use std::io::{self, Read};

use super::errors::{StorageError, StorageResult};

/// Bytes before the payload
pub const FRAME_HEADER_LEN: u64 = 8;

/// Upper bound on a single payload, guards against garbage length prefixes
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// Encode a payload into a complete frame.
///
/// Payloads over `MAX_PAYLOAD_LEN` are refused: the reader would treat the
/// frame as corruption.
pub fn encode_frame(payload: &[u8]) -> StorageResult<Vec<u8>> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_PAYLOAD_LEN)
        .ok_or(StorageError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        })?;

    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN as usize + payload.len());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&crc32fast::hash(payload).to_le_bytes());
    buf.extend_from_slice(payload);
    Ok(buf)
}

/// Sequential frame reader
pub struct FrameReader<R> {
    inner: R,
    offset: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, offset: 0 }
    }

    /// Byte offset just past the last complete frame read
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read the next payload.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(payload))` for a complete, checksum-valid frame
    /// - `Ok(None)` at end of log or at a torn tail
    /// - `Err(Corrupted)` when a complete frame fails its checksum
    pub fn read_next(&mut self) -> StorageResult<Option<Vec<u8>>> {
        let mut header = [0u8; FRAME_HEADER_LEN as usize];
        if !self.fill(&mut header)? {
            return Ok(None);
        }

        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if len > MAX_PAYLOAD_LEN {
            return Err(StorageError::Corrupted {
                offset: self.offset,
                reason: format!("payload length {} exceeds {}", len, MAX_PAYLOAD_LEN),
            });
        }

        let mut payload = vec![0u8; len as usize];
        if !self.fill(&mut payload)? {
            return Ok(None);
        }

        let actual = crc32fast::hash(&payload);
        if actual != expected {
            return Err(StorageError::Corrupted {
                offset: self.offset,
                reason: format!("checksum mismatch: expected {:08x}, got {:08x}", expected, actual),
            });
        }

        self.offset += FRAME_HEADER_LEN + u64::from(len);
        Ok(Some(payload))
    }

    /// Fill `buf` completely. Returns false if the input ends first.
    fn fill(&mut self, buf: &mut [u8]) -> StorageResult<bool> {
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
            Err(e) => Err(StorageError::io("Failed to read response log", e)),
        }
    }
}
