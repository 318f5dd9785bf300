//! Bounded TLV writer and reader
//!
//! [`TlvWriter`] is the only way bytes get into a structure: every append
//! checks the fixed capacity first and fails with
//! [`Error::BufferOverflow`] instead of growing. [`TlvReader`] is the
//! matching bounds-checked cursor used when parsing a structure back.

use crate::{CipherSuiteList, Error, KeyShareEntry, Result, X25519_KEY_LEN};

/// Append-only, capacity-bounded byte writer
#[derive(Debug, Clone)]
pub struct TlvWriter {
    buf: Vec<u8>,
    capacity: usize,
}

impl TlvWriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn reserve(&self, additional: usize) -> Result<()> {
        let needed = self.buf.len() + additional;
        if needed > self.capacity {
            return Err(Error::BufferOverflow {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    pub fn append_u8(&mut self, value: u8) -> Result<()> {
        self.reserve(1)?;
        self.buf.push(value);
        Ok(())
    }

    pub fn append_u16_be(&mut self, value: u16) -> Result<()> {
        self.append_bytes(&value.to_be_bytes())
    }

    pub fn append_u32_be(&mut self, value: u32) -> Result<()> {
        self.append_bytes(&value.to_be_bytes())
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.reserve(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    pub fn append_zeros(&mut self, count: usize) -> Result<()> {
        self.reserve(count)?;
        self.buf.resize(self.buf.len() + count, 0);
        Ok(())
    }

    /// Write `len(bytes)` as u16 big-endian followed by `bytes`
    pub fn length_prefixed(&mut self, bytes: &[u8]) -> Result<()> {
        let len = u16::try_from(bytes.len()).map_err(|_| Error::LengthOverflow(bytes.len()))?;
        // Check the whole write up front so a failure leaves nothing behind
        self.reserve(2 + bytes.len())?;
        self.append_u16_be(len)?;
        self.append_bytes(bytes)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked cursor over an encoded structure
#[derive(Debug, Clone)]
pub struct TlvReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> TlvReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Next `len` bytes without consuming them
    pub fn peek(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.offset..self.offset + len)
    }

    pub fn read_bytes(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::Decode(format!("insufficient data for {}", what)));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    pub fn read_u16(&mut self, what: &str) -> Result<u16> {
        let b = self.read_bytes(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn read_u64(&mut self, what: &str) -> Result<u64> {
        let b = self.read_bytes(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    /// Read a u16 length followed by that many bytes
    pub fn read_length_prefixed(&mut self, what: &str) -> Result<&'a [u8]> {
        let len = self.read_u16(what)? as usize;
        self.read_bytes(len, what)
    }
}

impl KeyShareEntry {
    /// Encode as `keys<4..2^16-1>` holding this single entry
    pub fn encode_list(&self, w: &mut TlvWriter) -> Result<()> {
        // group(2) + key_exchange length(2) + key
        w.append_u16_be((4 + X25519_KEY_LEN) as u16)?;
        w.append_u16_be(self.group)?;
        w.length_prefixed(&self.key_exchange)
    }

    /// Decode a single-entry `keys` list
    pub fn decode_list(r: &mut TlvReader<'_>) -> Result<Self> {
        let list = r.read_length_prefixed("keys")?;
        let mut inner = TlvReader::new(list);
        let group = inner.read_u16("key share group")?;
        let key = inner.read_length_prefixed("key_exchange")?;
        if !inner.is_empty() {
            return Err(Error::Decode(format!(
                "keys list carries {} trailing bytes",
                inner.remaining()
            )));
        }
        let key_exchange: [u8; X25519_KEY_LEN] =
            key.try_into().map_err(|_| Error::InvalidKeyLength {
                expected: X25519_KEY_LEN,
                actual: key.len(),
            })?;
        Ok(Self {
            group,
            key_exchange,
        })
    }
}

impl CipherSuiteList {
    /// Encode as `cipher_suites<2..2^16-2>`
    pub fn encode(&self, w: &mut TlvWriter) -> Result<()> {
        let mut raw = Vec::with_capacity(self.0.len() * 2);
        for suite in &self.0 {
            raw.extend_from_slice(&suite.to_be_bytes());
        }
        w.length_prefixed(&raw)
    }

    pub fn decode(r: &mut TlvReader<'_>) -> Result<Self> {
        let raw = r.read_length_prefixed("cipher_suites")?;
        if raw.is_empty() || raw.len() % 2 != 0 {
            return Err(Error::Decode(format!(
                "invalid cipher_suites length: {}",
                raw.len()
            )));
        }
        Ok(Self(
            raw.chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_overflow() {
        let mut w = TlvWriter::with_capacity(3);
        w.append_u16_be(0xff01).unwrap();
        w.append_u8(1).unwrap();
        assert!(matches!(
            w.append_u8(2),
            Err(Error::BufferOverflow {
                needed: 4,
                capacity: 3
            })
        ));
        assert_eq!(w.as_slice(), &[0xff, 0x01, 0x01]);
    }

    #[test]
    fn test_length_prefixed_is_atomic() {
        let mut w = TlvWriter::with_capacity(4);
        assert!(w.length_prefixed(&[1, 2, 3]).is_err());
        assert!(w.is_empty());

        w.length_prefixed(&[1, 2]).unwrap();
        assert_eq!(w.as_slice(), &[0x00, 0x02, 0x01, 0x02]);
    }

    #[test]
    fn test_length_prefixed_rejects_long_field() {
        let mut w = TlvWriter::with_capacity(0x20000);
        let big = vec![0u8; 0x10000];
        assert!(matches!(
            w.length_prefixed(&big),
            Err(Error::LengthOverflow(0x10000))
        ));
    }

    #[test]
    fn test_key_share_encoding() {
        let entry = KeyShareEntry::x25519(&[0xab; 32]).unwrap();
        let mut w = TlvWriter::with_capacity(64);
        entry.encode_list(&mut w).unwrap();

        let bytes = w.into_inner();
        assert_eq!(&bytes[..6], &[0x00, 0x24, 0x00, 0x1d, 0x00, 0x20]);
        assert_eq!(bytes.len(), 38);

        let decoded = KeyShareEntry::decode_list(&mut TlvReader::new(&bytes)).unwrap();
        assert_eq!(decoded, entry);
    }

    #[test]
    fn test_cipher_suites_encoding() {
        let mut w = TlvWriter::with_capacity(8);
        CipherSuiteList::default().encode(&mut w).unwrap();
        assert_eq!(w.as_slice(), &[0x00, 0x02, 0x13, 0x01]);
    }

    #[test]
    fn test_reader_short_input() {
        let mut r = TlvReader::new(&[0x00, 0x05, 0x01]);
        let err = r.read_length_prefixed("public_name").unwrap_err();
        assert!(err.to_string().contains("public_name"));
    }
}
