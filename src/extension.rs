//! ESNIKeys extensions and the AddressSet encoder
//!
//! An extension on the wire is `outer_len(u16) | type(u16) | inner_len(u16)
//! | value`. Generic records carry `outer_len = inner_len + 4`. The
//! AddressSet record (type 0x1001) keeps the header bytes deployed
//! ESNIKeys publish: the high byte of `outer_len` comes from
//! `inner_len + 4` and the low byte from `inner_len + 3`. Consumers
//! compare these bytes, so the two conventions stay separate.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::info;

use crate::codec::TlvWriter;
use crate::{Error, Result};

/// Extension type for the AddressSet extension
pub const ADDRESS_SET_EXTENSION_TYPE: u16 = 0x1001;

/// Maximum number of AddressSet entries
pub const MAX_ADDRESSES: usize = 16;

/// AddressSet tag for a 4-byte IPv4 value
pub const ADDRESS_V4_TAG: u8 = 0x04;

/// AddressSet tag for a 16-byte IPv6 value
pub const ADDRESS_V6_TAG: u8 = 0x06;

/// Address family as decided by [`classify_address`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// Lexical family check: a literal containing ':' is IPv6, anything else
/// is IPv4. Literals may come from a file, so the resolver's family is not
/// available here.
pub fn classify_address(literal: &str) -> AddressFamily {
    if literal.contains(':') {
        AddressFamily::V6
    } else {
        AddressFamily::V4
    }
}

/// One AddressSet entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressEntry {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl AddressEntry {
    /// Parse a literal for the family [`classify_address`] assigns it
    pub fn parse(literal: &str) -> Result<Self> {
        let parsed = match classify_address(literal) {
            AddressFamily::V6 => literal.parse().map(AddressEntry::V6).ok(),
            AddressFamily::V4 => literal.parse().map(AddressEntry::V4).ok(),
        };
        parsed.ok_or_else(|| Error::AddressParse(literal.to_string()))
    }

    pub fn family(&self) -> AddressFamily {
        match self {
            AddressEntry::V4(_) => AddressFamily::V4,
            AddressEntry::V6(_) => AddressFamily::V6,
        }
    }

    /// `tag || address bytes`
    pub fn encode(&self, out: &mut Vec<u8>) {
        match self {
            AddressEntry::V4(addr) => {
                out.push(ADDRESS_V4_TAG);
                out.extend_from_slice(&addr.octets());
            }
            AddressEntry::V6(addr) => {
                out.push(ADDRESS_V6_TAG);
                out.extend_from_slice(&addr.octets());
            }
        }
    }
}

/// Remove exact-duplicate literals, keeping first-seen order.
///
/// Fails once a 17th distinct literal shows up.
pub fn dedup_addresses<I, S>(literals: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut unique: Vec<String> = Vec::new();
    for literal in literals {
        let literal = literal.as_ref();
        if unique.iter().any(|seen| seen == literal) {
            continue;
        }
        if unique.len() == MAX_ADDRESSES {
            return Err(Error::TooManyAddresses {
                count: unique.len() + 1,
                max: MAX_ADDRESSES,
            });
        }
        unique.push(literal.to_string());
    }
    Ok(unique)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthConvention {
    Generic,
    AddressSet,
}

/// A single extension, ready to be framed into a structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionRecord {
    ext_type: u16,
    value: Vec<u8>,
    convention: LengthConvention,
}

/// Largest value whose framed `outer_len = inner_len + 4` fits a u16
const MAX_EXTENSION_VALUE_LEN: usize = u16::MAX as usize - 4;

fn check_value_len(len: usize) -> Result<()> {
    if len > MAX_EXTENSION_VALUE_LEN {
        return Err(Error::ExtensionTooLarge(len));
    }
    Ok(())
}

impl ExtensionRecord {
    /// Generic record framed with `outer_len = inner_len + 4`
    pub fn new(ext_type: u16, value: Vec<u8>) -> Result<Self> {
        check_value_len(value.len())?;
        Ok(Self {
            ext_type,
            value,
            convention: LengthConvention::Generic,
        })
    }

    /// Build the AddressSet extension from textual addresses.
    ///
    /// Duplicates are dropped before encoding.
    pub fn address_set<S: AsRef<str>>(literals: &[S]) -> Result<Self> {
        let unique = dedup_addresses(literals)?;

        let mut value = Vec::with_capacity(unique.len() * 17);
        for (i, literal) in unique.iter().enumerate() {
            let entry = AddressEntry::parse(literal)?;
            match entry.family() {
                AddressFamily::V4 => info!("IPv4 Address{}: {}", i, literal),
                AddressFamily::V6 => info!("IPv6 Address{}: {}", i, literal),
            }
            entry.encode(&mut value);
        }

        check_value_len(value.len())?;
        Ok(Self {
            ext_type: ADDRESS_SET_EXTENSION_TYPE,
            value,
            convention: LengthConvention::AddressSet,
        })
    }

    /// Rebuild a record read off the wire, picking the framing by type
    pub(crate) fn from_parts(ext_type: u16, value: Vec<u8>) -> Result<Self> {
        check_value_len(value.len())?;
        let convention = if ext_type == ADDRESS_SET_EXTENSION_TYPE {
            LengthConvention::AddressSet
        } else {
            LengthConvention::Generic
        };
        Ok(Self {
            ext_type,
            value,
            convention,
        })
    }

    pub fn ext_type(&self) -> u16 {
        self.ext_type
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn is_address_set(&self) -> bool {
        self.ext_type == ADDRESS_SET_EXTENSION_TYPE
    }

    /// Number of bytes [`encode`](Self::encode) appends
    pub fn encoded_len(&self) -> usize {
        6 + self.value.len()
    }

    /// Append `outer_len | type | inner_len | value`
    pub fn encode(&self, w: &mut TlvWriter) -> Result<()> {
        check_value_len(self.value.len())?;
        let n = self.value.len() as u16;
        let outer = (n + 4).to_be_bytes();
        let outer = match self.convention {
            LengthConvention::Generic => outer,
            // Low byte counts one less than the generic framing
            LengthConvention::AddressSet => [outer[0], (n + 3) as u8],
        };
        let mut framed = Vec::with_capacity(self.encoded_len());
        framed.extend_from_slice(&outer);
        framed.extend_from_slice(&self.ext_type.to_be_bytes());
        framed.extend_from_slice(&n.to_be_bytes());
        framed.extend_from_slice(&self.value);
        w.append_bytes(&framed)
    }
}
