use crate::{Error, Result};

/// ESNIKeys version for draft-ietf-tls-esni-02
pub const ESNI_DRAFT_02: u16 = 0xff01;

/// ESNIKeys version for draft-ietf-tls-esni-03
pub const ESNI_DRAFT_03: u16 = 0xff02;

/// ECHOConfig version for draft-ietf-tls-esni-04
pub const ECHO_DRAFT_04: u16 = 0xff03;

/// TLS NamedGroup for X25519 (RFC 8446)
pub const X25519_GROUP: u16 = 0x001d;

/// X25519 public key length
pub const X25519_KEY_LEN: usize = 32;

/// TLS CipherSuite TLS_AES_128_GCM_SHA256 (RFC 8446)
pub const TLS_AES_128_GCM_SHA256: u16 = 0x1301;

/// HPKE KEM DHKEM(X25519, HKDF-SHA256)
pub const DHKEM_X25519_SHA256: u16 = 0x0020;

/// padded_length written by every version (260, same as deployed ESNIKeys)
pub const PADDED_LENGTH: u16 = 0x0104;

/// Offset of the checksum field, right after the version tag
pub const CHECKSUM_OFFSET: usize = 2;

/// Length of the checksum field
pub const CHECKSUM_LEN: usize = 4;

/// Fixed capacity of every structure buffer
pub const MAX_STRUCTURE_LEN: usize = 1024;

/// Longer than this won't fit in SNI
pub const MAX_PUBLIC_NAME_LEN: usize = 254;

/// DNS RRTYPE used for ESNI zone fragments
pub const ESNI_RRTYPE: u16 = 65439;

/// Which artifact a version produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureKind {
    EsniKeys,
    EchoConfig,
}

/// Presence rule for the public_name field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameField {
    /// The layout has no public_name
    Absent,
    /// Always written, length-prefixed
    Required,
    /// Written only when a non-empty name is supplied
    Optional,
}

/// Per-version layout descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub kind: StructureKind,
    pub checksum: bool,
    pub public_name: NameField,
    pub kem_id: bool,
    pub validity_window: bool,
    pub address_set: bool,
}

/// Structure version
///
/// Closed set: every layout decision matches on this enum, so a new
/// version cannot be added without the compiler pointing at each site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// 0xff01, ESNIKeys (draft-02)
    V1,
    /// 0xff02, ESNIKeys with public_name (draft-03)
    V2,
    /// 0xff03, ECHOConfig (draft-04)
    V3,
}

impl Version {
    /// Wire tag
    pub fn tag(self) -> u16 {
        match self {
            Version::V1 => ESNI_DRAFT_02,
            Version::V2 => ESNI_DRAFT_03,
            Version::V3 => ECHO_DRAFT_04,
        }
    }

    pub fn layout(self) -> Layout {
        match self {
            Version::V1 => Layout {
                kind: StructureKind::EsniKeys,
                checksum: true,
                public_name: NameField::Absent,
                kem_id: false,
                validity_window: true,
                address_set: false,
            },
            Version::V2 => Layout {
                kind: StructureKind::EsniKeys,
                checksum: true,
                public_name: NameField::Required,
                kem_id: false,
                validity_window: true,
                address_set: true,
            },
            Version::V3 => Layout {
                kind: StructureKind::EchoConfig,
                checksum: false,
                public_name: NameField::Optional,
                kem_id: true,
                validity_window: false,
                address_set: false,
            },
        }
    }

    pub fn kind(self) -> StructureKind {
        self.layout().kind
    }
}

impl TryFrom<u16> for Version {
    type Error = Error;

    fn try_from(tag: u16) -> Result<Self> {
        match tag {
            ESNI_DRAFT_02 => Ok(Version::V1),
            ESNI_DRAFT_03 => Ok(Version::V2),
            ECHO_DRAFT_04 => Ok(Version::V3),
            other => Err(Error::UnsupportedVersion(other)),
        }
    }
}

impl From<Version> for u16 {
    fn from(version: Version) -> u16 {
        version.tag()
    }
}

/// Map a version string like `0xff01` or `65281` to its tag.
///
/// Follows `strtol(arg, NULL, 0)`: `0x` selects hex, a leading `0` octal,
/// anything else decimal, and parsing stops at the first invalid digit.
/// Values outside `1..0xffff` map to 0, which no layout accepts.
pub fn parse_version_tag(arg: &str) -> u16 {
    let s = arg.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, rest)
    } else if s.len() > 1 && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };

    let end = digits
        .char_indices()
        .find(|(_, c)| !c.is_digit(radix))
        .map(|(i, _)| i)
        .unwrap_or(digits.len());
    if end == 0 || negative {
        return 0;
    }

    match u64::from_str_radix(&digits[..end], radix) {
        Ok(v) if v > 0 && v < 0xffff => v as u16,
        _ => 0,
    }
}

/// KeyShareEntry: (group, key_exchange)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyShareEntry {
    pub group: u16,
    pub key_exchange: [u8; X25519_KEY_LEN],
}

impl KeyShareEntry {
    /// X25519 entry; the key must be exactly 32 bytes
    pub fn x25519(public_key: &[u8]) -> Result<Self> {
        let key_exchange: [u8; X25519_KEY_LEN] =
            public_key
                .try_into()
                .map_err(|_| Error::InvalidKeyLength {
                    expected: X25519_KEY_LEN,
                    actual: public_key.len(),
                })?;
        Ok(Self {
            group: X25519_GROUP,
            key_exchange,
        })
    }
}

/// Ordered list of TLS cipher suites
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherSuiteList(pub Vec<u16>);

impl Default for CipherSuiteList {
    fn default() -> Self {
        Self(vec![TLS_AES_128_GCM_SHA256])
    }
}

/// Not-before / not-after pair, Unix epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub not_before: u64,
    pub not_after: u64,
}
