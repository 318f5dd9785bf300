//! Assembled structures and their two-phase lifecycle
//!
//! A [`ConfigStructure`] leaves the builder as `ConfigStructure<Unfinalized>`:
//! every field is in place and, for ESNIKeys, the checksum field holds four
//! zero bytes. [`ConfigStructure::finalize`] patches the checksum in and is
//! the only way to obtain a `ConfigStructure<Finalized>`, which is what the
//! renderers accept. Nothing mutates a finalized structure.
//!
//! [`ParsedConfig`] reads any of the three layouts back into fields.

use std::marker::PhantomData;

use crate::checksum::{patch_checksum, DigestProvider};
use crate::codec::TlvReader;
use crate::{
    CipherSuiteList, Error, ExtensionRecord, KeyShareEntry, NameField, Result, StructureKind,
    ValidityWindow, Version, CHECKSUM_LEN, X25519_GROUP, X25519_KEY_LEN,
};

/// State marker: fields written, checksum not yet applied
#[derive(Debug)]
pub struct Unfinalized;

/// State marker: structure complete and read-only
#[derive(Debug)]
pub struct Finalized;

/// Encoded ESNIKeys or ECHOConfig
#[derive(Debug)]
pub struct ConfigStructure<State = Finalized> {
    version: Version,
    bytes: Vec<u8>,
    _state: PhantomData<State>,
}

impl<State> ConfigStructure<State> {
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn kind(&self) -> StructureKind {
        self.version.kind()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl ConfigStructure<Unfinalized> {
    pub(crate) fn new(version: Version, bytes: Vec<u8>) -> Self {
        Self {
            version,
            bytes,
            _state: PhantomData,
        }
    }

    /// Bytes as assembled, checksum field still zero
    pub fn unchecked_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Apply the checksum (ESNIKeys only) and seal the structure
    pub fn finalize<D>(mut self, digest: &D) -> Result<ConfigStructure<Finalized>>
    where
        D: DigestProvider + ?Sized,
    {
        if self.version.layout().checksum {
            patch_checksum(&mut self.bytes, digest)?;
        }
        tracing::debug!(
            version = self.version.tag(),
            len = self.bytes.len(),
            "finalized: {}",
            hex::encode(&self.bytes)
        );
        Ok(ConfigStructure {
            version: self.version,
            bytes: self.bytes,
            _state: PhantomData,
        })
    }
}

impl ConfigStructure<Finalized> {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl AsRef<[u8]> for ConfigStructure<Finalized> {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Fields read back from an encoded structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConfig {
    pub version: Version,
    pub checksum: Option<[u8; CHECKSUM_LEN]>,
    pub public_name: Option<Vec<u8>>,
    pub key_share: KeyShareEntry,
    pub kem_id: Option<u16>,
    pub cipher_suites: CipherSuiteList,
    pub padded_length: u16,
    pub validity: Option<ValidityWindow>,
    pub extensions: Vec<ExtensionRecord>,
}

/// First bytes of an X25519 `keys` list: length 0x0024, group 0x001d
fn starts_with_key_share(r: &TlvReader<'_>) -> bool {
    let list_len = (4 + X25519_KEY_LEN) as u16;
    let mut prefix = [0u8; 4];
    prefix[..2].copy_from_slice(&list_len.to_be_bytes());
    prefix[2..].copy_from_slice(&X25519_GROUP.to_be_bytes());
    r.peek(4) == Some(&prefix[..])
}

impl ParsedConfig {
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = TlvReader::new(data);

        let version = Version::try_from(r.read_u16("version")?)?;
        let layout = version.layout();

        let checksum = if layout.checksum {
            let mut cksum = [0u8; CHECKSUM_LEN];
            cksum.copy_from_slice(r.read_bytes(CHECKSUM_LEN, "checksum")?);
            Some(cksum)
        } else {
            None
        };

        let public_name = match layout.public_name {
            NameField::Absent => None,
            NameField::Required => Some(r.read_length_prefixed("public_name")?.to_vec()),
            NameField::Optional if starts_with_key_share(&r) => None,
            NameField::Optional => Some(r.read_length_prefixed("public_name")?.to_vec()),
        };

        let key_share = KeyShareEntry::decode_list(&mut r)?;

        let kem_id = if layout.kem_id {
            Some(r.read_u16("kem_id")?)
        } else {
            None
        };

        let cipher_suites = CipherSuiteList::decode(&mut r)?;
        let padded_length = r.read_u16("padded_length")?;

        let validity = if layout.validity_window {
            Some(ValidityWindow {
                not_before: r.read_u64("not_before")?,
                not_after: r.read_u64("not_after")?,
            })
        } else {
            None
        };

        let extensions = decode_extensions(&mut r)?;
        if !r.is_empty() {
            return Err(Error::Decode(format!("{} trailing bytes", r.remaining())));
        }

        Ok(Self {
            version,
            checksum,
            public_name,
            key_share,
            kem_id,
            cipher_suites,
            padded_length,
            validity,
            extensions,
        })
    }

    pub fn public_name_str(&self) -> Option<&str> {
        self.public_name
            .as_deref()
            .and_then(|name| std::str::from_utf8(name).ok())
    }
}

/// Extensions are either the two-byte zero terminator or framed records.
/// The outer length is skipped: AddressSet records do not keep it
/// consistent with the inner one.
fn decode_extensions(r: &mut TlvReader<'_>) -> Result<Vec<ExtensionRecord>> {
    if r.peek(2) == Some(&[0, 0][..]) {
        r.read_u16("extensions")?;
        return Ok(Vec::new());
    }

    let mut records = Vec::new();
    while !r.is_empty() {
        r.read_u16("extension length")?;
        let ext_type = r.read_u16("extension type")?;
        let value = r.read_length_prefixed("extension data")?;
        records.push(ExtensionRecord::from_parts(ext_type, value.to_vec())?);
    }
    if records.is_empty() {
        return Err(Error::Decode("insufficient data for extensions".into()));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::{verify_checksum, Sha256Digest};

    #[test]
    fn test_finalize_patches_esni_checksum() {
        let mut bytes = vec![0xff, 0x01, 0, 0, 0, 0];
        bytes.extend_from_slice(&[0x00, 0x00]);
        let unfinalized = ConfigStructure::<Unfinalized>::new(Version::V1, bytes);
        assert_eq!(&unfinalized.unchecked_bytes()[2..6], &[0, 0, 0, 0]);

        let finalized = unfinalized.finalize(&Sha256Digest).unwrap();
        assert_ne!(&finalized.as_bytes()[2..6], &[0, 0, 0, 0]);
        verify_checksum(finalized.as_bytes(), &Sha256Digest).unwrap();
    }

    #[test]
    fn test_finalize_leaves_echo_untouched() {
        let bytes = vec![0xff, 0x03, 0xaa, 0xbb, 0xcc, 0xdd, 0x00, 0x00];
        let finalized = ConfigStructure::<Unfinalized>::new(Version::V3, bytes.clone())
            .finalize(&Sha256Digest)
            .unwrap();
        assert_eq!(finalized.into_bytes(), bytes);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        assert!(matches!(
            ParsedConfig::decode(&[0xfe, 0x0d, 0x00]),
            Err(Error::UnsupportedVersion(0xfe0d))
        ));
    }

    #[test]
    fn test_decode_published_draft02_record() {
        // Cloudflare 0xff01 record, 0x44 bytes
        let bytes = hex::decode(concat!(
            "ff01c70413a80024001d0020e1849f8d",
            "2c893cdaf5cf717c2aacc13419cc7a38",
            "a6d2625968f9ab89add7b22700021301",
            "0104000000005bda5010000000005be2",
            "39100000"
        ))
        .unwrap();
        assert_eq!(bytes.len(), 0x44);

        let parsed = ParsedConfig::decode(&bytes).unwrap();
        assert_eq!(parsed.version, Version::V1);
        assert_eq!(parsed.checksum, Some([0xc7, 0x04, 0x13, 0xa8]));
        assert_eq!(parsed.public_name, None);
        assert_eq!(parsed.key_share.group, X25519_GROUP);
        assert_eq!(parsed.cipher_suites, CipherSuiteList::default());
        assert_eq!(parsed.padded_length, 260);
        assert_eq!(
            parsed.validity,
            Some(ValidityWindow {
                not_before: 0x5bda5010,
                not_after: 0x5be23910,
            })
        );
        assert!(parsed.extensions.is_empty());
    }

    #[test]
    fn test_decode_trailing_bytes() {
        let mut bytes = vec![0xff, 0x03, 0x00, 0x24, 0x00, 0x1d, 0x00, 0x20];
        bytes.extend_from_slice(&[1u8; 32]);
        bytes.extend_from_slice(&[0x00, 0x20, 0x00, 0x02, 0x13, 0x01, 0x01, 0x04, 0x00, 0x00]);
        let parsed = ParsedConfig::decode(&bytes).unwrap();
        assert_eq!(parsed.public_name, None);
        assert_eq!(parsed.kem_id, Some(0x0020));

        bytes.push(0xff);
        assert!(ParsedConfig::decode(&bytes).is_err());
    }
}
