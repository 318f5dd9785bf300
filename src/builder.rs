//! Versioned structure builder
//!
//! [`ConfigBuilder`] assembles one ESNIKeys or ECHOConfig in strict wire
//! order for the requested [`Version`]:
//!
//! ```text
//! 0xff01  version | checksum | keys | suites | padded_length | not_before | not_after | extensions
//! 0xff02  version | checksum | public_name | keys | suites | padded_length | not_before | not_after | extensions
//! 0xff03  version | [public_name] | keys | kem_id | suites | padded_length | extensions
//! ```
//!
//! The result is a `ConfigStructure<Unfinalized>`; call
//! [`finalize`](crate::ConfigStructure::finalize) to apply the checksum.
//!
//! # Example
//!
//! ```
//! # use esni_config::*;
//! let structure = ConfigBuilder::new(Version::V2)
//!     .public_name("example.com")
//!     .public_key(&[0u8; 32])
//!     .validity(ValidityWindow { not_before: 1_600_000_000, not_after: 1_600_604_800 })
//!     .build()
//!     .unwrap()
//!     .finalize(&Sha256Digest)
//!     .unwrap();
//!
//! assert_eq!(&structure.as_bytes()[..2], &[0xff, 0x02]);
//! verify_checksum(structure.as_bytes(), &Sha256Digest).unwrap();
//! ```

use crate::codec::TlvWriter;
use crate::{
    CipherSuiteList, ConfigStructure, Error, ExtensionRecord, KeyShareEntry, NameField, Result,
    Unfinalized, ValidityWindow, Version, CHECKSUM_LEN, DHKEM_X25519_SHA256, MAX_PUBLIC_NAME_LEN,
    MAX_STRUCTURE_LEN, PADDED_LENGTH,
};

/// Builder for ESNIKeys / ECHOConfig structures
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    version: Version,
    public_name: Option<String>,
    public_key: Vec<u8>,
    cipher_suites: CipherSuiteList,
    validity: Option<ValidityWindow>,
    extension: Option<ExtensionRecord>,
    capacity: usize,
}

impl ConfigBuilder {
    pub fn new(version: Version) -> Self {
        Self {
            version,
            public_name: None,
            public_key: Vec::new(),
            cipher_suites: CipherSuiteList::default(),
            validity: None,
            extension: None,
            capacity: MAX_STRUCTURE_LEN,
        }
    }

    pub fn public_name(mut self, name: &str) -> Self {
        self.public_name = Some(name.to_string());
        self
    }

    pub fn public_key(mut self, key: &[u8]) -> Self {
        self.public_key = key.to_vec();
        self
    }

    pub fn validity(mut self, window: ValidityWindow) -> Self {
        self.validity = Some(window);
        self
    }

    pub fn extension(mut self, extension: ExtensionRecord) -> Self {
        self.extension = Some(extension);
        self
    }

    /// Override the buffer capacity (defaults to [`MAX_STRUCTURE_LEN`])
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn build(self) -> Result<ConfigStructure<Unfinalized>> {
        let tag = self.version.tag();
        let layout = self.version.layout();
        let key_share = KeyShareEntry::x25519(&self.public_key)?;

        let name = self.public_name.as_deref();
        if let Some(name) = name {
            if name.len() > MAX_PUBLIC_NAME_LEN {
                return Err(Error::NameTooLong {
                    len: name.len(),
                    max: MAX_PUBLIC_NAME_LEN,
                });
            }
        }
        let name = match layout.public_name {
            NameField::Absent => {
                if name.is_some_and(|n| !n.is_empty()) {
                    return Err(Error::FieldNotSupported {
                        version: tag,
                        field: "public name",
                    });
                }
                None
            }
            NameField::Required => Some(name.ok_or(Error::MissingPublicName(tag))?),
            NameField::Optional => name.filter(|n| !n.is_empty()),
        };

        if let Some(ext) = &self.extension {
            if ext.is_address_set() && !layout.address_set {
                return Err(Error::FieldNotSupported {
                    version: tag,
                    field: "AddressSet",
                });
            }
        }

        let validity = match (layout.validity_window, self.validity) {
            (true, Some(window)) => Some(window),
            (true, None) => return Err(Error::MissingValidity(tag)),
            (false, Some(_)) => {
                return Err(Error::FieldNotSupported {
                    version: tag,
                    field: "validity window",
                })
            }
            (false, None) => None,
        };

        let mut w = TlvWriter::with_capacity(self.capacity);

        w.append_u16_be(tag)?;
        if layout.checksum {
            // Placeholder, patched by finalize()
            w.append_zeros(CHECKSUM_LEN)?;
        }
        if let Some(name) = name {
            w.length_prefixed(name.as_bytes())?;
        }
        key_share.encode_list(&mut w)?;
        if layout.kem_id {
            w.append_u16_be(DHKEM_X25519_SHA256)?;
        }
        self.cipher_suites.encode(&mut w)?;
        w.append_u16_be(PADDED_LENGTH)?;
        if let Some(window) = validity {
            // Only the low 32 bits of each time are carried
            for t in [window.not_before, window.not_after] {
                w.append_u32_be(0)?;
                w.append_u32_be(t as u32)?;
            }
        }
        match &self.extension {
            Some(ext) => ext.encode(&mut w)?,
            None => w.append_u16_be(0)?,
        }

        tracing::debug!(
            version = tag,
            len = w.len(),
            "assembled: {}",
            hex::encode(w.as_slice())
        );
        Ok(ConfigStructure::new(self.version, w.into_inner()))
    }
}
