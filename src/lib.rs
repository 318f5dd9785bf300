//! ESNIKeys and ECHOConfig generation for draft-ietf-tls-esni
//!
//! This library produces the public key-configuration structures a TLS
//! server publishes so clients can encrypt the ClientHello name: ESNIKeys
//! for drafts -02 (0xff01) and -03 (0xff02), and ECHOConfig for draft -04
//! (0xff03). Only X25519, TLS_AES_128_GCM_SHA256 and a fixed
//! padded_length of 260 are supported.
//!
//! # Overview
//!
//! A structure goes through three steps:
//!
//! 1. [`ConfigBuilder`] writes every field for the chosen [`Version`] into a
//!    bounded 1024-byte buffer ([`TlvWriter`]) and returns a
//!    `ConfigStructure<Unfinalized>`.
//! 2. [`ConfigStructure::finalize`] computes the ESNIKeys checksum (first
//!    four bytes of SHA-256 over the structure with the checksum field
//!    zeroed) through a [`DigestProvider`] and seals the structure.
//! 3. The renderers turn a `ConfigStructure<Finalized>` into its published
//!    form: [`zone_fragment`] for 0xff02, [`to_base64`] /
//!    [`encode_base64_into`] and [`echoconfig_pem`] for 0xff03. ESNIKeys
//!    0xff01 is published as raw bytes.
//!
//! # Versions
//!
//! | tag | structure | checksum | public_name | extra |
//! |---|---|---|---|---|
//! | 0xff01 | ESNIKeys | yes | none | validity window |
//! | 0xff02 | ESNIKeys | yes | required | validity window, AddressSet |
//! | 0xff03 | ECHOConfig | no | optional | KEM id 0x0020 |
//!
//! # Examples
//!
//! ## ECHOConfig
//!
//! ```
//! use esni_config::*;
//!
//! # fn main() -> esni_config::Result<()> {
//! let keys = OsKeyProvider.generate()?;
//! let config = ConfigBuilder::new(Version::V3)
//!     .public_name("cover.example")
//!     .public_key(keys.public_key())
//!     .build()?
//!     .finalize(&Sha256Digest)?;
//!
//! let b64 = to_base64(&config)?;
//! let pem = echoconfig_pem(&keys.private_key_pem()?, &b64);
//! assert!(pem.contains("-----BEGIN ECHOCONFIG-----"));
//! # Ok(())
//! # }
//! ```
//!
//! ## ESNIKeys with an AddressSet
//!
//! ```
//! use esni_config::*;
//!
//! # fn main() -> esni_config::Result<()> {
//! let keys = OsKeyProvider.generate()?;
//! let esnikeys = ConfigBuilder::new(Version::V2)
//!     .public_name("cover.example")
//!     .public_key(keys.public_key())
//!     .validity(ValidityWindow::starting_now(DEFAULT_DURATION_SECS)?)
//!     .extension(ExtensionRecord::address_set(&["192.0.2.1", "2001:db8::1"])?)
//!     .build()?
//!     .finalize(&Sha256Digest)?;
//!
//! verify_checksum(esnikeys.as_bytes(), &Sha256Digest)?;
//! let fragment = zone_fragment(&esnikeys, "cover.example")?;
//! assert!(fragment.starts_with("cover.example. IN TYPE65439"));
//! # Ok(())
//! # }
//! ```
//!
//! # Binaries
//!
//! - `mk-esnikeys` writes ESNIKeys, the private key and (for 0xff02) the
//!   zone fragment.
//! - `echo-config` writes an ECHOConfig with its private key.
//! - `gen-test-vector` prints a deterministic JSON vector for interop
//!   checks.

mod builder;
mod checksum;
mod codec;
mod error;
mod extension;
mod render;
mod structure;
mod types;

pub mod config;
pub mod keys;
pub mod resolve;

pub use builder::ConfigBuilder;
pub use checksum::{compute_checksum, verify_checksum, DigestProvider, Sha256Digest};
pub use codec::{TlvReader, TlvWriter};
pub use config::{DEFAULT_DURATION_SECS, MAX_DURATION_SECS, MIN_DURATION_SECS};
pub use error::{Error, Result};
pub use extension::{
    classify_address, dedup_addresses, AddressEntry, AddressFamily, ExtensionRecord,
    ADDRESS_SET_EXTENSION_TYPE, MAX_ADDRESSES,
};
pub use keys::{KeyPair, KeyProvider, KeySource, OsKeyProvider};
pub use render::{echoconfig_pem, encode_base64_into, to_base64, zone_fragment, ECHOCONFIG_PEM_LABEL};
pub use resolve::{AddressResolver, SystemResolver};
pub use structure::{ConfigStructure, Finalized, ParsedConfig, Unfinalized};
pub use types::*;
