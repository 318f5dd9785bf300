//! Error types for ESNIKeys / ECHOConfig generation
//!
//! This module defines the error type returned by every builder, encoder
//! and renderer in the crate. All errors implement the standard
//! [`std::error::Error`] trait.
//!
//! # Common Error Types
//!
//! - [`Error::UnsupportedVersion`] - Version tag has no known layout
//! - [`Error::BufferOverflow`] - Structure would exceed its fixed capacity
//! - [`Error::TooManyAddresses`] - More than 16 distinct AddressSet entries
//! - [`Error::FieldNotSupported`] - Field requested for a version without it
//!
//! Every error is terminal for the build in progress: no partially encoded
//! or partially checksummed structure is ever returned.
//!
//! # Result Type Alias
//!
//! [`Result<T>`] is a convenient alias for `std::result::Result<T, Error>`.

/// Error types for structure generation
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Version tag is not one of the supported layouts
    #[error("unsupported version (0x{0:04x})")]
    UnsupportedVersion(u16),

    /// Write would exceed the fixed buffer capacity
    #[error("buffer overflow: {needed} bytes needed, capacity {capacity}")]
    BufferOverflow { needed: usize, capacity: usize },

    /// AddressSet holds more entries than allowed
    #[error("too many addresses ({count}), max is {max}")]
    TooManyAddresses { count: usize, max: usize },

    /// Address literal did not parse for its assumed family
    #[error("failed to convert string ({0}) to IP address")]
    AddressParse(String),

    /// Encoded extension does not fit a 16-bit length
    #[error("encoded extensions too big ({0})")]
    ExtensionTooLarge(usize),

    /// Digest primitive could not be invoked
    #[error("digest unavailable: {0}")]
    DigestUnavailable(String),

    /// Key provider failed to produce or load a key pair
    #[error("key generation failed: {0}")]
    KeyGenerationFailed(String),

    /// Destination buffer cannot hold the rendered output
    #[error("render buffer too small: {needed} bytes needed, {available} available")]
    RenderBufferTooSmall { needed: usize, available: usize },

    /// Field is longer than its 16-bit length prefix allows
    #[error("length {0} does not fit a 16-bit prefix")]
    LengthOverflow(usize),

    /// Public key length does not match the curve
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Public name exceeds the maximum length
    #[error("public name too long ({len}), max is {max}")]
    NameTooLong { len: usize, max: usize },

    /// Field requested for a version whose layout has no room for it
    #[error("version 0x{version:04x} doesn't support {field}")]
    FieldNotSupported { version: u16, field: &'static str },

    /// Version requires a public name and none was given
    #[error("version 0x{0:04x} requires a public name")]
    MissingPublicName(u16),

    /// Version carries a validity window and none was given
    #[error("version 0x{0:04x} requires a validity window")]
    MissingValidity(u16),

    /// Validity duration outside the allowed range
    #[error("invalid duration: {0}")]
    InvalidDuration(String),

    /// Decode error (malformed wire format data)
    #[error("decode error: {0}")]
    Decode(String),

    /// Embedded checksum does not match the recomputed one
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// Host name resolution failed
    #[error("address resolution failed: {0}")]
    Resolve(String),

    /// Reading or writing an artifact failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for generation operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_version_shows_tag() {
        let err = Error::UnsupportedVersion(0xff01);
        assert_eq!(err.to_string(), "unsupported version (0xff01)");
    }

    #[test]
    fn test_field_not_supported_message() {
        let err = Error::FieldNotSupported {
            version: 0xff01,
            field: "public name",
        };
        assert_eq!(err.to_string(), "version 0xff01 doesn't support public name");
    }
}
