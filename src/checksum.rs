//! ESNIKeys checksum
//!
//! The checksum is the first four bytes of SHA-256 over the whole
//! structure with the checksum field (bytes 2..6) zeroed. It is computed on
//! a copy and spliced back into the live buffer exactly once, after every
//! other field has been written.

use sha2::{Digest, Sha256};

use crate::{Error, Result, CHECKSUM_LEN, CHECKSUM_OFFSET};

/// Source of the 256-bit digest used for checksums
pub trait DigestProvider {
    fn sha256(&self, data: &[u8]) -> Result<[u8; 32]>;
}

/// [`DigestProvider`] backed by the `sha2` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Digest;

impl DigestProvider for Sha256Digest {
    fn sha256(&self, data: &[u8]) -> Result<[u8; 32]> {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Ok(hasher.finalize().into())
    }
}

fn checksum_range(len: usize) -> Result<std::ops::Range<usize>> {
    let end = CHECKSUM_OFFSET + CHECKSUM_LEN;
    if len < end {
        return Err(Error::Decode("insufficient data for checksum".into()));
    }
    Ok(CHECKSUM_OFFSET..end)
}

/// Checksum of `buf` as if its checksum field were zero
pub fn compute_checksum<D>(buf: &[u8], digest: &D) -> Result<[u8; CHECKSUM_LEN]>
where
    D: DigestProvider + ?Sized,
{
    let range = checksum_range(buf.len())?;

    let mut zeroed = buf.to_vec();
    zeroed[range].fill(0);
    let md = digest.sha256(&zeroed)?;

    let mut cksum = [0u8; CHECKSUM_LEN];
    cksum.copy_from_slice(&md[..CHECKSUM_LEN]);
    Ok(cksum)
}

/// Compute the checksum and write it into `buf` at the checksum offset
pub(crate) fn patch_checksum<D>(buf: &mut [u8], digest: &D) -> Result<()>
where
    D: DigestProvider + ?Sized,
{
    let cksum = compute_checksum(buf, digest)?;
    buf[CHECKSUM_OFFSET..CHECKSUM_OFFSET + CHECKSUM_LEN].copy_from_slice(&cksum);
    Ok(())
}

/// Check the embedded checksum of an ESNIKeys structure
pub fn verify_checksum<D>(buf: &[u8], digest: &D) -> Result<()>
where
    D: DigestProvider + ?Sized,
{
    let range = checksum_range(buf.len())?;
    let expected = compute_checksum(buf, digest)?;
    if buf[range] != expected {
        return Err(Error::ChecksumMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenDigest;

    impl DigestProvider for BrokenDigest {
        fn sha256(&self, _data: &[u8]) -> Result<[u8; 32]> {
            Err(Error::DigestUnavailable("no provider".into()))
        }
    }

    #[test]
    fn test_checksum_ignores_existing_field() {
        let mut a = vec![0xff, 0x01, 0, 0, 0, 0, 0x00, 0x24, 0x00, 0x1d];
        let mut b = a.clone();
        b[2..6].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);

        let ca = compute_checksum(&a, &Sha256Digest).unwrap();
        let cb = compute_checksum(&b, &Sha256Digest).unwrap();
        assert_eq!(ca, cb);

        patch_checksum(&mut a, &Sha256Digest).unwrap();
        assert_eq!(&a[2..6], &ca);
        verify_checksum(&a, &Sha256Digest).unwrap();
    }

    #[test]
    fn test_checksum_is_sha256_prefix() {
        let buf: [u8; 6] = [0xff, 0x01, 0, 0, 0, 0];
        let md: [u8; 32] = Sha256::digest(buf).into();
        assert_eq!(&compute_checksum(&buf, &Sha256Digest).unwrap()[..], &md[..4]);
    }

    #[test]
    fn test_verify_detects_tamper() {
        let mut buf = vec![0xff, 0x02, 0, 0, 0, 0, 1, 2, 3];
        patch_checksum(&mut buf, &Sha256Digest).unwrap();
        buf[8] ^= 0x01;
        assert!(matches!(
            verify_checksum(&buf, &Sha256Digest),
            Err(Error::ChecksumMismatch)
        ));
    }

    #[test]
    fn test_digest_failure_propagates() {
        let mut buf = vec![0xff, 0x01, 0, 0, 0, 0];
        assert!(matches!(
            patch_checksum(&mut buf, &BrokenDigest),
            Err(Error::DigestUnavailable(_))
        ));
        assert_eq!(&buf[2..6], &[0, 0, 0, 0]);
    }

    #[test]
    fn test_short_buffer() {
        assert!(compute_checksum(&[0xff, 0x01, 0], &Sha256Digest).is_err());
    }
}
