//! Address sources for the AddressSet extension
//!
//! Addresses come either from a file (one literal per line) or from
//! resolving the public name. Both paths end in [`dedup_addresses`].

use std::fs;
use std::net::ToSocketAddrs;
use std::path::Path;

use tracing::{debug, info};

use crate::{dedup_addresses, Error, Result};

/// Name to address-literal lookup
pub trait AddressResolver {
    fn resolve(&self, name: &str) -> Result<Vec<String>>;
}

/// Resolver backed by the system's `getaddrinfo`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl AddressResolver for SystemResolver {
    fn resolve(&self, name: &str) -> Result<Vec<String>> {
        let addrs = (name, 0u16)
            .to_socket_addrs()
            .map_err(|e| Error::Resolve(format!("{}: {}", name, e)))?;
        let literals: Vec<String> = addrs.map(|sa| sa.ip().to_string()).collect();
        debug!("{} resolved to {} addresses", name, literals.len());
        Ok(literals)
    }
}

/// Read address literals, one per line. Lines starting with `#` and
/// blank lines are skipped.
pub fn read_address_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| !line.starts_with('#'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Gather the de-duplicated literals for an AddressSet.
///
/// `file` wins when given; otherwise `public_name` is resolved.
pub fn collect_addresses<R>(
    file: Option<&Path>,
    public_name: Option<&str>,
    resolver: &R,
) -> Result<Vec<String>>
where
    R: AddressResolver + ?Sized,
{
    let literals = match (file, public_name) {
        (Some(path), _) => {
            info!("reading addresses from {}", path.display());
            read_address_file(path)?
        }
        (None, Some(name)) => resolver.resolve(name)?,
        (None, None) => {
            return Err(Error::Resolve(
                "no address file and no public name to resolve".into(),
            ))
        }
    };
    if literals.is_empty() {
        return Err(Error::Resolve("no addresses found".into()));
    }
    dedup_addresses(literals)
}
