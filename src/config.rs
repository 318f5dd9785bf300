//! Option sets for the two generators
//!
//! The binaries parse flags into [`EsniKeysOptions`] / [`EchoConfigOptions`];
//! `validate()` applies defaults and cross-field rules and returns a plan
//! the binary can execute without further checks.
//!
//! [`EsniKeysPlan::generate`] builds every output in memory;
//! [`EsniKeysArtifacts::write`] is the only step that writes to disk.

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::keys::{self, KeyPair, KeyProvider, KeySource};
use crate::resolve::{self, AddressResolver};
use crate::{
    zone_fragment, ConfigBuilder, ConfigStructure, Error, ExtensionRecord, Finalized, Result,
    Sha256Digest, ValidityWindow, Version, ECHO_DRAFT_04, ESNI_DRAFT_02, MAX_PUBLIC_NAME_LEN,
};

/// One hour
pub const MIN_DURATION_SECS: u64 = 3600;

/// One week
pub const DEFAULT_DURATION_SECS: u64 = 604_800;

/// Ten years of 52 weeks; durations must stay below this
pub const MAX_DURATION_SECS: u64 = 604_800 * 52 * 10;

pub const DEFAULT_ESNIKEYS_PUB: &str = "esnikeys.pub";
pub const DEFAULT_ESNIKEYS_PRIV: &str = "esnikeys.priv";
pub const DEFAULT_ZONE_FRAGMENT: &str = "zonedata.fragment";
pub const DEFAULT_ECHOCONFIG_PEM: &str = "echoconfig.pem";

/// Check a requested duration against the one-hour / ten-year bounds
pub fn validate_duration(secs: i64) -> Result<u64> {
    if secs <= 0 {
        return Err(Error::InvalidDuration(format!(
            "can't have negative duration ({})",
            secs
        )));
    }
    let secs = secs as u64;
    if secs >= MAX_DURATION_SECS {
        return Err(Error::InvalidDuration(format!(
            "can't have >10 years duration ({}>{})",
            secs, MAX_DURATION_SECS
        )));
    }
    if secs < MIN_DURATION_SECS {
        return Err(Error::InvalidDuration(format!(
            "can't have <1 hour duration ({}<{})",
            secs, MIN_DURATION_SECS
        )));
    }
    Ok(secs)
}

impl ValidityWindow {
    /// Window opening one second before `now`
    pub fn starting_at(now: u64, duration: u64) -> Self {
        let not_before = now.saturating_sub(1);
        Self {
            not_before,
            not_after: not_before + duration,
        }
    }

    pub fn starting_now(duration: u64) -> Result<Self> {
        Ok(Self::starting_at(unix_now()?, duration))
    }
}

/// Seconds since the Unix epoch
pub fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| Error::InvalidDuration(format!("system clock before epoch: {}", e)))
}

/// Strip a single trailing dot
pub fn canonical_public_name(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

/// Where AddressSet literals come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    /// Resolve the public name
    Resolve,
    /// One literal per line
    File(PathBuf),
}

/// `mk-esnikeys` options as given on the command line
#[derive(Debug, Clone)]
pub struct EsniKeysOptions {
    pub version: u16,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    pub zone_fragment_path: PathBuf,
    pub duration: i64,
    pub public_name: Option<String>,
    pub address_set: Option<AddressSource>,
}

impl Default for EsniKeysOptions {
    fn default() -> Self {
        Self {
            version: ESNI_DRAFT_02,
            public_key_path: PathBuf::from(DEFAULT_ESNIKEYS_PUB),
            private_key_path: PathBuf::from(DEFAULT_ESNIKEYS_PRIV),
            zone_fragment_path: PathBuf::from(DEFAULT_ZONE_FRAGMENT),
            duration: DEFAULT_DURATION_SECS as i64,
            public_name: None,
            address_set: None,
        }
    }
}

/// Validated `mk-esnikeys` run
#[derive(Debug, Clone)]
pub struct EsniKeysPlan {
    pub version: Version,
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
    /// Set for 0xff02 only
    pub zone_fragment_path: Option<PathBuf>,
    pub duration: u64,
    /// Canonical form, no trailing dot
    pub public_name: Option<String>,
    pub address_set: Option<AddressSource>,
}

impl EsniKeysOptions {
    pub fn validate(self) -> Result<EsniKeysPlan> {
        let version = match Version::try_from(self.version)? {
            Version::V3 => return Err(Error::UnsupportedVersion(self.version)),
            v => v,
        };

        if version == Version::V1 {
            if self.public_name.is_some() {
                return Err(Error::FieldNotSupported {
                    version: self.version,
                    field: "public name",
                });
            }
            if self.address_set.is_some() {
                return Err(Error::FieldNotSupported {
                    version: self.version,
                    field: "AddressSet",
                });
            }
        }

        let duration = validate_duration(self.duration)?;

        let public_name = match (version, self.public_name) {
            (Version::V2, None) => return Err(Error::MissingPublicName(self.version)),
            (Version::V2, Some(name)) => {
                if name.len() > MAX_PUBLIC_NAME_LEN {
                    return Err(Error::NameTooLong {
                        len: name.len(),
                        max: MAX_PUBLIC_NAME_LEN,
                    });
                }
                let name = canonical_public_name(&name);
                if name.is_empty() {
                    return Err(Error::MissingPublicName(self.version));
                }
                Some(name.to_string())
            }
            _ => None,
        };

        let zone_fragment_path = (version == Version::V2).then_some(self.zone_fragment_path);

        Ok(EsniKeysPlan {
            version,
            public_key_path: self.public_key_path,
            private_key_path: self.private_key_path,
            zone_fragment_path,
            duration,
            public_name,
            address_set: self.address_set,
        })
    }
}

impl EsniKeysPlan {
    /// Build everything the run produces without writing any of it.
    ///
    /// Addresses are collected before a key is loaded or generated, so a
    /// bad address list fails before any key material exists.
    pub fn generate<P, R>(&self, provider: &P, resolver: &R, now: u64) -> Result<EsniKeysArtifacts>
    where
        P: KeyProvider + ?Sized,
        R: AddressResolver + ?Sized,
    {
        let address_set = self.address_set_extension(resolver)?;

        let (key, key_source) = keys::load_or_generate(&self.private_key_path, provider)?;
        let window = ValidityWindow::starting_at(now, self.duration);
        info!("validity window {} .. {}", window.not_before, window.not_after);

        let mut builder = ConfigBuilder::new(self.version)
            .public_key(key.public_key())
            .validity(window);
        if let Some(name) = &self.public_name {
            builder = builder.public_name(name);
        }
        if let Some(extension) = address_set {
            builder = builder.extension(extension);
        }
        let esnikeys = builder.build()?.finalize(&Sha256Digest)?;

        let zone_fragment = match &self.zone_fragment_path {
            Some(_) => {
                let owner = self
                    .public_name
                    .as_deref()
                    .ok_or(Error::MissingPublicName(self.version.tag()))?;
                Some(zone_fragment(&esnikeys, owner)?)
            }
            None => None,
        };

        Ok(EsniKeysArtifacts {
            plan: self.clone(),
            key,
            key_source,
            esnikeys,
            zone_fragment,
        })
    }

    fn address_set_extension<R>(&self, resolver: &R) -> Result<Option<ExtensionRecord>>
    where
        R: AddressResolver + ?Sized,
    {
        let Some(source) = &self.address_set else {
            return Ok(None);
        };

        let file = match source {
            AddressSource::File(path) => Some(path.as_path()),
            AddressSource::Resolve => None,
        };
        let literals = resolve::collect_addresses(file, self.public_name.as_deref(), resolver)?;
        ExtensionRecord::address_set(&literals).map(Some)
    }
}

/// Output of a successful `mk-esnikeys` run, held in memory
#[derive(Debug)]
pub struct EsniKeysArtifacts {
    plan: EsniKeysPlan,
    key: KeyPair,
    key_source: KeySource,
    esnikeys: ConfigStructure<Finalized>,
    zone_fragment: Option<String>,
}

impl EsniKeysArtifacts {
    pub fn key(&self) -> &KeyPair {
        &self.key
    }

    pub fn key_source(&self) -> KeySource {
        self.key_source
    }

    pub fn esnikeys(&self) -> &ConfigStructure<Finalized> {
        &self.esnikeys
    }

    pub fn zone_fragment(&self) -> Option<&str> {
        self.zone_fragment.as_deref()
    }

    /// Write the new private key (if any), the ESNIKeys and the zone fragment
    pub fn write(&self) -> Result<()> {
        if self.key_source == KeySource::Generated {
            keys::write_private_key(&self.plan.private_key_path, &self.key)?;
        }

        fs::write(&self.plan.public_key_path, self.esnikeys.as_bytes())?;
        info!(
            "wrote ESNIKeys 0x{:04x} ({} bytes) to {}",
            self.plan.version.tag(),
            self.esnikeys.len(),
            self.plan.public_key_path.display()
        );

        if let (Some(path), Some(fragment)) = (&self.plan.zone_fragment_path, &self.zone_fragment) {
            fs::write(path, fragment)?;
            info!("wrote zone fragment to {}", path.display());
        }
        Ok(())
    }
}

/// `echo-config` options as given on the command line
#[derive(Debug, Clone)]
pub struct EchoConfigOptions {
    pub version: u16,
    pub public_name: Option<String>,
    pub pem_path: PathBuf,
    pub public_key_path: Option<PathBuf>,
    pub private_key_path: Option<PathBuf>,
}

impl Default for EchoConfigOptions {
    fn default() -> Self {
        Self {
            version: ECHO_DRAFT_04,
            public_name: None,
            pem_path: PathBuf::from(DEFAULT_ECHOCONFIG_PEM),
            public_key_path: None,
            private_key_path: None,
        }
    }
}

/// Where `echo-config` puts its output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoOutput {
    /// Private key PEM plus ECHOCONFIG block in one file
    Pem(PathBuf),
    /// Separate files; either may be missing
    Split {
        public_key_path: Option<PathBuf>,
        private_key_path: Option<PathBuf>,
    },
}

/// Validated `echo-config` run
#[derive(Debug, Clone)]
pub struct EchoConfigPlan {
    pub version: Version,
    pub public_name: Option<String>,
    pub output: EchoOutput,
}

impl EchoConfigOptions {
    pub fn validate(self) -> Result<EchoConfigPlan> {
        let version = match Version::try_from(self.version)? {
            Version::V3 => Version::V3,
            _ => return Err(Error::UnsupportedVersion(self.version)),
        };

        if let Some(name) = &self.public_name {
            if name.len() > MAX_PUBLIC_NAME_LEN {
                return Err(Error::NameTooLong {
                    len: name.len(),
                    max: MAX_PUBLIC_NAME_LEN,
                });
            }
        }

        let output = match (self.public_key_path, self.private_key_path) {
            (None, None) => EchoOutput::Pem(self.pem_path),
            (public_key_path, private_key_path) => EchoOutput::Split {
                public_key_path,
                private_key_path,
            },
        };

        Ok(EchoConfigPlan {
            version,
            public_name: self.public_name,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{verify_checksum, OsKeyProvider, ParsedConfig};
    use std::path::Path;

    struct NoResolver;

    impl AddressResolver for NoResolver {
        fn resolve(&self, name: &str) -> Result<Vec<String>> {
            Err(Error::Resolve(format!("{}: lookups disabled", name)))
        }
    }

    // 2030-01-01T00:00:00Z
    const NOW: u64 = 1_893_456_000;

    fn draft03_plan(dir: &Path, addresses: Option<AddressSource>) -> EsniKeysPlan {
        EsniKeysOptions {
            version: 0xff02,
            public_key_path: dir.join("esnikeys.pub"),
            private_key_path: dir.join("esnikeys.priv"),
            zone_fragment_path: dir.join("zonedata.fragment"),
            public_name: Some("cover.example".into()),
            address_set: addresses,
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_duration_bounds() {
        assert_eq!(validate_duration(3600).unwrap(), 3600);
        assert_eq!(validate_duration(604_800).unwrap(), 604_800);
        assert_eq!(
            validate_duration(MAX_DURATION_SECS as i64 - 1).unwrap(),
            MAX_DURATION_SECS - 1
        );
        for bad in [0, -1, 3599, MAX_DURATION_SECS as i64] {
            assert!(
                matches!(validate_duration(bad), Err(Error::InvalidDuration(_))),
                "{} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_window_starts_one_second_back() {
        let window = ValidityWindow::starting_at(1_000_000, 3600);
        assert_eq!(window.not_before, 999_999);
        assert_eq!(window.not_after, 999_999 + 3600);

        let now = ValidityWindow::starting_now(DEFAULT_DURATION_SECS).unwrap();
        assert_eq!(now.not_after - now.not_before, DEFAULT_DURATION_SECS);
    }

    #[test]
    fn test_canonical_public_name() {
        assert_eq!(canonical_public_name("example.com."), "example.com");
        assert_eq!(canonical_public_name("example.com"), "example.com");
        assert_eq!(canonical_public_name("example.com.."), "example.com.");
    }

    #[test]
    fn test_esnikeys_defaults() {
        let plan = EsniKeysOptions::default().validate().unwrap();
        assert_eq!(plan.version, Version::V1);
        assert_eq!(plan.public_key_path, PathBuf::from("esnikeys.pub"));
        assert_eq!(plan.private_key_path, PathBuf::from("esnikeys.priv"));
        assert_eq!(plan.zone_fragment_path, None);
        assert_eq!(plan.duration, 604_800);
    }

    #[test]
    fn test_esnikeys_draft02_rejects_draft03_fields() {
        let opts = EsniKeysOptions {
            public_name: Some("example.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::FieldNotSupported { version: 0xff01, field: "public name" })
        ));

        let opts = EsniKeysOptions {
            address_set: Some(AddressSource::Resolve),
            ..Default::default()
        };
        assert!(matches!(
            opts.validate(),
            Err(Error::FieldNotSupported { version: 0xff01, field: "AddressSet" })
        ));
    }

    #[test]
    fn test_esnikeys_draft03_name_rules() {
        let base = EsniKeysOptions {
            version: 0xff02,
            ..Default::default()
        };

        assert!(matches!(
            base.clone().validate(),
            Err(Error::MissingPublicName(0xff02))
        ));

        let plan = EsniKeysOptions {
            public_name: Some("cover.example.".into()),
            ..base.clone()
        }
        .validate()
        .unwrap();
        assert_eq!(plan.public_name.as_deref(), Some("cover.example"));
        assert_eq!(plan.zone_fragment_path, Some(PathBuf::from("zonedata.fragment")));

        let long = EsniKeysOptions {
            public_name: Some("a".repeat(255)),
            ..base
        };
        assert!(matches!(
            long.validate(),
            Err(Error::NameTooLong { len: 255, max: 254 })
        ));
    }

    #[test]
    fn test_esnikeys_rejects_echo_version() {
        for tag in [0xff03, 0, 0x1234] {
            let opts = EsniKeysOptions {
                version: tag,
                ..Default::default()
            };
            assert!(matches!(opts.validate(), Err(Error::UnsupportedVersion(t)) if t == tag));
        }
    }

    #[test]
    fn test_echo_outputs() {
        let plan = EchoConfigOptions::default().validate().unwrap();
        assert_eq!(plan.version, Version::V3);
        assert_eq!(plan.output, EchoOutput::Pem(PathBuf::from("echoconfig.pem")));

        let plan = EchoConfigOptions {
            public_key_path: Some("echo.pub".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(
            plan.output,
            EchoOutput::Split {
                public_key_path: Some(PathBuf::from("echo.pub")),
                private_key_path: None,
            }
        );
    }

    #[test]
    fn test_echo_rejects_esni_versions() {
        for tag in [0xff01, 0xff02] {
            let opts = EchoConfigOptions {
                version: tag,
                ..Default::default()
            };
            assert!(matches!(opts.validate(), Err(Error::UnsupportedVersion(t)) if t == tag));
        }
    }

    #[test]
    fn test_bad_address_file_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let addrs = dir.path().join("addrs.txt");
        fs::write(&addrs, "10.0.0.1\n10.0.0.999\n").unwrap();

        let plan = draft03_plan(dir.path(), Some(AddressSource::File(addrs)));
        assert!(matches!(
            plan.generate(&OsKeyProvider, &NoResolver, NOW),
            Err(Error::AddressParse(a)) if a == "10.0.0.999"
        ));
        assert_eq!(dir_entries(dir.path()), vec!["addrs.txt"]);
    }

    #[test]
    fn test_failed_lookup_leaves_no_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let plan = draft03_plan(dir.path(), Some(AddressSource::Resolve));
        assert!(matches!(
            plan.generate(&OsKeyProvider, &NoResolver, NOW),
            Err(Error::Resolve(_))
        ));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[test]
    fn test_generate_then_write() {
        let dir = tempfile::tempdir().unwrap();
        let addrs = dir.path().join("addrs.txt");
        fs::write(&addrs, "192.0.2.1\n2001:db8::1\n").unwrap();
        let plan = draft03_plan(dir.path(), Some(AddressSource::File(addrs)));

        let artifacts = plan.generate(&OsKeyProvider, &NoResolver, NOW).unwrap();
        assert_eq!(artifacts.key_source(), KeySource::Generated);
        assert_eq!(dir_entries(dir.path()), vec!["addrs.txt"]);

        artifacts.write().unwrap();
        assert_eq!(
            dir_entries(dir.path()),
            vec!["addrs.txt", "esnikeys.priv", "esnikeys.pub", "zonedata.fragment"]
        );

        let written = fs::read(&plan.public_key_path).unwrap();
        assert_eq!(written, artifacts.esnikeys().as_bytes());
        verify_checksum(&written, &Sha256Digest).unwrap();
        let parsed = ParsedConfig::decode(&written).unwrap();
        assert_eq!(parsed.validity.unwrap().not_before, NOW - 1);
        assert_eq!(
            fs::read_to_string(plan.zone_fragment_path.as_ref().unwrap()).unwrap(),
            artifacts.zone_fragment().unwrap()
        );

        // A rerun picks up the stored key and leaves it alone
        let stored = fs::read(&plan.private_key_path).unwrap();
        let rerun = plan.generate(&OsKeyProvider, &NoResolver, NOW + 60).unwrap();
        assert_eq!(rerun.key_source(), KeySource::Loaded);
        assert_eq!(rerun.key().public_key(), artifacts.key().public_key());
        rerun.write().unwrap();
        assert_eq!(fs::read(&plan.private_key_path).unwrap(), stored);
    }
}
