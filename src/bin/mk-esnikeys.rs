//! Create an ESNIKeys structure (draft-ietf-tls-esni-02 / -03)
//!
//! Writes the binary ESNIKeys, the matching X25519 private key and, for
//! 0xff02, a DNS zone-file fragment. An existing private key file is
//! re-used. Nothing is written unless every output was built.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use esni_config::config::{self, AddressSource, EsniKeysOptions};
use esni_config::{parse_version_tag, OsKeyProvider, Result, SystemResolver};

#[derive(Parser, Debug)]
#[command(name = "mk-esnikeys")]
#[command(about = "Create an ESNIKeys data structure as per draft-ietf-tls-esni-[02|03]")]
#[command(after_help = "-P, -A and -z are only supported for version 0xff02.\n\
    With a file name, -A reads one IP address per line; without one, the A and AAAA\n\
    records of the public name are used.")]
struct Cli {
    /// ESNIKeys version to produce (0xff01 or 0xff02)
    #[arg(short = 'V', long = "esni-version", default_value = "0xff01")]
    version: String,

    /// Output file for the binary-encoded ESNIKeys
    #[arg(short = 'o', long, default_value = config::DEFAULT_ESNIKEYS_PUB)]
    pubout: PathBuf,

    /// Output file for the private key; re-used if it already holds a key
    #[arg(short = 'p', long, default_value = config::DEFAULT_ESNIKEYS_PRIV)]
    privout: PathBuf,

    /// Seconds from now for which the public share is valid
    #[arg(short = 'd', long, default_value_t = esni_config::DEFAULT_DURATION_SECS as i64, allow_hyphen_values = true)]
    duration: i64,

    /// Public (cover) name, 0xff02 only
    #[arg(short = 'P', long)]
    public_name: Option<String>,

    /// Include an AddressSet extension, optionally read from a file (0xff02 only)
    #[arg(short = 'A', long, num_args = 0..=1, default_missing_value = "", value_name = "FILE")]
    address_set: Option<String>,

    /// Zone fragment output file (0xff02 only)
    #[arg(short = 'z', long, default_value = config::DEFAULT_ZONE_FRAGMENT)]
    zonefrag: PathBuf,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let address_set = cli.address_set.map(|arg| {
        if arg.is_empty() {
            AddressSource::Resolve
        } else {
            AddressSource::File(PathBuf::from(arg))
        }
    });

    let plan = EsniKeysOptions {
        version: parse_version_tag(&cli.version),
        public_key_path: cli.pubout,
        private_key_path: cli.privout,
        zone_fragment_path: cli.zonefrag,
        duration: cli.duration,
        public_name: cli.public_name,
        address_set,
    }
    .validate()?;

    plan.generate(&OsKeyProvider, &SystemResolver, config::unix_now()?)?
        .write()
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}
