//! Create an ECHOConfig (draft-ietf-tls-esni-04) and its private key
//!
//! By default both go into one PEM file: the PKCS#8 private key followed by
//! an ECHOCONFIG block holding the Base64 ECHOConfig. `--pubout` and
//! `--privout` write them separately instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use esni_config::config::{EchoConfigOptions, EchoOutput, DEFAULT_ECHOCONFIG_PEM};
use esni_config::{
    echoconfig_pem, encode_base64_into, keys, parse_version_tag, to_base64, ConfigBuilder,
    ConfigStructure, Error, Finalized, KeyProvider, OsKeyProvider, Result, Sha256Digest,
    ESNI_DRAFT_02, ESNI_DRAFT_03, MAX_STRUCTURE_LEN,
};

#[derive(Parser, Debug)]
#[command(name = "echo-config")]
#[command(about = "Create an ECHOConfig and private key as per draft-ietf-tls-esni-04")]
struct Cli {
    /// PEM output file with private key and ECHOConfig
    #[arg(long, default_value = DEFAULT_ECHOCONFIG_PEM)]
    pemout: PathBuf,

    /// Base64 ECHOConfig output file
    #[arg(long)]
    pubout: Option<PathBuf>,

    /// Private key output file
    #[arg(long)]
    privout: Option<PathBuf>,

    /// public_name value
    #[arg(long, alias = "public_name")]
    public_name: Option<String>,

    /// ECHOConfig version
    #[arg(long, alias = "echo_version", default_value = "0xff03")]
    echo_version: String,

    /// Log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    if let Err(e) = run(cli) {
        match e {
            Error::UnsupportedVersion(v @ (ESNI_DRAFT_02 | ESNI_DRAFT_03)) => {
                eprintln!("Unsupported version (0x{:04x}) - try using mk-esnikeys instead", v);
            }
            e => eprintln!("Error: {}", e),
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let plan = EchoConfigOptions {
        version: parse_version_tag(&cli.echo_version),
        public_name: cli.public_name,
        pem_path: cli.pemout,
        public_key_path: cli.pubout,
        private_key_path: cli.privout,
    }
    .validate()?;

    let pair = OsKeyProvider.generate()?;
    let mut builder = ConfigBuilder::new(plan.version).public_key(pair.public_key());
    if let Some(name) = &plan.public_name {
        builder = builder.public_name(name);
    }
    let echoconfig = builder.build()?.finalize(&Sha256Digest)?;

    match &plan.output {
        EchoOutput::Pem(path) => {
            let pem = echoconfig_pem(&pair.private_key_pem()?, &to_base64(&echoconfig)?);
            fs::write(path, pem)?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
            }
            info!("wrote ECHO key pair to {}", path.display());
        }
        EchoOutput::Split {
            public_key_path,
            private_key_path,
        } => {
            match public_key_path {
                Some(path) => write_base64(path, &echoconfig)?,
                None => warn!("didn't write ECHOConfig anywhere"),
            }
            match private_key_path {
                Some(path) => keys::write_private_key(path, &pair)?,
                None => warn!("didn't write private key anywhere"),
            }
        }
    }

    Ok(())
}

fn write_base64(path: &Path, echoconfig: &ConfigStructure<Finalized>) -> Result<()> {
    // Base64 of a full-capacity structure plus the newline
    let mut buf = [0u8; (MAX_STRUCTURE_LEN + 2) / 3 * 4 + 1];
    let n = encode_base64_into(echoconfig, &mut buf)?;
    fs::write(path, &buf[..n])?;
    info!("wrote ECHOConfig to {}", path.display());
    Ok(())
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
