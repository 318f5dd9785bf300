//! Generate test vectors for cross-implementation testing
//!
//! Every input is fixed (RFC 7748 key, validity window, addresses), so the
//! output is byte-for-byte reproducible.

use std::process;

use esni_config::{
    to_base64, zone_fragment, ConfigBuilder, ExtensionRecord, KeyPair, Result, Sha256Digest,
    ValidityWindow, Version,
};

// RFC 7748 section 6.1, Alice
const KEY_BYTES: [u8; 32] = [
    0x77, 0x07, 0x6d, 0x0a, 0x73, 0x18, 0xa5, 0x7d,
    0x3c, 0x16, 0xc1, 0x72, 0x51, 0xb2, 0x66, 0x45,
    0xdf, 0x4c, 0x2f, 0x87, 0xeb, 0xc0, 0x99, 0x2a,
    0xb1, 0x77, 0xfb, 0xa5, 0x1d, 0xb9, 0x2c, 0x2a,
];

const PUBLIC_NAME: &str = "cover.example.com";

const ADDRESSES: [&str; 3] = ["192.0.2.1", "2001:db8::1", "192.0.2.2"];

// 2030-01-01T00:00:00Z, one week
const WINDOW: ValidityWindow = ValidityWindow {
    not_before: 1_893_456_000,
    not_after: 1_893_456_000 + 604_800,
};

fn vectors() -> Result<serde_json::Value> {
    let pair = KeyPair::from_private_bytes(KEY_BYTES);

    let draft02 = ConfigBuilder::new(Version::V1)
        .public_key(pair.public_key())
        .validity(WINDOW)
        .build()?
        .finalize(&Sha256Digest)?;

    let draft03 = ConfigBuilder::new(Version::V2)
        .public_name(PUBLIC_NAME)
        .public_key(pair.public_key())
        .validity(WINDOW)
        .extension(ExtensionRecord::address_set(&ADDRESSES)?)
        .build()?
        .finalize(&Sha256Digest)?;

    let draft04 = ConfigBuilder::new(Version::V3)
        .public_name(PUBLIC_NAME)
        .public_key(pair.public_key())
        .build()?
        .finalize(&Sha256Digest)?;

    eprintln!("Generated test vectors:");
    eprintln!("  Public key: {}", hex::encode(pair.public_key()));
    eprintln!("  0xff01: {} bytes", draft02.len());
    eprintln!("  0xff02: {} bytes", draft03.len());
    eprintln!("  0xff03: {} bytes", draft04.len());

    Ok(serde_json::json!({
        "name": "esni_config_interop_x25519",
        "private_key_hex": hex::encode(KEY_BYTES),
        "public_key_hex": hex::encode(pair.public_key()),
        "not_before": WINDOW.not_before,
        "not_after": WINDOW.not_after,
        "public_name": PUBLIC_NAME,
        "addresses": ADDRESSES,
        "esnikeys_ff01_hex": hex::encode(draft02.as_bytes()),
        "esnikeys_ff02_hex": hex::encode(draft03.as_bytes()),
        "esnikeys_ff02_zone_fragment": zone_fragment(&draft03, PUBLIC_NAME)?,
        "echoconfig_ff03_hex": hex::encode(draft04.as_bytes()),
        "echoconfig_ff03_base64": to_base64(&draft04)?,
    }))
}

fn main() {
    let json = match vectors() {
        Ok(json) => json,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    match serde_json::to_string_pretty(&json) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
