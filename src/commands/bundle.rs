//! Bundle command - generate a party, publish its prekeys and save its secrets.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use clap::Args;
use rand::Rng;
use serde::{Deserialize, Serialize};

use signal_session::{
    InMemoryKeyStore, PreKeyBundle, SignalKeyPair, SignalPreKeyPair, SignalSignedKeyPair,
    SignedPreKeyBundle, KEY_LENGTH, SIGNATURE_LENGTH,
};

use super::fingerprint::fingerprint;
use super::CommandExecutor;

/// Generate a fresh identity with prekeys.
///
/// Without `--output` the public bundle is printed and the private keys are
/// discarded.
#[derive(Args, Debug)]
pub struct BundleCommand {
    /// Number of one-time prekeys to include
    #[arg(long, default_value = "1")]
    pub one_time_prekeys: u32,

    /// Id of the signed prekey
    #[arg(long, default_value = "1")]
    pub signed_prekey_id: u32,

    /// Output path prefix (creates .bundle.json and .keys.json files)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Serialize)]
struct BundleJson {
    registration_id: u32,
    identity_key: String,
    identity_fingerprint: String,
    signed_pre_key: SignedPreKeyJson,
    one_time_pre_keys: Vec<PreKeyJson>,
}

#[derive(Serialize)]
struct SignedPreKeyJson {
    id: u32,
    public_key: String,
    signature: String,
}

#[derive(Serialize)]
struct PreKeyJson {
    id: u32,
    public_key: String,
}

/// Private key file. Keys are base64 of the raw 32-byte secrets.
#[derive(Serialize, Deserialize)]
struct KeysJson {
    registration_id: u32,
    identity_key: String,
    signed_pre_key: SignedSecretJson,
    one_time_pre_keys: Vec<SecretJson>,
}

#[derive(Serialize, Deserialize)]
struct SignedSecretJson {
    id: u32,
    private_key: String,
    signature: String,
}

#[derive(Serialize, Deserialize)]
struct SecretJson {
    id: u32,
    private_key: String,
}

/// A party's complete key material.
pub(super) struct PartyKeys {
    pub registration_id: u32,
    pub identity: SignalKeyPair,
    pub signed_pre_key: SignalSignedKeyPair,
    pub one_time_pre_keys: Vec<SignalPreKeyPair>,
}

impl PartyKeys {
    fn generate(signed_prekey_id: u32, one_time_prekeys: u32) -> Self {
        let identity = SignalKeyPair::random();
        let signed_pre_key = SignalSignedKeyPair::generate(signed_prekey_id, &identity);
        Self {
            registration_id: rand::thread_rng().gen_range(1..16380),
            identity,
            signed_pre_key,
            one_time_pre_keys: (1..=one_time_prekeys)
                .map(SignalPreKeyPair::generate)
                .collect(),
        }
    }

    /// Reads a key file written by `bundle --output`.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read key file {}", path.display()))?;
        let json: KeysJson = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse key file {}", path.display()))?;

        let identity = SignalKeyPair::from_secret_bytes(decode_key(&json.identity_key)?);
        let signed_pre_key = SignalSignedKeyPair::new(
            json.signed_pre_key.id,
            SignalKeyPair::from_secret_bytes(decode_key(&json.signed_pre_key.private_key)?),
            decode_signature(&json.signed_pre_key.signature)?,
        );
        let one_time_pre_keys = json
            .one_time_pre_keys
            .iter()
            .map(|k| {
                Ok(SignalPreKeyPair::new(
                    k.id,
                    SignalKeyPair::from_secret_bytes(decode_key(&k.private_key)?),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            registration_id: json.registration_id,
            identity,
            signed_pre_key,
            one_time_pre_keys,
        })
    }

    pub fn signed_bundle(&self) -> SignedPreKeyBundle {
        self.signed_pre_key.to_bundle()
    }

    pub fn one_time_bundles(&self) -> Vec<PreKeyBundle> {
        self.one_time_pre_keys.iter().map(|k| k.to_bundle()).collect()
    }

    /// Moves the keys into a store ready to answer handshakes.
    pub fn into_store(self) -> InMemoryKeyStore {
        let store = InMemoryKeyStore::new(self.identity, self.registration_id);
        store.store_signed_pre_key(self.signed_pre_key);
        for pre_key in self.one_time_pre_keys {
            store.store_pre_key(pre_key);
        }
        store
    }

    fn public_json(&self) -> BundleJson {
        let signed = self.signed_bundle();
        BundleJson {
            registration_id: self.registration_id,
            identity_key: BASE64.encode(self.identity.encoded_public_key()),
            identity_fingerprint: fingerprint(&self.identity.encoded_public_key()),
            signed_pre_key: SignedPreKeyJson {
                id: signed.id,
                public_key: BASE64.encode(signed.public_key.encoded()),
                signature: BASE64.encode(signed.signature),
            },
            one_time_pre_keys: self
                .one_time_bundles()
                .iter()
                .map(|k| PreKeyJson {
                    id: k.id,
                    public_key: BASE64.encode(k.public_key.encoded()),
                })
                .collect(),
        }
    }

    fn private_json(&self) -> KeysJson {
        KeysJson {
            registration_id: self.registration_id,
            identity_key: BASE64.encode(*self.identity.secret_bytes()),
            signed_pre_key: SignedSecretJson {
                id: self.signed_pre_key.id(),
                private_key: BASE64.encode(*self.signed_pre_key.key_pair().secret_bytes()),
                signature: BASE64.encode(self.signed_pre_key.signature()),
            },
            one_time_pre_keys: self
                .one_time_pre_keys
                .iter()
                .map(|k| SecretJson {
                    id: k.id(),
                    private_key: BASE64.encode(*k.key_pair().secret_bytes()),
                })
                .collect(),
        }
    }

    /// Writes `<prefix>.bundle.json` and `<prefix>.keys.json`.
    fn save(&self, prefix: &Path) -> Result<(PathBuf, PathBuf)> {
        let bundle_path = with_suffix(prefix, ".bundle.json");
        let keys_path = with_suffix(prefix, ".keys.json");

        let public =
            serde_json::to_string_pretty(&self.public_json()).context("Failed to serialize bundle")?;
        let private =
            serde_json::to_string_pretty(&self.private_json()).context("Failed to serialize keys")?;

        fs::write(&bundle_path, public)
            .with_context(|| format!("Failed to write {}", bundle_path.display()))?;
        fs::write(&keys_path, private)
            .with_context(|| format!("Failed to write {}", keys_path.display()))?;
        Ok((bundle_path, keys_path))
    }
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut p = prefix.as_os_str().to_os_string();
    p.push(suffix);
    PathBuf::from(p)
}

fn decode_key(value: &str) -> Result<[u8; KEY_LENGTH]> {
    let bytes = BASE64.decode(value).context("Invalid base64 in private key")?;
    match bytes.try_into() {
        Ok(key) => Ok(key),
        Err(bytes) => bail!(
            "Invalid private key length: expected {}, got {}",
            KEY_LENGTH,
            bytes.len()
        ),
    }
}

fn decode_signature(value: &str) -> Result<[u8; SIGNATURE_LENGTH]> {
    let bytes = BASE64.decode(value).context("Invalid base64 in signature")?;
    match bytes.try_into() {
        Ok(signature) => Ok(signature),
        Err(bytes) => bail!(
            "Invalid signature length: expected {}, got {}",
            SIGNATURE_LENGTH,
            bytes.len()
        ),
    }
}

impl CommandExecutor for BundleCommand {
    fn execute(&self) -> Result<()> {
        let keys = PartyKeys::generate(self.signed_prekey_id, self.one_time_prekeys);

        let Some(prefix) = &self.output else {
            let output = serde_json::to_string_pretty(&keys.public_json())
                .context("Failed to serialize bundle")?;
            println!("{}", output);
            eprintln!("Private keys were not saved; use --output to keep them.");
            return Ok(());
        };

        let (bundle_path, keys_path) = keys.save(prefix)?;
        println!("Prekey bundle generated successfully:");
        println!();
        println!("  Public bundle: {}", bundle_path.display());
        println!("  Private keys:  {}", keys_path.display());
        println!("  Fingerprint:   {}", fingerprint(&keys.identity.encoded_public_key()));
        println!();
        println!("Publish the bundle (.bundle.json) for peers who want to start a session.");
        println!("Keep the private keys (.keys.json) secret and secure.");
        Ok(())
    }
}
