//! Signing keys for proposers and builders.
//!
//! The auction protocol authenticates off-chain requests with either
//! Ed25519 or secp256k1 keys. Both schemes are wrapped in tagged enums so
//! stored key material and registered public keys carry their scheme with
//! them. Ed25519 signs the message directly; secp256k1 signs the SHA-256
//! digest of the message, with compact 64-byte signatures.
//!
//! A [`Key`] bundles a private key with its public key and derived account
//! address, and is what both the proposer engine and the builder service
//! sign with. Keys are persisted as JSON files with mode 0600.

use std::fs;
use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signer as _, SigningKey, Verifier as _, VerifyingKey};
use rand::RngCore;
use secp256k1::{ecdsa, Message, PublicKey as SecpPublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::address;
use super::encoding;
use super::sha256;

/// Errors produced by key handling and signing.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("invalid key material: {0}")]
    InvalidKey(String),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("key file address {have:?} does not match public key address {want:?}")]
    AddressMismatch { have: String, want: String },
    #[error("key file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("key file format: {0}")]
    Format(#[from] serde_json::Error),
}

/// Anything that can produce a signature over a message.
///
/// The proposer engine and builder service are written against this trait
/// rather than a concrete key type.
pub trait Signer {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError>;
}

/// A private key in one of the supported schemes.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PrivKey {
    Ed25519(#[serde(with = "encoding::base64_bytes")] Vec<u8>),
    Secp256k1(#[serde(with = "encoding::base64_bytes")] Vec<u8>),
}

impl std::fmt::Debug for PrivKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print private key material.
        match self {
            PrivKey::Ed25519(_) => write!(f, "PrivKey::Ed25519(..)"),
            PrivKey::Secp256k1(_) => write!(f, "PrivKey::Secp256k1(..)"),
        }
    }
}

/// A public key in one of the supported schemes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PubKey {
    Ed25519(#[serde(with = "encoding::base64_bytes")] Vec<u8>),
    Secp256k1(#[serde(with = "encoding::base64_bytes")] Vec<u8>),
}

impl PrivKey {
    /// Generates a fresh Ed25519 private key.
    pub fn generate_ed25519() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        PrivKey::Ed25519(seed.to_vec())
    }

    /// Generates a fresh secp256k1 private key.
    pub fn generate_secp256k1() -> Self {
        loop {
            let mut seed = [0u8; 32];
            rand::rng().fill_bytes(&mut seed);
            if SecretKey::from_byte_array(seed).is_ok() {
                return PrivKey::Secp256k1(seed.to_vec());
            }
        }
    }

    /// Derives the public key for this private key.
    pub fn public_key(&self) -> Result<PubKey, KeyError> {
        match self {
            PrivKey::Ed25519(seed) => {
                let signing_key = ed25519_signing_key(seed)?;
                Ok(PubKey::Ed25519(
                    signing_key.verifying_key().to_bytes().to_vec(),
                ))
            }
            PrivKey::Secp256k1(seed) => {
                let secret = secp256k1_secret_key(seed)?;
                let secp = Secp256k1::new();
                let public = SecpPublicKey::from_secret_key(&secp, &secret);
                Ok(PubKey::Secp256k1(public.serialize().to_vec()))
            }
        }
    }

    /// Signs a message under this key's scheme.
    pub fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        match self {
            PrivKey::Ed25519(seed) => {
                let signing_key = ed25519_signing_key(seed)?;
                Ok(signing_key.sign(msg).to_bytes().to_vec())
            }
            PrivKey::Secp256k1(seed) => {
                let secret = secp256k1_secret_key(seed)?;
                let secp = Secp256k1::new();
                let message = Message::from_digest(sha256(msg));
                let signature = secp.sign_ecdsa(message, &secret);
                Ok(signature.serialize_compact().to_vec())
            }
        }
    }
}

impl PubKey {
    /// Raw scheme-specific public key encoding.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PubKey::Ed25519(bytes) | PubKey::Secp256k1(bytes) => bytes,
        }
    }

    /// Verifies a detached signature over `msg`.
    ///
    /// Malformed keys or signatures verify as `false` rather than erroring:
    /// callers only care whether the signature is acceptable.
    pub fn verify(&self, msg: &[u8], sig: &[u8]) -> bool {
        match self {
            PubKey::Ed25519(bytes) => {
                let Ok(key_bytes) = <&[u8; 32]>::try_from(bytes.as_slice()) else {
                    return false;
                };
                let Ok(verifying_key) = VerifyingKey::from_bytes(key_bytes) else {
                    return false;
                };
                let Ok(signature) = ed25519_dalek::Signature::from_slice(sig) else {
                    return false;
                };
                verifying_key.verify(msg, &signature).is_ok()
            }
            PubKey::Secp256k1(bytes) => {
                let Ok(public) = SecpPublicKey::from_slice(bytes) else {
                    return false;
                };
                let Ok(signature) = ecdsa::Signature::from_compact(sig) else {
                    return false;
                };
                let secp = Secp256k1::verification_only();
                let message = Message::from_digest(sha256(msg));
                secp.verify_ecdsa(message, &signature, &public).is_ok()
            }
        }
    }

    /// Bech32 account address derived from this public key.
    pub fn account_address(&self) -> String {
        address::account_address(self.as_bytes())
    }

    /// Bech32 validator operator address derived from this public key.
    pub fn operator_address(&self) -> String {
        address::operator_address(self.as_bytes())
    }
}

fn ed25519_signing_key(seed: &[u8]) -> Result<SigningKey, KeyError> {
    let seed: &[u8; 32] = seed
        .try_into()
        .map_err(|_| KeyError::InvalidKey(format!("ed25519 seed length {}", seed.len())))?;
    Ok(SigningKey::from_bytes(seed))
}

fn secp256k1_secret_key(seed: &[u8]) -> Result<SecretKey, KeyError> {
    let seed: [u8; 32] = seed
        .try_into()
        .map_err(|_| KeyError::InvalidKey(format!("secp256k1 seed length {}", seed.len())))?;
    SecretKey::from_byte_array(seed).map_err(|e| KeyError::InvalidKey(e.to_string()))
}

/// A private key together with its public key and account address.
///
/// Proposers register the address ahead of time so builders can verify
/// request signatures; builders likewise register theirs so the chain and
/// proposers can verify bid responses and commitments.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Key {
    pub priv_key: PrivKey,
    pub pub_key: PubKey,
    pub address: String,
}

impl Key {
    /// Builds a [`Key`] from a private key, deriving pubkey and address.
    pub fn from_priv_key(priv_key: PrivKey) -> Result<Self, KeyError> {
        let pub_key = priv_key.public_key()?;
        let address = pub_key.account_address();
        Ok(Self {
            priv_key,
            pub_key,
            address,
        })
    }

    /// Generates a fresh Ed25519 key.
    pub fn generate() -> Self {
        Self::from_priv_key(PrivKey::generate_ed25519())
            .expect("freshly generated key material is valid")
    }

    /// Loads a key from a JSON key file.
    ///
    /// The stored address must match the address derived from the stored
    /// public key; a mismatch means the file was edited or corrupted.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let data = fs::read(path)?;
        let key: Key = serde_json::from_slice(&data)?;

        let want = key.pub_key.account_address();
        if key.address != want {
            return Err(KeyError::AddressMismatch {
                have: key.address,
                want,
            });
        }

        Ok(key)
    }

    /// Loads the key at `path`, or generates and saves a new Ed25519 key if
    /// the file does not exist.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, KeyError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(path);
        }

        let key = Self::generate();
        key.save(path)?;
        Ok(key)
    }

    /// Writes the key to a JSON file with mode 0600.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), KeyError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let data = serde_json::to_vec_pretty(self)?;

        let mut options = fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(path)?;
        file.write_all(&data)?;
        Ok(())
    }
}

impl Signer for Key {
    fn sign(&self, msg: &[u8]) -> Result<Vec<u8>, KeyError> {
        self.priv_key.sign(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_sign_verify_roundtrip() {
        let key = Key::generate();
        let sig = key.sign(b"message").expect("signing should succeed");
        assert!(key.pub_key.verify(b"message", &sig));
        assert!(!key.pub_key.verify(b"other message", &sig));
    }

    #[test]
    fn secp256k1_sign_verify_roundtrip() {
        let key = Key::from_priv_key(PrivKey::generate_secp256k1()).expect("valid key");
        let sig = key.sign(b"message").expect("signing should succeed");
        assert_eq!(sig.len(), 64);
        assert!(key.pub_key.verify(b"message", &sig));
        assert!(!key.pub_key.verify(b"tampered", &sig));
    }

    #[test]
    fn address_matches_pubkey_derivation() {
        let key = Key::generate();
        assert_eq!(key.address, key.pub_key.account_address());
    }

    #[test]
    fn verify_rejects_wrong_scheme_and_garbage() {
        let key = Key::generate();
        let sig = key.sign(b"msg").expect("sign");
        assert!(!key.pub_key.verify(b"msg", &[]));
        assert!(!key.pub_key.verify(b"msg", &sig[..32]));

        let other = PubKey::Secp256k1(key.pub_key.as_bytes().to_vec());
        assert!(!other.verify(b"msg", &sig));
    }

    #[test]
    fn key_file_roundtrip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("keys/proposer.json");

        let key = Key::generate();
        key.save(&path).expect("save should succeed");

        let loaded = Key::load(&path).expect("load should succeed");
        assert_eq!(loaded.address, key.address);
        assert_eq!(loaded.pub_key, key.pub_key);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).expect("metadata").permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn load_or_generate_creates_then_reuses() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("builder.json");

        let first = Key::load_or_generate(&path).expect("generate");
        let second = Key::load_or_generate(&path).expect("reload");
        assert_eq!(first.address, second.address);
    }

    #[test]
    fn tampered_key_file_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("key.json");

        let mut key = Key::generate();
        key.address = Key::generate().address;
        let data = serde_json::to_vec(&key).expect("serialize");
        fs::write(&path, data).expect("write");

        match Key::load(&path) {
            Err(KeyError::AddressMismatch { .. }) => {}
            other => panic!("expected address mismatch, got {other:?}"),
        }
    }
}
