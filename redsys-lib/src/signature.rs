//! # Signature Engine
//!
//! ## Protocol
//!
//! Signing is a two-step scheme fixed by the gateway:
//!
//! 1. **Key diversification**: the order identifier is encrypted with the
//!    merchant secret (triple-DES, CBC, zero IV, zero padding to the 8-byte
//!    block). The ciphertext is the per-order signing key.
//! 2. **MAC**: HMAC-SHA256 over the transport-encoded parameter set, keyed
//!    with the diversified key, transmitted as base64url (`-_` alphabet,
//!    padding kept).
//!
//! Triple-DES is a compatibility constraint of the counterparty, not a
//! security choice. It lives behind [`KeyDiversifier`] so a protocol upgrade
//! only replaces one type.
//!
//! ## Security
//!
//! - Verification compares raw MAC bytes in constant time (`subtle`)
//! - Derived keys are zeroized on drop
//! - A mismatch is a `false`, never an error

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use cbc::cipher::block_padding::ZeroPadding;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::{RedsysError, Result};

/// Literal tag identifying this signing scheme on the wire.
pub const SIGNATURE_VERSION: &str = "HMAC_SHA256_V1";

/// Length of a raw HMAC-SHA256 output.
pub const SIGNATURE_LEN: usize = 32;

/// Triple-DES (EDE3) key size in bytes.
pub const TDES_KEY_LEN: usize = 24;

type HmacSha256 = Hmac<Sha256>;
type TdesCbcEncryptor = cbc::Encryptor<des::TdesEde3>;

/// Derives a per-order signing key from the merchant secret.
pub trait KeyDiversifier: Send + Sync {
    /// Derive the signing key for `diversifier` (the order identifier).
    fn derive_key(&self, secret: &[u8], diversifier: &str) -> Result<Zeroizing<Vec<u8>>>;
}

/// The gateway's mandated diversification: 3DES-EDE3-CBC, zero IV, zero padding.
#[derive(Clone, Copy, Debug, Default)]
pub struct TripleDesDiversifier;

impl TripleDesDiversifier {
    /// Expand the secret to a 24-byte EDE3 key.
    ///
    /// Shorter secrets are right-padded with zero bytes; longer ones are
    /// rejected.
    fn expand_key(secret: &[u8]) -> Result<Zeroizing<[u8; TDES_KEY_LEN]>> {
        if secret.is_empty() {
            return Err(RedsysError::InvalidSecret("secret is empty".into()));
        }
        if secret.len() > TDES_KEY_LEN {
            return Err(RedsysError::InvalidSecret(format!(
                "secret is {} bytes, triple-DES takes at most {}",
                secret.len(),
                TDES_KEY_LEN
            )));
        }
        let mut key = Zeroizing::new([0u8; TDES_KEY_LEN]);
        key[..secret.len()].copy_from_slice(secret);
        Ok(key)
    }
}

impl KeyDiversifier for TripleDesDiversifier {
    fn derive_key(&self, secret: &[u8], diversifier: &str) -> Result<Zeroizing<Vec<u8>>> {
        let key = Self::expand_key(secret)?;
        let iv = [0u8; 8];
        let encryptor = TdesCbcEncryptor::new_from_slices(&key[..], &iv)
            .map_err(|e| RedsysError::InvalidSecret(e.to_string()))?;
        Ok(Zeroizing::new(
            encryptor.encrypt_padded_vec_mut::<ZeroPadding>(diversifier.as_bytes()),
        ))
    }
}

/// Computes and verifies gateway signatures.
///
/// Holds no per-request state; one engine can serve any number of threads.
#[derive(Clone)]
pub struct SignatureEngine {
    diversifier: Arc<dyn KeyDiversifier>,
}

impl Default for SignatureEngine {
    fn default() -> Self {
        Self::new(TripleDesDiversifier)
    }
}

impl std::fmt::Debug for SignatureEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureEngine").finish_non_exhaustive()
    }
}

impl SignatureEngine {
    /// Create an engine with a specific key diversifier.
    pub fn new(diversifier: impl KeyDiversifier + 'static) -> Self {
        Self {
            diversifier: Arc::new(diversifier),
        }
    }

    /// Derive the per-order signing key.
    pub fn derive_key(&self, secret: &[u8], diversifier: &str) -> Result<Zeroizing<Vec<u8>>> {
        self.diversifier.derive_key(secret, diversifier)
    }

    /// HMAC-SHA256 over `encoded_parameters` with an already derived key.
    pub fn sign(&self, encoded_parameters: &str, derived_key: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
        let mut mac = HmacSha256::new_from_slice(derived_key)
            .map_err(|e| RedsysError::InvalidSecret(e.to_string()))?;
        mac.update(encoded_parameters.as_bytes());
        let digest = mac.finalize().into_bytes();

        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&digest);
        Ok(out)
    }

    /// Full signature as transmitted: base64url of the per-order HMAC.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, secret, encoded_parameters), fields(params_len = encoded_parameters.len())))]
    pub fn compute_signature(
        &self,
        secret: &[u8],
        diversifier: &str,
        encoded_parameters: &str,
    ) -> Result<String> {
        let raw = self.raw_signature(secret, diversifier, encoded_parameters)?;
        Ok(URL_SAFE.encode(raw))
    }

    /// Check a received signature against the recomputed one.
    ///
    /// The received text must be exactly the transmitted encoding; the raw
    /// MAC bytes are compared in constant time. Any mismatch, undecodable
    /// signature or unusable secret yields `false`.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, expected, secret, encoded_parameters)))]
    pub fn verify(
        &self,
        expected: &str,
        secret: &[u8],
        diversifier: &str,
        encoded_parameters: &str,
    ) -> bool {
        let Some(received) = decode_signature(expected) else {
            return false;
        };

        match self.raw_signature(secret, diversifier, encoded_parameters) {
            Ok(computed) => bool::from(received.as_slice().ct_eq(&computed[..])),
            Err(_err) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("signature recomputation failed: {}", _err);
                false
            }
        }
    }

    fn raw_signature(
        &self,
        secret: &[u8],
        diversifier: &str,
        encoded_parameters: &str,
    ) -> Result<[u8; SIGNATURE_LEN]> {
        let key = self.derive_key(secret, diversifier)?;
        self.sign(encoded_parameters, &key)
    }
}

/// Decode a transmitted signature to raw bytes.
///
/// Only canonical base64url with padding is accepted, so any change to the
/// transmitted text changes the result or fails to decode.
pub fn decode_signature(signature: &str) -> Option<Vec<u8>> {
    URL_SAFE.decode(signature.as_bytes()).ok()
}

/// Check that a signature decodes to exactly one HMAC-SHA256 output.
pub fn is_well_formed(signature: &str) -> bool {
    decode_signature(signature).is_some_and(|raw| raw.len() == SIGNATURE_LEN)
}

/// Derive the per-order key with the gateway's triple-DES scheme.
pub fn derive_key(secret: &[u8], diversifier: &str) -> Result<Zeroizing<Vec<u8>>> {
    TripleDesDiversifier.derive_key(secret, diversifier)
}

/// HMAC-SHA256 over `encoded_parameters`.
pub fn sign(encoded_parameters: &str, derived_key: &[u8]) -> Result<[u8; SIGNATURE_LEN]> {
    SignatureEngine::default().sign(encoded_parameters, derived_key)
}

/// Compute the transmitted signature with the default engine.
pub fn compute_signature(secret: &[u8], diversifier: &str, encoded_parameters: &str) -> Result<String> {
    SignatureEngine::default().compute_signature(secret, diversifier, encoded_parameters)
}

/// Verify a transmitted signature with the default engine.
pub fn verify(expected: &str, secret: &[u8], diversifier: &str, encoded_parameters: &str) -> bool {
    SignatureEngine::default().verify(expected, secret, diversifier, encoded_parameters)
}
