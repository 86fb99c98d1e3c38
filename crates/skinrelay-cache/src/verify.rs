//! Textures signature verification.
//!
//! Upstream signs the base64 `value` string with RSA PKCS#1 v1.5 over SHA-1.
//! Verification needs the session service public key; without one nothing
//! verifies unless the structural mode was chosen explicitly, in which case
//! only the shape is checked: the signature must be base64 and the value
//! must be a textures payload.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::DecodePublicKey;
use rsa::signature::Verifier;
use rsa::RsaPublicKey;
use sha1::Sha1;
use skinrelay_common::TexturesPayload;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{SignatureCheck, UpstreamConfig};
use crate::error::{SkinError, SkinResult};

#[derive(Debug, Clone)]
enum Check {
    Key(VerifyingKey<Sha1>),
    /// Verification wanted, no key available.
    NoKey,
    Structural,
}

/// Defaults to verifying without a key, which rejects every signature.
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    check: Check,
}

impl Default for SignatureVerifier {
    fn default() -> Self {
        Self { check: Check::NoKey }
    }
}

impl SignatureVerifier {
    /// Verifier checking signatures against `pem` (SPKI); `None` rejects everything.
    pub fn new(pem: Option<&str>) -> SkinResult<Self> {
        match pem {
            Some(pem) => Ok(Self::keyed(parse_pem(pem)?)),
            None => Ok(Self::default()),
        }
    }

    /// Build the verifier an upstream configuration asks for.
    pub fn from_config(config: &UpstreamConfig) -> SkinResult<Self> {
        if config.signature_verification == SignatureCheck::Structural {
            warn!("textures signatures are not verified (structural mode)");
            return Ok(Self::structural());
        }
        if let Some(pem) = &config.signature_public_key_pem {
            return Self::new(Some(pem));
        }
        if let Some(path) = &config.signature_public_key_path {
            return Ok(Self::keyed(read_key_file(path)?));
        }
        warn!("no signature public key configured, every signed property will be rejected");
        Ok(Self::default())
    }

    /// Shape checks only.
    pub fn structural() -> Self {
        Self {
            check: Check::Structural,
        }
    }

    fn keyed(key: RsaPublicKey) -> Self {
        Self {
            check: Check::Key(VerifyingKey::<Sha1>::new(key)),
        }
    }

    pub fn has_key(&self) -> bool {
        matches!(self.check, Check::Key(_))
    }

    /// Verify a property not bound to a particular profile (generated or uploaded skins).
    pub fn verify(&self, value: &str, signature: &str) -> SkinResult<TexturesPayload> {
        let signature_bytes = decode_signature(signature)?;

        let payload = TexturesPayload::decode(value).map_err(|e| SkinError::InvalidSignature {
            reason: format!("value is not a textures payload: {}", e),
        })?;

        match &self.check {
            Check::Key(key) => {
                let signature =
                    Signature::try_from(signature_bytes.as_slice()).map_err(|e| {
                        SkinError::InvalidSignature {
                            reason: format!("malformed signature: {}", e),
                        }
                    })?;
                key.verify(value.as_bytes(), &signature)
                    .map_err(|_| SkinError::InvalidSignature {
                        reason: "signature does not match textures payload".to_string(),
                    })?;
                debug!(hash = ?payload.texture_hash(), "textures signature verified");
            }
            Check::NoKey => {
                return Err(SkinError::InvalidSignature {
                    reason: "no signature public key configured".to_string(),
                })
            }
            Check::Structural => {}
        }

        Ok(payload)
    }

    /// Verify a property that must describe `expected`'s own profile.
    pub fn verify_profile(
        &self,
        expected: Uuid,
        value: &str,
        signature: &str,
    ) -> SkinResult<TexturesPayload> {
        let payload = self.verify(value, signature)?;
        match payload.profile_uuid() {
            Some(id) if id == expected => Ok(payload),
            Some(id) => Err(SkinError::InvalidSignature {
                reason: format!("payload belongs to {} not {}", id, expected),
            }),
            None => Err(SkinError::InvalidSignature {
                reason: "payload carries no profile id".to_string(),
            }),
        }
    }
}

fn parse_pem(pem: &str) -> SkinResult<RsaPublicKey> {
    RsaPublicKey::from_public_key_pem(pem.trim()).map_err(|e| SkinError::Config {
        message: format!("invalid signature public key: {}", e),
    })
}

fn read_key_file(path: &Path) -> SkinResult<RsaPublicKey> {
    let bytes = std::fs::read(path).map_err(|e| SkinError::Config {
        message: format!("cannot read signature public key {}: {}", path.display(), e),
    })?;
    if bytes.starts_with(b"-----BEGIN") {
        let pem = String::from_utf8_lossy(&bytes);
        return parse_pem(&pem);
    }
    RsaPublicKey::from_public_key_der(&bytes).map_err(|e| SkinError::Config {
        message: format!("invalid signature public key {}: {}", path.display(), e),
    })
}

fn decode_signature(signature: &str) -> SkinResult<Vec<u8>> {
    let bytes = BASE64
        .decode(signature.trim())
        .map_err(|e| SkinError::InvalidSignature {
            reason: format!("signature is not base64: {}", e),
        })?;
    if bytes.is_empty() {
        return Err(SkinError::InvalidSignature {
            reason: "signature is empty".to_string(),
        });
    }
    Ok(bytes)
}
