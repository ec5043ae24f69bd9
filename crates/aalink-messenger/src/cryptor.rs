//! Injected encryption seam.
//!
//! After the TLS handshake every frame payload is one TLS record. The
//! messenger does not know TLS; it hands each frame payload to a
//! [`Cryptor`] supplied by the orchestrator. Thread safety is the
//! implementor's concern; the messenger only calls it from its own tasks.

use bytes::Bytes;

/// Failure surface of a cryptor implementation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CryptorError {
    /// The TLS handshake has not completed or failed.
    #[error("tls handshake failed: {0}")]
    Handshake(String),

    /// Encrypting a record failed.
    #[error("failed to encrypt record: {0}")]
    Encrypt(String),

    /// Decrypting a record failed.
    #[error("failed to decrypt record: {0}")]
    Decrypt(String),

    /// The configured certificate could not be loaded.
    #[error("failed to read certificate")]
    ReadCertificate,

    /// The configured private key could not be loaded.
    #[error("failed to read private key")]
    ReadPrivateKey,
}

/// Encrypts and decrypts frame payloads.
///
/// Each call covers exactly one frame payload; a fragmented message is
/// encrypted record by record.
pub trait Cryptor: Send + Sync + 'static {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Bytes, CryptorError>;
    fn decrypt(&self, ciphertext: &[u8]) -> Result<Bytes, CryptorError>;
}

/// Pass-through cryptor for pipelines that only carry plain frames, and
/// for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCryptor;

impl Cryptor for NullCryptor {
    fn encrypt(&self, plaintext: &[u8]) -> Result<Bytes, CryptorError> {
        Ok(Bytes::copy_from_slice(plaintext))
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<Bytes, CryptorError> {
        Ok(Bytes::copy_from_slice(ciphertext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_cryptor_is_identity() {
        let cryptor = NullCryptor;
        let data = b"record bytes";
        assert_eq!(cryptor.encrypt(data).unwrap().as_ref(), data);
        assert_eq!(cryptor.decrypt(data).unwrap().as_ref(), data);
    }
}
