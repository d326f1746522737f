//! Symmetric message envelope used between the admin panel and its backend.
//!
//! Plaintext (normally pretty-printed JSON) is padded with PKCS#7, encrypted with
//! AES-256 in CBC mode and rendered as uppercase hex. The IV is shared out of band
//! and never prefixed to the ciphertext.
//!
//! The wire-compatible codec uses one process-wide key/IV pair, so identical
//! plaintext always produces identical ciphertext. Callers depend on the
//! [`EnvelopeCodec`] trait rather than on [`FixedIvAesCbcCodec`] so a hardened
//! variant (random IV, authenticated encryption) can be swapped in later.

pub mod codec;
mod error;
mod key;

pub use codec::{decode, decrypt_bytes, encode, encrypt_bytes, FixedIvAesCbcCodec};
pub use error::{EnvelopeError, Result};
pub use key::{EnvelopeKey, IV_LEN, KEY_LEN};

/// Strategy for turning envelope plaintext into transport ciphertext and back
pub trait EnvelopeCodec: Send + Sync {
    /// Encrypt `plaintext` into a hex string
    fn encode(&self, plaintext: &str) -> String;

    /// Decrypt a hex string produced by [`EnvelopeCodec::encode`]
    ///
    /// Fails without returning partial output when the hex is malformed, the
    /// length is wrong, or the padding does not verify.
    fn decode(&self, ciphertext: &str) -> Result<String>;
}
