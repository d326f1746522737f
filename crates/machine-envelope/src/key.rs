use std::fmt;

use crate::error::{EnvelopeError, Result};

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// CBC initialization vector length in bytes
pub const IV_LEN: usize = 16;

/// Process-wide key material for the envelope codec
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl EnvelopeKey {
    pub fn new(key: [u8; KEY_LEN], iv: [u8; IV_LEN]) -> Self {
        Self { key, iv }
    }

    /// Parses key material from configuration strings
    ///
    /// Each value is accepted either as hex (twice the byte length) or as raw
    /// characters of exactly the byte length.
    ///
    /// # Example
    /// ```
    /// use machine_envelope::EnvelopeKey;
    ///
    /// let key = EnvelopeKey::from_config(
    ///     "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
    ///     "0123456789abcdef",
    /// )
    /// .unwrap();
    /// assert_eq!(key.iv(), b"0123456789abcdef");
    /// ```
    pub fn from_config(key: &str, iv: &str) -> Result<Self> {
        Ok(Self {
            key: parse_material::<KEY_LEN>(key)?,
            iv: parse_material::<IV_LEN>(iv)?,
        })
    }

    pub fn key(&self) -> &[u8; KEY_LEN] {
        &self.key
    }

    pub fn iv(&self) -> &[u8; IV_LEN] {
        &self.iv
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("key", &"<redacted>")
            .field("iv", &"<redacted>")
            .finish()
    }
}

fn parse_material<const N: usize>(value: &str) -> Result<[u8; N]> {
    let bytes = if value.len() == N * 2 {
        hex::decode(value).map_err(|e| EnvelopeError::InvalidHex(e.to_string()))?
    } else if value.len() == N {
        value.as_bytes().to_vec()
    } else {
        return Err(EnvelopeError::InvalidKeyLength {
            expected: N,
            actual: value.len(),
        });
    };

    bytes
        .try_into()
        .map_err(|rejected: Vec<u8>| EnvelopeError::InvalidKeyLength {
            expected: N,
            actual: rejected.len(),
        })
}
