use aes::Aes256;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::error::{EnvelopeError, Result};
use crate::key::{EnvelopeKey, IV_LEN, KEY_LEN};
use crate::EnvelopeCodec;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

const BLOCK_LEN: usize = 16;

/// Encrypts raw bytes with AES-256-CBC and PKCS#7 padding
pub fn encrypt_bytes(plaintext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Vec<u8> {
    Aes256CbcEnc::new(&(*key).into(), &(*iv).into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
}

/// Decrypts AES-256-CBC ciphertext and strips PKCS#7 padding
pub fn decrypt_bytes(ciphertext: &[u8], key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(EnvelopeError::InvalidLength(ciphertext.len()));
    }

    Aes256CbcDec::new(&(*key).into(), &(*iv).into())
        .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
        .map_err(|_| EnvelopeError::Decrypt)
}

/// Encodes UTF-8 plaintext into uppercase hex ciphertext
pub fn encode(plaintext: &str, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> String {
    hex::encode_upper(encrypt_bytes(plaintext.as_bytes(), key, iv))
}

/// Decodes hex ciphertext (either case) back into UTF-8 plaintext
pub fn decode(ciphertext_hex: &str, key: &[u8; KEY_LEN], iv: &[u8; IV_LEN]) -> Result<String> {
    let ciphertext =
        hex::decode(ciphertext_hex.trim()).map_err(|e| EnvelopeError::InvalidHex(e.to_string()))?;
    let plaintext = decrypt_bytes(&ciphertext, key, iv)?;
    String::from_utf8(plaintext).map_err(|_| EnvelopeError::InvalidUtf8)
}

/// Wire-compatible codec with a single fixed key/IV pair
///
/// Encryption is deterministic: the same plaintext always yields the same
/// ciphertext.
#[derive(Debug, Clone)]
pub struct FixedIvAesCbcCodec {
    key: EnvelopeKey,
}

impl FixedIvAesCbcCodec {
    pub fn new(key: EnvelopeKey) -> Self {
        Self { key }
    }
}

impl EnvelopeCodec for FixedIvAesCbcCodec {
    fn encode(&self, plaintext: &str) -> String {
        encode(plaintext, self.key.key(), self.key.iv())
    }

    fn decode(&self, ciphertext: &str) -> Result<String> {
        decode(ciphertext, self.key.key(), self.key.iv())
    }
}
