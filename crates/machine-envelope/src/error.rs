use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("invalid ciphertext length: {0} bytes is not a positive multiple of the block size")]
    InvalidLength(usize),

    #[error("decryption failed")]
    Decrypt,

    #[error("decrypted message is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid key material length: expected {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, EnvelopeError>;
