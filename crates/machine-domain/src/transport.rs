use std::fmt;

use serde::{Deserialize, Serialize};

/// `localdb` flag; carried through but never branched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LocalDb {
    #[serde(rename = "Y")]
    Yes,
    #[default]
    #[serde(rename = "N")]
    No,
}

/// Outer HTTP body wrapping an encrypted command envelope
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportPayload {
    pub apikey: String,
    pub uniqueid: String,
    pub timestamp: String,
    pub localdb: LocalDb,
    pub message: String,
}

impl fmt::Debug for TransportPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportPayload")
            .field("apikey", &"<redacted>")
            .field("uniqueid", &self.uniqueid)
            .field("timestamp", &self.timestamp)
            .field("localdb", &self.localdb)
            .field("message_len", &self.message.len())
            .finish()
    }
}

/// Server reply; `message` is the hex ciphertext of the result JSON
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponsePayload {
    pub uniqueid: String,
    pub timestamp: String,
    pub code: String,
    pub message: String,
}

/// Static transport credentials loaded once at startup
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub unique_id: String,
    pub local_db: LocalDb,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, unique_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            unique_id: unique_id.into(),
            local_db: LocalDb::No,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("unique_id", &self.unique_id)
            .field("local_db", &self.local_db)
            .finish()
    }
}

/// Constant tags stamped on every envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeIdentity {
    pub datacore: String,
    pub group: String,
    pub property: String,
}

impl EnvelopeIdentity {
    pub fn new(
        datacore: impl Into<String>,
        group: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            datacore: datacore.into(),
            group: group.into(),
            property: property.into(),
        }
    }
}
