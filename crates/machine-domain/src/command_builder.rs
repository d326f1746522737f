use std::sync::Arc;

use chrono::{DateTime, Utc};
use machine_envelope::EnvelopeCodec;
use serde_json::Value;

use crate::envelope::{Command, CommandEnvelope, Condition, ConditionClause, Record};
use crate::error::{DomainError, DomainResult};
use crate::folder::Folder;
use crate::timestamp::format_compact;
use crate::transport::{Credentials, EnvelopeIdentity, ResponsePayload, TransportPayload};

/// Client half of the envelope protocol
///
/// Builds command envelopes for a folder, seals them into transport payloads
/// and opens server responses, all with the codec it was constructed with.
pub struct CommandBuilder {
    codec: Arc<dyn EnvelopeCodec>,
    identity: EnvelopeIdentity,
    credentials: Credentials,
}

impl CommandBuilder {
    pub fn new(
        codec: Arc<dyn EnvelopeCodec>,
        identity: EnvelopeIdentity,
        credentials: Credentials,
    ) -> Self {
        Self {
            codec,
            identity,
            credentials,
        }
    }

    fn envelope(&self, folder: Folder, command: Command) -> CommandEnvelope {
        CommandEnvelope {
            datacore: self.identity.datacore.clone(),
            folder: folder.name().to_string(),
            command,
            group: self.identity.group.clone(),
            property: self.identity.property.clone(),
            record: None,
            condition: None,
            fields: None,
            pageno: None,
            recordperpage: None,
        }
    }

    pub fn build_insert(&self, folder: Folder, record: Record) -> CommandEnvelope {
        CommandEnvelope {
            record: Some(record),
            ..self.envelope(folder, Command::Insert)
        }
    }

    /// Every condition entry becomes an equality clause. Cardinality of the
    /// match is the caller's concern.
    pub fn build_update(&self, folder: Folder, record: Record, condition: Record) -> CommandEnvelope {
        CommandEnvelope {
            record: Some(record),
            condition: Some(equality_condition(condition)),
            ..self.envelope(folder, Command::Update)
        }
    }

    pub fn build_select(
        &self,
        folder: Folder,
        fields: Option<&str>,
        condition: Record,
        pageno: Option<u32>,
        recordperpage: Option<u32>,
    ) -> CommandEnvelope {
        CommandEnvelope {
            condition: (!condition.is_empty()).then(|| equality_condition(condition)),
            fields: Some(fields.unwrap_or("*").to_string()),
            pageno: pageno.map(|n| n.to_string()),
            recordperpage: recordperpage.map(|n| n.to_string()),
            ..self.envelope(folder, Command::Select)
        }
    }

    pub fn wrap(&self, envelope: &CommandEnvelope) -> DomainResult<TransportPayload> {
        self.wrap_at(envelope, Utc::now())
    }

    /// Serializes the envelope as pretty JSON, encrypts it and stamps the
    /// static credentials with the given time
    pub fn wrap_at(
        &self,
        envelope: &CommandEnvelope,
        at: DateTime<Utc>,
    ) -> DomainResult<TransportPayload> {
        let plaintext = serde_json::to_string_pretty(envelope)?;

        Ok(TransportPayload {
            apikey: self.credentials.api_key.clone(),
            uniqueid: self.credentials.unique_id.clone(),
            timestamp: format_compact(at),
            localdb: self.credentials.local_db,
            message: self.codec.encode(&plaintext),
        })
    }

    /// Decrypts a server response `message` into its JSON result
    pub fn open_response(&self, response: &ResponsePayload) -> DomainResult<Value> {
        let plaintext = self
            .codec
            .decode(&response.message)
            .map_err(|e| DomainError::Decode(e.to_string()))?;

        serde_json::from_str(&plaintext)
            .map_err(|e| DomainError::InvalidEnvelope(format!("response is not JSON: {}", e)))
    }
}

fn equality_condition(condition: Record) -> Condition {
    condition
        .into_iter()
        .map(|(column, value)| (column, ConditionClause::equals(value)))
        .collect()
}
