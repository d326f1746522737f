use std::sync::Arc;

use chrono::{DateTime, Utc};
use machine_envelope::EnvelopeCodec;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::envelope::{
    ensure_supported_operators, normalize_condition, normalize_record, parse_fields, Command,
    CommandEnvelope, Page, Record,
};
use crate::error::{DomainError, DomainResult};
use crate::folder::Folder;
use crate::repository::{
    FolderRepository, InsertRecordInput, SelectRecordsInput, UpdateRecordsInput,
};
use crate::timestamp::{format_compact, parse_timestamp};
use crate::transport::{Credentials, EnvelopeIdentity, ResponsePayload, TransportPayload};

pub const RESPONSE_CODE_OK: &str = "200";

/// Column holding the store-generated primary key
pub const ID_COLUMN: &str = "id";

/// Backend half of the envelope protocol
///
/// Opens a transport payload, validates the command it carries, runs it against
/// the folder repository and seals the result into a response payload.
pub struct EnvelopeService {
    repository: Arc<dyn FolderRepository>,
    codec: Arc<dyn EnvelopeCodec>,
    identity: EnvelopeIdentity,
    credentials: Credentials,
}

impl EnvelopeService {
    pub fn new(
        repository: Arc<dyn FolderRepository>,
        codec: Arc<dyn EnvelopeCodec>,
        identity: EnvelopeIdentity,
        credentials: Credentials,
    ) -> Self {
        Self {
            repository,
            codec,
            identity,
            credentials,
        }
    }

    pub async fn handle(&self, payload: TransportPayload) -> DomainResult<ResponsePayload> {
        self.handle_at(payload, Utc::now()).await
    }

    pub async fn handle_at(
        &self,
        payload: TransportPayload,
        now: DateTime<Utc>,
    ) -> DomainResult<ResponsePayload> {
        self.authenticate(&payload)?;
        parse_timestamp(&payload.timestamp)?;

        let envelope = self.open(&payload.message)?;
        let folder: Folder = envelope.folder.parse()?;
        let command = envelope.command;

        debug!(
            uniqueid = %payload.uniqueid,
            folder = %folder,
            command = %command,
            "Handling envelope"
        );

        let result = match command {
            Command::Insert => self.insert(folder, envelope).await?,
            Command::Update => self.update(folder, envelope).await?,
            Command::Select => self.select(folder, envelope).await?,
        };

        let plaintext = serde_json::to_string_pretty(&result)?;
        let response = ResponsePayload {
            uniqueid: payload.uniqueid,
            timestamp: format_compact(now),
            code: RESPONSE_CODE_OK.to_string(),
            message: self.codec.encode(&plaintext),
        };

        info!(folder = %folder, command = %command, "Envelope handled");
        Ok(response)
    }

    fn authenticate(&self, payload: &TransportPayload) -> DomainResult<()> {
        let matches: bool = payload
            .apikey
            .as_bytes()
            .ct_eq(self.credentials.api_key.as_bytes())
            .into();

        if !matches {
            warn!(uniqueid = %payload.uniqueid, "Rejected envelope with invalid api key");
            return Err(DomainError::Unauthorized);
        }
        Ok(())
    }

    fn open(&self, message: &str) -> DomainResult<CommandEnvelope> {
        let plaintext = self
            .codec
            .decode(message)
            .map_err(|e| DomainError::Decode(e.to_string()))?;

        let envelope: CommandEnvelope = serde_json::from_str(&plaintext)
            .map_err(|e| DomainError::InvalidEnvelope(e.to_string()))?;

        if envelope.datacore != self.identity.datacore {
            return Err(DomainError::InvalidEnvelope(format!(
                "unexpected datacore {:?}",
                envelope.datacore
            )));
        }

        Ok(envelope)
    }

    async fn insert(&self, folder: Folder, envelope: CommandEnvelope) -> DomainResult<Value> {
        let record = assignable_record(envelope.record)?;

        let mut stored = self
            .repository
            .insert_record(InsertRecordInput { folder, record })
            .await?;
        stored.remove(ID_COLUMN);

        Ok(json!({ "record": stored, "affected": 1 }))
    }

    async fn update(&self, folder: Folder, envelope: CommandEnvelope) -> DomainResult<Value> {
        let record = assignable_record(envelope.record)?;
        let condition = envelope
            .condition
            .filter(|c| !c.is_empty())
            .ok_or_else(|| {
                DomainError::InvalidEnvelope("UPDATE requires a condition".to_string())
            })?;
        ensure_supported_operators(&condition)?;

        let affected = self
            .repository
            .update_records(UpdateRecordsInput {
                folder,
                record: record.clone(),
                condition: normalize_condition(condition),
            })
            .await?;

        if affected == 0 {
            return Err(DomainError::NotFound(format!(
                "no {} row matched the condition",
                folder
            )));
        }

        Ok(json!({ "record": record, "affected": affected }))
    }

    async fn select(&self, folder: Folder, envelope: CommandEnvelope) -> DomainResult<Value> {
        let condition = envelope.condition.unwrap_or_default();
        ensure_supported_operators(&condition)?;
        let scoped = !condition.is_empty();
        let page = Page::parse(envelope.pageno.as_deref(), envelope.recordperpage.as_deref())?;

        let rows = self
            .repository
            .select_records(SelectRecordsInput {
                folder,
                fields: parse_fields(envelope.fields.as_deref()),
                condition: normalize_condition(condition),
                page,
            })
            .await?;

        if scoped && rows.is_empty() {
            return Err(DomainError::NotFound(format!(
                "no {} row matched the condition",
                folder
            )));
        }

        debug!(folder = %folder, count = rows.len(), "Selected rows");
        Ok(json!({ "data": rows }))
    }
}

/// Normalizes a record for INSERT/UPDATE; the primary key is never assignable
pub(crate) fn assignable_record(record: Option<Record>) -> DomainResult<Record> {
    let mut record = normalize_record(record.unwrap_or_default());
    record.remove(ID_COLUMN);

    if record.is_empty() {
        return Err(DomainError::InvalidEnvelope(
            "record must contain at least one column".to_string(),
        ));
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_builder::CommandBuilder;
    use crate::envelope::{Comparator, ConditionClause};
    use crate::repository::MockFolderRepository;
    use crate::transport::LocalDb;
    use chrono::TimeZone;
    use machine_envelope::{EnvelopeKey, FixedIvAesCbcCodec, IV_LEN, KEY_LEN};

    fn codec() -> Arc<dyn EnvelopeCodec> {
        Arc::new(FixedIvAesCbcCodec::new(EnvelopeKey::new(
            [0x5a; KEY_LEN],
            [0xa5; IV_LEN],
        )))
    }

    fn identity() -> EnvelopeIdentity {
        EnvelopeIdentity::new("MACHINE", "GRP", "PROP")
    }

    fn credentials() -> Credentials {
        Credentials::new("api-key", "uid-1")
    }

    fn builder() -> CommandBuilder {
        CommandBuilder::new(codec(), identity(), credentials())
    }

    fn service(repo: MockFolderRepository) -> EnvelopeService {
        EnvelopeService::new(Arc::new(repo), codec(), identity(), credentials())
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn open(response: &ResponsePayload) -> Value {
        builder().open_response(response).unwrap()
    }

    fn payload_for(plaintext: &str) -> TransportPayload {
        TransportPayload {
            apikey: "api-key".to_string(),
            uniqueid: "uid-1".to_string(),
            timestamp: "2024-05-06T07:08:09Z".to_string(),
            localdb: LocalDb::No,
            message: codec().encode(plaintext),
        }
    }

    #[tokio::test]
    async fn test_update_strips_id_from_response() {
        let mut mock_repo = MockFolderRepository::new();

        mock_repo
            .expect_update_records()
            .withf(|input: &UpdateRecordsInput| {
                input.folder == Folder::MachineType
                    && input.record.get("objecttype") == Some(&json!("ABC"))
                    && !input.record.contains_key("id")
                    && input.condition.get("id") == Some(&ConditionClause::equals(1))
            })
            .times(1)
            .return_once(|_| Ok(1));

        let builder = builder();
        let envelope = builder.build_update(
            Folder::MachineType,
            record(json!({"id": 1, "objecttype": "ABC", "description": "Test", "active": "Y"})),
            record(json!({"id": 1})),
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let response = service(mock_repo).handle_at(payload, now()).await.unwrap();

        assert_eq!(response.code, "200");
        assert_eq!(response.uniqueid, "uid-1");
        assert_eq!(response.timestamp, "20240506070809");
        let result = open(&response);
        assert_eq!(
            result["record"],
            json!({"objecttype": "ABC", "description": "Test", "active": "Y"})
        );
        assert_eq!(result["affected"], json!(1));
    }

    #[tokio::test]
    async fn test_update_no_rows_is_not_found() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_update_records()
            .times(1)
            .return_once(|_| Ok(0));

        let builder = builder();
        let envelope = builder.build_update(
            Folder::MachineType,
            record(json!({"description": "x"})),
            record(json!({"id": 999})),
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_without_condition_rejected() {
        let mock_repo = MockFolderRepository::new();
        let builder = builder();
        let envelope = builder.build_update(
            Folder::MachineType,
            record(json!({"description": "x"})),
            Record::new(),
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::InvalidEnvelope(_))));
    }

    #[tokio::test]
    async fn test_unsupported_operator_never_reaches_store() {
        let mock_repo = MockFolderRepository::new();
        let builder = builder();
        let mut envelope = builder.build_update(
            Folder::MachineType,
            record(json!({"description": "x"})),
            record(json!({"id": 1})),
        );
        if let Some(condition) = envelope.condition.as_mut() {
            condition.insert(
                "objecttype".to_string(),
                ConditionClause {
                    operator: Comparator::Unsupported("gt".to_string()),
                    value: json!("A"),
                },
            );
        }
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::UnsupportedOperator(_))));
    }

    #[tokio::test]
    async fn test_unknown_folder_rejected() {
        let mock_repo = MockFolderRepository::new();
        let payload = payload_for(
            r#"{"datacore":"MACHINE","folder":"NOPE","command":"SELECT","group":"G","property":"P"}"#,
        );

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::UnknownEntity(name)) if name == "NOPE"));
    }

    #[tokio::test]
    async fn test_insert_strips_legacy_quotes() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_insert_record()
            .withf(|input: &InsertRecordInput| {
                input.folder == Folder::Vendor && input.record.get("vendorname") == Some(&json!("Acme"))
            })
            .times(1)
            .return_once(|input| {
                let mut stored = input.record;
                stored.insert("id".to_string(), json!(7));
                Ok(stored)
            });

        let builder = builder();
        let envelope = builder.build_insert(Folder::Vendor, record(json!({"vendorname": "'Acme'"})));
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let response = service(mock_repo).handle_at(payload, now()).await.unwrap();
        let result = open(&response);

        assert_eq!(result["record"], json!({"vendorname": "Acme"}));
        assert_eq!(result["affected"], json!(1));
    }

    #[tokio::test]
    async fn test_select_returns_data_page() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_select_records()
            .withf(|input: &SelectRecordsInput| {
                input.folder == Folder::MachineGroup
                    && input.fields == vec!["id".to_string(), "groupname".to_string()]
                    && input.page == Page { number: 2, size: 10 }
                    && input.condition.get("machinetypeid") == Some(&ConditionClause::equals("3"))
            })
            .times(1)
            .return_once(|_| Ok(vec![record(json!({"id": 11, "groupname": "Press"}))]));

        let builder = builder();
        let envelope = builder.build_select(
            Folder::MachineGroup,
            Some("id,groupname"),
            record(json!({"machinetypeid": "'3'"})),
            Some(2),
            Some(10),
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let response = service(mock_repo).handle_at(payload, now()).await.unwrap();
        assert_eq!(
            open(&response),
            json!({"data": [{"id": 11, "groupname": "Press"}]})
        );
    }

    #[tokio::test]
    async fn test_select_by_condition_without_match_is_not_found() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_select_records()
            .withf(|input: &SelectRecordsInput| {
                input.condition.get("id") == Some(&ConditionClause::equals(999))
            })
            .times(1)
            .return_once(|_| Ok(vec![]));

        let builder = builder();
        let envelope = builder.build_select(
            Folder::MachineType,
            None,
            record(json!({"id": 999})),
            None,
            None,
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unscoped_select_may_return_empty_page() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_select_records()
            .times(1)
            .return_once(|_| Ok(vec![]));

        let builder = builder();
        let envelope =
            builder.build_select(Folder::Vendor, None, Record::new(), Some(9), None);
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let response = service(mock_repo).handle_at(payload, now()).await.unwrap();
        assert_eq!(open(&response), json!({"data": []}));
    }

    #[tokio::test]
    async fn test_insert_response_reflects_stored_row() {
        let mut mock_repo = MockFolderRepository::new();
        mock_repo
            .expect_insert_record()
            .times(1)
            .return_once(|input| {
                let mut stored = input.record;
                stored.insert("id".to_string(), json!(12));
                stored.insert("active".to_string(), json!("Y"));
                stored.insert("description".to_string(), Value::Null);
                Ok(stored)
            });

        let builder = builder();
        let envelope = builder.build_insert(
            Folder::MachineType,
            record(json!({"objecttype": "LATHE"})),
        );
        let payload = builder.wrap_at(&envelope, now()).unwrap();

        let response = service(mock_repo).handle_at(payload, now()).await.unwrap();
        let result = open(&response);

        assert_eq!(
            result["record"],
            json!({"objecttype": "LATHE", "active": "Y", "description": null})
        );
        assert!(result["record"].get("id").is_none());
    }

    #[tokio::test]
    async fn test_wrong_api_key_rejected_before_decrypt() {
        let mock_repo = MockFolderRepository::new();
        let mut payload = payload_for("not even ciphertext");
        payload.apikey = "guess".to_string();
        payload.message = "ZZZZ".to_string();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_corrupt_message_is_decode_error() {
        let mock_repo = MockFolderRepository::new();
        let mut payload = payload_for("{}");
        payload.message = "00112233".to_string();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::Decode(_))));
    }

    #[tokio::test]
    async fn test_non_json_plaintext_is_invalid_envelope() {
        let mock_repo = MockFolderRepository::new();
        let payload = payload_for("hello");

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::InvalidEnvelope(_))));
    }

    #[tokio::test]
    async fn test_foreign_datacore_rejected() {
        let mock_repo = MockFolderRepository::new();
        let payload = payload_for(
            r#"{"datacore":"BILLING","folder":"VENDOR","command":"SELECT","group":"G","property":"P"}"#,
        );

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::InvalidEnvelope(_))));
    }

    #[tokio::test]
    async fn test_bad_timestamp_rejected() {
        let mock_repo = MockFolderRepository::new();
        let mut payload = payload_for("{}");
        payload.timestamp = "later".to_string();

        let result = service(mock_repo).handle_at(payload, now()).await;
        assert!(matches!(result, Err(DomainError::InvalidTimestamp(_))));
    }
}
