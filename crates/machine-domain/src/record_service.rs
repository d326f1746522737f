use std::sync::Arc;

use tracing::{debug, info};

use crate::envelope::{Condition, ConditionClause, Page, Record};
use crate::envelope_service::{assignable_record, ID_COLUMN};
use crate::error::{DomainError, DomainResult};
use crate::folder::Folder;
use crate::repository::{
    FolderRepository, InsertRecordInput, SelectRecordsInput, UpdateRecordsInput,
};

/// Plain CRUD over folder tables, used by the non-enveloped REST routes
pub struct RecordService {
    repository: Arc<dyn FolderRepository>,
}

impl RecordService {
    pub fn new(repository: Arc<dyn FolderRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, folder: Folder, page: Page) -> DomainResult<Vec<Record>> {
        debug!(folder = %folder, page = page.number, "Listing records");

        let records = self
            .repository
            .select_records(SelectRecordsInput {
                folder,
                fields: Vec::new(),
                condition: Condition::new(),
                page,
            })
            .await?;

        info!(folder = %folder, count = records.len(), "Listed records");
        Ok(records)
    }

    pub async fn get(&self, folder: Folder, id: i64) -> DomainResult<Record> {
        debug!(folder = %folder, id, "Getting record");

        self.repository
            .select_records(SelectRecordsInput {
                folder,
                fields: Vec::new(),
                condition: by_id(id),
                page: Page { number: 1, size: 1 },
            })
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::NotFound(format!("{} {}", folder, id)))
    }

    pub async fn create(&self, folder: Folder, record: Record) -> DomainResult<Record> {
        debug!(folder = %folder, "Creating record");

        let record = assignable_record(Some(record))?;
        let created = self
            .repository
            .insert_record(InsertRecordInput { folder, record })
            .await?;

        info!(folder = %folder, id = ?created.get(ID_COLUMN), "Record created successfully");
        Ok(created)
    }

    pub async fn update(&self, folder: Folder, id: i64, record: Record) -> DomainResult<Record> {
        debug!(folder = %folder, id, "Updating record");

        let record = assignable_record(Some(record))?;
        let affected = self
            .repository
            .update_records(UpdateRecordsInput {
                folder,
                record,
                condition: by_id(id),
            })
            .await?;

        if affected == 0 {
            return Err(DomainError::NotFound(format!("{} {}", folder, id)));
        }

        info!(folder = %folder, id, "Record updated successfully");
        self.get(folder, id).await
    }
}

fn by_id(id: i64) -> Condition {
    Condition::from([(ID_COLUMN.to_string(), ConditionClause::equals(id))])
}
