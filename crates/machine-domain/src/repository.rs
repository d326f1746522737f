use async_trait::async_trait;

use crate::envelope::{Condition, Page, Record};
use crate::error::DomainResult;
use crate::folder::Folder;

#[derive(Debug, Clone, PartialEq)]
pub struct InsertRecordInput {
    pub folder: Folder,
    pub record: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecordsInput {
    pub folder: Folder,
    pub record: Record,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectRecordsInput {
    pub folder: Folder,
    /// Projection; empty selects every column
    pub fields: Vec<String>,
    pub condition: Condition,
    pub page: Page,
}

/// Repository trait for folder-backed tables
/// Infrastructure layer (machine-postgres) implements this trait
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FolderRepository: Send + Sync {
    /// Insert one row and return it as stored, including the generated id
    async fn insert_record(&self, input: InsertRecordInput) -> DomainResult<Record>;

    /// Update every row matched by the condition, returning the affected count
    async fn update_records(&self, input: UpdateRecordsInput) -> DomainResult<u64>;

    /// Select one page of rows ordered by id
    async fn select_records(&self, input: SelectRecordsInput) -> DomainResult<Vec<Record>>;
}
