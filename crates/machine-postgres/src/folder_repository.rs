use async_trait::async_trait;
use chrono::{DateTime, Utc};
use machine_domain::{
    DomainError, DomainResult, FolderRepository, InsertRecordInput, Record, SelectRecordsInput,
    UpdateRecordsInput,
};
use serde_json::Value;
use tokio_postgres::Row;
use tracing::{debug, instrument};

use crate::client::PostgresClient;
use crate::folder_table::{Column, ColumnType, FolderTable};
use crate::query::{insert_statement, select_statement, update_statement};

/// PostgreSQL implementation of FolderRepository
#[derive(Clone)]
pub struct PostgresFolderRepository {
    client: PostgresClient,
}

impl PostgresFolderRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FolderRepository for PostgresFolderRepository {
    #[instrument(skip(self, input), fields(folder = %input.folder, columns = input.record.len()))]
    async fn insert_record(&self, input: InsertRecordInput) -> DomainResult<Record> {
        let table = FolderTable::for_folder(input.folder);
        let statement = insert_statement(table, &input.record)?;

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_one(&statement.sql, &statement.params())
            .await
            .map_err(map_db_error)?;

        let record = row_to_record(&row, &table.all_columns())?;
        debug!(table = table.table, id = ?record.get("id"), "inserted row");
        Ok(record)
    }

    #[instrument(skip(self, input), fields(folder = %input.folder, conditions = input.condition.len()))]
    async fn update_records(&self, input: UpdateRecordsInput) -> DomainResult<u64> {
        let table = FolderTable::for_folder(input.folder);
        let statement = update_statement(table, &input.record, &input.condition)?;

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let affected = conn
            .execute(&statement.sql, &statement.params())
            .await
            .map_err(map_db_error)?;

        debug!(table = table.table, affected, "updated rows");
        Ok(affected)
    }

    #[instrument(skip(self, input), fields(folder = %input.folder, page = input.page.number))]
    async fn select_records(&self, input: SelectRecordsInput) -> DomainResult<Vec<Record>> {
        let table = FolderTable::for_folder(input.folder);
        let statement = select_statement(table, &input.fields, &input.condition, input.page)?;

        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(&statement.fragment.sql, &statement.fragment.params())
            .await
            .map_err(map_db_error)?;

        rows.iter()
            .map(|row| row_to_record(row, &statement.columns))
            .collect()
    }
}

/// Maps constraint violations to domain errors naming only the constraint
fn map_db_error(e: tokio_postgres::Error) -> DomainError {
    if let Some(db_err) = e.as_db_error() {
        let constraint = db_err.constraint().unwrap_or("record");
        match db_err.code().code() {
            "23505" => return DomainError::Conflict(format!("{} already exists", constraint)),
            "23503" => {
                return DomainError::Conflict(format!("{} reference is invalid", constraint))
            }
            "23502" => {
                return DomainError::InvalidValue {
                    column: db_err.column().unwrap_or("unknown").to_string(),
                    reason: "value is required".to_string(),
                }
            }
            _ => {}
        }
    }
    DomainError::RepositoryError(e.into())
}

fn row_to_record(row: &Row, columns: &[&Column]) -> DomainResult<Record> {
    let mut record = Record::new();

    for (idx, column) in columns.iter().enumerate() {
        let value = match column.kind {
            ColumnType::Integer => row
                .try_get::<_, Option<i64>>(idx)
                .map(|v| v.map(Value::from)),
            ColumnType::Text => row
                .try_get::<_, Option<String>>(idx)
                .map(|v| v.map(Value::from)),
            ColumnType::Timestamp => row
                .try_get::<_, Option<DateTime<Utc>>>(idx)
                .map(|v| v.map(|at| Value::from(at.to_rfc3339()))),
        }
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        record.insert(column.name.to_string(), value.unwrap_or(Value::Null));
    }

    Ok(record)
}
