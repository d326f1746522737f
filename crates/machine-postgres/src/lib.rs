mod client;
mod config;
mod folder_repository;
mod folder_table;
mod query;

pub use client::PostgresClient;
pub use config::PostgresConfig;
pub use folder_repository::PostgresFolderRepository;
pub use folder_table::{Column, ColumnType, FolderTable};
pub use query::{
    apply_condition, apply_record, coerce, insert_statement, select_statement, update_statement,
    SelectStatement, SqlFragment, SqlValue,
};
