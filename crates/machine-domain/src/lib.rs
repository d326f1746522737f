mod command_builder;
mod envelope;
mod envelope_service;
mod error;
mod folder;
mod record_service;
mod repository;
mod timestamp;
mod transport;

pub use command_builder::*;
pub use envelope::*;
pub use envelope_service::{EnvelopeService, ID_COLUMN, RESPONSE_CODE_OK};
pub use error::*;
pub use folder::*;
pub use record_service::*;
pub use repository::*;
pub use timestamp::*;
pub use transport::*;
