use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use machine_domain::DomainError;
use serde_json::json;
use tracing::{error, warn};

const DECODE_FAILED: &str = "failed to decode message";
const INTERNAL_ERROR: &str = "internal error";

/// Route family an error came from; an unknown entity is a bad envelope
/// field on one and a missing resource on the other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    Envelope,
    Rest,
}

#[derive(Debug)]
pub struct ApiError {
    error: DomainError,
    surface: Surface,
}

impl ApiError {
    pub fn envelope(error: DomainError) -> Self {
        Self {
            error,
            surface: Surface::Envelope,
        }
    }

    pub fn rest(error: DomainError) -> Self {
        Self {
            error,
            surface: Surface::Rest,
        }
    }

    pub fn status(&self) -> StatusCode {
        domain_error_to_status(&self.error, self.surface)
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self::rest(error)
    }
}

/// Malformed request bodies are reported as invalid envelopes
pub fn rejection_to_domain(rejection: JsonRejection) -> DomainError {
    DomainError::InvalidEnvelope(rejection.body_text())
}

/// A non-numeric `{id}` segment is an invalid id value
pub fn path_rejection_to_domain(rejection: PathRejection) -> DomainError {
    DomainError::InvalidValue {
        column: "id".to_string(),
        reason: rejection.body_text(),
    }
}

/// Convert domain error to HTTP status
pub fn domain_error_to_status(error: &DomainError, surface: Surface) -> StatusCode {
    match error {
        DomainError::Decode(_) => StatusCode::INTERNAL_SERVER_ERROR,

        DomainError::InvalidEnvelope(_)
        | DomainError::InvalidTimestamp(_)
        | DomainError::UnknownColumn { .. }
        | DomainError::UnsupportedOperator(_)
        | DomainError::InvalidValue { .. } => StatusCode::BAD_REQUEST,

        DomainError::UnknownEntity(_) => match surface {
            Surface::Envelope => StatusCode::BAD_REQUEST,
            Surface::Rest => StatusCode::NOT_FOUND,
        },

        DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Conflict(_) => StatusCode::CONFLICT,

        DomainError::Serialization(_) | DomainError::RepositoryError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let message = match &self.error {
            DomainError::Decode(detail) => {
                warn!(detail = %detail, "envelope decode failed");
                DECODE_FAILED.to_string()
            }
            DomainError::Serialization(e) => {
                error!(error = %e, "serialization failed");
                INTERNAL_ERROR.to_string()
            }
            DomainError::RepositoryError(e) => {
                error!(error = ?e, "store operation failed");
                INTERNAL_ERROR.to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "code": status.as_u16().to_string(),
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_entity_depends_on_surface() {
        let err = DomainError::UnknownEntity("NOPE".to_string());
        assert_eq!(
            domain_error_to_status(&err, Surface::Envelope),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            domain_error_to_status(&err, Surface::Rest),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (DomainError::Decode("pad".to_string()), StatusCode::INTERNAL_SERVER_ERROR),
            (DomainError::Unauthorized, StatusCode::UNAUTHORIZED),
            (DomainError::NotFound("x".to_string()), StatusCode::NOT_FOUND),
            (DomainError::Conflict("x".to_string()), StatusCode::CONFLICT),
            (
                DomainError::UnsupportedOperator("gt".to_string()),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::RepositoryError(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(domain_error_to_status(&err, Surface::Envelope), expected);
        }
    }
}
