//! Error taxonomy for the extraction pipeline and its HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::schema::FailureResponse;

/// Everything that can go wrong between receiving a document URL and
/// returning mapped bill data.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// A required provider credential is not configured.
    #[error("{0}")]
    Configuration(String),
    /// The provider could not be reached (connect error, timeout, DNS).
    #[error("Error calling Veryfi: {0}")]
    UpstreamUnavailable(#[source] reqwest::Error),
    /// The provider answered with status >= 400.
    #[error("Veryfi error: {body}")]
    Provider { status: u16, body: String },
    /// The provider answered successfully but the body is not JSON.
    #[error("Invalid response from Veryfi: {0}")]
    InvalidProviderResponse(String),
    /// The provider payload does not fit the expected document shape.
    #[error("Unexpected Veryfi document shape: {0}")]
    Mapping(String),
}

impl ExtractError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExtractError::Configuration(_) | ExtractError::Mapping(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ExtractError::UpstreamUnavailable(_) | ExtractError::InvalidProviderResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
            // reqwest 0.11 and axum 0.7 carry different `http` versions, so the
            // provider status travels as a raw code.
            ExtractError::Provider { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

impl IntoResponse for ExtractError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = FailureResponse::new(format!("Failed to process document. {}", self));
        (status, Json(body)).into_response()
    }
}
