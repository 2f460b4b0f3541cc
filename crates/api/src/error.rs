use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use scanner_core::{DiscoveryError, HistoryFetchError, InstrumentError};

/// Errors surfaced to HTTP clients as `{"error": message}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Discovery(_) => StatusCode::BAD_GATEWAY,
            ApiError::Instrument(InstrumentError::HistoryFetch(e)) => match e {
                HistoryFetchError::UnknownInstrument(_) => StatusCode::NOT_FOUND,
                HistoryFetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                _ => StatusCode::BAD_GATEWAY,
            },
            ApiError::Instrument(InstrumentError::MalformedSeries(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
