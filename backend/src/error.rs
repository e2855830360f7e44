//! HTTP error mapping
//!
//! Every typed error the components produce converges here and is rendered
//! as the standard `{success: false, error}` envelope with the matching
//! status code.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::chain::ChainError;
use crate::lobby::LobbyError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Lobby(LobbyError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Lobby(LobbyError::NotParticipant) => StatusCode::FORBIDDEN,
            // IllegalState, NotYourTurn and engine rejections are client errors
            ApiError::Lobby(_) => StatusCode::BAD_REQUEST,
            ApiError::Chain(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
