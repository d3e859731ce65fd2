use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use thiserror::Error;

use crate::archive::ArchiveError;
use crate::assistant::AssistantError;
use crate::auth::{self, AuthError};
use crate::export::ExportError;
use crate::form::FormError;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Form(#[from] FormError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Couldn't load your ledger right now. Please try again.")]
    Archive(#[from] ArchiveError),
    #[error("{context}: {source}")]
    Assistant {
        title: &'static str,
        context: &'static str,
        source: AssistantError,
    },
    #[error("Please sign in to continue.")]
    Unauthorized,
}

impl ApiError {
    pub fn suggestion_failed(source: AssistantError) -> Self {
        ApiError::Assistant {
            title: "AI Suggestion Failed",
            context: "Failed to get suggestion",
            source,
        }
    }

    pub fn scan_failed(source: AssistantError) -> Self {
        ApiError::Assistant {
            title: "Receipt Scan Failed",
            context: "Failed to scan receipt",
            source,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ApiError::Form(err) => err.title(),
            ApiError::Auth(_) => "Authentication Failed",
            ApiError::Ledger(_) => "Not Found",
            ApiError::Export(_) => "Export Failed",
            ApiError::Archive(_) => "Ledger Unavailable",
            ApiError::Assistant { title, .. } => title,
            ApiError::Unauthorized => "Not Signed In",
        }
    }

    pub fn description(&self) -> String {
        match self {
            ApiError::Auth(err) => err.friendly_message(),
            other => other.to_string(),
        }
    }
}

/// Error body in the shape of a notification: a title and a description.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub title: String,
    pub description: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Form(FormError::UnknownGroup(_)) => StatusCode::NOT_FOUND,
            ApiError::Form(_) => StatusCode::BAD_REQUEST,
            ApiError::Auth(err) => match err.code.as_str() {
                auth::EMAIL_ALREADY_IN_USE => StatusCode::CONFLICT,
                auth::WEAK_PASSWORD | auth::INVALID_EMAIL => StatusCode::BAD_REQUEST,
                auth::OPERATION_NOT_ALLOWED => StatusCode::FORBIDDEN,
                _ => StatusCode::UNAUTHORIZED,
            },
            ApiError::Ledger(LedgerError::GroupNotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Archive(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Assistant {
                source: AssistantError::NotConfigured,
                ..
            } => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Assistant { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            title: self.title().to_string(),
            description: self.description(),
        })
    }
}
