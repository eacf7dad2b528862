// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

#![forbid(unsafe_code)]

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

pub use sonance_core::ErrorKind;

#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Valid email is required")]
    InvalidEmail,

    #[error("Token is required")]
    TokenRequired,

    /// Unknown and expired tokens share this variant.
    #[error("Invalid or expired token")]
    InvalidOrExpired,

    #[error("Mail delivery failed: {0}")]
    Mail(String),

    #[error("Token store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LinkError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail | Self::TokenRequired => ErrorKind::Validation,
            Self::InvalidOrExpired => ErrorKind::Expired,
            Self::Mail(_) | Self::Http(_) => ErrorKind::Transient,
            Self::Store(_) | Self::InvalidConfig(_) | Self::Json(_) | Self::Io(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message safe to return to an HTTP caller.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Transient | ErrorKind::Internal => "Internal server error".into(),
            _ => self.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Transient | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for LinkError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, LinkError>;
