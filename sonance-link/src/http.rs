// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! HTTP surface of the link service.

#![forbid(unsafe_code)]

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::debug;

use crate::error::{LinkError, Result};
use crate::service::{LinkService, TokenClaims};

pub const RECOVERY_LINK_ROUTE: &str = "/api/recovery-link";

const SENT_MESSAGE: &str = "Recovery link sent. Check your email.";

#[derive(Debug, Deserialize)]
pub struct IssueRequest {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub expires_at: i64,
    pub message: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub token: Option<String>,
}

pub fn router(service: Arc<LinkService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route(RECOVERY_LINK_ROUTE, post(issue_link).get(validate_link))
        .route("/health", get(health))
        .with_state(service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn issue_link(
    State(service): State<Arc<LinkService>>,
    body: std::result::Result<Json<IssueRequest>, JsonRejection>,
) -> Result<Json<IssueResponse>> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "rejected recovery link request body");
        LinkError::InvalidEmail
    })?;
    let email = request.email.ok_or(LinkError::InvalidEmail)?;

    let link = service.issue(&email).await?;
    let expose = service.config().expose_links;

    Ok(Json(IssueResponse {
        token: expose.then(|| link.token.clone()),
        url: expose.then(|| link.url.clone()),
        expires_at: link.expires_at,
        message: SENT_MESSAGE,
    }))
}

async fn validate_link(
    State(service): State<Arc<LinkService>>,
    Query(query): Query<ValidateQuery>,
) -> Result<Json<TokenClaims>> {
    service.validate(query.token.as_deref()).map(Json)
}

async fn health() -> &'static str {
    "ok"
}
