// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Issuing and validating recovery links.

#![forbid(unsafe_code)]

use std::fmt;
use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use sonance_core::clock::Clock;
use tracing::{debug, info, warn};

use crate::email::{is_valid_email, recovery_email, Mailer};
use crate::error::{LinkError, Result};
use crate::token::{fingerprint, generate_token, ConnectionToken, TokenStore};

pub const TOKEN_TTL_MINUTES: i64 = 30;

pub const RECOVERY_PATH: &str = "/wallet/recover";

#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Public origin the emailed link points at.
    pub base_url: String,
    /// Return the token and url in API responses. Never in production.
    pub expose_links: bool,
    pub mail_from: String,
    pub ttl: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".into(),
            expose_links: false,
            mail_from: "Sonance <noreply@sonance.local>".into(),
            ttl: Duration::minutes(TOKEN_TTL_MINUTES),
        }
    }
}

impl LinkConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(LinkError::InvalidConfig(
                "base_url must start with http:// or https://".into(),
            ));
        }
        if self.ttl <= Duration::zero() {
            return Err(LinkError::InvalidConfig("link ttl must be positive".into()));
        }
        if self.mail_from.trim().is_empty() {
            return Err(LinkError::InvalidConfig("mail_from must not be empty".into()));
        }
        Ok(())
    }
}

pub struct IssuedLink {
    pub token: String,
    pub url: String,
    pub expires_at: i64,
    /// False when the mailer failed. The token is valid either way.
    pub email_sent: bool,
}

impl fmt::Debug for IssuedLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedLink")
            .field("token", &fingerprint(&self.token))
            .field("expires_at", &self.expires_at)
            .field("email_sent", &self.email_sent)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenClaims {
    pub valid: bool,
    pub email: String,
    pub expires_at: i64,
}

pub struct LinkService {
    store: Arc<dyn TokenStore>,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    config: LinkConfig,
}

impl LinkService {
    pub fn new(
        store: Arc<dyn TokenStore>,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        config: LinkConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            mailer,
            clock,
            config,
        })
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub fn link_url(&self, token: &str) -> String {
        format!(
            "{}{RECOVERY_PATH}?token={token}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    /// Stores a fresh token for `email` and mails the link.
    ///
    /// Mail failures are logged and reported in [`IssuedLink::email_sent`];
    /// they never revoke the token.
    pub async fn issue(&self, email: &str) -> Result<IssuedLink> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(LinkError::InvalidEmail);
        }

        let now = self.clock.now_millis();
        let token = generate_token();
        let entry = ConnectionToken::new(
            token.clone(),
            email.to_string(),
            now,
            self.config.ttl.num_milliseconds(),
        );
        let expires_at = entry.expires_at;
        self.store.put(entry)?;

        let url = self.link_url(&token);
        let mail = recovery_email(
            &self.config.mail_from,
            email,
            &url,
            self.config.ttl.num_minutes(),
        );
        let email_sent = match self.mailer.send(&mail).await {
            Ok(()) => true,
            Err(e) => {
                warn!(token = %fingerprint(&token), error = %e, "failed to send recovery email");
                false
            }
        };

        info!(token = %fingerprint(&token), expires_at, email_sent, "recovery link issued");
        Ok(IssuedLink {
            token,
            url,
            expires_at,
            email_sent,
        })
    }

    /// Checks a presented token. Valid tokens stay usable until they expire.
    pub fn validate(&self, token: Option<&str>) -> Result<TokenClaims> {
        let token = token
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(LinkError::TokenRequired)?;

        let Some(entry) = self.store.get(token)? else {
            debug!(token = %fingerprint(token), "unknown token");
            return Err(LinkError::InvalidOrExpired);
        };

        if entry.is_expired_at(self.clock.now_millis()) {
            self.store.remove(token)?;
            info!(token = %fingerprint(token), "expired token removed");
            return Err(LinkError::InvalidOrExpired);
        }

        debug!(token = %fingerprint(token), "token validated");
        Ok(TokenClaims {
            valid: true,
            email: entry.email.clone(),
            expires_at: entry.expires_at,
        })
    }

    pub fn sweep_expired(&self) -> Result<usize> {
        self.store.delete_expired(self.clock.now_millis())
    }

    pub fn pending(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingMailer;
    use crate::token::MemoryTokenStore;
    use sonance_core::clock::ManualClock;

    fn service(config: LinkConfig) -> Result<LinkService> {
        LinkService::new(
            Arc::new(MemoryTokenStore::new()),
            Arc::new(RecordingMailer::new()),
            Arc::new(ManualClock::new(0)),
            config,
        )
    }

    #[test]
    fn test_config_validation() {
        assert!(service(LinkConfig::default()).is_ok());

        let bad_url = LinkConfig {
            base_url: "ftp://example.com".into(),
            ..LinkConfig::default()
        };
        assert!(matches!(service(bad_url), Err(LinkError::InvalidConfig(_))));

        let zero_ttl = LinkConfig {
            ttl: Duration::zero(),
            ..LinkConfig::default()
        };
        assert!(service(zero_ttl).is_err());
    }

    #[test]
    fn test_link_url_strips_trailing_slash() {
        let svc = service(LinkConfig {
            base_url: "https://sonance.test/".into(),
            ..LinkConfig::default()
        })
        .unwrap();
        assert_eq!(
            svc.link_url("abc"),
            "https://sonance.test/wallet/recover?token=abc"
        );
    }

    #[test]
    fn test_validate_requires_token() {
        let svc = service(LinkConfig::default()).unwrap();
        assert!(matches!(svc.validate(None), Err(LinkError::TokenRequired)));
        assert!(matches!(
            svc.validate(Some("   ")),
            Err(LinkError::TokenRequired)
        ));
    }

    #[tokio::test]
    async fn test_issue_rejects_bad_email() {
        let svc = service(LinkConfig::default()).unwrap();
        assert!(matches!(
            svc.issue("not-an-email").await,
            Err(LinkError::InvalidEmail)
        ));
        assert_eq!(svc.pending(), 0);
    }

    #[tokio::test]
    async fn test_issue_trims_email() {
        let svc = service(LinkConfig::default()).unwrap();
        let link = svc.issue("  alice@example.com ").await.unwrap();
        let claims = svc.validate(Some(&link.token)).unwrap();
        assert_eq!(claims.email, "alice@example.com");
    }
}
