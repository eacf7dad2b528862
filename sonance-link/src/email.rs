// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Outgoing mail for recovery links.

#![forbid(unsafe_code)]

use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LinkError, Result};

const MAX_EMAIL_LEN: usize = 254;
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

fn email_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

/// Checks the shape of an address. Deliverability is the mailer's problem.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    email_regex().is_some_and(|re| re.is_match(email))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

pub fn recovery_email(from: &str, to: &str, url: &str, ttl_minutes: i64) -> OutgoingEmail {
    let html = format!(
        "<p>Use the link below to create your Sonance wallet.</p>\
         <p><a href=\"{url}\">Create your wallet</a></p>\
         <p>This link expires in {ttl_minutes} minutes. If you did not ask for it, \
         you can ignore this email.</p>"
    );
    OutgoingEmail {
        from: from.to_string(),
        to: to.to_string(),
        subject: "Your Sonance wallet link".into(),
        html,
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<()>;
}

/// Logs instead of sending. For development.
#[derive(Debug, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        info!(to = %email.to, subject = %email.subject, "mail delivery disabled, not sending");
        Ok(())
    }
}

#[derive(Serialize)]
struct SendRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

/// Sends through a JSON mail API with bearer authentication.
pub struct HttpMailer {
    client: reqwest::Client,
    api_url: String,
    api_key: SecretString,
}

impl HttpMailer {
    pub fn new(api_url: impl Into<String>, api_key: SecretString) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            api_key,
        })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        let body = SendRequest {
            from: &email.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LinkError::Mail(format!("mail API returned {status}")));
        }
        debug!(to = %email.to, "mail accepted");
        Ok(())
    }
}

/// Keeps sent mail in memory. Can be told to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<()> {
        if self.fail {
            return Err(LinkError::Mail("recording mailer set to fail".into()));
        }
        self.sent.lock().push(email.clone());
        Ok(())
    }
}
