// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Sonance Link - short-lived recovery links for wallet creation
//!
//! Issues random capability tokens bound to an email address, mails the
//! link, and validates presented tokens until they expire. Expired entries
//! are also removed by a background [`Sweeper`].

#![forbid(unsafe_code)]

pub mod email;
pub mod error;
pub mod http;
pub mod service;
pub mod sweeper;
pub mod token;

pub use crate::email::{HttpMailer, LogMailer, Mailer, OutgoingEmail};
pub use crate::error::{LinkError, Result};
pub use crate::http::router;
pub use crate::service::{IssuedLink, LinkConfig, LinkService, TokenClaims};
pub use crate::sweeper::{Sweeper, DEFAULT_SWEEP_INTERVAL};
pub use crate::token::{ConnectionToken, MemoryTokenStore, TokenStore};
