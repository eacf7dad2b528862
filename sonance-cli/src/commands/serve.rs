// SPDX-FileCopyrightText: © 2026 PrivKey LLC
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::net::SocketAddr;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::{debug, info, warn};

use sonance_core::clock::SystemClock;
use sonance_core::error::{Result, WalletError};
use sonance_link::{
    router, HttpMailer, LinkError, LinkService, LogMailer, Mailer, MemoryTokenStore, Sweeper,
};

use crate::config::{Config, LinkSettings};
use crate::output::Output;

const MAIL_API_KEY_VAR: &str = "SONANCE_MAIL_API_KEY";

fn link_err(e: LinkError) -> WalletError {
    WalletError::Other(format!("link service: {e}"))
}

fn build_mailer(out: &Output, settings: &LinkSettings) -> Result<Arc<dyn Mailer>> {
    let Some(api_url) = &settings.mail_api_url else {
        out.warn("No mail_api_url configured. Recovery links are logged, not emailed.");
        return Ok(Arc::new(LogMailer));
    };
    match std::env::var(MAIL_API_KEY_VAR) {
        Ok(key) => {
            debug!(api_url = %api_url, "using HTTP mailer");
            let mailer = HttpMailer::new(api_url.clone(), SecretString::from(key)).map_err(link_err)?;
            Ok(Arc::new(mailer))
        }
        Err(_) => {
            out.warn(&format!(
                "{MAIL_API_KEY_VAR} is not set. Recovery links are logged, not emailed."
            ));
            Ok(Arc::new(LogMailer))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

pub fn cmd_serve(out: &Output, cfg: &Config, bind: Option<SocketAddr>) -> Result<()> {
    let settings = &cfg.link;
    let bind = bind.unwrap_or(settings.bind);
    let link_config = settings.link_config();

    if link_config.expose_links {
        out.warn("expose_links is enabled. Tokens are returned in API responses; never use this in production.");
    }

    let mailer = build_mailer(out, settings)?;
    let service = Arc::new(
        LinkService::new(
            Arc::new(MemoryTokenStore::new()),
            mailer,
            Arc::new(SystemClock),
            link_config,
        )
        .map_err(link_err)?,
    );

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| WalletError::Other(format!("tokio: {}", e)))?;

    rt.block_on(async {
        let listener = tokio::net::TcpListener::bind(bind).await?;
        let local = listener.local_addr()?;

        out.header("Recovery link service");
        out.field("Listening", &format!("http://{local}"));
        out.field("Links point at", &service.config().base_url);
        out.field(
            "Sweep interval",
            &format!("{}s", settings.sweep_interval().as_secs()),
        );
        out.newline();
        out.info("Press Ctrl+C to stop.");

        let sweeper = Sweeper::spawn(service.clone(), settings.sweep_interval());
        info!(addr = %local, "link service listening");

        let served = axum::serve(listener, router(service))
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.shutdown().await;
        served?;
        out.success("Link service stopped");
        Ok::<(), WalletError>(())
    })
}
