use std::sync::Arc;

use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

pub const UNKNOWN_DOMAIN_MESSAGE: &str = "unknown domain requested";

/// Side channel told about lookups for domains the store has never seen.
///
/// Calls must return immediately; delivery is best-effort.
pub trait Notifier: Send + Sync {
    fn notify_info(&self, domain: &str);
}

/// Writes the notification to the log only.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify_info(&self, domain: &str) {
        info!(domain, "info: {}", UNKNOWN_DOMAIN_MESSAGE);
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InfoEvent<'a> {
    pub level: &'a str,
    pub message: &'a str,
    pub domain: &'a str,
}

impl<'a> InfoEvent<'a> {
    pub fn unknown_domain(domain: &'a str) -> Self {
        Self {
            level: "info",
            message: UNKNOWN_DOMAIN_MESSAGE,
            domain,
        }
    }
}

/// POSTs an [`InfoEvent`] to a webhook from a detached task.
///
/// Tasks still in flight when the server shuts down are dropped unsent.
#[derive(Clone)]
pub struct HttpNotifier {
    client: Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    pub async fn send(&self, domain: &str) -> Result<()> {
        self.client
            .post(&self.url)
            .json(&InfoEvent::unknown_domain(domain))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

impl Notifier for HttpNotifier {
    fn notify_info(&self, domain: &str) {
        let notifier = self.clone();
        let domain = domain.to_string();
        tokio::spawn(async move {
            if let Err(e) = notifier.send(&domain).await {
                warn!("Unknown-domain notification for {} failed: {}", domain, e);
            }
        });
    }
}

fn webhook_url(notify_url: Option<&str>) -> Option<&str> {
    notify_url.map(str::trim).filter(|u| !u.is_empty())
}

pub fn from_config(notify_url: Option<&str>) -> Arc<dyn Notifier> {
    match webhook_url(notify_url) {
        Some(url) => {
            info!("Unknown-domain notifications go to {}", url);
            Arc::new(HttpNotifier::new(url.to_string()))
        }
        None => Arc::new(LogNotifier),
    }
}
