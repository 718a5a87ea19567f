use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A scanned domain and its SSL grading metadata.
///
/// `servers` is only filled in when a caller hydrates it explicitly;
/// it is never read from the `site` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub domain: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(rename = "ssl_grade")]
    pub grade: String,
    #[sqlx(rename = "previous_ssl_grade")]
    pub previous_grade: String,
    pub logo: String,
    pub is_down: bool,
    pub servers_changed: bool,

    #[sqlx(skip)]
    pub servers: Vec<Server>,
}

/// One machine serving a [`Site`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Server {
    pub address: String,
    #[serde(rename = "sslGrade")]
    #[sqlx(rename = "ssl_grade")]
    pub grade: String,
    pub country: String,
    pub owner: String,
}

impl Site {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    pub fn with_servers(mut self, servers: Vec<Server>) -> Self {
        self.servers = servers;
        self
    }
}

impl Server {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }
}

/// Current time at the precision PostgreSQL stores (microseconds).
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
