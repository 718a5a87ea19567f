use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{Server, Site};

pub mod memory_repo;
pub mod site_repo;

pub use memory_repo::MemorySiteStore;
pub use site_repo::SiteRepository;

/// How many sites `retrieve_latest_sites` returns at most.
pub const LATEST_SITES_LIMIT: i64 = 15;

/// Data access for sites and their servers.
///
/// Implementations hold their own handle to the backing store; there is no
/// process-wide connection.
#[async_trait]
pub trait SiteStore: Send + Sync {
    /// Fetch the site row for `domain`. `servers` is left empty.
    async fn fetch_site(&self, domain: &str) -> Result<Site, StoreError>;

    /// Stamp `created_at` / `updated_at` with the current time and persist every field.
    async fn insert_site(&self, site: Site) -> Result<Site, StoreError>;

    /// All servers for `domain` in insertion order. Empty when there are none.
    async fn fetch_servers(&self, domain: &str) -> Result<Vec<Server>, StoreError>;

    /// Insert a batch of servers for `domain`. All-or-nothing.
    async fn insert_servers(
        &self,
        domain: &str,
        servers: Vec<Server>,
    ) -> Result<Vec<Server>, StoreError>;

    async fn delete_all_servers(&self, domain: &str) -> Result<(), StoreError>;

    /// Update the grading fields of `site`.
    ///
    /// An empty `previous_grade` marks the first grading: the stored grade is
    /// moved into `previous_ssl_grade` and `updated_at` is left alone.
    /// Otherwise `updated_at` is bumped and `previous_ssl_grade` is left alone.
    async fn partial_update_site(&self, site: &Site, previous_grade: &str)
    -> Result<(), StoreError>;

    /// Most recently updated sites, newest first, each with its servers.
    async fn retrieve_latest_sites(&self) -> Result<Vec<Site>, StoreError>;
}
