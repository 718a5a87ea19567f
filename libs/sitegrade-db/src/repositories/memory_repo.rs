use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{LATEST_SITES_LIMIT, SiteStore};
use crate::error::StoreError;
use crate::models::site::{Server, Site, now};

/// In-process store with the same constraints as the PostgreSQL schema:
/// unique domain, servers must reference an existing site, and
/// `(domain, address)` is unique.
#[derive(Debug, Default)]
pub struct MemorySiteStore {
    inner: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    sites: HashMap<String, Site>,
    servers: HashMap<String, Vec<Server>>,
}

impl MemorySiteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SiteStore for MemorySiteStore {
    async fn fetch_site(&self, domain: &str) -> Result<Site, StoreError> {
        let tables = self.inner.read().await;
        let mut site = tables.sites.get(domain).cloned().ok_or(StoreError::NotFound)?;
        site.servers.clear();
        Ok(site)
    }

    async fn insert_site(&self, mut site: Site) -> Result<Site, StoreError> {
        let mut tables = self.inner.write().await;
        if tables.sites.contains_key(&site.domain) {
            return Err(StoreError::Constraint(format!(
                "duplicate key value violates unique constraint on site.domain ({})",
                site.domain
            )));
        }

        let stamp = now();
        site.created_at = stamp;
        site.updated_at = stamp;

        let mut stored = site.clone();
        stored.servers.clear();
        tables.sites.insert(site.domain.clone(), stored);
        Ok(site)
    }

    async fn fetch_servers(&self, domain: &str) -> Result<Vec<Server>, StoreError> {
        let tables = self.inner.read().await;
        Ok(tables.servers.get(domain).cloned().unwrap_or_default())
    }

    async fn insert_servers(
        &self,
        domain: &str,
        servers: Vec<Server>,
    ) -> Result<Vec<Server>, StoreError> {
        let mut tables = self.inner.write().await;
        if !servers.is_empty() && !tables.sites.contains_key(domain) {
            return Err(StoreError::Constraint(format!(
                "server.domain references unknown site ({domain})"
            )));
        }

        let mut staged = tables.servers.get(domain).cloned().unwrap_or_default();
        for s in &servers {
            if staged.iter().any(|existing| existing.address == s.address) {
                return Err(StoreError::Constraint(format!(
                    "duplicate server {} for {}",
                    s.address, domain
                )));
            }
            staged.push(s.clone());
        }

        tables.servers.insert(domain.to_string(), staged);
        Ok(servers)
    }

    async fn delete_all_servers(&self, domain: &str) -> Result<(), StoreError> {
        self.inner.write().await.servers.remove(domain);
        Ok(())
    }

    async fn partial_update_site(
        &self,
        site: &Site,
        previous_grade: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.write().await;
        let stored = tables
            .sites
            .get_mut(&site.domain)
            .ok_or(StoreError::NotFound)?;

        if previous_grade.is_empty() {
            stored.previous_grade = std::mem::replace(&mut stored.grade, site.grade.clone());
        } else {
            stored.grade = site.grade.clone();
            stored.updated_at = now();
        }
        stored.servers_changed = site.servers_changed;
        Ok(())
    }

    async fn retrieve_latest_sites(&self) -> Result<Vec<Site>, StoreError> {
        let mut sites: Vec<Site> = {
            let tables = self.inner.read().await;
            tables.sites.values().cloned().collect()
        };
        sites.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        sites.truncate(LATEST_SITES_LIMIT as usize);

        for site in &mut sites {
            site.servers = self.fetch_servers(&site.domain).await?;
        }
        Ok(sites)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site(domain: &str, grade: &str) -> Site {
        Site {
            domain: domain.to_string(),
            title: format!("{domain} home"),
            grade: grade.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn unknown_domain_is_not_found() {
        let store = MemorySiteStore::new();
        assert!(store.fetch_site("missing.test").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn insert_stamps_times_and_fetch_returns_same_site() {
        let store = MemorySiteStore::new();
        let inserted = store.insert_site(site("example.com", "A")).await.unwrap();
        assert!(inserted.created_at.timestamp() > 0);
        assert_eq!(inserted.created_at, inserted.updated_at);

        let fetched = store.fetch_site("example.com").await.unwrap();
        assert_eq!(fetched, inserted);
    }

    #[tokio::test]
    async fn fetch_site_does_not_hydrate_servers() {
        let store = MemorySiteStore::new();
        store
            .insert_site(site("example.com", "A").with_servers(vec![Server::new("1.1.1.1")]))
            .await
            .unwrap();
        store
            .insert_servers("example.com", vec![Server::new("1.1.1.1")])
            .await
            .unwrap();

        assert!(store.fetch_site("example.com").await.unwrap().servers.is_empty());
    }

    #[tokio::test]
    async fn duplicate_domain_is_rejected() {
        let store = MemorySiteStore::new();
        store.insert_site(site("example.com", "A")).await.unwrap();
        let err = store.insert_site(site("example.com", "B")).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert_eq!(store.fetch_site("example.com").await.unwrap().grade, "A");
    }

    #[tokio::test]
    async fn domain_without_servers_yields_empty_list() {
        let store = MemorySiteStore::new();
        assert!(store.fetch_servers("nothing.test").await.unwrap().is_empty());
        store.insert_site(site("example.com", "A")).await.unwrap();
        assert!(store.fetch_servers("example.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_batch_inserts_nothing() {
        let store = MemorySiteStore::new();
        store.insert_site(site("x.com", "A")).await.unwrap();

        let batch = vec![Server::new("1.1.1.1"), Server::new("1.1.1.1")];
        let err = store.insert_servers("x.com", batch).await.unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
        assert!(store.fetch_servers("x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn servers_require_an_existing_site() {
        let store = MemorySiteStore::new();
        let err = store
            .insert_servers("ghost.test", vec![Server::new("1.1.1.1")])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Constraint(_)));
    }

    #[tokio::test]
    async fn delete_all_servers_is_idempotent() {
        let store = MemorySiteStore::new();
        store.insert_site(site("x.com", "A")).await.unwrap();
        store
            .insert_servers("x.com", vec![Server::new("1.1.1.1"), Server::new("2.2.2.2")])
            .await
            .unwrap();

        store.delete_all_servers("x.com").await.unwrap();
        store.delete_all_servers("x.com").await.unwrap();
        assert!(store.fetch_servers("x.com").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn first_grading_moves_grade_and_keeps_updated_at() {
        let store = MemorySiteStore::new();
        let inserted = store.insert_site(site("example.com", "A")).await.unwrap();

        let mut regraded = inserted.clone();
        regraded.grade = "B".to_string();
        regraded.servers_changed = true;
        store.partial_update_site(&regraded, "").await.unwrap();

        let stored = store.fetch_site("example.com").await.unwrap();
        assert_eq!(stored.grade, "B");
        assert_eq!(stored.previous_grade, "A");
        assert!(stored.servers_changed);
        assert_eq!(stored.updated_at, inserted.updated_at);
    }

    #[tokio::test]
    async fn regrading_bumps_updated_at_and_keeps_previous_grade() {
        let store = MemorySiteStore::new();
        let mut initial = site("example.com", "A");
        initial.previous_grade = "C".to_string();
        let inserted = store.insert_site(initial).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let mut regraded = inserted.clone();
        regraded.grade = "A+".to_string();
        store.partial_update_site(&regraded, "B").await.unwrap();

        let stored = store.fetch_site("example.com").await.unwrap();
        assert_eq!(stored.grade, "A+");
        assert_eq!(stored.previous_grade, "C");
        assert!(stored.updated_at > inserted.updated_at);
    }

    #[tokio::test]
    async fn updating_unknown_site_is_not_found() {
        let store = MemorySiteStore::new();
        let err = store
            .partial_update_site(&site("ghost.test", "A"), "")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn latest_sites_are_capped_ordered_and_hydrated() {
        let store = MemorySiteStore::new();
        for i in 0..20 {
            let domain = format!("site{i}.test");
            store.insert_site(site(&domain, "A")).await.unwrap();
            store
                .insert_servers(&domain, vec![Server::new(format!("10.0.0.{i}"))])
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(1)).await;
        }

        let latest = store.retrieve_latest_sites().await.unwrap();
        assert_eq!(latest.len(), LATEST_SITES_LIMIT as usize);
        assert_eq!(latest[0].domain, "site19.test");
        assert!(latest.windows(2).all(|w| w[0].updated_at >= w[1].updated_at));
        for s in &latest {
            assert_eq!(s.servers, store.fetch_servers(&s.domain).await.unwrap());
        }
    }
}
