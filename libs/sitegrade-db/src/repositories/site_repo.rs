use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::{LATEST_SITES_LIMIT, SiteStore};
use crate::error::StoreError;
use crate::models::site::{Server, Site, now};

#[derive(Debug, Clone)]
pub struct SiteRepository {
    pool: PgPool,
}

impl SiteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SiteStore for SiteRepository {
    async fn fetch_site(&self, domain: &str) -> Result<Site, StoreError> {
        debug!("Fetching site {}", domain);
        let site = sqlx::query_as::<_, Site>(
            r#"
            SELECT domain, title, ssl_grade, previous_ssl_grade, created_at,
                   updated_at, logo, is_down, servers_changed
            FROM site
            WHERE domain = $1
            "#,
        )
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;

        Ok(site)
    }

    async fn insert_site(&self, mut site: Site) -> Result<Site, StoreError> {
        let stamp = now();
        site.created_at = stamp;
        site.updated_at = stamp;

        sqlx::query(
            r#"
            INSERT INTO site (domain, title, ssl_grade, previous_ssl_grade,
                              created_at, updated_at, logo, is_down, servers_changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&site.domain)
        .bind(&site.title)
        .bind(&site.grade)
        .bind(&site.previous_grade)
        .bind(site.created_at)
        .bind(site.updated_at)
        .bind(&site.logo)
        .bind(site.is_down)
        .bind(site.servers_changed)
        .execute(&self.pool)
        .await?;

        debug!("Inserted site {}", site.domain);
        Ok(site)
    }

    async fn fetch_servers(&self, domain: &str) -> Result<Vec<Server>, StoreError> {
        let servers = sqlx::query_as::<_, Server>(
            r#"
            SELECT address, ssl_grade, country, owner
            FROM server
            WHERE domain = $1
            ORDER BY id ASC
            "#,
        )
        .bind(domain)
        .fetch_all(&self.pool)
        .await?;

        debug!("Fetched {} servers for {}", servers.len(), domain);
        Ok(servers)
    }

    async fn insert_servers(
        &self,
        domain: &str,
        servers: Vec<Server>,
    ) -> Result<Vec<Server>, StoreError> {
        let mut tx = self.pool.begin().await?;

        for s in &servers {
            sqlx::query(
                r#"
                INSERT INTO server (address, ssl_grade, country, owner, domain)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(&s.address)
            .bind(&s.grade)
            .bind(&s.country)
            .bind(&s.owner)
            .bind(domain)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!("Inserted {} servers for {}", servers.len(), domain);
        Ok(servers)
    }

    async fn delete_all_servers(&self, domain: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM server WHERE domain = $1")
            .bind(domain)
            .execute(&self.pool)
            .await?;

        debug!("Deleted {} servers for {}", result.rows_affected(), domain);
        Ok(())
    }

    async fn partial_update_site(
        &self,
        site: &Site,
        previous_grade: &str,
    ) -> Result<(), StoreError> {
        // In an UPDATE the right-hand side sees the pre-update row, so
        // previous_ssl_grade receives the grade being replaced.
        let result = if previous_grade.is_empty() {
            sqlx::query(
                r#"
                UPDATE site
                SET previous_ssl_grade = ssl_grade, ssl_grade = $1, servers_changed = $2
                WHERE domain = $3
                "#,
            )
            .bind(&site.grade)
            .bind(site.servers_changed)
            .bind(&site.domain)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                r#"
                UPDATE site
                SET ssl_grade = $1, servers_changed = $2, updated_at = $3
                WHERE domain = $4
                "#,
            )
            .bind(&site.grade)
            .bind(site.servers_changed)
            .bind(now())
            .bind(&site.domain)
            .execute(&self.pool)
            .await?
        };

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        debug!(
            "Updated grade of {} to {} (first grading: {})",
            site.domain,
            site.grade,
            previous_grade.is_empty()
        );
        Ok(())
    }

    async fn retrieve_latest_sites(&self) -> Result<Vec<Site>, StoreError> {
        let mut sites = sqlx::query_as::<_, Site>(
            r#"
            SELECT domain, title, ssl_grade, previous_ssl_grade, logo, is_down,
                   servers_changed, created_at, updated_at
            FROM site
            ORDER BY updated_at DESC
            LIMIT $1
            "#,
        )
        .bind(LATEST_SITES_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        for site in &mut sites {
            site.servers = self.fetch_servers(&site.domain).await?;
        }

        debug!("Retrieved {} latest sites", sites.len());
        Ok(sites)
    }
}
