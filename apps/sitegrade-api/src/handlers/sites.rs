use axum::{
    Json,
    extract::{Path, State},
    routing::get,
};
use sitegrade_db::StoreError;
use sitegrade_db::models::Site;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::{AppState, RouteSpec};

pub fn routes() -> Vec<RouteSpec> {
    vec![
        RouteSpec {
            method: "GET",
            path: "/servers",
            handler: get(list_latest_sites),
        },
        RouteSpec {
            method: "GET",
            path: "/servers/{domain}",
            handler: get(get_site),
        },
    ]
}

/// Look up a site by domain and return it with its servers.
///
/// An unknown domain fires one info notification and answers 404.
pub async fn get_site(
    Path(domain): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Site>, ApiError> {
    let mut site = match state.store.fetch_site(&domain).await {
        Ok(site) => site,
        Err(StoreError::NotFound) => {
            info!("Unknown domain requested: {}", domain);
            state.notifier.notify_info(&domain);
            return Err(ApiError::UnknownDomain(domain));
        }
        Err(e) => return Err(e.into()),
    };

    site.servers = state.store.fetch_servers(&domain).await?;
    debug!("Serving {} with {} servers", domain, site.servers.len());
    Ok(Json(site))
}

pub async fn list_latest_sites(State(state): State<AppState>) -> Result<Json<Vec<Site>>, ApiError> {
    let sites = state.store.retrieve_latest_sites().await?;
    Ok(Json(sites))
}
