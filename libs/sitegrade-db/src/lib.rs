pub mod db;
pub mod error;
pub mod models;
pub mod repositories;

pub use error::StoreError;
pub use repositories::SiteStore;
pub use sqlx;
