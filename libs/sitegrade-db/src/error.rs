use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no matching row")]
    NotFound,
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db) if !matches!(db.kind(), sqlx::error::ErrorKind::Other) => {
                StoreError::Constraint(db.message().to_string())
            }
            other => StoreError::Database(other),
        }
    }
}
