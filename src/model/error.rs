use thiserror::Error;

pub type DatabaseResult<T> = std::result::Result<T, DatabaseError>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("sqlx migrate error: {0}")]
    SqlxMigrateError(#[from] sqlx::migrate::MigrateError),
    #[error("sqlx error: {0}")]
    SqlxError(sqlx::Error),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("access to this resource is forbidden")]
    Forbidden,
    #[error("unique constraint `{0}` violated")]
    Conflict(String),
    #[error("check constraint `{0}` violated")]
    ConstraintViolation(String),
    #[error("payment required to access this resource")]
    PaymentRequired,
}

impl From<sqlx::Error> for DatabaseError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            let constraint = db.constraint().unwrap_or("unknown").to_string();
            if db.is_unique_violation() {
                return Self::Conflict(constraint);
            }
            if db.is_check_violation() {
                return Self::ConstraintViolation(constraint);
            }
        }
        Self::SqlxError(error)
    }
}
