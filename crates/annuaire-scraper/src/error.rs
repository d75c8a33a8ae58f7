use annuaire_client::ClientError;
use thiserror::Error;

/// Errors that end a scrape run early.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Portal error: {0}")]
    Client(#[from] ClientError),

    #[error("Query error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_sources() {
        let err: ScrapeError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ScrapeError::Sqlx(_)));

        let err: ScrapeError = ClientError::Unavailable {
            reason: "blocked".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Portal error: directory search unavailable: blocked"
        );
    }
}
