use thiserror::Error;

pub type IntegrationResult<T> = std::result::Result<T, IntegrationError>;

#[derive(Debug, Error)]
pub enum IntegrationError {
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("{service} responded with status {status}: {body}")]
    UpstreamStatus {
        service: &'static str,
        status: u16,
        body: String,
    },
    #[error("{service} returned an unexpected payload: {reason}")]
    UnexpectedPayload {
        service: &'static str,
        reason: String,
    },
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}
