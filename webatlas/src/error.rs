use thiserror::Error;

/// Errors surfaced by the queue store (C1).
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),

    #[error("lease contention exhausted after {attempts} attempt(s)")]
    LeaseContention { attempts: u32 },
}

/// Errors surfaced by the fetcher (C4). Never panics; every failure mode
/// the crawl loop needs to branch on has its own variant.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("dns resolution failed: {0}")]
    Dns(String),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("non-success status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),
}

impl FetchError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            return FetchError::Timeout(std::time::Duration::from_secs(0));
        }
        if e.is_connect() {
            return FetchError::Connect(e.to_string());
        }
        FetchError::Transport(e.to_string())
    }
}

/// Errors surfaced at the database-initialization boundary, re-exported
/// here so binaries only need to depend on one error surface.
pub use webatlas_db::DbInitError;

/// Errors from the domain repository (C8).
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

/// Lets the orchestrator propagate a repository failure through a function
/// that otherwise returns `QueueError` with a single `?`.
impl From<RepoError> for QueueError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::Db(err) => QueueError::Db(err),
        }
    }
}
