use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("league database returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("match entry is invalid: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("player id must be a valid UUID (got '{0}')")]
    InvalidPlayerId(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("table '{0}' cannot be browsed")]
    UnknownTable(String),

    /// The match row exists but its lines or games do not.
    #[error("match {match_id} was saved without all of its lines/games: {message}")]
    PartialWrite { match_id: String, message: String },
}

/// Error stored on a cache entry and handed to every waiter of a fetch.
///
/// Cloneable so a single failure can be shared between the coalesced callers
/// and the observers of the key.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FetchError {
    message: String,
    inner: Arc<anyhow::Error>,
}

impl FetchError {
    pub fn msg(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            inner: Arc::new(anyhow::anyhow!(message.clone())),
            message,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    /// The domain error behind this failure, if the fetcher raised one.
    pub fn league_error(&self) -> Option<&LeagueError> {
        self.inner.downcast_ref::<LeagueError>()
    }
}

impl From<anyhow::Error> for FetchError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            message: format!("{:#}", err),
            inner: Arc::new(err),
        }
    }
}

impl From<LeagueError> for FetchError {
    fn from(err: LeagueError) -> Self {
        anyhow::Error::new(err).into()
    }
}

/// Domain error carried by `err`, looking through cached fetch failures.
pub fn find_league_error(err: &anyhow::Error) -> Option<&LeagueError> {
    err.downcast_ref::<LeagueError>()
        .or_else(|| err.downcast_ref::<FetchError>().and_then(FetchError::league_error))
}
