//! Error kinds shared by the queue, playlist stores and collaborators.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Rejected input (empty name, malformed id). Nothing was mutated.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A playlist or video that does not exist. Nothing was mutated.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A storage write failed after the in-memory change was applied.
    #[error("failed to persist {target}: {source}")]
    Persistence {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// A remote collaborator failed, timed out or ran out of quota.
    #[error("upstream failure: {0}")]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    #[error("backend answered with status {0}")]
    Status(u16),

    #[error("invalid response: {0}")]
    Decode(String),

    #[error("no stream available for {0}")]
    Unavailable(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn persistence(target: impl Into<String>, source: std::io::Error) -> Self {
        Self::Persistence {
            target: target.into(),
            source,
        }
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(UpstreamError::Other(msg.into()))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }

    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }
}

/// Result of a mutation that was applied in memory. `persistence` holds the
/// write-through failure, if any; the mutation stays applied either way.
#[derive(Debug)]
#[must_use]
pub struct Committed<T> {
    pub value: T,
    pub persistence: Option<Error>,
}

impl<T> Committed<T> {
    pub fn durable(value: T) -> Self {
        Self {
            value,
            persistence: None,
        }
    }

    pub fn with_persistence(value: T, persisted: Result<()>) -> Self {
        Self {
            value,
            persistence: persisted.err(),
        }
    }

    pub fn is_durable(&self) -> bool {
        self.persistence.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Committed<U> {
        Committed {
            value: f(self.value),
            persistence: self.persistence,
        }
    }

    /// Collapses into a plain result, surfacing a persistence failure as `Err`.
    pub fn into_result(self) -> Result<T> {
        match self.persistence {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}
