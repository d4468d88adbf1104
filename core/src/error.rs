use crate::session::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("session {session_id} is already cached")]
    DuplicateSession { session_id: SessionId },
    #[error("session {session_id} has expired or does not exist")]
    SessionNotFound { session_id: SessionId },
    #[error("unable to locate page identified by '{identifier}'")]
    PageNotFound { identifier: String },
    #[error("unable to locate subpage identified by '{identifier}'")]
    SubPageNotFound { identifier: String },
    #[error("failed to render view: {source}")]
    Render {
        #[source]
        source: anyhow::Error,
    },
}

impl ViewError {
    pub(crate) fn duplicate_session(session_id: SessionId) -> Self {
        Self::DuplicateSession { session_id }
    }

    pub(crate) fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    pub(crate) fn page_not_found(identifier: &str) -> Self {
        Self::PageNotFound {
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn sub_page_not_found(identifier: &str) -> Self {
        Self::SubPageNotFound {
            identifier: identifier.to_string(),
        }
    }

    pub(crate) fn render(source: anyhow::Error) -> Self {
        Self::Render { source }
    }

    /// Errors a caller should surface to the user as a message (an expired
    /// view, an unknown page) instead of reporting them as failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound { .. } | Self::PageNotFound { .. } | Self::SubPageNotFound { .. }
        )
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {error}")]
    Read {
        path: String,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to parse config: {error}")]
    Parse {
        #[source]
        error: toml::de::Error,
    },
    #[error("sweep interval must be greater than zero")]
    InvalidSweepInterval,
}
