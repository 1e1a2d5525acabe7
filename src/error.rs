use thiserror::Error;

/// Boxed error returned by an encoder or decoder.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of [`Error`], for callers that only need to pick a response
/// (for example: redirect to sign-in on [`ErrorKind::NotFound`] or [`ErrorKind::Integrity`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The store was built or configured incorrectly.
    Config,
    /// The session value could not be turned into cookies.
    Encoding,
    /// The request carries no session cookie.
    NotFound,
    /// The session cookie did not pass verification.
    Integrity,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("cookie store requires an encoder/decoder")]
    MissingDependency,

    #[error("invalid cookie options: {0}")]
    InvalidOptions(&'static str),

    #[error("no encoder configured to marshal a typed session value")]
    MissingEncoder,

    #[error("failed to marshal session value: {0}")]
    Marshal(#[source] BoxError),

    #[error("session token needs {chunks} cookies, at most {max} are allowed")]
    TooManyChunks { chunks: usize, max: usize },

    #[error("session cookie is not a valid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),

    #[error("session cookie '{name}' not found")]
    NotFound { name: String },

    #[error("no decoder configured to verify the session")]
    MissingDecoder,

    #[error("session failed verification: {0}")]
    Integrity(#[source] BoxError),
}

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingDependency | Self::InvalidOptions(_) => ErrorKind::Config,
            Self::MissingEncoder
            | Self::Marshal(_)
            | Self::TooManyChunks { .. }
            | Self::InvalidHeader(_) => ErrorKind::Encoding,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::MissingDecoder | Self::Integrity(_) => ErrorKind::Integrity,
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    #[must_use]
    pub fn is_integrity(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    pub(crate) fn marshal(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Marshal(Box::new(source))
    }

    pub(crate) fn integrity(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Integrity(Box::new(source))
    }
}
