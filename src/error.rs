use std::path::PathBuf;

/// All errors produced by the object store, the local/proxy repository layer,
/// and the version/item model.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("repo error: {0}")]
    Repo(String),

    #[error("proxy error: {0}")]
    Proxy(String),

    #[error("version error: {0}")]
    Version(String),

    #[error("item error: {0}")]
    Item(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("git error: {0}")]
    Git(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("not a repository: {0}")]
    InvalidRepository(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn repo(msg: impl Into<String>) -> Self {
        Self::Repo(msg.into())
    }

    pub fn proxy(msg: impl Into<String>) -> Self {
        Self::Proxy(msg.into())
    }

    pub fn version(msg: impl Into<String>) -> Self {
        Self::Version(msg.into())
    }

    pub fn item(msg: impl Into<String>) -> Self {
        Self::Item(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn git(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Git(Box::new(err))
    }

    pub fn git_msg(msg: impl Into<String>) -> Self {
        Self::Git(msg.into().into())
    }

    pub fn invalid_repository(path: impl Into<String>) -> Self {
        Self::InvalidRepository(path.into())
    }

    /// A store path failed [`crate::paths::normalize_path`] validation.
    pub fn invalid_path(msg: impl Into<String>) -> Self {
        Self::Item(format!("invalid path: {}", msg.into()))
    }

    /// A git reference name failed [`crate::paths::validate_ref_name`].
    pub fn invalid_ref_name(msg: impl Into<String>) -> Self {
        Self::Repo(format!("invalid ref name: {}", msg.into()))
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::Item(format!("not found: {}", path.into()))
    }

    pub fn not_a_directory(path: impl Into<String>) -> Self {
        Self::Item(format!("not a directory: {}", path.into()))
    }

    pub fn is_a_directory(path: impl Into<String>) -> Self {
        Self::Item(format!("is a directory: {}", path.into()))
    }

    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io(std::io::Error::new(
            err.kind(),
            format!("{}: {}", path.into().display(), err),
        ))
    }
}

impl From<git2::Error> for Error {
    fn from(err: git2::Error) -> Self {
        Self::git(err)
    }
}
