use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the environment manager.
///
/// Every layer wraps the error it receives in [`EnvError::Context`] so the
/// top-level message reads as a chain (`failed to use go:1.21.5: SDK ... is
/// not installed`). Use [`EnvError::kind`] to match on the underlying cause.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("SDK {sdk}:{version} is already installed at {}", path.display())]
    AlreadyInstalled {
        sdk: String,
        version: String,
        path: PathBuf,
    },

    #[error("SDK {sdk}:{version} is not installed, use 'ktenv add {sdk}:{version}' to install it first")]
    NotInstalled { sdk: String, version: String },

    #[error("SDK {0} is not currently active")]
    NotActive(String),

    #[error("download failed: {0}")]
    Download(String),

    #[error("extract failed: {0}")]
    Extract(String),

    #[error("state file error: {0}")]
    StateIo(String),

    #[error("state file {} was modified by another ktenv process, retry the command", .0.display())]
    StateConflict(PathBuf),

    #[error("unsupported shell type: {0}")]
    UnsupportedShell(String),

    #[error("operation cancelled")]
    Cancelled,

    /// Displays the whole chain itself, so it reports no `source()`.
    #[error("{context}: {cause}")]
    Context {
        context: String,
        cause: Box<EnvError>,
    },
}

/// Structural classification of an [`EnvError`], independent of any context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Validation,
    NotFound,
    AlreadyInstalled,
    NotInstalled,
    NotActive,
    Download,
    Extract,
    StateIo,
    StateConflict,
    UnsupportedShell,
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Config => "config",
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not-found",
            ErrorKind::AlreadyInstalled => "already-installed",
            ErrorKind::NotInstalled => "not-installed",
            ErrorKind::NotActive => "not-active",
            ErrorKind::Download => "download",
            ErrorKind::Extract => "extract",
            ErrorKind::StateIo => "state-io",
            ErrorKind::StateConflict => "state-conflict",
            ErrorKind::UnsupportedShell => "unsupported-shell",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl EnvError {
    /// Kind of the innermost error, skipping context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvError::Config(_) => ErrorKind::Config,
            EnvError::Validation(_) => ErrorKind::Validation,
            EnvError::NotFound { .. } => ErrorKind::NotFound,
            EnvError::AlreadyInstalled { .. } => ErrorKind::AlreadyInstalled,
            EnvError::NotInstalled { .. } => ErrorKind::NotInstalled,
            EnvError::NotActive(_) => ErrorKind::NotActive,
            EnvError::Download(_) => ErrorKind::Download,
            EnvError::Extract(_) => ErrorKind::Extract,
            EnvError::StateIo(_) => ErrorKind::StateIo,
            EnvError::StateConflict(_) => ErrorKind::StateConflict,
            EnvError::UnsupportedShell(_) => ErrorKind::UnsupportedShell,
            EnvError::Cancelled => ErrorKind::Cancelled,
            EnvError::Context { cause, .. } => cause.kind(),
        }
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    pub(crate) fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        EnvError::NotFound {
            what,
            name: name.into(),
        }
    }

    fn wrap(self, context: String) -> Self {
        EnvError::Context {
            context,
            cause: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EnvError>;

/// Attach operation context to an [`EnvError`] result.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.wrap(context.into()))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.wrap(f().into()))
    }
}
