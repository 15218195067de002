use std::path::PathBuf;
use std::process::ExitCode;

/// Categories of application errors that can be matched on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppErrorKind {
    /// Argument validation errors
    ArgValidation,
    /// Lockfile reading errors
    LockfileRead,
    /// Lockfile parsing errors
    LockfileParse,
    /// Errors while resolving packages and generating sources
    Generate,
    /// Errors writing the output file
    OutputWrite,
}

/// Internal error type that contains all application error variants.
#[derive(Debug, thiserror::Error)]
pub enum AppErrorInner {
    #[error("Argument error: {0}")]
    ArgValidation(String),
    #[error("Failed to read lockfile: {}", path.display())]
    LockfileRead {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Failed to parse lockfile: {}", path.display())]
    LockfileParse {
        path: PathBuf,
        #[source]
        err: toml::de::Error,
    },
    #[error("Failed to generate sources")]
    Generate(#[source] flatpak_cargo::Error),
    #[error("Failed to write output file: {}", path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
}

/// The application-level error. Wraps a boxed inner error together with its kind, which decides
/// the exit code.
#[derive(Debug)]
pub struct AppError(Box<AppErrorInner>, AppErrorKind);

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl AppError {
    pub fn new(inner: AppErrorInner, kind: AppErrorKind) -> Self {
        Self(Box::new(inner), kind)
    }

    pub fn error_kind(&self) -> &AppErrorKind {
        &self.1
    }

    pub fn arg_validation(msg: String) -> Self {
        Self::new(AppErrorInner::ArgValidation(msg), AppErrorKind::ArgValidation)
    }

    pub fn lockfile_read(path: PathBuf, err: std::io::Error) -> Self {
        Self::new(AppErrorInner::LockfileRead { path, err }, AppErrorKind::LockfileRead)
    }

    pub fn lockfile_parse(path: PathBuf, err: toml::de::Error) -> Self {
        Self::new(AppErrorInner::LockfileParse { path, err }, AppErrorKind::LockfileParse)
    }

    pub fn output_write(path: PathBuf, err: std::io::Error) -> Self {
        Self::new(AppErrorInner::OutputWrite { path, err }, AppErrorKind::OutputWrite)
    }

    /// Print this error and its chain of causes to stderr.
    pub fn report(&self) {
        eprintln!("error: {self}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            eprintln!("  caused by: {cause}");
            source = cause.source();
        }
    }
}

impl From<flatpak_cargo::Error> for AppError {
    fn from(err: flatpak_cargo::Error) -> Self {
        Self::new(AppErrorInner::Generate(err), AppErrorKind::Generate)
    }
}

impl From<AppError> for ExitCode {
    fn from(error: AppError) -> Self {
        ExitCode::from(match error.error_kind() {
            AppErrorKind::ArgValidation => 2,
            _ => 3,
        })
    }
}
