use std::error::Error;
use std::fmt::{Display, Formatter};
use svcdir_core::repo::RepoError;
use svcdir_core::{ConfigError, CoreError, DbError, LoggingError};

/// Failures that abort a CLI command before it produced its report.
#[derive(Debug)]
pub enum CliError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
    Core(CoreError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "config: {err}"),
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Db(err) => write!(f, "database: {err}"),
            Self::Core(err) => write!(f, "{} error: {err}", err.kind().as_str()),
            Self::Output(err) => write!(f, "output: {err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Core(err) => Some(err),
            Self::Output(err) => Some(err),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<CoreError> for CliError {
    fn from(value: CoreError) -> Self {
        Self::Core(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Core(CoreError::from(value))
    }
}
