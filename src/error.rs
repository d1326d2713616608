use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::autoapply::{
    ExtractError, IdentifierListError, InputError, RepositoryError, RunError, SessionError,
};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Input(InputError),
    Storage(RepositoryError),
    Session(SessionError),
    Run(RunError),
    Extract(ExtractError),
    Identifiers(IdentifierListError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Input(err) => write!(f, "profile error: {}", err),
            AppError::Storage(err) => write!(f, "state error: {}", err),
            AppError::Session(err) => write!(f, "session setup error: {}", err),
            AppError::Run(err) => write!(f, "run error: {}", err),
            AppError::Extract(err) => write!(f, "extraction error: {}", err),
            AppError::Identifiers(err) => write!(f, "identifier list error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Input(err) => Some(err),
            AppError::Storage(err) => Some(err),
            AppError::Session(err) => Some(err),
            AppError::Run(err) => Some(err),
            AppError::Extract(err) => Some(err),
            AppError::Identifiers(err) => Some(err),
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<InputError> for AppError {
    fn from(value: InputError) -> Self {
        Self::Input(value)
    }
}

impl From<RepositoryError> for AppError {
    fn from(value: RepositoryError) -> Self {
        Self::Storage(value)
    }
}

impl From<SessionError> for AppError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<RunError> for AppError {
    fn from(value: RunError) -> Self {
        Self::Run(value)
    }
}

impl From<ExtractError> for AppError {
    fn from(value: ExtractError) -> Self {
        Self::Extract(value)
    }
}

impl From<IdentifierListError> for AppError {
    fn from(value: IdentifierListError) -> Self {
        Self::Identifiers(value)
    }
}
