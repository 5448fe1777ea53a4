use miette::{Diagnostic, Result};
use thiserror::Error;

/// Main error type for the organiser
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("{0}")]
    #[diagnostic(code(organiser::validation))]
    Validation(String),

    #[error("{0}")]
    #[diagnostic(code(organiser::load_failed))]
    LoadFailed(String),

    #[error("{0}")]
    #[diagnostic(code(organiser::create_failed))]
    CreateFailed(String),

    #[error("{0}")]
    #[diagnostic(code(organiser::update_failed))]
    UpdateFailed(String),

    #[error("{0}")]
    #[diagnostic(code(organiser::delete_failed))]
    DeleteFailed(String),

    #[error("Discarded stale response: {0}")]
    #[diagnostic(code(organiser::stale))]
    Stale(String),

    #[error("{0}")]
    #[diagnostic(code(organiser::in_flight))]
    InFlight(String),

    #[error("Organiser service error: {0}")]
    #[diagnostic(code(organiser::remote))]
    Remote(String),

    #[error("Environment error: {0}")]
    #[diagnostic(code(organiser::environment))]
    Environment(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(organiser::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(organiser::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(organiser::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(organiser::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(organiser::other))]
    Other(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl Error {
    /// Whether the failure was caught locally before any request went out
    pub fn is_local(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::InFlight(_))
    }
}

/// Type alias for Result with our Error type
pub type OrganiserResult<T> = Result<T, Error>;

/// Helper to create environment errors
pub fn env_error(var: &str) -> Error {
    Error::Environment(format!("Missing environment variable: {}", var))
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}

/// Helper to create organiser service errors
pub fn remote_error(message: &str) -> Error {
    Error::Remote(message.to_string())
}
