//! Error types for the AWI operator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeError(#[source] kube::Error),

    /// Update rejected because the object changed since it was read
    #[error("Conflicting update of {0}")]
    Conflict(String),

    /// Transport-level failure talking to the control plane (includes deadlines)
    #[error("Control plane request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Control plane answered with a non-success status
    #[error("Control plane returned {status}: {message}")]
    ControlPlane { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Object is missing data required to act on it
    #[error("Invalid object: {0}")]
    InvalidObject(String),

    /// A bounded pass exceeded its deadline
    #[error("Deadline exceeded: {0}")]
    Timeout(String),

    /// Operator configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<kube::Error> for Error {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ref response) if response.code == 409 => {
                Error::Conflict(response.message.clone())
            }
            other => Error::KubeError(other),
        }
    }
}

impl Error {
    /// Whether the failure is expected to clear up on its own
    pub fn is_retriable(&self) -> bool {
        match self {
            Error::Conflict(_) | Error::Http(_) | Error::Timeout(_) => true,
            Error::ControlPlane { status, .. } => *status >= 500 || *status == 429,
            Error::KubeError(kube::Error::Api(response)) => response.code >= 500,
            Error::KubeError(_) => true,
            Error::SerializationError(_) | Error::InvalidObject(_) | Error::ConfigError(_) => {
                false
            }
        }
    }

    /// Whether the error means the object does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KubeError(kube::Error::Api(response)) if response.code == 404)
            || matches!(self, Error::ControlPlane { status: 404, .. })
    }
}
