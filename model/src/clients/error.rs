use crate::Error as ModelError;
pub use http::StatusCode;
use snafu::Snafu;
use std::path::PathBuf;

/// The `Result` type returned by `clients`.
pub type Result<T> = std::result::Result<T, Error>;

/// The public error type returned by `clients`.
#[derive(Debug, Snafu)]
pub struct Error(InnerError);

/// The private error type returned by `clients`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(super)))]
pub(crate) enum InnerError {
    #[snafu(display("{}", source))]
    Conversion { source: ModelError },

    #[snafu(display("Unable to read kubeconfig '{}': {}", path.display(), source))]
    Kubeconfig {
        path: PathBuf,
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to read the default kubeconfig: {}", source))]
    DefaultKubeconfig {
        source: kube::config::KubeconfigError,
    },

    #[snafu(display("Unable to infer a Kubernetes configuration: {}", source))]
    InferConfig {
        source: kube::config::InferConfigError,
    },

    #[snafu(display("Invalid API server URL '{}': {}", url, source))]
    ClusterUrl {
        url: String,
        source: http::uri::InvalidUri,
    },

    #[snafu(display(
        "Error initializing the Kubernetes client for '{}': {}",
        endpoint,
        source
    ))]
    Initialization {
        endpoint: String,
        source: kube::Error,
    },

    #[snafu(display("Unable to {} {}: {}", method, what, source))]
    KubeApiCall {
        method: String,
        what: String,
        source: kube::Error,
    },

    #[snafu(display(
        "None of the configured managed clusters {:?} is registered on the hub",
        candidates
    ))]
    NoImportedCluster { candidates: Vec<String> },

    #[snafu(display(
        "ManagedServiceAccount '{}' does not reference a token secret yet",
        name
    ))]
    MissingSecretRef { name: String },

    #[snafu(display("Secret '{}' has an empty '{}' entry", secret, key))]
    EmptyToken { secret: String, key: String },

    #[snafu(display(
        "Secret '{}' holds a token that is not valid UTF-8: {}",
        secret,
        source
    ))]
    InvalidToken {
        secret: String,
        source: std::string::FromUtf8Error,
    },

    #[snafu(display("The token for '{}' failed to authenticate: {}", username, reason))]
    TokenNotAuthenticated { username: String, reason: String },

    #[snafu(display(
        "The token authenticated as '{}' but '{}' was expected",
        actual,
        expected
    ))]
    UsernameMismatch { expected: String, actual: String },

    #[snafu(display("MultiClusterEngine CR not found"))]
    MultiClusterEngineMissing,

    #[snafu(display("Unable to find 'spec.overrides.components' in '{}'", name))]
    ComponentsMissing { name: String },

    #[snafu(display(
        "Unexpected format for component {} of '{}': expected an object",
        index,
        name
    ))]
    ComponentFormat { name: String, index: usize },
}

impl From<ModelError> for Error {
    fn from(e: ModelError) -> Self {
        Error(InnerError::Conversion { source: e })
    }
}

/// The broad categories callers act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The API server answered 404. This is the only authoritative evidence of absence.
    NotFound,
    /// Any other failure talking to an API server, including client construction.
    Transport,
    /// An object did not have the shape its type requires.
    Conversion,
    /// The issued credential was missing, empty or did not authenticate as expected.
    Validation,
    /// An object the suite needs to exist or to be shaped a certain way was not.
    Precondition,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match &self.0 {
            InnerError::KubeApiCall { .. } if self.is_not_found() => ErrorKind::NotFound,
            InnerError::KubeApiCall { .. }
            | InnerError::Kubeconfig { .. }
            | InnerError::DefaultKubeconfig { .. }
            | InnerError::InferConfig { .. }
            | InnerError::ClusterUrl { .. }
            | InnerError::Initialization { .. } => ErrorKind::Transport,
            InnerError::Conversion { .. } => ErrorKind::Conversion,
            InnerError::MissingSecretRef { .. }
            | InnerError::EmptyToken { .. }
            | InnerError::InvalidToken { .. }
            | InnerError::TokenNotAuthenticated { .. }
            | InnerError::UsernameMismatch { .. } => ErrorKind::Validation,
            InnerError::NoImportedCluster { .. }
            | InnerError::MultiClusterEngineMissing
            | InnerError::ComponentsMissing { .. }
            | InnerError::ComponentFormat { .. } => ErrorKind::Precondition,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.is_status_code(StatusCode::NOT_FOUND)
    }
}

pub trait HttpStatusCode {
    fn status_code(&self) -> Option<StatusCode>;

    fn is_status_code(&self, status_code: StatusCode) -> bool {
        self.status_code()
            .map(|some| some == status_code)
            .unwrap_or_default()
    }
}

impl HttpStatusCode for kube::Error {
    fn status_code(&self) -> Option<StatusCode> {
        if let kube::Error::Api(error_response) = self {
            StatusCode::from_u16(error_response.code).ok()
        } else {
            None
        }
    }
}

impl HttpStatusCode for InnerError {
    fn status_code(&self) -> Option<StatusCode> {
        match self {
            InnerError::KubeApiCall { source, .. } | InnerError::Initialization { source, .. } => {
                source.status_code()
            }
            _ => None,
        }
    }
}

impl HttpStatusCode for Error {
    fn status_code(&self) -> Option<StatusCode> {
        self.0.status_code()
    }
}

impl<T, E> HttpStatusCode for std::result::Result<T, E>
where
    E: HttpStatusCode,
{
    fn status_code(&self) -> Option<StatusCode> {
        self.as_ref().err().and_then(|e| e.status_code())
    }
}

/// Turns a 404 into `Ok(None)` while every other error is returned unchanged.
pub trait AllowNotFound<T> {
    /// `on_not_found` is called with the swallowed error, typically to log it.
    fn allow_not_found<F>(self, on_not_found: F) -> Result<Option<T>>
    where
        F: FnOnce(&Error);
}

impl<T> AllowNotFound<T> for Result<T> {
    fn allow_not_found<F>(self, on_not_found: F) -> Result<Option<T>>
    where
        F: FnOnce(&Error),
    {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => {
                on_not_found(&e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
