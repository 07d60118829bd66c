//! Error types
//!
//! Every failure stays inside the unit that hit it. Units render asset and
//! fetch failures as an error panel with a retry action, validation errors
//! block a submission without touching the store, and malformed jar items
//! never surface at all.

use std::time::Duration;

/// Failure fetching text or JSON from an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read
    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },
    /// The collaborator answered with a non-2xx status
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    /// No answer within the configured fetch timeout
    #[error("request to {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
    /// The body was not the JSON document we expected
    #[error("invalid JSON from {url}: {reason}")]
    Decode { url: String, reason: String },
}

/// Failure resolving or loading a unit's presentation assets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AssetError {
    #[error("failed to load asset {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: FetchError,
    },
    /// The script dependency graph loops back on itself
    #[error("dependency cycle through {0}")]
    Cycle(String),
    /// A dependency requires an id nobody declared
    #[error("{dependent} requires unknown dependency {missing}")]
    UnknownDependency { dependent: String, missing: String },
}

/// Failure category surfaced by a unit host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnitError {
    /// Style, template or script could not be loaded
    #[error("asset load failed: {0}")]
    AssetLoad(#[from] AssetError),
    /// The unit's data source failed
    #[error("data fetch failed: {0}")]
    DataFetch(#[source] FetchError),
    /// The unit's asset declaration is unusable (bad dependency graph)
    #[error("unit {unit} cannot be registered: {source}")]
    Registration {
        unit: &'static str,
        #[source]
        source: AssetError,
    },
    /// The mount was cancelled before it completed
    #[error("mount cancelled")]
    Cancelled,
}

impl UnitError {
    /// Headline shown above the failure reason in the error panel.
    pub fn headline(&self) -> &'static str {
        match self {
            UnitError::AssetLoad(_) | UnitError::Registration { .. } => "Failed to Load Component",
            UnitError::DataFetch(_) => "Failed to Load Data",
            UnitError::Cancelled => "Loading Cancelled",
        }
    }

    /// Underlying failure reason, without the category prefix
    pub fn reason(&self) -> String {
        match self {
            UnitError::AssetLoad(source) | UnitError::Registration { source, .. } => {
                source.to_string()
            }
            UnitError::DataFetch(source) => source.to_string(),
            UnitError::Cancelled => self.to_string(),
        }
    }
}

/// A submission the definitions table does not allow.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("no cookie selected")]
    MissingKey,
    #[error("no value entered")]
    MissingValue,
    #[error("{0} is not a known control cookie")]
    UnknownKey(String),
    #[error("{value:?} is not one of the choices for {name}")]
    UnknownChoice { name: String, value: String },
    #[error("{value:?} is not a number")]
    NotANumber { value: String },
    #[error("{value} is outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("{value} is not a multiple of {step} from {min}")]
    StepMismatch { value: f64, min: f64, step: f64 },
}

/// Write rejected by the cookie store adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("cookie key must not be empty")]
    EmptyKey,
}

/// Failure reported by an event bus handler.
///
/// The bus logs it and keeps delivering to the remaining subscribers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HandlerError(pub String);

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<std::cell::BorrowMutError> for HandlerError {
    fn from(_: std::cell::BorrowMutError) -> Self {
        Self::new("unit state is already borrowed")
    }
}
