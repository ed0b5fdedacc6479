use std::fmt;

use thiserror::Error;

/// Machine-readable error codes for the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NoGeometryFound,
    LocationNotFound,
    MalformedArchive,
    ProviderUnavailable,
    InputUnreadable,
    EmptyGraph,
    UnknownMetric,
    InvalidWeight,
    NonFiniteScore,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NoGeometryFound => "E1001",
            Self::LocationNotFound => "E1002",
            Self::MalformedArchive => "E1003",
            Self::ProviderUnavailable => "E1004",
            Self::InputUnreadable => "E1005",
            Self::EmptyGraph => "E2001",
            Self::UnknownMetric => "E2002",
            Self::InvalidWeight => "E3001",
            Self::NonFiniteScore => "E3002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoGeometryFound => "No line geometry found",
            Self::LocationNotFound => "Location not found",
            Self::MalformedArchive => "Malformed input archive",
            Self::ProviderUnavailable => "Road network provider unavailable",
            Self::InputUnreadable => "Input file could not be read",
            Self::EmptyGraph => "Graph has no edges",
            Self::UnknownMetric => "Unknown metric",
            Self::InvalidWeight => "Invalid edge weight",
            Self::NonFiniteScore => "Non-finite centrality score",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NoGeometryFound => {
                Some("Upload a zip with a LineString shapefile or GeoJSON layer.")
            }
            Self::LocationNotFound => Some("Use a more specific place name, e.g. \"Moratuwa, Sri Lanka\"."),
            Self::MalformedArchive => Some("Check that the upload is a valid zip archive."),
            Self::ProviderUnavailable => Some("Retry later or pass --road-network with a local file."),
            Self::InputUnreadable => Some("Check that the input path exists and is readable."),
            Self::EmptyGraph => Some("Check that the input contains connected line segments."),
            Self::UnknownMetric => Some("Use one of: betweenness, closeness, connectivity."),
            Self::InvalidWeight | Self::NonFiniteScore | Self::InternalUnexpected => {
                Some("Retry once. If persistent, report a bug with logs.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures while acquiring or decoding input.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("no valid line geometry found in input")]
    NoGeometryFound,

    #[error("location not found: {0}")]
    LocationNotFound(String),

    #[error("malformed archive: {0}")]
    MalformedArchive(String),

    #[error("road network provider failed: {0}")]
    Provider(String),

    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Precondition failures detected before any centrality work runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("graph has no edges")]
    EmptyGraph,

    #[error("unknown metric: {0}")]
    UnknownMetric(String),
}

/// Numerical failures inside the centrality engine.
#[derive(Debug, Error, PartialEq)]
pub enum ComputationError {
    #[error("edge {edge} has invalid weight {weight}")]
    InvalidWeight { edge: usize, weight: f64 },

    #[error("{metric} produced a non-finite score at index {index}")]
    NonFiniteScore { metric: &'static str, index: usize },
}

/// Every failure the pipeline can return.
#[derive(Debug, Error)]
pub enum CentralityError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Computation(#[from] ComputationError),
}

impl CentralityError {
    /// The stable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Input(InputError::NoGeometryFound) => ErrorCode::NoGeometryFound,
            Self::Input(InputError::LocationNotFound(_)) => ErrorCode::LocationNotFound,
            Self::Input(InputError::MalformedArchive(_)) => ErrorCode::MalformedArchive,
            Self::Input(InputError::Io(_)) => ErrorCode::InputUnreadable,
            Self::Input(InputError::Provider(_)) => ErrorCode::ProviderUnavailable,
            Self::Validation(ValidationError::EmptyGraph) => ErrorCode::EmptyGraph,
            Self::Validation(ValidationError::UnknownMetric(_)) => ErrorCode::UnknownMetric,
            Self::Computation(ComputationError::InvalidWeight { .. }) => ErrorCode::InvalidWeight,
            Self::Computation(ComputationError::NonFiniteScore { .. }) => {
                ErrorCode::NonFiniteScore
            }
        }
    }
}
