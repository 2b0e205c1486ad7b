//! Error types and result aliases for tangle operations.
//!
//! Provides a unified error type that covers every terminal failure of a
//! resolution request, with actionable suggestions for the CLI.

use thiserror::Error;

/// Unified error type for all tangle operations
#[derive(Error, Debug)]
pub enum TangleError {
    // Identity & version errors
    #[error("Malformed version or version range: '{text}'")]
    MalformedVersion { text: String },

    #[error("Unsupported target framework: '{text}'")]
    UnsupportedFramework { text: String },

    // Registry errors
    #[error("Package '{identity}' was not found in any repository")]
    PackageNotFound { identity: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid package archive: {message}")]
    Archive { message: String },

    // Resolution errors
    #[error("No resolved candidate of '{id}' satisfies the declared range {range}")]
    UnsatisfiedDependency { id: String, range: String },

    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    #[error("Edge {from} -> {to} references a node that is not in the graph")]
    DanglingEdge { from: String, to: String },

    #[error("Resolution was cancelled")]
    Cancelled,

    // Project errors
    #[error("Failed to load project '{path}': {reason}")]
    ProjectLoad { path: String, reason: String },

    #[error("No lock file found for project '{path}'")]
    MissingRestore { path: String },

    #[error("Project '{path}' is not supported: {reason}")]
    UnsupportedProject { path: String, reason: String },

    // Config errors
    #[error("Failed to parse configuration: {message}")]
    TomlParse { message: String },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for tangle operations
pub type TangleResult<T> = Result<T, TangleError>;

impl TangleError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Shorthand for a malformed version or range
    pub fn malformed(text: impl Into<String>) -> Self {
        Self::MalformedVersion { text: text.into() }
    }

    /// Check if this error is recoverable by trying another repository
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            TangleError::Network { .. } | TangleError::Io { .. } | TangleError::Archive { .. }
        )
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            TangleError::PackageNotFound { .. } => {
                Some("Check the package id and version, or add the repository that hosts it")
            },
            TangleError::Network { .. } => Some("Check your internet connection and try again"),
            TangleError::MissingRestore { .. } => {
                Some("Run a restore for the project first so its lock file exists")
            },
            TangleError::UnsupportedProject { .. } => {
                Some("Only PackageReference-style .csproj, .fsproj and .vbproj projects are supported")
            },
            TangleError::UnsupportedFramework { .. } => {
                Some("Use a short framework name such as net48, netstandard2.0 or net8.0")
            },
            TangleError::UnsatisfiedDependency { .. } => {
                Some("The newest discovered version conflicts with a declared range; pin the dependency explicitly")
            },
            _ => None,
        }
    }
}
