//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all failure
//! modes during engine startup and the tick loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: crate::config::ConfigError,
    },

    /// Task tracking or scheduling failed.
    #[error("dispatch error: {source}")]
    Dispatch {
        /// The underlying dispatch error.
        #[from]
        source: menagerie_dispatch::DispatchError,
    },

    /// Perception registry operation failed.
    #[error("perception error: {source}")]
    Perception {
        /// The underlying perception error.
        #[from]
        source: menagerie_perception::PerceptionError,
    },

    /// A stimulus kind failed validation.
    #[error("stimulus error: {source}")]
    Stimulus {
        /// The underlying stimulus error.
        #[from]
        source: menagerie_types::StimulusError,
    },
}
