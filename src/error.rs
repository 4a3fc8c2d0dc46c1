//! Error kinds for this crate's public surface.

use std::fmt;

/// Errors the connector can produce.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration failed validation (duplicate dimension names, zero-sized cache, etc).
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The named metrics exporter could not be resolved against the host's exporter set.
    #[error("exporter resolution failed: {0}")]
    ExporterResolution(String),

    /// `consume` was called before `start` resolved a metrics sink.
    #[error("processor has not been started")]
    NotStarted,

    /// The key caches and the aggregation store disagree about which keys are live.
    /// Indicates internal corruption; should never happen in correct operation.
    #[error("cache invariant violated: {0}")]
    CacheInvariant(String),

    /// A downstream consumer (metrics sink or trace sink) failed.
    #[error("downstream forwarding failed: {0}")]
    Forwarding(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a downstream consumer error as a [`Error::Forwarding`].
    pub fn forwarding(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Forwarding(Box::new(source))
    }

    /// Build a [`Error::CacheInvariant`] with a formatted message.
    pub fn cache_invariant(message: impl fmt::Display) -> Self {
        Self::CacheInvariant(message.to_string())
    }
}
