//! Error types for the cluster index cache.

use crate::filter::FilterSignature;
use thiserror::Error;

/// Boxed error returned by external loaders.
pub type LoaderError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Malformed bounding box, negative zoom, or invalid configuration.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external loader failed while materializing a signature.
    #[error("Failed to load points for '{signature}': {source}")]
    LoadFailure {
        signature: FilterSignature,
        #[source]
        source: LoaderError,
    },

    /// Clustering produced an inconsistent structure; nothing was cached.
    #[error("Failed to build cluster index for '{signature}': {reason}")]
    BuildFailure {
        signature: FilterSignature,
        reason: String,
    },

    /// The id does not name an aggregate cluster of this index.
    #[error("Cluster {0} not found")]
    ClusterNotFound(u64),
}

impl ClusterError {
    pub(crate) fn build_failure(signature: &FilterSignature, reason: impl Into<String>) -> Self {
        ClusterError::BuildFailure {
            signature: signature.clone(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClusterError>;
