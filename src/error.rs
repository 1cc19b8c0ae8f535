use std::sync::Arc;

use thiserror::Error;

/// Failure of a deferred computation.
///
/// Clones share the same underlying error, so a cached failure is re-raised
/// as the very same error on every access.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    #[error("deferred computation failed: {0}")]
    Computation(Arc<anyhow::Error>),
}

impl FrameError {
    pub fn computation(err: impl Into<anyhow::Error>) -> Self {
        FrameError::Computation(Arc::new(err.into()))
    }

    /// The error the computation failed with.
    pub fn inner(&self) -> &anyhow::Error {
        match self {
            FrameError::Computation(err) => err,
        }
    }

    /// Whether both errors come from the same failure.
    pub fn same_failure(&self, other: &FrameError) -> bool {
        match (self, other) {
            (FrameError::Computation(a), FrameError::Computation(b)) => Arc::ptr_eq(a, b),
        }
    }
}
