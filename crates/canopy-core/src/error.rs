//! Error types for Canopy core.

use std::fmt;

/// A single resource that failed to release.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Failed to release {resource}: {message}")]
pub struct DisposeError {
    /// Human-readable name of the resource (command id, menu entry, ...).
    pub resource: String,
    /// What went wrong.
    pub message: String,
}

impl DisposeError {
    /// Create a dispose error for the named resource.
    pub fn new(resource: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            message: message.into(),
        }
    }
}

/// Every failure collected while releasing a [`DisposableStore`](crate::DisposableStore).
///
/// Failures are kept in release order. A store never stops at the first
/// failure, so this may hold more than one entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisposeErrors {
    errors: Vec<DisposeError>,
}

impl DisposeErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure.
    pub fn push(&mut self, error: DisposeError) {
        self.errors.push(error);
    }

    /// Append every failure from another collection.
    pub fn extend(&mut self, other: DisposeErrors) {
        self.errors.extend(other.errors);
    }

    /// Returns `true` if no failure was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of recorded failures.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The recorded failures, in release order.
    pub fn errors(&self) -> &[DisposeError] {
        &self.errors
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    pub fn into_result(self) -> Result<(), DisposeErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for DisposeErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} resource(s) failed to release", self.errors.len())?;
        for err in &self.errors {
            write!(f, "; {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for DisposeErrors {}

impl From<DisposeError> for DisposeErrors {
    fn from(err: DisposeError) -> Self {
        Self { errors: vec![err] }
    }
}

/// Async runtime errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    /// Not called from within a Tokio runtime and no handle was supplied.
    #[error("No Tokio runtime is available on this thread")]
    NoRuntime,
}
