// src/error.rs
//! Error handling for the entire crate.
//!
//! Every failure here is a broken caller contract (bad mass, degenerate shape,
//! use after dispose, empty path) or a configuration problem. Nothing in the
//! per-frame path allocates unless it is already failing.

use thiserror::Error;

/// Main error type. Send + Sync + 'static.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O errors while reading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration (de)serialization.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Mass must be finite and non-negative.
    #[error("invalid mass {0}: must be finite and >= 0")]
    InvalidMass(f32),

    /// A dynamic body needs a shape with volume to derive inertia from.
    #[error("collision shape has no volume, cannot derive inertia for mass {mass}")]
    DegenerateShape { mass: f32 },

    /// The entity was disposed and its native handles released.
    #[error("entity `{0}` has been disposed")]
    Disposed(String),

    /// The entity's rigid body is no longer present in the physics world.
    #[error("rigid body of entity `{0}` is not in the physics world")]
    InvalidHandle(String),

    /// `set_path` needs at least one waypoint.
    #[error("path must contain at least one waypoint")]
    EmptyPath,

    /// No live entity with this id.
    #[error("unknown entity `{0}`")]
    UnknownEntity(String),

    /// Context chaining.
    #[error("{message}: {source}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Add context to any error (chainable, like `.context()` in anyhow).
    #[inline]
    pub fn context<C: Into<String>>(self, context: C) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    #[inline]
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Json(_) | Error::Config(_))
    }

    /// True for use-after-dispose and dangling-handle failures.
    #[inline]
    pub fn is_stale_handle(&self) -> bool {
        match self {
            Error::Disposed(_) | Error::InvalidHandle(_) => true,
            Error::WithContext { source, .. } => source.is_stale_handle(),
            _ => false,
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, Error>;
