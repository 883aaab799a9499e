//! Error types for fea-link

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::elements::ElementType;
use crate::session::SessionState;

/// Kind of raw input a geometry error points into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryItem {
    /// A line segment, indexed in segment order
    Line,
    /// A facet, indexed in facet order
    Facet,
    /// A support or load location
    Location,
    /// A support's local plane
    Frame,
}

impl fmt::Display for GeometryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Line => "line",
            Self::Facet => "facet",
            Self::Location => "location",
            Self::Frame => "local plane",
        })
    }
}

/// Main error type for model assembly and engine session operations
#[derive(Error, Debug)]
pub enum LinkError {
    #[error("Invalid geometry at {item} {index}: {reason}")]
    Geometry {
        item: GeometryItem,
        index: usize,
        reason: String,
    },

    #[error("Unsupported element type '{0}'")]
    UnsupportedType(String),

    #[error("Cannot convert {found} to {expected}")]
    Conversion { expected: String, found: String },

    #[error("Engine is already held by another session")]
    EngineUnavailable,

    #[error("Cannot access model file {path:?}: {reason}")]
    FileAccess { path: PathBuf, reason: String },

    #[error("Failed to save model file {path:?}: {reason}")]
    Save { path: PathBuf, reason: String },

    #[error("Failed to push {kind} at index {index}: {reason}")]
    Mutation {
        kind: ElementType,
        index: usize,
        reason: String,
    },

    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LinkError {
    pub(crate) fn geometry(item: GeometryItem, index: usize, reason: impl Into<String>) -> Self {
        Self::Geometry {
            item,
            index,
            reason: reason.into(),
        }
    }

    /// Kind of raw input behind a geometry error
    pub fn geometry_item(&self) -> Option<GeometryItem> {
        match self {
            Self::Geometry { item, .. } => Some(*item),
            _ => None,
        }
    }

    /// Index of the offending item, if the error points at one
    pub fn offending_index(&self) -> Option<usize> {
        match self {
            Self::Geometry { index, .. } | Self::Mutation { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Result type for fea-link operations
pub type LinkResult<T> = Result<T, LinkError>;
