//! Error types
//!
//! Construction problems are reported eagerly through these types. Problems
//! found while stepping (an unsupported shape pair, an equation between a body
//! and itself) are logged and skipped instead.

use crate::config::ConfigError;
use thiserror::Error;

/// Malformed shape geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A face references a vertex index that does not exist
    #[error("face {face} references missing vertex {vertex}")]
    MissingVertex {
        /// Face index
        face: usize,
        /// Offending vertex index
        vertex: usize,
    },

    /// A face has fewer than three vertices or zero area
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// Face index
        face: usize,
    },

    /// A vertex lies in front of a face plane (inverted winding or a concave hull)
    #[error("face {face} has vertices in front of its plane")]
    NotConvex {
        /// Face index
        face: usize,
    },

    /// Not enough vertices to form a solid
    #[error("convex polyhedron needs at least 4 vertices, got {0}")]
    TooFewVertices(usize),

    /// Negative radius
    #[error("radius must be non-negative, got {0}")]
    NegativeRadius(f64),

    /// Non-positive or non-finite dimensions
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Malformed height samples
    #[error("invalid heightfield: {0}")]
    InvalidHeightfield(String),

    /// Malformed triangle mesh
    #[error("invalid trimesh: {0}")]
    InvalidTrimesh(String),

    /// A compound without children
    #[error("compound shape has no children")]
    EmptyCompound,
}

/// Engine-level errors
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Shape construction failed
    #[error("invalid shape: {0}")]
    InvalidShape(#[from] ShapeError),

    /// Handle does not refer to a live body
    #[error("unknown body handle")]
    UnknownBody,

    /// Handle does not refer to a live constraint
    #[error("unknown constraint handle")]
    UnknownConstraint,

    /// Configuration failed validation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Mass is negative or not finite
    #[error("invalid mass: {0}")]
    InvalidMass(f64),

    /// Time step is not a positive finite number
    #[error("invalid time step: {0}")]
    InvalidTimeStep(f64),

    /// Configuration could not be loaded or saved
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias for engine operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
