//! Error types for the tactics core.
//!
//! Only setup operations (grid construction, spawning, coordinate parsing,
//! rules loading) can fail. The tick itself never returns an error: invalid
//! input degrades to "stand still" or "ignore order".

use thiserror::Error;

use crate::grid::Coord;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for the tactics core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GameError {
    /// Algebraic coordinate outside files A-L / ranks 1-12.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Position lies outside the terrain grid.
    #[error("Position ({}, {}) is outside the grid", .0.x, .0.y)]
    OutOfBounds(Coord),

    /// Position is a water cell and cannot hold a unit.
    #[error("Position ({}, {}) is impassable", .0.x, .0.y)]
    Impassable(Coord),

    /// Another unit already stands on this cell.
    #[error("Position ({}, {}) is occupied", .0.x, .0.y)]
    Occupied(Coord),

    /// A unit with this display name already exists.
    #[error("Unit name already in use: {0}")]
    DuplicateName(String),

    /// Unit names must be exactly two uppercase letters.
    #[error("Invalid unit name: {0:?}")]
    InvalidName(String),

    /// No unit is registered under this identifier.
    #[error("Invalid unit ID: {0}")]
    InvalidUnitId(u32),

    /// Terrain layout could not be turned into a grid.
    #[error("Invalid terrain layout: {0}")]
    InvalidTerrain(String),

    /// A rules value is outside its supported range.
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParseError {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },
}
