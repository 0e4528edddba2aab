//! Nine Lives level data -- authoring-side model for levels and tuning.
//!
//! This crate holds everything the engine reads before a level exists:
//!
//! - [`LevelData`]: per-category object property records (walls, activators,
//!   lasers, ...) deserialized from a level JSON file.
//! - [`GameConstants`]: explicit per-kind tuning structs. Every field has a
//!   default, so a constants file only needs the values it overrides.
//! - [`Direction`]: the four cardinal directions and the authoring angle
//!   mapping (0 = up, counter-clockwise in 90 degree steps).
//!
//! # Quick Start
//!
//! ```
//! use ninelives_data::prelude::*;
//!
//! let level = LevelData::from_json_str(r#"{
//!     "bounds": { "x": 0.0, "y": 0.0, "width": 32.0, "height": 18.0 },
//!     "cat": { "x": 2.0, "y": 2.0 }
//! }"#).unwrap();
//! assert_eq!(level.bounds.width, 32.0);
//!
//! assert_eq!(Direction::from_angle(90).unwrap(), Direction::Left);
//! ```

#![deny(unsafe_code)]

pub mod constants;
pub mod direction;
pub mod level;

pub use constants::GameConstants;
pub use direction::Direction;
pub use level::{Bounds, LevelData};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while reading or interpreting authoring data.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The JSON text did not match the expected schema.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A rotation that is not a multiple of 90 degrees.
    #[error("angle {angle} cannot be mapped to a direction (must be a multiple of 90)")]
    UnsupportedAngle {
        /// The offending angle in degrees.
        angle: i32,
    },

    /// A polygon with too few vertices or an odd coordinate count.
    #[error("polygon for '{object}' is degenerate: {reason}")]
    DegeneratePolygon {
        /// Name of the object carrying the polygon.
        object: String,
        /// What is wrong with it.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports.
pub mod prelude {
    pub use crate::constants::GameConstants;
    pub use crate::direction::Direction;
    pub use crate::level::{Bounds, LevelData};
    pub use crate::DataError;
}
