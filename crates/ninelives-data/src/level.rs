//! Level files: per-category object property records.
//!
//! A level is a JSON object with the world bounds, the cat's spawn point and
//! one array per object category. Every category except `bounds` and `cat`
//! may be omitted. Positions are world units (meters); rotations are degrees
//! in the [`Direction`](crate::direction::Direction) convention.
//!
//! Objects that can be driven by an activator carry an optional
//! `activator_id` and an `active` flag (the initial activation). Validation
//! of cross references (activator ids, type strings, angles) happens when the
//! engine populates the level; this module only checks shape.

use std::path::Path;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::DataError;

// ---------------------------------------------------------------------------
// Bounds
// ---------------------------------------------------------------------------

/// Axis-aligned world rectangle. Lasers terminate at its edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f32,
    /// Bottom edge.
    pub y: f32,
    /// Extent along x.
    pub width: f32,
    /// Extent along y.
    pub height: f32,
}

impl Bounds {
    /// Bottom-left corner.
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Top-right corner.
    pub fn max(&self) -> Vec2 {
        Vec2::new(self.x + self.width, self.y + self.height)
    }

    /// Whether `point` lies inside or on the edge of the rectangle.
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 32.0,
            height: 18.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Shared fields
// ---------------------------------------------------------------------------

/// Wiring of an activatable object to an activator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivationLink {
    /// Id of the controlling activator, if any.
    #[serde(default)]
    pub activator_id: Option<String>,
    /// Initial activation, on unless authored otherwise. The effective state
    /// is this XOR the activator.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Default for ActivationLink {
    fn default() -> Self {
        Self {
            activator_id: None,
            active: true,
        }
    }
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Per-category records
// ---------------------------------------------------------------------------

/// Player spawn point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CatSpawn {
    /// Spawn x.
    pub x: f32,
    /// Spawn y.
    pub y: f32,
}

/// Static terrain described by a convex polygon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WallData {
    /// Optional debug name.
    #[serde(default)]
    pub name: Option<String>,
    /// Flattened `[x0, y0, x1, y1, ...]` vertices in world space.
    pub shape: Vec<f32>,
    /// Whether the cat may climb this wall.
    #[serde(default)]
    pub climbable: bool,
}

impl WallData {
    /// Vertices as points, validated for count.
    pub fn points(&self) -> Result<Vec<Vec2>, DataError> {
        let name = self.name.clone().unwrap_or_else(|| "wall".to_owned());
        polygon_points(&name, &self.shape)
    }
}

/// Moving platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformData {
    /// Center x of the start position.
    pub x: f32,
    /// Center y of the start position.
    pub y: f32,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
    /// Displacement from the start position to the far end of the track.
    #[serde(default)]
    pub disp: [f32; 2],
    /// Travel speed override.
    #[serde(default)]
    pub speed: Option<f32>,
    /// Activator wiring.
    #[serde(flatten)]
    pub link: ActivationLink,
}

/// Checkpoint sensor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckpointData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Authoring rotation in degrees.
    #[serde(default)]
    pub rotation: i32,
}

/// Button, switch or timed button.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivatorData {
    /// Level-unique identifier referenced by `activator_id` fields.
    pub id: String,
    /// `"button"`, `"switch"` or `"timed"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Authoring rotation in degrees.
    #[serde(default)]
    pub rotation: i32,
    /// Countdown length in ticks for timed buttons.
    #[serde(default)]
    pub duration: Option<u32>,
}

/// An object placed at a point with a facing, optionally activatable.
/// Used by lasers, spikes and flamethrowers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectedData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Authoring rotation in degrees.
    #[serde(default)]
    pub rotation: i32,
    /// Activator wiring.
    #[serde(flatten)]
    pub link: ActivationLink,
}

/// Door that closes when activated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DoorData {
    /// Center x of the fully closed door.
    pub x: f32,
    /// Center y of the fully closed door.
    pub y: f32,
    /// Closed width.
    pub width: f32,
    /// Closed height.
    pub height: f32,
    /// Authoring rotation; the door grows toward this direction.
    #[serde(default)]
    pub rotation: i32,
    /// Ticks needed to fully open or close.
    #[serde(default)]
    pub total_ticks: Option<u32>,
    /// Activator wiring.
    #[serde(flatten)]
    pub link: ActivationLink,
}

/// Region in which body switching is allowed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpiritRegionData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
    /// Region color; regions of one color form one switching zone.
    #[serde(default)]
    pub color: String,
}

/// Enemy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobData {
    /// Spawn x.
    pub x: f32,
    /// Spawn y.
    pub y: f32,
    /// Aggressive mobs chase the cat on sight.
    #[serde(default)]
    pub aggressive: bool,
    /// Initial facing.
    #[serde(default = "default_true")]
    pub facing_right: bool,
}

impl Default for MobData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            aggressive: false,
            facing_right: true,
        }
    }
}

/// Pushable box. Frozen while deactivated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Controlling activator, if any.
    #[serde(default)]
    pub activator_id: Option<String>,
    /// Initial activation; boxes default to pushable.
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Default for BoxData {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            activator_id: None,
            active: true,
        }
    }
}

/// Laser mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MirrorData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Authoring rotation; determines the facing used by the reflection table.
    #[serde(default)]
    pub rotation: i32,
}

/// Camera zoom trigger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraTileData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
    /// Requested zoom factor.
    pub zoom: f32,
}

/// Level exit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitData {
    /// Center x.
    pub x: f32,
    /// Center y.
    pub y: f32,
    /// Full width.
    pub width: f32,
    /// Full height.
    pub height: f32,
    /// `"goal"` or `"return"`.
    #[serde(rename = "type")]
    pub kind: String,
}

// ---------------------------------------------------------------------------
// LevelData
// ---------------------------------------------------------------------------

/// Everything needed to populate one level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// World rectangle.
    pub bounds: Bounds,
    /// Player spawn.
    pub cat: CatSpawn,
    /// Exits.
    #[serde(default)]
    pub exits: Vec<ExitData>,
    /// Terrain.
    #[serde(default)]
    pub walls: Vec<WallData>,
    /// Moving platforms.
    #[serde(default)]
    pub platforms: Vec<PlatformData>,
    /// Checkpoints.
    #[serde(default)]
    pub checkpoints: Vec<CheckpointData>,
    /// Buttons, switches and timed buttons.
    #[serde(default)]
    pub activators: Vec<ActivatorData>,
    /// Laser emitters.
    #[serde(default)]
    pub lasers: Vec<DirectedData>,
    /// Spikes.
    #[serde(default)]
    pub spikes: Vec<DirectedData>,
    /// Flamethrowers.
    #[serde(default)]
    pub flamethrowers: Vec<DirectedData>,
    /// Doors.
    #[serde(default)]
    pub doors: Vec<DoorData>,
    /// Spirit regions.
    #[serde(default)]
    pub spirit_regions: Vec<SpiritRegionData>,
    /// Mobs.
    #[serde(default)]
    pub mobs: Vec<MobData>,
    /// Pushable boxes.
    #[serde(default)]
    pub boxes: Vec<BoxData>,
    /// Mirrors.
    #[serde(default)]
    pub mirrors: Vec<MirrorData>,
    /// Camera zoom tiles.
    #[serde(default)]
    pub camera_tiles: Vec<CameraTileData>,
}

impl LevelData {
    /// Parse a level from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a level file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let level = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), "level data loaded");
        Ok(level)
    }

    /// Total number of authored objects, not counting the cat.
    pub fn object_count(&self) -> usize {
        self.exits.len()
            + self.walls.len()
            + self.platforms.len()
            + self.checkpoints.len()
            + self.activators.len()
            + self.lasers.len()
            + self.spikes.len()
            + self.flamethrowers.len()
            + self.doors.len()
            + self.spirit_regions.len()
            + self.mobs.len()
            + self.boxes.len()
            + self.mirrors.len()
            + self.camera_tiles.len()
    }
}

/// Convert a flattened coordinate list into points.
///
/// # Errors
///
/// [`DataError::DegeneratePolygon`] for odd coordinate counts or fewer than
/// three vertices.
pub fn polygon_points(object: &str, flat: &[f32]) -> Result<Vec<Vec2>, DataError> {
    if flat.len() % 2 != 0 {
        return Err(DataError::DegeneratePolygon {
            object: object.to_owned(),
            reason: format!("odd coordinate count {}", flat.len()),
        });
    }
    if flat.len() < 6 {
        return Err(DataError::DegeneratePolygon {
            object: object.to_owned(),
            reason: format!("{} vertices, need at least 3", flat.len() / 2),
        });
    }
    Ok(flat
        .chunks_exact(2)
        .map(|pair| Vec2::new(pair[0], pair[1]))
        .collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_categories_default_to_empty() {
        let level = LevelData::from_json_str(
            r#"{ "bounds": { "x": 0, "y": 0, "width": 10, "height": 5 }, "cat": { "x": 1, "y": 1 } }"#,
        )
        .unwrap();
        assert_eq!(level.object_count(), 0);
        assert_eq!(level.cat, CatSpawn { x: 1.0, y: 1.0 });
    }

    #[test]
    fn activation_link_is_flattened() {
        let level = LevelData::from_json_str(
            r#"{
                "bounds": { "x": 0, "y": 0, "width": 10, "height": 5 },
                "cat": { "x": 1, "y": 1 },
                "doors": [{ "x": 4, "y": 2, "width": 1, "height": 3, "activator_id": "btn1" }],
                "activators": [{ "id": "btn1", "type": "button", "x": 2, "y": 1 }]
            }"#,
        )
        .unwrap();
        assert_eq!(level.doors[0].link.activator_id.as_deref(), Some("btn1"));
        assert!(level.doors[0].link.active, "activatables default to on");
        assert_eq!(level.activators[0].kind, "button");
    }

    #[test]
    fn boxes_default_to_active() {
        let level = LevelData::from_json_str(
            r#"{
                "bounds": { "x": 0, "y": 0, "width": 10, "height": 5 },
                "cat": { "x": 1, "y": 1 },
                "boxes": [{ "x": 3, "y": 1 }]
            }"#,
        )
        .unwrap();
        assert!(level.boxes[0].active);
    }

    #[test]
    fn missing_cat_is_a_parse_error() {
        let err = LevelData::from_json_str(r#"{ "bounds": { "x": 0, "y": 0, "width": 1, "height": 1 } }"#)
            .unwrap_err();
        assert!(matches!(err, DataError::Json(_)));
    }

    #[test]
    fn polygon_rejects_odd_and_short_lists() {
        assert!(polygon_points("w", &[0.0, 0.0, 1.0]).is_err());
        assert!(polygon_points("w", &[0.0, 0.0, 1.0, 0.0]).is_err());
        let pts = polygon_points("w", &[0.0, 0.0, 1.0, 0.0, 1.0, 1.0]).unwrap();
        assert_eq!(pts.len(), 3);
        assert_eq!(pts[2], Vec2::new(1.0, 1.0));
    }

    #[test]
    fn bounds_contains_edges() {
        let b = Bounds { x: 1.0, y: 2.0, width: 3.0, height: 4.0 };
        assert_eq!(b.max(), Vec2::new(4.0, 6.0));
        assert!(b.contains(Vec2::new(1.0, 2.0)));
        assert!(b.contains(Vec2::new(4.0, 6.0)));
        assert!(!b.contains(Vec2::new(4.1, 6.0)));
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = LevelData::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, DataError::Io { .. }));
    }
}
