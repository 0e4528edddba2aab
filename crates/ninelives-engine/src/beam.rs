//! Laser beam tracing.
//!
//! A beam starts at the emitter's beam origin and travels in a cardinal
//! direction until it hits a solid fixture or reaches the edge of the level
//! bounds. Mirrors bend it according to [`Mirror::reflect`]; any other hit
//! ends it. The number of reflections is capped at [`MAX_REFLECTIONS`] so
//! that mirror loops terminate.

use glam::Vec2;
use ninelives_data::{Bounds, Direction};
use tracing::debug;

use crate::obstacle::{Mirror, ObstacleId};
use crate::physics::{FixtureTag, RayCaster};

/// Upper bound on mirror bounces per beam.
pub const MAX_REFLECTIONS: usize = 64;

/// Result of one trace.
#[derive(Debug, Clone, PartialEq)]
pub struct BeamTrace {
    /// Polyline: origin, every reflection point, then the end point.
    pub points: Vec<Vec2>,
    /// The fixture the beam ended on, or `None` if it left the bounds.
    pub terminal: Option<FixtureTag>,
    /// Whether the reflection cap cut the beam short.
    pub truncated: bool,
}

/// Distance from `origin` to the edge of `bounds` along `direction`.
pub fn distance_to_bounds(origin: Vec2, direction: Direction, bounds: &Bounds) -> f32 {
    let (min, max) = (bounds.min(), bounds.max());
    let d = match direction {
        Direction::Up => max.y - origin.y,
        Direction::Down => origin.y - min.y,
        Direction::Left => origin.x - min.x,
        Direction::Right => max.x - origin.x,
    };
    d.max(0.0)
}

/// Trace a beam from `origin` heading `direction`.
///
/// `emitter` is ignored by the first cast, and each mirror is ignored by the
/// cast leaving it. `mirror_at` resolves an obstacle to its mirror, if it is
/// one.
pub fn trace_beam(
    caster: &impl RayCaster,
    origin: Vec2,
    direction: Direction,
    bounds: &Bounds,
    emitter: Option<ObstacleId>,
    mirror_at: impl Fn(ObstacleId) -> Option<Mirror>,
) -> BeamTrace {
    let mut points = vec![origin];
    let mut from = origin;
    let mut heading = direction;
    let mut exclude = emitter;
    let mut reflections = 0;

    loop {
        let reach = distance_to_bounds(from, heading, bounds);
        let Some(hit) = caster.cast_ray(from, heading.unit(), reach, exclude) else {
            points.push(from + heading.unit() * reach);
            return BeamTrace {
                points,
                terminal: None,
                truncated: false,
            };
        };
        points.push(hit.point);

        let bounce = hit
            .tag
            .and_then(|tag| mirror_at(tag.obstacle).map(|m| (tag, m)))
            .and_then(|(tag, mirror)| mirror.reflect(heading).map(|next| (tag, next)));
        match bounce {
            Some((tag, next)) if reflections < MAX_REFLECTIONS => {
                reflections += 1;
                from = hit.point;
                heading = next;
                exclude = Some(tag.obstacle);
            }
            Some((tag, _)) => {
                debug!(mirror = %tag.obstacle, "beam reflection cap reached");
                return BeamTrace {
                    points,
                    terminal: hit.tag,
                    truncated: true,
                };
            }
            None => {
                return BeamTrace {
                    points,
                    terminal: hit.tag,
                    truncated: false,
                };
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
