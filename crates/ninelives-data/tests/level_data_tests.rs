//! Level and constants files parsed end to end.

use ninelives_data::prelude::*;
use proptest::prelude::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const FULL_LEVEL: &str = r#"{
    "bounds": { "x": 0, "y": 0, "width": 40, "height": 20 },
    "cat": { "x": 2, "y": 1.5 },
    "exits": [{ "x": 38, "y": 2, "width": 1, "height": 2, "type": "goal" }],
    "walls": [{ "shape": [0, 0, 40, 0, 40, 1, 0, 1], "climbable": true }],
    "platforms": [{ "x": 10, "y": 4, "width": 3, "height": 0.5, "disp": [0, 4], "activator_id": "sw" }],
    "checkpoints": [{ "x": 20, "y": 2 }],
    "activators": [
        { "id": "sw", "type": "switch", "x": 5, "y": 1.1 },
        { "id": "tb", "type": "timed", "x": 7, "y": 1.1, "duration": 90 }
    ],
    "lasers": [{ "x": 12, "y": 1.25, "rotation": 0, "activator_id": "tb", "active": true }],
    "spikes": [{ "x": 15, "y": 1.25, "rotation": 0 }],
    "flamethrowers": [{ "x": 17, "y": 1.25, "rotation": 90 }],
    "doors": [{ "x": 25, "y": 3, "width": 1, "height": 4, "total_ticks": 30, "activator_id": "sw" }],
    "spirit_regions": [{ "x": 8, "y": 4, "width": 6, "height": 6, "color": "blue" }],
    "mobs": [{ "x": 30, "y": 1.5, "aggressive": true }],
    "boxes": [{ "x": 3, "y": 1.5 }],
    "mirrors": [{ "x": 12, "y": 10, "rotation": 180 }],
    "camera_tiles": [{ "x": 30, "y": 10, "width": 10, "height": 10, "zoom": 1.5 }]
}"#;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn full_level_parses_every_category() {
    let level = LevelData::from_json_str(FULL_LEVEL).unwrap();
    assert_eq!(level.object_count(), 15);
    assert_eq!(level.activators[1].duration, Some(90));
    assert_eq!(level.doors[0].total_ticks, Some(30));
    assert!(level.lasers[0].link.active);
    assert_eq!(level.platforms[0].disp, [0.0, 4.0]);
    assert_eq!(level.exits[0].kind, "goal");
    assert!(level.mobs[0].facing_right);
    assert_eq!(level.walls[0].points().unwrap().len(), 4);
}

#[test]
fn level_roundtrips_through_json() {
    let level = LevelData::from_json_str(FULL_LEVEL).unwrap();
    let text = serde_json::to_string(&level).unwrap();
    let again = LevelData::from_json_str(&text).unwrap();
    assert_eq!(level, again);
}

#[test]
fn directions_from_authored_rotations() {
    let level = LevelData::from_json_str(FULL_LEVEL).unwrap();
    assert_eq!(Direction::from_angle(level.mirrors[0].rotation).unwrap(), Direction::Down);
    assert_eq!(
        Direction::from_angle(level.flamethrowers[0].rotation).unwrap(),
        Direction::Left
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn only_quarter_turns_map_to_directions(angle in -1440i32..1440) {
        let result = Direction::from_angle(angle);
        prop_assert_eq!(result.is_ok(), angle.rem_euclid(90) == 0);
        if let Ok(dir) = result {
            prop_assert_eq!(dir.angle_degrees(), angle.rem_euclid(360));
        }
    }
}
