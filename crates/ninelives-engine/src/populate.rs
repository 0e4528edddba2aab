//! Level population: authoring data to a live [`Level`].
//!
//! Activators are created first so that every activatable can be linked to
//! its activator as soon as it exists. After all objects are in place each
//! activatable is brought in line with its authored activation, the initial
//! snapshot is saved to the history and to life slot 0.

use glam::Vec2;
use ninelives_data::level::ActivationLink;
use ninelives_data::{Direction, GameConstants, LevelData};
use tracing::info;

use crate::activation::ActivationGraph;
use crate::ai::MobAi;
use crate::command::CommandQueue;
use crate::contact::ContactController;
use crate::level::Level;
use crate::obstacle::{
    activator, cat, door, hazard, laser, mob, platform, region, Activator, ActivatorKind, CameraTile, Cat,
    Checkpoint, Door, Exit, ExitKind, Flamethrower, Laser, Mirror, Mob, Obstacle, ObstacleArena, ObstacleId,
    ObstacleKind, Platform, PushableBox, SpiritRegion, Spikes, Wall,
};
use crate::physics::{BodyContext, BodySpec, ColliderSpec, PhysicsWorld};
use crate::LevelError;

type BodyParts = (BodySpec, Vec<ColliderSpec>);

/// Arena and physics world under construction.
struct Builder {
    arena: ObstacleArena,
    physics: PhysicsWorld,
    graph: ActivationGraph,
}

impl Builder {
    fn insert(&mut self, name: String, (spec, colliders): BodyParts, kind: ObstacleKind) -> Result<ObstacleId, LevelError> {
        let physics = &mut self.physics;
        self.arena.try_insert_with(|id| match physics.create_body(id, &spec, &colliders) {
            Some(body) => Ok(Obstacle::new(name, body, kind)),
            None => Err(LevelError::InvalidShape { object: name.clone() }),
        })
    }

    fn link(&mut self, link: Option<&str>, target: ObstacleId, name: &str) -> Result<(), LevelError> {
        match link {
            Some(activator_id) => self.graph.link(activator_id, target, name),
            None => Ok(()),
        }
    }

    fn link_wired(&mut self, link: &ActivationLink, target: ObstacleId, name: &str) -> Result<(), LevelError> {
        self.link(link.activator_id.as_deref(), target, name)
    }
}

/// Build a level from `data`.
///
/// # Errors
///
/// Any [`LevelError`]: unknown activator or exit types, duplicate or unknown
/// activator ids, rotations that do not map to a direction, and shapes the
/// physics engine rejects.
pub(crate) fn populate(data: &LevelData, constants: &GameConstants) -> Result<Level, LevelError> {
    let mut constants = constants.clone();
    constants.max_lives = constants.max_lives.max(1);
    let mut b = Builder {
        arena: ObstacleArena::new(),
        physics: PhysicsWorld::from_config(&constants.world),
        graph: ActivationGraph::new(),
    };

    for (i, a) in data.activators.iter().enumerate() {
        let kind = ActivatorKind::parse(&a.kind).ok_or_else(|| LevelError::UnknownActivatorType {
            id: a.id.clone(),
            kind: a.kind.clone(),
        })?;
        let direction = Direction::from_angle(a.rotation)?;
        let duration = a.duration.unwrap_or(constants.activator.default_duration);
        let id = b.insert(
            format!("activator{i}"),
            activator::body(Vec2::new(a.x, a.y), direction, &constants.activator),
            ObstacleKind::Activator(Activator::new(a.id.clone(), kind, duration)),
        )?;
        b.graph.register_activator(&a.id, id)?;
    }

    for (i, w) in data.walls.iter().enumerate() {
        let name = w.name.clone().unwrap_or_else(|| format!("wall{i}"));
        let points = w.points()?;
        b.insert(name, region::wall_body(points), ObstacleKind::Wall(Wall::new(w.climbable)))?;
    }

    for (i, p) in data.platforms.iter().enumerate() {
        let name = format!("platform{i}");
        let start = Vec2::new(p.x, p.y);
        let speed = p.speed.unwrap_or(constants.platform.speed);
        let kind = Platform::new(start, Vec2::from(p.disp), speed, &constants.platform, p.link.active);
        let id = b.insert(
            name.clone(),
            platform::platform_body(start, Vec2::new(p.width, p.height)),
            ObstacleKind::Platform(kind),
        )?;
        b.link_wired(&p.link, id, &name)?;
    }

    for (i, c) in data.checkpoints.iter().enumerate() {
        let direction = Direction::from_angle(c.rotation)?;
        let position = Vec2::new(c.x, c.y);
        let respawn = position + direction.rotate(constants.checkpoint.respawn_offset);
        b.insert(
            format!("checkpoint{i}"),
            region::checkpoint_body(position, direction.angle_radians(), &constants.checkpoint),
            ObstacleKind::Checkpoint(Checkpoint::new(respawn)),
        )?;
    }

    for (i, l) in data.lasers.iter().enumerate() {
        let name = format!("laser{i}");
        let direction = Direction::from_angle(l.rotation)?;
        let id = b.insert(
            name.clone(),
            laser::laser_body(Vec2::new(l.x, l.y), direction, &constants.laser),
            ObstacleKind::Laser(Laser::new(direction, constants.laser.beam_offset, l.link.active)),
        )?;
        b.link_wired(&l.link, id, &name)?;
    }

    for (i, s) in data.spikes.iter().enumerate() {
        let name = format!("spikes{i}");
        let direction = Direction::from_angle(s.rotation)?;
        let id = b.insert(
            name.clone(),
            hazard::spikes_body(Vec2::new(s.x, s.y), direction, &constants.spikes),
            ObstacleKind::Spikes(Spikes::new(direction, s.link.active)),
        )?;
        b.link_wired(&s.link, id, &name)?;
    }

    for (i, f) in data.flamethrowers.iter().enumerate() {
        let name = format!("flamethrower{i}");
        let direction = Direction::from_angle(f.rotation)?;
        let position = Vec2::new(f.x, f.y);
        let config = &constants.flamethrower;
        let offset = hazard::flame_offset(config);
        let (base_spec, base_colliders) = hazard::flamethrower_base(position, direction, config);
        let (flame_spec, flame_colliders) = hazard::flame(position + direction.rotate(offset), direction, config);
        let physics = &mut b.physics;
        let id = b.arena.try_insert_with(|id| {
            let shape_error = || LevelError::InvalidShape { object: name.clone() };
            let base = physics.create_body(id, &base_spec, &base_colliders).ok_or_else(shape_error)?;
            let Some(flame) = physics.create_body(id, &flame_spec, &flame_colliders) else {
                physics.remove_body(base);
                return Err(shape_error());
            };
            let kind = Flamethrower::new(direction, flame, offset, f.link.active);
            Ok(Obstacle::new(name.clone(), base, ObstacleKind::Flamethrower(kind)))
        })?;
        b.link_wired(&f.link, id, &name)?;
    }

    for (i, d) in data.doors.iter().enumerate() {
        let name = format!("door{i}");
        let direction = Direction::from_angle(d.rotation)?;
        let size = Vec2::new(d.width, d.height);
        let total_ticks = d.total_ticks.unwrap_or(constants.door.total_ticks);
        let id = b.insert(
            name.clone(),
            door::body(Vec2::new(d.x, d.y), direction, size),
            ObstacleKind::Door(Door::new(direction, size, total_ticks, d.link.active)),
        )?;
        b.link_wired(&d.link, id, &name)?;
    }

    for (i, r) in data.spirit_regions.iter().enumerate() {
        b.insert(
            format!("spirit_region{i}"),
            region::area_body(Vec2::new(r.x, r.y), Vec2::new(r.width, r.height)),
            ObstacleKind::SpiritRegion(SpiritRegion::new(r.color.clone())),
        )?;
    }

    let mut mobs = Vec::with_capacity(data.mobs.len());
    for (i, m) in data.mobs.iter().enumerate() {
        let id = b.insert(
            format!("mob{i}"),
            mob::body(Vec2::new(m.x, m.y), &constants.mob),
            ObstacleKind::Mob(Mob::new(m.aggressive, m.facing_right)),
        )?;
        mobs.push(MobAi::new(id));
    }

    for (i, x) in data.boxes.iter().enumerate() {
        let name = format!("box{i}");
        let id = b.insert(
            name.clone(),
            platform::box_body(Vec2::new(x.x, x.y), &constants.pushable_box),
            ObstacleKind::PushableBox(PushableBox::new(x.active)),
        )?;
        b.link(x.activator_id.as_deref(), id, &name)?;
    }

    for (i, m) in data.mirrors.iter().enumerate() {
        let direction = Direction::from_angle(m.rotation)?;
        b.insert(
            format!("mirror{i}"),
            laser::mirror_body(Vec2::new(m.x, m.y), direction, &constants.mirror),
            ObstacleKind::Mirror(Mirror::new(direction)),
        )?;
    }

    for (i, t) in data.camera_tiles.iter().enumerate() {
        b.insert(
            format!("camera_tile{i}"),
            region::area_body(Vec2::new(t.x, t.y), Vec2::new(t.width, t.height)),
            ObstacleKind::CameraTile(CameraTile::new(t.zoom)),
        )?;
    }

    for (i, e) in data.exits.iter().enumerate() {
        let kind = ExitKind::parse(&e.kind).ok_or_else(|| LevelError::UnknownExitType { kind: e.kind.clone() })?;
        b.insert(
            format!("exit{i}"),
            region::area_body(Vec2::new(e.x, e.y), Vec2::new(e.width, e.height)),
            ObstacleKind::Exit(Exit::new(kind)),
        )?;
    }

    let start = Vec2::new(data.cat.x, data.cat.y);
    let cat = b.insert(
        "cat".to_owned(),
        cat::body(start, &constants.cat),
        ObstacleKind::Cat(Cat::new(constants.cat.clone())),
    )?;

    let Builder {
        mut arena,
        mut physics,
        graph,
    } = b;
    for (_, obstacle) in arena.iter_mut() {
        let body = obstacle.body;
        if let Some(activatable) = obstacle.kind.as_activatable_mut() {
            activatable.apply_activation(&mut BodyContext::new(&mut physics, body));
        }
    }
    physics.refresh_queries();

    let max_lives = constants.max_lives;
    let objects = arena.len();
    let mut level = Level {
        arena,
        physics,
        graph,
        commands: CommandQueue::new(),
        contacts: ContactController::new(),
        bounds: data.bounds,
        constants,
        cat,
        start,
        respawn_position: start,
        checkpoint: None,
        lives: max_lives,
        history: Vec::new(),
        life_states: vec![None; max_lives as usize],
        mobs,
        died: false,
        pending_respawn: false,
        pending_life_save: false,
        complete: false,
        returning: false,
        failed: false,
        camera_zoom: None,
        spirit_mode: false,
        failed_switches: 0,
    };
    level.save_state();
    level.save_life_state();
    info!(objects, activators = level.graph.activator_count(), lives = max_lives, "level populated");
    Ok(level)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ninelives_data::level::{ActivatorData, BoxData, DirectedData, DoorData, ExitData, PlatformData, WallData};
    use ninelives_data::DataError;

    fn base() -> LevelData {
        LevelData {
            walls: vec![WallData {
                name: None,
                shape: vec![0.0, 0.0, 20.0, 0.0, 20.0, 1.0, 0.0, 1.0],
                climbable: false,
            }],
            ..Default::default()
        }
    }

    fn button(id: &str) -> ActivatorData {
        ActivatorData {
            id: id.into(),
            kind: "button".into(),
            x: 4.0,
            y: 1.5,
            ..Default::default()
        }
    }

    fn wired(activator: &str, active: bool) -> ActivationLink {
        ActivationLink {
            activator_id: Some(activator.into()),
            active,
        }
    }

    #[test]
    fn populates_every_category() {
        let mut data = base();
        data.activators.push(button("b"));
        data.doors.push(DoorData {
            x: 8.0,
            y: 3.0,
            width: 1.0,
            height: 4.0,
            link: wired("b", false),
            ..Default::default()
        });
        data.lasers.push(DirectedData {
            x: 12.0,
            y: 1.5,
            ..Default::default()
        });
        data.flamethrowers.push(DirectedData {
            x: 15.0,
            y: 1.5,
            ..Default::default()
        });
        data.boxes.push(BoxData {
            x: 6.0,
            y: 2.0,
            activator_id: Some("b".into()),
            active: true,
        });
        data.exits.push(ExitData {
            x: 18.0,
            y: 2.0,
            width: 1.0,
            height: 2.0,
            kind: "goal".into(),
        });

        let level = populate(&data, &GameConstants::default()).unwrap();
        // wall, activator, door, laser, flamethrower, box, exit, cat
        assert_eq!(level.arena().len(), 8);
        assert_eq!(level.graph().targets("b").len(), 2);
        assert!(level.cat().is_some());

        let flamethrower = level
            .arena()
            .iter()
            .find_map(|(_, o)| o.kind.as_flamethrower())
            .unwrap();
        assert!(flamethrower.is_welded(), "active flamethrowers start welded");
    }

    #[test]
    fn inactive_platform_starts_displaced() {
        let mut data = base();
        data.platforms.push(PlatformData {
            x: 5.0,
            y: 5.0,
            width: 3.0,
            height: 0.5,
            disp: [4.0, 0.0],
            speed: None,
            link: ActivationLink {
                activator_id: None,
                active: false,
            },
        });
        let level = populate(&data, &GameConstants::default()).unwrap();
        let platform = level.find("platform0").unwrap();
        let body = level.arena().get(platform).unwrap().body;
        assert_eq!(level.physics().position(body), Some(Vec2::new(9.0, 5.0)));
    }

    #[test]
    fn unknown_activator_type_is_fatal() {
        let mut data = base();
        data.activators.push(ActivatorData {
            kind: "lever".into(),
            ..button("x")
        });
        let err = populate(&data, &GameConstants::default()).unwrap_err();
        assert!(matches!(err, LevelError::UnknownActivatorType { kind, .. } if kind == "lever"));
    }

    #[test]
    fn unknown_exit_type_is_fatal() {
        let mut data = base();
        data.exits.push(ExitData {
            kind: "portal".into(),
            ..Default::default()
        });
        let err = populate(&data, &GameConstants::default()).unwrap_err();
        assert!(matches!(err, LevelError::UnknownExitType { .. }));
    }

    #[test]
    fn dangling_activator_reference_is_fatal() {
        let mut data = base();
        data.spikes.push(DirectedData {
            link: wired("ghost", true),
            ..Default::default()
        });
        let err = populate(&data, &GameConstants::default()).unwrap_err();
        assert!(matches!(err, LevelError::UnknownActivator { id, .. } if id == "ghost"));
    }

    #[test]
    fn odd_spikes_angle_is_fatal() {
        let mut data = base();
        data.spikes.push(DirectedData {
            rotation: 45,
            ..Default::default()
        });
        let err = populate(&data, &GameConstants::default()).unwrap_err();
        assert!(matches!(err, LevelError::Data(DataError::UnsupportedAngle { angle: 45 })));
    }

    #[test]
    fn duplicate_activator_is_fatal() {
        let mut data = base();
        data.activators.push(button("b"));
        data.activators.push(button("b"));
        let err = populate(&data, &GameConstants::default()).unwrap_err();
        assert!(matches!(err, LevelError::DuplicateActivator { .. }));
    }
}
