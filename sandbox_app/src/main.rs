//! Physics sandbox
//!
//! Builds a small scene (a box tower, a pile of random balls on rolling
//! terrain and a motorized wheel), runs it headless for a few seconds and logs
//! what happens. An optional first argument names a `.toml` or `.ron`
//! world config to use instead of the built-in one.

use rand::{Rng, SeedableRng};
use rust_physics::prelude::*;
use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

const TIME_STEP: f64 = 1.0 / 60.0;
const MAX_SUB_STEPS: usize = 5;
const SIMULATED_SECONDS: usize = 8;
const BALL_COUNT: usize = 40;

struct Scene {
    world: World,
    tower: Vec<BodyHandle>,
    balls: Vec<BodyHandle>,
    wheel: BodyHandle,
}

fn load_config() -> Result<WorldConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading world config from {path}");
            Ok(WorldConfig::load_from_file(&path)?)
        }
        None => Ok(WorldConfig::new()
            .with_earth_gravity()
            .with_sleep(true)
            .with_broadphase(BroadphaseConfig::Sap {
                axis: rust_physics::config::Axis::X,
                auto_detect_axis: true,
            })),
    }
}

/// Gentle sine hills, 16 x 16 cells of 1 m
fn terrain() -> Result<Shape, Box<dyn std::error::Error>> {
    let size = 17;
    let data = (0..size)
        .map(|x| {
            (0..size)
                .map(|y| {
                    let (x, y) = (f64::from(x), f64::from(y));
                    0.3 * (x * 0.5).sin() * (y * 0.5).cos()
                })
                .collect()
        })
        .collect();
    Ok(Shape::heightfield(data, 1.0)?)
}

fn build_scene(config: WorldConfig) -> Result<Scene, Box<dyn std::error::Error>> {
    let mut world = World::new(config)?;

    let ice = world.add_material(Material::new("ice"));
    let rubber = world.add_material(Material::new("rubber"));
    world.add_contact_material(ice, rubber, ContactParams::default().with_friction(0.02))?;
    world.add_contact_material(rubber, rubber, ContactParams::default().with_restitution(0.6))?;

    world.add_body(Body::fixed().with_shape(Shape::Plane).with_material(ice));
    world.add_body(
        Body::fixed()
            .with_shape(terrain()?)
            .with_position(Vec3::new(-20.0, -8.0, 0.0))
            .with_material(rubber),
    );

    let crate_shape = Arc::new(Shape::cuboid(Vec3::repeat(0.5))?);
    let tower = (0..5)
        .map(|level| {
            world.add_body(
                Body::new(2.0)
                    .with_shape(Arc::clone(&crate_shape))
                    .with_position(Vec3::new(0.0, 0.0, 0.5 + f64::from(level))),
            )
        })
        .collect();

    let mut rng = rand::rngs::StdRng::seed_from_u64(42);
    let balls = (0..BALL_COUNT)
        .map(|_| -> Result<BodyHandle, ShapeError> {
            let radius = rng.gen_range(0.2..0.5);
            let position = Vec3::new(rng.gen_range(-18.0..-6.0), rng.gen_range(-6.0..6.0), rng.gen_range(2.0..8.0));
            Ok(world.add_body(
                Body::new(radius * 4.0)
                    .with_shape(Shape::sphere(radius)?)
                    .with_position(position)
                    .with_material(rubber),
            ))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let axle = world.add_body(Body::fixed().with_position(Vec3::new(6.0, 0.0, 1.5)));
    let wheel = world.add_body(
        Body::new(5.0)
            .with_shape(Shape::cylinder(1.0, 1.0, 0.4, 16)?)
            .with_position(Vec3::new(6.0, 0.0, 1.5))
            .with_orientation(Quat::from_axis_angle(&Vec3::x_axis(), PI / 2.0)),
    );
    let mut hinge = Constraint::hinge(axle, Vec3::zeros(), Vec3::y(), wheel, Vec3::zeros(), -Vec3::z(), 1e6)?;
    hinge.collide_connected = false;
    hinge.enable_motor();
    hinge.set_motor_speed(2.0);
    world.add_constraint(hinge)?;

    log::info!(
        "Scene built: {} bodies, {} constraints",
        world.bodies().len(),
        world.constraints().len()
    );
    Ok(Scene { world, tower, balls, wheel })
}

fn run(scene: &mut Scene) -> Result<(), Box<dyn std::error::Error>> {
    let mut tally: HashMap<EventType, usize> = HashMap::new();
    let frames = SIMULATED_SECONDS * 60;

    for frame in 1..=frames {
        let outcome = scene.world.step(TIME_STEP, TIME_STEP, MAX_SUB_STEPS)?;
        for event in &outcome.events {
            *tally.entry(event.event_type()).or_default() += 1;
        }

        if frame % 60 == 0 {
            let profile = scene.world.profile();
            let awake = scene
                .balls
                .iter()
                .filter_map(|&handle| scene.world.body(handle))
                .filter(|body| body.is_awake())
                .count();
            let wheel_spin = scene.world.body(scene.wheel).map_or(0.0, |b| b.angular_velocity.norm());
            log::info!(
                "t = {:.1}s: {} contacts, {}/{} balls awake, wheel spin {:.2} rad/s, step {:.3} ms",
                scene.world.time(),
                scene.world.contacts().len(),
                awake,
                scene.balls.len(),
                wheel_spin,
                profile.total
            );
        }
    }

    for (level, &handle) in scene.tower.iter().enumerate() {
        if let Some(body) = scene.world.body(handle) {
            log::info!("Tower crate {level} rests at {:.3?}", body.position);
        }
    }
    let mut counts: Vec<_> = tally.into_iter().collect();
    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    for (event_type, count) in counts {
        log::info!("{event_type:?}: {count}");
    }
    if !scene.world.has_active_bodies() {
        log::info!("Everything fell asleep after {} steps", scene.world.step_number());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting physics sandbox");
    let config = load_config()?;
    let mut scene = build_scene(config)?;

    match run(&mut scene) {
        Ok(()) => {
            log::info!("Sandbox finished at t = {:.2}s", scene.world.time());
            Ok(())
        }
        Err(e) => {
            log::error!("Sandbox failed: {e}");
            Err(e)
        }
    }
}
