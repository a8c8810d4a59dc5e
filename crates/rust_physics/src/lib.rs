//! # Rust Physics
//!
//! A real-time 3D rigid-body physics engine.
//!
//! ## Features
//!
//! - **Broadphase**: Naive, uniform grid and sweep-and-prune pair finding
//! - **Narrowphase**: SAT with face clipping plus dedicated sphere, plane,
//!   particle, height field and triangle mesh routines
//! - **Solver**: SPOOK-stabilized projected Gauss-Seidel, optionally split
//!   into independent islands
//! - **Constraints**: Point-to-point, distance, hinge (with motor), lock and
//!   cone-twist joints
//! - **Sleeping**: Slow bodies fall asleep and wake on contact
//!
//! The world is Z-up; `WorldConfig::with_earth_gravity` pulls along -Z.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_physics::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut world = World::new(WorldConfig::new().with_earth_gravity())?;
//!     world.add_body(Body::fixed().with_shape(Shape::Plane));
//!     let ball = world.add_body(
//!         Body::new(1.0)
//!             .with_shape(Shape::sphere(0.5)?)
//!             .with_position(Vec3::new(0.0, 0.0, 2.0)),
//!     );
//!
//!     for _ in 0..120 {
//!         world.step(1.0 / 60.0, 0.0, 10)?;
//!     }
//!     assert!(world.body(ball).map_or(false, |b| b.position.z < 2.0));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Shared building blocks
pub mod error;
pub mod foundation;
pub mod config;
pub mod collision;

// Bodies and what they are made of
pub mod shapes;
pub mod material;
pub mod body;

// Collision pipeline
pub mod broadphase;
pub mod narrowphase;

// Constraint solving
pub mod equations;
pub mod constraints;
pub mod solver;

// Simulation
pub mod events;
pub mod world;

pub use error::{PhysicsError, PhysicsResult, ShapeError};
pub use world::{StepOutcome, World};

/// Common imports for physics users
pub mod prelude {
    pub use crate::{
        body::{Body, BodyShape, BodyType, SleepState},
        collision::{Aabb, CollisionFilter, CollisionGroups},
        config::{BroadphaseConfig, Config, FrictionCoupling, SolverKind, WorldConfig},
        constraints::Constraint,
        events::{EventHandler, EventType, WorldEvent},
        foundation::{
            collections::{BodyHandle, ConstraintHandle},
            math::{Quat, Transform, Vec3},
        },
        material::{ContactParams, Material, MaterialId},
        shapes::Shape,
        PhysicsError, PhysicsResult, ShapeError, StepOutcome, World,
    };
}
