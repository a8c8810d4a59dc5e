//! Collision primitives shared by the broadphase, narrowphase and world
//!
//! Based on Game Engine Architecture 3rd Edition, Chapter 13:
//! "The collision detection system is typically split into two phases:
//! broad-phase and narrow-phase."

pub mod aabb;
pub mod filter;
pub mod tracking;

pub use aabb::Aabb;
pub use filter::{CollisionFilter, CollisionGroups};
pub use tracking::{CollisionMatrix, OverlapKeeper};
