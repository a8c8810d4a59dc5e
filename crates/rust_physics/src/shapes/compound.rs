//! Compound shapes
//!
//! A fixed set of child shapes, each placed by a local transform. The
//! narrowphase recurses into the children.

use super::Shape;
use crate::collision::Aabb;
use crate::error::ShapeError;
use crate::foundation::math::Transform;
use std::sync::Arc;

/// Child of a compound
#[derive(Debug, Clone, PartialEq)]
pub struct CompoundChild {
    /// Child geometry
    pub shape: Arc<Shape>,
    /// Placement relative to the compound origin
    pub transform: Transform,
}

/// Rigid assembly of child shapes
#[derive(Debug, Clone, PartialEq)]
pub struct Compound {
    children: Vec<CompoundChild>,
    bounding_radius: f64,
}

impl Compound {
    /// Create a compound; at least one child is required
    pub fn new(children: Vec<CompoundChild>) -> Result<Self, ShapeError> {
        if children.is_empty() {
            return Err(ShapeError::EmptyCompound);
        }
        let bounding_radius = children
            .iter()
            .map(|c| c.transform.position.norm() + c.shape.bounding_radius())
            .fold(0.0, f64::max);
        Ok(Self {
            children,
            bounding_radius,
        })
    }

    /// Children in insertion order
    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }

    /// Radius enclosing every child
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// World box enclosing every child
    pub fn world_aabb(&self, transform: &Transform) -> Aabb {
        let mut boxes = self
            .children
            .iter()
            .map(|child| child.shape.world_aabb(&transform.combine(&child.transform)));
        let mut aabb = boxes.next().unwrap_or_default();
        for b in boxes {
            aabb.extend(&b);
        }
        aabb
    }

    /// Sum of child volumes
    pub fn volume(&self) -> f64 {
        self.children.iter().map(|c| c.shape.volume()).sum()
    }
}
