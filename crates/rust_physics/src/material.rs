//! Surface materials and contact material pairs
//!
//! A [`Material`] tags a body or a single shape. The parameters that reach the
//! equations come from the [`ContactParams`] registered for the material pair,
//! or the library default when the pair is unknown.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a material inside a [`MaterialLibrary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub usize);

/// Named surface material
///
/// Friction and restitution are optional; when both materials of a contact set
/// a value, their product overrides the contact material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Material {
    /// Display name
    pub name: String,
    /// Friction coefficient
    pub friction: Option<f64>,
    /// Restitution coefficient
    pub restitution: Option<f64>,
}

impl Material {
    /// Create a material with no friction or restitution override
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the friction coefficient
    #[must_use]
    pub const fn with_friction(mut self, friction: f64) -> Self {
        self.friction = Some(friction);
        self
    }

    /// Set the restitution coefficient
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = Some(restitution);
        self
    }
}

/// Parameters used to build contact and friction equations
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactParams {
    /// Friction coefficient
    pub friction: f64,
    /// Restitution coefficient
    pub restitution: f64,
    /// SPOOK stiffness of contact rows
    pub contact_equation_stiffness: f64,
    /// SPOOK relaxation of contact rows
    pub contact_equation_relaxation: f64,
    /// SPOOK stiffness of friction rows
    pub friction_equation_stiffness: f64,
    /// SPOOK relaxation of friction rows
    pub friction_equation_relaxation: f64,
}

impl Default for ContactParams {
    fn default() -> Self {
        Self {
            friction: 0.3,
            restitution: 0.3,
            contact_equation_stiffness: 1e7,
            contact_equation_relaxation: 3.0,
            friction_equation_stiffness: 1e7,
            friction_equation_relaxation: 3.0,
        }
    }
}

impl ContactParams {
    /// The parameters a world uses when no pair is registered
    pub fn world_default() -> Self {
        Self {
            restitution: 0.0,
            ..Self::default()
        }
    }

    /// Set the friction coefficient
    #[must_use]
    pub const fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution coefficient
    #[must_use]
    pub const fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<(), String> {
        if !is_non_negative(self.friction) {
            return Err(format!("Friction must be non-negative, got {}", self.friction));
        }
        if !is_non_negative(self.restitution) {
            return Err(format!("Restitution must be non-negative, got {}", self.restitution));
        }
        if self.contact_equation_stiffness.is_nan()
            || self.friction_equation_stiffness.is_nan()
            || self.contact_equation_stiffness <= 0.0
            || self.friction_equation_stiffness <= 0.0
        {
            return Err("Equation stiffness must be positive".to_string());
        }
        if !is_non_negative(self.contact_equation_relaxation)
            || !is_non_negative(self.friction_equation_relaxation)
        {
            return Err("Equation relaxation must be non-negative".to_string());
        }
        Ok(())
    }
}

fn is_non_negative(value: f64) -> bool {
    value >= 0.0
}

/// Friction and restitution resolved for one shape pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedContact {
    /// Effective friction coefficient
    pub friction: f64,
    /// Effective restitution coefficient
    pub restitution: f64,
    /// Equation parameters of the contact material
    pub params: ContactParams,
}

/// Registry of materials and their pairwise contact parameters
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    materials: Vec<Material>,
    contact_materials: HashMap<(MaterialId, MaterialId), ContactParams>,
    default_params: ContactParams,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self::new(ContactParams::world_default())
    }
}

impl MaterialLibrary {
    /// Create an empty library with the given fallback parameters
    pub fn new(default_params: ContactParams) -> Self {
        Self {
            materials: Vec::new(),
            contact_materials: HashMap::new(),
            default_params,
        }
    }

    /// Register a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.push(material);
        MaterialId(self.materials.len() - 1)
    }

    /// Look up a material
    pub fn material(&self, id: MaterialId) -> Option<&Material> {
        self.materials.get(id.0)
    }

    /// Register (or replace) the parameters for a material pair
    pub fn add_contact_material(&mut self, a: MaterialId, b: MaterialId, params: ContactParams) {
        self.contact_materials.insert(Self::key(a, b), params);
    }

    /// Registered parameters for a pair
    pub fn find_contact_params(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> Option<&ContactParams> {
        self.contact_materials.get(&Self::key(a?, b?))
    }

    /// Parameters for a pair, or the default when the pair is unknown
    pub fn contact_params(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> &ContactParams {
        self.find_contact_params(a, b).unwrap_or(&self.default_params)
    }

    /// Fallback parameters
    pub const fn default_params(&self) -> &ContactParams {
        &self.default_params
    }

    /// Replace the fallback parameters
    pub fn set_default_params(&mut self, params: ContactParams) {
        self.default_params = params;
    }

    /// Resolve the effective friction and restitution for a material pair
    pub fn resolve(&self, a: Option<MaterialId>, b: Option<MaterialId>) -> ResolvedContact {
        self.apply_overrides(*self.contact_params(a, b), a, b)
    }

    /// Resolve a shape pair on two bodies.
    ///
    /// The pair parameters come from the shape materials, then the body
    /// materials, then the default. Each side's effective material is its
    /// shape material, else its body material; their products override
    /// friction and restitution.
    pub fn resolve_layered(
        &self,
        shapes: (Option<MaterialId>, Option<MaterialId>),
        bodies: (Option<MaterialId>, Option<MaterialId>),
    ) -> ResolvedContact {
        let params = self
            .find_contact_params(shapes.0, shapes.1)
            .or_else(|| self.find_contact_params(bodies.0, bodies.1))
            .copied()
            .unwrap_or(self.default_params);
        self.apply_overrides(params, shapes.0.or(bodies.0), shapes.1.or(bodies.1))
    }

    fn apply_overrides(&self, params: ContactParams, a: Option<MaterialId>, b: Option<MaterialId>) -> ResolvedContact {
        let mat_a = a.and_then(|id| self.material(id));
        let mat_b = b.and_then(|id| self.material(id));

        let mut friction = params.friction;
        let mut restitution = params.restitution;
        if let (Some(ma), Some(mb)) = (mat_a, mat_b) {
            if let (Some(fa), Some(fb)) = (ma.friction, mb.friction) {
                if fa >= 0.0 && fb >= 0.0 {
                    friction = fa * fb;
                }
            }
            if let (Some(ra), Some(rb)) = (ma.restitution, mb.restitution) {
                if ra >= 0.0 && rb >= 0.0 {
                    restitution = ra * rb;
                }
            }
        }

        ResolvedContact {
            friction,
            restitution,
            params,
        }
    }

    fn key(a: MaterialId, b: MaterialId) -> (MaterialId, MaterialId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}
