//! # World Configuration
//!
//! Construction parameters of a [`World`](crate::world::World): gravity,
//! sleeping, the broadphase and solver variants, quaternion normalization and
//! the fallback contact material.

use super::Config;
use crate::foundation::math::Vec3;
use crate::material::ContactParams;
use serde::{Deserialize, Serialize};

/// Coordinate axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Axis {
    /// X axis
    #[default]
    X,
    /// Y axis
    Y,
    /// Z axis
    Z,
}

impl Axis {
    /// Component index of the axis
    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    /// Axis for a component index, clamped to Z
    pub const fn from_index(index: usize) -> Self {
        match index {
            0 => Self::X,
            1 => Self::Y,
            _ => Self::Z,
        }
    }
}

/// Broadphase variant and its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BroadphaseConfig {
    /// All-pairs test
    Naive {
        /// Compare AABBs instead of bounding spheres
        use_bounding_boxes: bool,
    },
    /// Uniform grid over a fixed region
    Grid {
        /// Lower corner of the gridded region
        aabb_min: Vec3,
        /// Upper corner of the gridded region
        aabb_max: Vec3,
        /// Cells along X
        nx: usize,
        /// Cells along Y
        ny: usize,
        /// Cells along Z
        nz: usize,
    },
    /// Sweep and prune along one axis
    Sap {
        /// Sweep axis
        axis: Axis,
        /// Re-pick the axis of largest spread every step
        auto_detect_axis: bool,
    },
}

impl Default for BroadphaseConfig {
    fn default() -> Self {
        Self::Naive {
            use_bounding_boxes: false,
        }
    }
}

impl BroadphaseConfig {
    /// Default grid over `[-100, 100]^3` with 10 cells per axis
    pub fn grid() -> Self {
        Self::Grid {
            aabb_min: Vec3::repeat(-100.0),
            aabb_max: Vec3::repeat(100.0),
            nx: 10,
            ny: 10,
            nz: 10,
        }
    }

    /// Sweep and prune with automatic axis detection
    pub const fn sap() -> Self {
        Self::Sap {
            axis: Axis::X,
            auto_detect_axis: true,
        }
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<(), String> {
        if let Self::Grid {
            aabb_min,
            aabb_max,
            nx,
            ny,
            nz,
        } = self
        {
            if *nx == 0 || *ny == 0 || *nz == 0 {
                return Err(format!("Grid broadphase needs at least one cell per axis, got {nx}x{ny}x{nz}"));
            }
            if (0..3).any(|i| aabb_max[i].partial_cmp(&aabb_min[i]) != Some(std::cmp::Ordering::Greater)) {
                return Err("Grid broadphase bounds must have positive extent on every axis".to_string());
            }
        }
        Ok(())
    }
}

/// Solver variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SolverKind {
    /// One projected Gauss-Seidel pass over every equation
    #[default]
    GaussSeidel,
    /// Gauss-Seidel per connected island
    Split,
}

/// Iterative solver parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Solver variant
    pub kind: SolverKind,
    /// Maximum Gauss-Seidel iterations per solve
    pub iterations: usize,
    /// Early-exit threshold on the summed multiplier change
    pub tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            kind: SolverKind::GaussSeidel,
            iterations: 10,
            tolerance: 1e-7,
        }
    }
}

/// How friction rows bound themselves during a solve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FrictionCoupling {
    /// Re-bound each iteration by `mu` times the solved normal impulse of the same contact
    #[default]
    NormalImpulse,
    /// Keep the bound estimated from gravity and reduced mass at creation time
    GravityEstimate,
}

/// Configuration of a simulation world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Gravitational acceleration applied to dynamic bodies
    pub gravity: Vec3,
    /// Let bodies fall asleep
    pub allow_sleep: bool,
    /// Broadphase variant
    pub broadphase: BroadphaseConfig,
    /// Solver parameters
    pub solver: SolverConfig,
    /// Use the approximate quaternion normalization
    pub quat_normalize_fast: bool,
    /// Number of steps between quaternion normalizations
    pub quat_normalize_skip: u32,
    /// Contact parameters used when no material pair matches
    pub default_contact_material: ContactParams,
    /// Friction bound policy
    pub friction_coupling: FrictionCoupling,
    /// Build one averaged friction pair per manifold instead of one per contact
    pub enable_friction_reduction: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::zeros(),
            allow_sleep: false,
            broadphase: BroadphaseConfig::default(),
            solver: SolverConfig::default(),
            quat_normalize_fast: false,
            quat_normalize_skip: 0,
            default_contact_material: ContactParams::world_default(),
            friction_coupling: FrictionCoupling::default(),
            enable_friction_reduction: false,
        }
    }
}

impl Config for WorldConfig {}

impl WorldConfig {
    /// Create a default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Earth gravity along -Z
    #[must_use]
    pub fn with_earth_gravity(self) -> Self {
        self.with_gravity(Vec3::new(0.0, 0.0, -9.82))
    }

    /// Set gravity
    #[must_use]
    pub const fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Enable or disable sleeping
    #[must_use]
    pub const fn with_sleep(mut self, allow_sleep: bool) -> Self {
        self.allow_sleep = allow_sleep;
        self
    }

    /// Set the broadphase variant
    #[must_use]
    pub fn with_broadphase(mut self, broadphase: BroadphaseConfig) -> Self {
        self.broadphase = broadphase;
        self
    }

    /// Set the solver variant
    #[must_use]
    pub const fn with_solver_kind(mut self, kind: SolverKind) -> Self {
        self.solver.kind = kind;
        self
    }

    /// Set the solver iteration count
    #[must_use]
    pub const fn with_iterations(mut self, iterations: usize) -> Self {
        self.solver.iterations = iterations;
        self
    }

    /// Set the solver tolerance
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.solver.tolerance = tolerance;
        self
    }

    /// Configure quaternion normalization
    #[must_use]
    pub const fn with_quat_normalization(mut self, fast: bool, skip: u32) -> Self {
        self.quat_normalize_fast = fast;
        self.quat_normalize_skip = skip;
        self
    }

    /// Set the fallback contact material
    #[must_use]
    pub const fn with_default_contact_material(mut self, params: ContactParams) -> Self {
        self.default_contact_material = params;
        self
    }

    /// Set the friction bound policy
    #[must_use]
    pub const fn with_friction_coupling(mut self, coupling: FrictionCoupling) -> Self {
        self.friction_coupling = coupling;
        self
    }

    /// Enable or disable friction reduction
    #[must_use]
    pub const fn with_friction_reduction(mut self, enabled: bool) -> Self {
        self.enable_friction_reduction = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err("Gravity must be finite".to_string());
        }

        if self.solver.iterations == 0 {
            return Err("Solver needs at least one iteration".to_string());
        }

        if !(self.solver.tolerance.is_finite() && self.solver.tolerance >= 0.0) {
            return Err(format!("Solver tolerance must be a non-negative number, got {}", self.solver.tolerance));
        }

        self.broadphase.validate()?;
        self.default_contact_material.validate()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rust_physics_{}_{name}", std::process::id()))
    }

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
        assert_eq!(WorldConfig::default().solver.iterations, 10);
    }

    #[test]
    fn test_rejects_zero_iterations() {
        assert!(WorldConfig::new().with_iterations(0).validate().is_err());
    }

    #[test]
    fn test_rejects_empty_grid() {
        let config = WorldConfig::new().with_broadphase(BroadphaseConfig::Grid {
            aabb_min: Vec3::repeat(-1.0),
            aabb_max: Vec3::repeat(1.0),
            nx: 0,
            ny: 4,
            nz: 4,
        });
        assert!(config.validate().is_err());

        let inverted = WorldConfig::new().with_broadphase(BroadphaseConfig::Grid {
            aabb_min: Vec3::repeat(1.0),
            aabb_max: Vec3::repeat(-1.0),
            nx: 2,
            ny: 2,
            nz: 2,
        });
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = WorldConfig::new()
            .with_earth_gravity()
            .with_sleep(true)
            .with_broadphase(BroadphaseConfig::sap())
            .with_solver_kind(SolverKind::Split);
        let path = temp_path("world.toml");
        config.save_to_file(&path).unwrap();
        let loaded = WorldConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_ron_round_trip() {
        let config = WorldConfig::new()
            .with_broadphase(BroadphaseConfig::grid())
            .with_quat_normalization(true, 2);
        let path = temp_path("world.ron");
        config.save_to_file(&path).unwrap();
        let loaded = WorldConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = WorldConfig::new().save_to_file(temp_path("world.json")).unwrap_err();
        assert!(matches!(err, super::super::ConfigError::UnsupportedFormat(_)));
    }
}
