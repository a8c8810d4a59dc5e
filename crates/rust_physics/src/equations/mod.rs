//! Constraint equations
//!
//! An [`Equation`] is one scalar velocity constraint between two bodies. Its
//! Jacobian is split into a spatial and a rotational part per body, and its
//! softness comes from SPOOK stabilization:
//!
//! ```text
//! a   = 4 / (h (1 + 4d))
//! b   = 4d / (1 + 4d)
//! eps = 4 / (h^2 k (1 + 4d))
//! ```
//!
//! with stiffness `k`, relaxation `d` and step `h`. The solver evaluates
//! `B = -g a - GW b - GiMf h` once per step and iterates on
//! `C = G M^-1 G^T + eps`.

use crate::body::Body;
use crate::foundation::collections::BodyHandle;
use crate::foundation::math::Vec3;

/// Default force bound of a bilateral row
pub const DEFAULT_MAX_FORCE: f64 = 1e6;

/// Default SPOOK stiffness
pub const DEFAULT_STIFFNESS: f64 = 1e7;

/// Default SPOOK relaxation
pub const DEFAULT_RELAXATION: f64 = 4.0;

/// Step size used for SPOOK parameters until the world sets its own
pub const DEFAULT_TIME_STEP: f64 = 1.0 / 60.0;

/// One body's half of a Jacobian row
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JacobianElement {
    /// Translational part
    pub spatial: Vec3,
    /// Rotational part
    pub rotational: Vec3,
}

impl JacobianElement {
    /// `spatial . linear + rotational . angular`
    pub fn multiply_vectors(&self, linear: &Vec3, angular: &Vec3) -> f64 {
        self.spatial.dot(linear) + self.rotational.dot(angular)
    }

    /// Dot product of two elements
    pub fn multiply_element(&self, other: &Self) -> f64 {
        self.spatial.dot(&other.spatial) + self.rotational.dot(&other.rotational)
    }
}

/// Non-penetration row along a contact normal
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactRow {
    /// Contact point relative to body i, world orientation
    pub ri: Vec3,
    /// Contact point relative to body j, world orientation
    pub rj: Vec3,
    /// Contact normal pointing out of body i
    pub ni: Vec3,
    /// Restitution coefficient
    pub restitution: f64,
}

/// Tangential friction row
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionRow {
    /// Contact point relative to body i
    pub ri: Vec3,
    /// Contact point relative to body j
    pub rj: Vec3,
    /// Tangent direction
    pub t: Vec3,
    /// Friction coefficient
    pub mu: f64,
    /// Id of the contact row whose impulse bounds this row
    pub contact_id: Option<u64>,
}

/// Keeps two body axes within an angle of each other
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationalRow {
    /// World axis of body i
    pub axis_a: Vec3,
    /// World axis of body j
    pub axis_b: Vec3,
    /// Target angle between the axes
    pub max_angle: f64,
}

/// Drives the relative angular velocity about an axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorRow {
    /// World axis of body i
    pub axis_a: Vec3,
    /// World axis of body j
    pub axis_b: Vec3,
    /// Target relative angular velocity
    pub target_velocity: f64,
}

/// Keeps body j's axis inside a cone around body i's axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConeRow {
    /// World axis of body i
    pub axis_a: Vec3,
    /// World axis of body j
    pub axis_b: Vec3,
    /// Cone half angle
    pub angle: f64,
}

/// Row type and its geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EquationKind {
    /// Contact normal row
    Contact(ContactRow),
    /// Friction tangent row
    Friction(FrictionRow),
    /// Axis alignment row
    Rotational(RotationalRow),
    /// Angular motor row
    RotationalMotor(MotorRow),
    /// Cone limit row
    Cone(ConeRow),
}

/// Scalar velocity constraint between two bodies
#[derive(Debug, Clone, PartialEq)]
pub struct Equation {
    /// Unique id within a world, assigned when the equation enters it
    pub id: u64,
    /// First body
    pub body_i: BodyHandle,
    /// Second body
    pub body_j: BodyHandle,
    /// Lower bound on the multiplier
    pub min_force: f64,
    /// Upper bound on the multiplier
    pub max_force: f64,
    /// SPOOK position gain
    pub a: f64,
    /// SPOOK velocity gain
    pub b: f64,
    /// SPOOK regularization
    pub eps: f64,
    /// Stiffness the SPOOK parameters were derived from
    pub stiffness: f64,
    /// Relaxation the SPOOK parameters were derived from
    pub relaxation: f64,
    /// Jacobian of body i
    pub jacobian_a: JacobianElement,
    /// Jacobian of body j
    pub jacobian_b: JacobianElement,
    /// Disabled equations are ignored by the solver
    pub enabled: bool,
    /// Solved multiplier divided by the step, i.e. the constraint force
    pub multiplier: f64,
    /// Row type
    pub kind: EquationKind,
}

impl Equation {
    /// Create a row with default SPOOK parameters
    pub fn new(body_i: BodyHandle, body_j: BodyHandle, min_force: f64, max_force: f64, kind: EquationKind) -> Self {
        let mut eq = Self {
            id: 0,
            body_i,
            body_j,
            min_force,
            max_force,
            a: 0.0,
            b: 0.0,
            eps: 0.0,
            stiffness: DEFAULT_STIFFNESS,
            relaxation: DEFAULT_RELAXATION,
            jacobian_a: JacobianElement::default(),
            jacobian_b: JacobianElement::default(),
            enabled: true,
            multiplier: 0.0,
            kind,
        };
        eq.set_spook_params(DEFAULT_STIFFNESS, DEFAULT_RELAXATION, DEFAULT_TIME_STEP);
        eq.update_jacobians();
        eq
    }

    /// Unilateral contact row, bounded to `[0, max_force]`
    pub fn contact(body_i: BodyHandle, body_j: BodyHandle, row: ContactRow, max_force: f64) -> Self {
        Self::new(body_i, body_j, 0.0, max_force, EquationKind::Contact(row))
    }

    /// Friction row bounded to `[-slip_force, slip_force]`
    pub fn friction(body_i: BodyHandle, body_j: BodyHandle, row: FrictionRow, slip_force: f64) -> Self {
        Self::new(body_i, body_j, -slip_force, slip_force, EquationKind::Friction(row))
    }

    /// Rotational row bounded symmetrically by `max_force`
    pub fn rotational(body_i: BodyHandle, body_j: BodyHandle, row: RotationalRow, max_force: f64) -> Self {
        Self::new(body_i, body_j, -max_force, max_force, EquationKind::Rotational(row))
    }

    /// Motor row bounded symmetrically by `max_force`
    pub fn motor(body_i: BodyHandle, body_j: BodyHandle, row: MotorRow, max_force: f64) -> Self {
        Self::new(body_i, body_j, -max_force, max_force, EquationKind::RotationalMotor(row))
    }

    /// Cone row bounded to `[-max_force, 0]`
    pub fn cone(body_i: BodyHandle, body_j: BodyHandle, row: ConeRow, max_force: f64) -> Self {
        Self::new(body_i, body_j, -max_force, 0.0, EquationKind::Cone(row))
    }

    /// Recompute `a`, `b` and `eps`
    pub fn set_spook_params(&mut self, stiffness: f64, relaxation: f64, time_step: f64) {
        let d = relaxation;
        let k = stiffness;
        let h = time_step;
        self.stiffness = stiffness;
        self.relaxation = relaxation;
        self.a = 4.0 / (h * (1.0 + 4.0 * d));
        self.b = (4.0 * d) / (1.0 + 4.0 * d);
        self.eps = 4.0 / (h * h * k * (1.0 + 4.0 * d));
    }

    /// Whether this is a contact row
    pub const fn is_contact(&self) -> bool {
        matches!(self.kind, EquationKind::Contact(_))
    }

    /// Whether this is a friction row
    pub const fn is_friction(&self) -> bool {
        matches!(self.kind, EquationKind::Friction(_))
    }

    /// Contact geometry, if this is a contact row
    pub const fn as_contact(&self) -> Option<&ContactRow> {
        match &self.kind {
            EquationKind::Contact(row) => Some(row),
            _ => None,
        }
    }

    /// Rebuild the Jacobian from the row geometry
    pub fn update_jacobians(&mut self) {
        let (ga, gb) = match &self.kind {
            EquationKind::Contact(row) => {
                let rixn = row.ri.cross(&row.ni);
                let rjxn = row.rj.cross(&row.ni);
                (
                    JacobianElement { spatial: -row.ni, rotational: -rixn },
                    JacobianElement { spatial: row.ni, rotational: rjxn },
                )
            }
            EquationKind::Friction(row) => {
                let rixt = row.ri.cross(&row.t);
                let rjxt = row.rj.cross(&row.t);
                (
                    JacobianElement { spatial: -row.t, rotational: -rixt },
                    JacobianElement { spatial: row.t, rotational: rjxt },
                )
            }
            EquationKind::Rotational(row) => (
                JacobianElement { spatial: Vec3::zeros(), rotational: row.axis_b.cross(&row.axis_a) },
                JacobianElement { spatial: Vec3::zeros(), rotational: row.axis_a.cross(&row.axis_b) },
            ),
            EquationKind::RotationalMotor(row) => (
                JacobianElement { spatial: Vec3::zeros(), rotational: row.axis_a },
                JacobianElement { spatial: Vec3::zeros(), rotational: -row.axis_b },
            ),
            EquationKind::Cone(row) => (
                JacobianElement { spatial: Vec3::zeros(), rotational: row.axis_b.cross(&row.axis_a) },
                JacobianElement { spatial: Vec3::zeros(), rotational: row.axis_a.cross(&row.axis_b) },
            ),
        };
        self.jacobian_a = ga;
        self.jacobian_b = gb;
    }

    /// Constraint violation along the row
    fn position_error(&self, bi: &Body, bj: &Body) -> f64 {
        match &self.kind {
            EquationKind::Contact(row) => row.ni.dot(&(bj.position + row.rj - bi.position - row.ri)),
            EquationKind::Rotational(row) => row.max_angle.cos() - row.axis_a.dot(&row.axis_b),
            EquationKind::Cone(row) => row.angle.cos() - row.axis_a.dot(&row.axis_b),
            EquationKind::Friction(_) | EquationKind::RotationalMotor(_) => 0.0,
        }
    }

    /// Right-hand side `B` of the row for step `h`
    pub fn compute_b(&mut self, bi: &Body, bj: &Body, h: f64) -> f64 {
        self.update_jacobians();
        let gimf = self.compute_gimf(bi, bj);
        match &self.kind {
            EquationKind::Contact(row) => {
                let g = self.position_error(bi, bj);
                let e_plus_one = row.restitution + 1.0;
                let gw = e_plus_one * bj.velocity.dot(&row.ni) - e_plus_one * bi.velocity.dot(&row.ni)
                    + bj.angular_velocity.dot(&self.jacobian_b.rotational)
                    + bi.angular_velocity.dot(&self.jacobian_a.rotational);
                -g * self.a - gw * self.b - h * gimf
            }
            EquationKind::RotationalMotor(row) => {
                let gw = self.compute_gw(bi, bj) - row.target_velocity;
                -gw * self.b - h * gimf
            }
            EquationKind::Friction(_) | EquationKind::Rotational(_) | EquationKind::Cone(_) => {
                let g = self.position_error(bi, bj);
                -g * self.a - self.compute_gw(bi, bj) * self.b - h * gimf
            }
        }
    }

    /// `G W`: relative velocity along the row
    pub fn compute_gw(&self, bi: &Body, bj: &Body) -> f64 {
        self.jacobian_a.multiply_vectors(&bi.velocity, &bi.angular_velocity)
            + self.jacobian_b.multiply_vectors(&bj.velocity, &bj.angular_velocity)
    }

    /// `G W_lambda`: relative velocity of the solver accumulators
    pub fn compute_gw_lambda(&self, bi: &Body, bj: &Body) -> f64 {
        self.jacobian_a.multiply_vectors(&bi.vlambda, &bi.wlambda)
            + self.jacobian_b.multiply_vectors(&bj.vlambda, &bj.wlambda)
    }

    /// `G M^-1 f`: acceleration along the row from external forces
    pub fn compute_gimf(&self, bi: &Body, bj: &Body) -> f64 {
        let imf_i = bi.force * bi.inv_mass_solve;
        let imf_j = bj.force * bj.inv_mass_solve;
        let iit_i = bi.inv_inertia_world_solve * bi.torque;
        let iit_j = bj.inv_inertia_world_solve * bj.torque;
        self.jacobian_a.multiply_vectors(&imf_i, &iit_i) + self.jacobian_b.multiply_vectors(&imf_j, &iit_j)
    }

    /// `G M^-1 G^T`
    pub fn compute_gimgt(&self, bi: &Body, bj: &Body) -> f64 {
        let ga = &self.jacobian_a;
        let gb = &self.jacobian_b;
        bi.inv_mass_solve * ga.spatial.norm_squared()
            + bj.inv_mass_solve * gb.spatial.norm_squared()
            + (bi.inv_inertia_world_solve * ga.rotational).dot(&ga.rotational)
            + (bj.inv_inertia_world_solve * gb.rotational).dot(&gb.rotational)
    }

    /// Effective inverse mass plus regularization
    pub fn compute_c(&self, bi: &Body, bj: &Body) -> f64 {
        self.compute_gimgt(bi, bj) + self.eps
    }

    /// Apply a multiplier increment to both bodies' solver accumulators
    pub fn add_to_wlambda(&self, bi: &mut Body, bj: &mut Body, delta_lambda: f64) {
        bi.vlambda += self.jacobian_a.spatial * (bi.inv_mass_solve * delta_lambda);
        bj.vlambda += self.jacobian_b.spatial * (bj.inv_mass_solve * delta_lambda);
        bi.wlambda += (bi.inv_inertia_world_solve * self.jacobian_a.rotational) * delta_lambda;
        bj.wlambda += (bj.inv_inertia_world_solve * self.jacobian_b.rotational) * delta_lambda;
    }

    /// Approach speed of a contact along its normal, 0 for other rows
    pub fn impact_velocity_along_normal(&self, bi: &Body, bj: &Body) -> f64 {
        let Some(row) = self.as_contact() else {
            return 0.0;
        };
        let vi = bi.velocity_at_world_point(&(bi.position + row.ri));
        let vj = bj.velocity_at_world_point(&(bj.position + row.rj));
        row.ni.dot(&(vi - vj))
    }
}
