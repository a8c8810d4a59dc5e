//! User joints between two bodies
//!
//! A [`Constraint`] owns a fixed list of [`Equation`] rows. Every step the
//! world calls [`Constraint::update`] to rewrite the row geometry from the
//! current body poses, then hands the enabled rows to the solver. Solved
//! multipliers are copied back afterwards so joint forces can be read from
//! [`Constraint::equations`].

use crate::body::Body;
use crate::error::{PhysicsError, PhysicsResult};
use crate::equations::{ConeRow, ContactRow, Equation, EquationKind, MotorRow, RotationalRow};
use crate::foundation::collections::{BodyHandle, BodySet};
use crate::foundation::math::{tangents, Vec3};
use std::f64::consts::FRAC_PI_2;

/// Row index of the hinge motor
const MOTOR_ROW: usize = 5;

/// Joint geometry, in the local frames of the two bodies
#[derive(Debug, Clone, PartialEq)]
pub enum ConstraintKind {
    /// Pins a point of each body together
    PointToPoint {
        /// Pivot in body A
        pivot_a: Vec3,
        /// Pivot in body B
        pivot_b: Vec3,
    },
    /// Keeps the centers of mass at a fixed distance
    Distance {
        /// Rest distance
        distance: f64,
    },
    /// Point-to-point plus aligned axes, free to spin about them
    Hinge {
        /// Pivot in body A
        pivot_a: Vec3,
        /// Pivot in body B
        pivot_b: Vec3,
        /// Hinge axis in body A
        axis_a: Vec3,
        /// Hinge axis in body B
        axis_b: Vec3,
        /// Whether the motor row takes part in solving
        motor_enabled: bool,
    },
    /// Removes all relative motion
    Lock {
        /// Shared point in body A
        pivot_a: Vec3,
        /// Shared point in body B
        pivot_b: Vec3,
        /// World X, Y and Z in body A at creation
        axes_a: [Vec3; 3],
        /// World X, Y and Z in body B at creation
        axes_b: [Vec3; 3],
    },
    /// Point-to-point with a swing cone and a twist limit
    ConeTwist {
        /// Pivot in body A
        pivot_a: Vec3,
        /// Pivot in body B
        pivot_b: Vec3,
        /// Cone axis in body A
        axis_a: Vec3,
        /// Cone axis in body B
        axis_b: Vec3,
        /// Cone half angle
        angle: f64,
        /// Twist limit
        twist_angle: f64,
    },
}

/// Joint between two bodies
#[derive(Debug, Clone)]
pub struct Constraint {
    pub(crate) id: u32,
    body_a: BodyHandle,
    body_b: BodyHandle,
    /// Whether the joined bodies still collide with each other
    pub collide_connected: bool,
    kind: ConstraintKind,
    equations: Vec<Equation>,
}

/// Three bilateral rows along the world axes, pivots filled in by `update`
fn point_rows(body_a: BodyHandle, body_b: BodyHandle, max_force: f64) -> [Equation; 3] {
    [Vec3::x(), Vec3::y(), Vec3::z()].map(|ni| {
        let row = ContactRow { ri: Vec3::zeros(), rj: Vec3::zeros(), ni, restitution: 0.0 };
        let mut eq = Equation::contact(body_a, body_b, row, max_force);
        eq.min_force = -max_force;
        eq
    })
}

fn rotational_row(body_a: BodyHandle, body_b: BodyHandle, max_angle: f64, max_force: f64) -> Equation {
    let row = RotationalRow { axis_a: Vec3::x(), axis_b: Vec3::y(), max_angle };
    Equation::rotational(body_a, body_b, row, max_force)
}

fn update_point_rows(rows: &mut [Equation], a: &Body, b: &Body, pivot_a: &Vec3, pivot_b: &Vec3) {
    let ri = a.vector_to_world_frame(pivot_a);
    let rj = b.vector_to_world_frame(pivot_b);
    for eq in rows {
        if let EquationKind::Contact(row) = &mut eq.kind {
            row.ri = ri;
            row.rj = rj;
        }
    }
}

fn set_rotational_axes(eq: &mut Equation, axis_a: Vec3, axis_b: Vec3) {
    if let EquationKind::Rotational(row) = &mut eq.kind {
        row.axis_a = axis_a;
        row.axis_b = axis_b;
    }
}

fn unit_axis(axis: &Vec3) -> PhysicsResult<Vec3> {
    axis.try_normalize(f64::EPSILON)
        .ok_or_else(|| PhysicsError::InvalidConfig(format!("constraint axis {axis:?} has zero length")))
}

fn body_pair<'a>(bodies: &'a BodySet, a: BodyHandle, b: BodyHandle) -> PhysicsResult<(&'a Body, &'a Body)> {
    match (bodies.get(a), bodies.get(b)) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(PhysicsError::UnknownBody),
    }
}

impl Constraint {
    fn from_parts(
        body_a: BodyHandle,
        body_b: BodyHandle,
        kind: ConstraintKind,
        equations: Vec<Equation>,
    ) -> Self {
        let collide_connected = !matches!(kind, ConstraintKind::ConeTwist { .. });
        Self { id: 0, body_a, body_b, collide_connected, kind, equations }
    }

    /// Pin `pivot_a` of body A to `pivot_b` of body B
    pub fn point_to_point(body_a: BodyHandle, pivot_a: Vec3, body_b: BodyHandle, pivot_b: Vec3, max_force: f64) -> Self {
        let equations = point_rows(body_a, body_b, max_force).to_vec();
        Self::from_parts(body_a, body_b, ConstraintKind::PointToPoint { pivot_a, pivot_b }, equations)
    }

    /// Keep the two bodies `distance` apart, or at their current distance
    pub fn distance(
        bodies: &BodySet,
        body_a: BodyHandle,
        body_b: BodyHandle,
        distance: Option<f64>,
        max_force: f64,
    ) -> PhysicsResult<Self> {
        let (a, b) = body_pair(bodies, body_a, body_b)?;
        let distance = distance.unwrap_or_else(|| (b.position - a.position).norm());
        let row = ContactRow { ri: Vec3::zeros(), rj: Vec3::zeros(), ni: Vec3::x(), restitution: 0.0 };
        let mut eq = Equation::contact(body_a, body_b, row, max_force);
        eq.min_force = -max_force;
        Ok(Self::from_parts(body_a, body_b, ConstraintKind::Distance { distance }, vec![eq]))
    }

    /// Hinge about `axis_a`/`axis_b` through the two pivots. The motor starts disabled.
    pub fn hinge(
        body_a: BodyHandle,
        pivot_a: Vec3,
        axis_a: Vec3,
        body_b: BodyHandle,
        pivot_b: Vec3,
        axis_b: Vec3,
        max_force: f64,
    ) -> PhysicsResult<Self> {
        let axis_a = unit_axis(&axis_a)?;
        let axis_b = unit_axis(&axis_b)?;
        let mut equations = point_rows(body_a, body_b, max_force).to_vec();
        equations.push(rotational_row(body_a, body_b, FRAC_PI_2, max_force));
        equations.push(rotational_row(body_a, body_b, FRAC_PI_2, max_force));
        let mut motor = Equation::motor(
            body_a,
            body_b,
            MotorRow { axis_a, axis_b, target_velocity: 0.0 },
            max_force,
        );
        motor.enabled = false;
        equations.push(motor);
        let kind = ConstraintKind::Hinge { pivot_a, pivot_b, axis_a, axis_b, motor_enabled: false };
        Ok(Self::from_parts(body_a, body_b, kind, equations))
    }

    /// Freeze the current relative pose of the two bodies
    pub fn lock(bodies: &BodySet, body_a: BodyHandle, body_b: BodyHandle, max_force: f64) -> PhysicsResult<Self> {
        let (a, b) = body_pair(bodies, body_a, body_b)?;
        let halfway = (a.position + b.position) * 0.5;
        let world_axes = [Vec3::x(), Vec3::y(), Vec3::z()];
        let kind = ConstraintKind::Lock {
            pivot_a: a.point_to_local_frame(&halfway),
            pivot_b: b.point_to_local_frame(&halfway),
            axes_a: world_axes.map(|axis| a.vector_to_local_frame(&axis)),
            axes_b: world_axes.map(|axis| b.vector_to_local_frame(&axis)),
        };
        let mut equations = point_rows(body_a, body_b, max_force).to_vec();
        for _ in 0..3 {
            equations.push(rotational_row(body_a, body_b, FRAC_PI_2, max_force));
        }
        Ok(Self::from_parts(body_a, body_b, kind, equations))
    }

    /// Ball joint whose swing stays inside `angle` and whose twist stays under `twist_angle`.
    /// Joined bodies do not collide unless `collide_connected` is set afterwards.
    pub fn cone_twist(
        body_a: BodyHandle,
        pivot_a: Vec3,
        axis_a: Vec3,
        body_b: BodyHandle,
        pivot_b: Vec3,
        axis_b: Vec3,
        angle: f64,
        twist_angle: f64,
        max_force: f64,
    ) -> PhysicsResult<Self> {
        let axis_a = unit_axis(&axis_a)?;
        let axis_b = unit_axis(&axis_b)?;
        let mut equations = point_rows(body_a, body_b, max_force).to_vec();
        equations.push(Equation::cone(body_a, body_b, ConeRow { axis_a, axis_b, angle }, max_force));
        let mut twist = rotational_row(body_a, body_b, twist_angle, max_force);
        twist.max_force = 0.0;
        equations.push(twist);
        let kind = ConstraintKind::ConeTwist { pivot_a, pivot_b, axis_a, axis_b, angle, twist_angle };
        Ok(Self::from_parts(body_a, body_b, kind, equations))
    }

    /// Id assigned by the world, 0 before insertion
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// First body
    pub const fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body
    pub const fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Joint geometry
    pub const fn kind(&self) -> &ConstraintKind {
        &self.kind
    }

    /// Rows in their fixed order; multipliers hold the last solved forces
    pub fn equations(&self) -> &[Equation] {
        &self.equations
    }

    pub(crate) fn equations_mut(&mut self) -> &mut [Equation] {
        &mut self.equations
    }

    /// Whether any row takes part in solving
    pub fn is_enabled(&self) -> bool {
        self.equations.iter().any(|eq| eq.enabled)
    }

    /// Enable every row. A hinge motor stays as it was.
    pub fn enable(&mut self) {
        let motor = match self.kind {
            ConstraintKind::Hinge { motor_enabled, .. } => Some(motor_enabled),
            _ => None,
        };
        for eq in &mut self.equations {
            eq.enabled = true;
        }
        if let (Some(enabled), Some(eq)) = (motor, self.equations.get_mut(MOTOR_ROW)) {
            eq.enabled = enabled;
        }
    }

    /// Disable every row
    pub fn disable(&mut self) {
        for eq in &mut self.equations {
            eq.enabled = false;
        }
    }

    fn motor_row(&mut self) -> Option<&mut Equation> {
        match self.kind {
            ConstraintKind::Hinge { .. } => self.equations.get_mut(MOTOR_ROW),
            _ => None,
        }
    }

    fn set_motor_enabled(&mut self, enabled: bool) {
        if let ConstraintKind::Hinge { motor_enabled, .. } = &mut self.kind {
            *motor_enabled = enabled;
        }
        if let Some(eq) = self.motor_row() {
            eq.enabled = enabled;
        }
    }

    /// Turn on the hinge motor. No effect on other joints.
    pub fn enable_motor(&mut self) {
        self.set_motor_enabled(true);
    }

    /// Turn off the hinge motor
    pub fn disable_motor(&mut self) {
        self.set_motor_enabled(false);
    }

    /// Target relative angular velocity of the hinge motor
    pub fn set_motor_speed(&mut self, speed: f64) {
        if let Some(eq) = self.motor_row() {
            if let EquationKind::RotationalMotor(row) = &mut eq.kind {
                row.target_velocity = speed;
            }
        }
    }

    /// Torque bound of the hinge motor
    pub fn set_motor_max_force(&mut self, max_force: f64) {
        if let Some(eq) = self.motor_row() {
            eq.min_force = -max_force;
            eq.max_force = max_force;
        }
    }

    /// Rewrite row geometry from the current body poses.
    /// Returns false when either body is gone.
    pub fn update(&mut self, bodies: &BodySet) -> bool {
        let Ok((a, b)) = body_pair(bodies, self.body_a, self.body_b) else {
            return false;
        };

        match &self.kind {
            ConstraintKind::PointToPoint { pivot_a, pivot_b } => {
                update_point_rows(&mut self.equations, a, b, pivot_a, pivot_b);
            }
            ConstraintKind::Distance { distance } => {
                let half = distance * 0.5;
                let normal = (b.position - a.position).try_normalize(f64::EPSILON).unwrap_or_else(Vec3::x);
                if let Some(EquationKind::Contact(row)) = self.equations.first_mut().map(|eq| &mut eq.kind) {
                    row.ni = normal;
                    row.ri = normal * half;
                    row.rj = -normal * half;
                }
            }
            ConstraintKind::Hinge { pivot_a, pivot_b, axis_a, axis_b, .. } => {
                update_point_rows(&mut self.equations[..3], a, b, pivot_a, pivot_b);
                let world_a = a.vector_to_world_frame(axis_a);
                let world_b = b.vector_to_world_frame(axis_b);
                let (t1, t2) = tangents(&world_a);
                set_rotational_axes(&mut self.equations[3], t1, world_b);
                set_rotational_axes(&mut self.equations[4], t2, world_b);
                if let EquationKind::RotationalMotor(row) = &mut self.equations[MOTOR_ROW].kind {
                    row.axis_a = world_a;
                    row.axis_b = world_b;
                }
            }
            ConstraintKind::Lock { pivot_a, pivot_b, axes_a, axes_b } => {
                update_point_rows(&mut self.equations[..3], a, b, pivot_a, pivot_b);
                for (k, eq) in self.equations[3..].iter_mut().enumerate() {
                    let axis_a = a.vector_to_world_frame(&axes_a[k]);
                    let axis_b = b.vector_to_world_frame(&axes_b[(k + 1) % 3]);
                    set_rotational_axes(eq, axis_a, axis_b);
                }
            }
            ConstraintKind::ConeTwist { pivot_a, pivot_b, axis_a, axis_b, angle, twist_angle } => {
                update_point_rows(&mut self.equations[..3], a, b, pivot_a, pivot_b);
                let world_a = a.vector_to_world_frame(axis_a);
                let world_b = b.vector_to_world_frame(axis_b);
                if let EquationKind::Cone(row) = &mut self.equations[3].kind {
                    row.axis_a = world_a;
                    row.axis_b = world_b;
                    row.angle = *angle;
                }
                let twist_a = a.vector_to_world_frame(&tangents(axis_a).0);
                let twist_b = b.vector_to_world_frame(&tangents(axis_b).0);
                set_rotational_axes(&mut self.equations[4], twist_a, twist_b);
                if let EquationKind::Rotational(row) = &mut self.equations[4].kind {
                    row.max_angle = *twist_angle;
                }
            }
        }

        for eq in &mut self.equations {
            eq.update_jacobians();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Quat;
    use crate::shapes::Shape;
    use crate::solver::{GsSolver, Solver};
    use approx::assert_relative_eq;

    const EPSILON: f64 = 1e-9;
    const DT: f64 = 1.0 / 60.0;

    fn ball(x: f64) -> Body {
        Body::new(1.0)
            .with_shape(Shape::sphere(0.5).unwrap())
            .with_position(Vec3::new(x, 0.0, 0.0))
    }

    fn two_balls(xa: f64, xb: f64) -> (BodySet, BodyHandle, BodyHandle) {
        let mut bodies = BodySet::with_key();
        let a = bodies.insert(ball(xa));
        let b = bodies.insert(ball(xb));
        (bodies, a, b)
    }

    fn rhs(eq: &mut Equation, bodies: &BodySet) -> f64 {
        let bi = &bodies[eq.body_i];
        let bj = &bodies[eq.body_j];
        eq.compute_b(bi, bj, DT)
    }

    #[test]
    fn test_point_to_point_rows_balanced_when_pivots_meet() {
        let (bodies, a, b) = two_balls(0.0, 2.0);
        let mut joint = Constraint::point_to_point(a, Vec3::x(), b, -Vec3::x(), 1e6);
        assert!(joint.update(&bodies));
        assert_eq!(joint.equations().len(), 3);
        for eq in &mut joint.equations {
            assert_relative_eq!(eq.min_force, -1e6);
            assert_relative_eq!(rhs(eq, &bodies), 0.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_point_to_point_pulls_pivots_together() {
        let (mut bodies, a, b) = two_balls(0.0, 2.5);
        let mut joint = Constraint::point_to_point(a, Vec3::x(), b, -Vec3::x(), 1e6);
        joint.update(&bodies);

        let mut solver = GsSolver::new();
        solver.set_iterations(20);
        for eq in joint.equations() {
            solver.add_equation(eq.clone());
        }
        solver.solve(DT, &mut bodies);
        assert!(bodies[a].velocity.x > 0.0);
        assert!(bodies[b].velocity.x < 0.0);
        assert_relative_eq!(bodies[a].velocity.y, 0.0, epsilon = EPSILON);
    }

    #[test]
    fn test_distance_defaults_to_current_separation() {
        let (bodies, a, b) = two_balls(0.0, 3.0);
        let mut joint = Constraint::distance(&bodies, a, b, None, 1e6).unwrap();
        joint.update(&bodies);
        assert_relative_eq!(rhs(&mut joint.equations[0], &bodies), 0.0, epsilon = EPSILON);

        let mut short = Constraint::distance(&bodies, a, b, Some(1.0), 1e6).unwrap();
        short.update(&bodies);
        let row = short.equations()[0].as_contact().unwrap();
        assert_relative_eq!(row.ni, Vec3::x(), epsilon = EPSILON);
        assert_relative_eq!(row.ri, Vec3::new(0.5, 0.0, 0.0), epsilon = EPSILON);
        // Too far apart: the row pulls inward
        assert!(rhs(&mut short.equations[0], &bodies) < 0.0);
    }

    #[test]
    fn test_distance_needs_both_bodies() {
        let (mut bodies, a, b) = two_balls(0.0, 1.0);
        bodies.remove(b);
        assert!(matches!(
            Constraint::distance(&bodies, a, b, None, 1e6),
            Err(PhysicsError::UnknownBody)
        ));
    }

    #[test]
    fn test_hinge_layout_and_motor() {
        let (bodies, a, b) = two_balls(0.0, 2.0);
        let mut hinge = Constraint::hinge(a, Vec3::x(), Vec3::z(), b, -Vec3::x(), Vec3::z(), 1e6).unwrap();
        assert_eq!(hinge.equations().len(), 6);
        assert!(!hinge.equations()[MOTOR_ROW].enabled);

        hinge.enable_motor();
        hinge.set_motor_speed(2.0);
        hinge.set_motor_max_force(10.0);
        let motor = &hinge.equations()[MOTOR_ROW];
        assert!(motor.enabled);
        assert_relative_eq!(motor.max_force, 10.0);
        assert_relative_eq!(motor.min_force, -10.0);
        let EquationKind::RotationalMotor(row) = motor.kind else {
            panic!("row {MOTOR_ROW} is not the motor");
        };
        assert_relative_eq!(row.target_velocity, 2.0);

        // Aligned axes leave the rotational rows satisfied
        hinge.update(&bodies);
        for eq in &mut hinge.equations[3..5] {
            assert_relative_eq!(rhs(eq, &bodies), 0.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_enable_keeps_motor_state() {
        let (_, a, b) = two_balls(0.0, 2.0);
        let mut hinge = Constraint::hinge(a, Vec3::zeros(), Vec3::z(), b, Vec3::zeros(), Vec3::z(), 1e6).unwrap();
        hinge.disable();
        assert!(!hinge.is_enabled());
        hinge.enable();
        assert!(hinge.equations()[..MOTOR_ROW].iter().all(|eq| eq.enabled));
        assert!(!hinge.equations()[MOTOR_ROW].enabled);
    }

    #[test]
    fn test_hinge_rejects_zero_axis() {
        let (_, a, b) = two_balls(0.0, 2.0);
        assert!(Constraint::hinge(a, Vec3::zeros(), Vec3::zeros(), b, Vec3::zeros(), Vec3::z(), 1e6).is_err());
    }

    #[test]
    fn test_lock_is_satisfied_at_creation() {
        let mut bodies = BodySet::with_key();
        let a = bodies.insert(ball(0.0).with_orientation(Quat::from_axis_angle(&Vec3::z_axis(), 0.3)));
        let b = bodies.insert(ball(1.5));
        let mut lock = Constraint::lock(&bodies, a, b, 1e6).unwrap();
        assert!(lock.update(&bodies));
        assert_eq!(lock.equations().len(), 6);
        for eq in &mut lock.equations {
            assert_relative_eq!(rhs(eq, &bodies), 0.0, epsilon = EPSILON);
        }
    }

    #[test]
    fn test_cone_twist_bounds() {
        let (bodies, a, b) = two_balls(0.0, 2.0);
        let mut joint =
            Constraint::cone_twist(a, Vec3::x(), Vec3::x(), b, -Vec3::x(), Vec3::x(), 0.5, 0.2, 1e6).unwrap();
        assert!(!joint.collide_connected);
        for eq in &joint.equations()[3..] {
            assert_relative_eq!(eq.min_force, -1e6);
            assert_relative_eq!(eq.max_force, 0.0);
        }
        // Aligned axes sit inside the cone, so the row only asks for a clamped push
        joint.update(&bodies);
        assert!(rhs(&mut joint.equations[3], &bodies) > 0.0);
    }

    #[test]
    fn test_update_reports_missing_body() {
        let (mut bodies, a, b) = two_balls(0.0, 2.0);
        let mut joint = Constraint::point_to_point(a, Vec3::zeros(), b, Vec3::zeros(), 1e6);
        bodies.remove(a);
        assert!(!joint.update(&bodies));
    }

    #[test]
    fn test_motor_calls_ignore_other_joints() {
        let (_, a, b) = two_balls(0.0, 2.0);
        let mut joint = Constraint::point_to_point(a, Vec3::zeros(), b, Vec3::zeros(), 1e6);
        joint.enable_motor();
        joint.set_motor_speed(1.0);
        assert_eq!(joint.equations().len(), 3);
        assert!(joint.equations().iter().all(|eq| eq.is_contact()));
    }
}
