//! Projected Gauss-Seidel solver

use super::Solver;
use crate::config::FrictionCoupling;
use crate::equations::{Equation, EquationKind};
use crate::foundation::collections::{BodyHandle, BodySet};
use crate::foundation::logging::warn;
use crate::foundation::math::Vec3;
use std::collections::HashMap;

/// Projected Gauss-Seidel solver with SPOOK stabilization
#[derive(Debug, Clone)]
pub struct GsSolver {
    iterations: usize,
    tolerance: f64,
    friction_coupling: FrictionCoupling,
    equations: Vec<Equation>,

    // Per-solve scratch, kept to avoid reallocation
    lambda: Vec<f64>,
    rhs: Vec<f64>,
    inv_c: Vec<f64>,
    touched: Vec<BodyHandle>,
    contact_rows: HashMap<u64, usize>,
}

impl Default for GsSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl GsSolver {
    /// Solver with 10 iterations and tolerance 1e-7
    pub fn new() -> Self {
        Self {
            iterations: 10,
            tolerance: 1e-7,
            friction_coupling: FrictionCoupling::default(),
            equations: Vec::new(),
            lambda: Vec::new(),
            rhs: Vec::new(),
            inv_c: Vec::new(),
            touched: Vec::new(),
            contact_rows: HashMap::new(),
        }
    }

    /// Choose how friction rows are bounded
    #[must_use]
    pub const fn with_friction_coupling(mut self, coupling: FrictionCoupling) -> Self {
        self.friction_coupling = coupling;
        self
    }

    /// Friction bound policy
    pub const fn friction_coupling(&self) -> FrictionCoupling {
        self.friction_coupling
    }

    fn prepare(&mut self, dt: f64, bodies: &mut BodySet) {
        let n = self.equations.len();

        self.touched.clear();
        self.touched
            .extend(self.equations.iter().flat_map(|eq| [eq.body_i, eq.body_j]));
        self.touched.sort_unstable();
        self.touched.dedup();
        for &handle in &self.touched {
            if let Some(body) = bodies.get_mut(handle) {
                body.update_solve_mass_properties();
                body.vlambda = Vec3::zeros();
                body.wlambda = Vec3::zeros();
            }
        }

        self.contact_rows.clear();
        for (k, eq) in self.equations.iter().enumerate() {
            if eq.is_contact() {
                self.contact_rows.insert(eq.id, k);
            }
        }

        self.lambda.clear();
        self.lambda.resize(n, 0.0);
        self.rhs.clear();
        self.rhs.resize(n, 0.0);
        self.inv_c.clear();
        self.inv_c.resize(n, 0.0);

        for (k, eq) in self.equations.iter_mut().enumerate() {
            let pair = (eq.body_i != eq.body_j)
                .then(|| bodies.get(eq.body_i).zip(bodies.get(eq.body_j)))
                .flatten();
            let Some((bi, bj)) = pair else {
                warn!("Skipping equation {} without two distinct live bodies", eq.id);
                continue;
            };
            self.rhs[k] = eq.compute_b(bi, bj, dt);
            self.inv_c[k] = 1.0 / eq.compute_c(bi, bj);
        }
    }

    fn iterate(&mut self, bodies: &mut BodySet) -> usize {
        let tolerance_squared = self.tolerance * self.tolerance;
        let Self {
            equations,
            lambda,
            rhs,
            inv_c,
            contact_rows,
            friction_coupling,
            iterations,
            ..
        } = self;

        let mut performed = 0;
        for _ in 0..*iterations {
            performed += 1;
            let mut delta_total = 0.0;

            for k in 0..equations.len() {
                if inv_c[k] == 0.0 {
                    continue;
                }
                if *friction_coupling == FrictionCoupling::NormalImpulse {
                    let bound = match &equations[k].kind {
                        EquationKind::Friction(row) => row
                            .contact_id
                            .and_then(|id| contact_rows.get(&id))
                            .map(|&contact| row.mu * lambda[contact]),
                        _ => None,
                    };
                    if let Some(bound) = bound {
                        equations[k].min_force = -bound;
                        equations[k].max_force = bound;
                    }
                }

                let eq = &equations[k];
                let Some([bi, bj]) = bodies.get_disjoint_mut([eq.body_i, eq.body_j]) else {
                    continue;
                };
                let gw_lambda = eq.compute_gw_lambda(bi, bj);
                let lambda_j = lambda[k];
                let mut delta = inv_c[k] * (rhs[k] - gw_lambda - eq.eps * lambda_j);
                if lambda_j + delta < eq.min_force {
                    delta = eq.min_force - lambda_j;
                } else if lambda_j + delta > eq.max_force {
                    delta = eq.max_force - lambda_j;
                }
                lambda[k] += delta;
                delta_total += delta.abs();
                eq.add_to_wlambda(bi, bj, delta);
            }

            if delta_total * delta_total < tolerance_squared {
                break;
            }
        }
        performed
    }
}

impl Solver for GsSolver {
    fn add_equation(&mut self, equation: Equation) {
        if equation.enabled {
            self.equations.push(equation);
        }
    }

    fn remove_all_equations(&mut self) {
        self.equations.clear();
    }

    fn equations(&self) -> &[Equation] {
        &self.equations
    }

    fn take_equations(&mut self) -> Vec<Equation> {
        std::mem::take(&mut self.equations)
    }

    /// Returns the number of iterations performed
    fn solve(&mut self, dt: f64, bodies: &mut BodySet) -> usize {
        if self.equations.is_empty() {
            return 0;
        }
        self.prepare(dt, bodies);
        let performed = self.iterate(bodies);

        for &handle in &self.touched {
            if let Some(body) = bodies.get_mut(handle) {
                body.velocity += body.vlambda.component_mul(&body.linear_factor);
                body.angular_velocity += body.wlambda.component_mul(&body.angular_factor);
            }
        }

        let inv_dt = 1.0 / dt;
        for (eq, lambda) in self.equations.iter_mut().zip(&self.lambda) {
            eq.multiplier = lambda * inv_dt;
        }
        performed
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn set_iterations(&mut self, iterations: usize) {
        self.iterations = iterations;
    }

    fn tolerance(&self) -> f64 {
        self.tolerance
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.tolerance = tolerance;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Body;
    use crate::equations::{ContactRow, FrictionRow, DEFAULT_MAX_FORCE};
    use crate::shapes::Shape;
    use approx::assert_relative_eq;

    const DT: f64 = 1.0 / 60.0;
    const GRAVITY: f64 = 9.82;

    fn ground_and_ball(velocity: Vec3) -> (BodySet, BodyHandle, BodyHandle) {
        let mut bodies = BodySet::with_key();
        let ground = bodies.insert(Body::fixed().with_shape(Shape::Plane));
        let ball = bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::sphere(0.5).unwrap())
                .with_position(Vec3::new(0.0, 0.0, 0.5))
                .with_velocity(velocity),
        );
        (bodies, ground, ball)
    }

    fn resting_contact(ground: BodyHandle, ball: BodyHandle) -> Equation {
        let mut eq = Equation::contact(
            ground,
            ball,
            ContactRow {
                ri: Vec3::zeros(),
                rj: Vec3::new(0.0, 0.0, -0.5),
                ni: Vec3::z(),
                restitution: 0.0,
            },
            DEFAULT_MAX_FORCE,
        );
        eq.id = 1;
        eq.set_spook_params(1e7, 4.0, DT);
        eq
    }

    #[test]
    fn test_contact_carries_weight() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::zeros());
        bodies[ball].force = Vec3::new(0.0, 0.0, -GRAVITY);

        let mut solver = GsSolver::new();
        solver.add_equation(resting_contact(ground, ball));
        let iterations = solver.solve(DT, &mut bodies);
        assert!(iterations <= 3);

        let multiplier = solver.equations()[0].multiplier;
        assert_relative_eq!(multiplier, GRAVITY, max_relative = 1e-3);
        assert_relative_eq!(bodies[ball].velocity.z, GRAVITY * DT, max_relative = 1e-3);
        assert_eq!(bodies[ground].velocity, Vec3::zeros());
    }

    #[test]
    fn test_separating_contact_stays_clamped() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::new(0.0, 0.0, 1.0));
        let mut solver = GsSolver::new();
        solver.add_equation(resting_contact(ground, ball));
        solver.solve(DT, &mut bodies);
        assert_eq!(solver.equations()[0].multiplier, 0.0);
        assert_relative_eq!(bodies[ball].velocity.z, 1.0);
    }

    #[test]
    fn test_loaded_contact_converges_early() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::zeros());
        bodies[ball].force = Vec3::new(0.0, 0.0, -GRAVITY);
        let mut solver = GsSolver::new();

        // One row: the first sweep solves it exactly, the second sees no change
        let mut multipliers = Vec::new();
        for _ in 0..2 {
            bodies[ball].velocity = Vec3::zeros();
            solver.remove_all_equations();
            solver.add_equation(resting_contact(ground, ball));
            assert_eq!(solver.solve(DT, &mut bodies), 2);
            multipliers.push(solver.equations()[0].multiplier);
        }
        assert!(multipliers[0] > 0.0);
        assert_relative_eq!(multipliers[0], multipliers[1]);

        // A ball already rising fast enough to cancel the load leaves nothing to solve
        let contact = resting_contact(ground, ball);
        bodies[ball].velocity = Vec3::new(0.0, 0.0, DT * GRAVITY / contact.b);
        solver.remove_all_equations();
        solver.add_equation(contact);
        assert_eq!(solver.solve(DT, &mut bodies), 1);
        assert!(solver.equations()[0].multiplier.abs() < 1e-9);
    }

    #[test]
    fn test_rows_stay_within_bounds_after_every_sweep() {
        for iterations in 1..=8 {
            let (mut bodies, ground, ball) = ground_and_ball(Vec3::new(3.0, -1.0, -2.0));
            bodies[ball].force = Vec3::new(0.0, 0.0, -GRAVITY);
            let contact = resting_contact(ground, ball);

            let mut solver = GsSolver::new();
            solver.set_iterations(iterations);
            solver.set_tolerance(0.0);
            for (id, t) in [(2, Vec3::x()), (3, Vec3::y())] {
                let mut friction = Equation::friction(
                    ground,
                    ball,
                    FrictionRow {
                        ri: Vec3::zeros(),
                        rj: Vec3::new(0.0, 0.0, -0.5),
                        t,
                        mu: 0.3,
                        contact_id: Some(contact.id),
                    },
                    DEFAULT_MAX_FORCE,
                );
                friction.id = id;
                solver.add_equation(friction);
            }
            solver.add_equation(contact);
            assert_eq!(solver.solve(DT, &mut bodies), iterations);

            for eq in solver.equations() {
                let lambda = eq.multiplier * DT;
                assert!(lambda >= eq.min_force - 1e-12, "row {} below bound after {iterations} sweeps", eq.id);
                assert!(lambda <= eq.max_force + 1e-12, "row {} above bound after {iterations} sweeps", eq.id);
            }
            assert!(solver.equations()[2].multiplier > 0.0);
        }
    }

    #[test]
    fn test_friction_bounded_by_normal_impulse() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::new(3.0, 0.0, 0.0));
        bodies[ball].force = Vec3::new(0.0, 0.0, -GRAVITY);

        let contact = resting_contact(ground, ball);
        let mut friction = Equation::friction(
            ground,
            ball,
            FrictionRow {
                ri: Vec3::zeros(),
                rj: Vec3::new(0.0, 0.0, -0.5),
                t: Vec3::x(),
                mu: 0.3,
                contact_id: Some(contact.id),
            },
            DEFAULT_MAX_FORCE,
        );
        friction.id = 2;

        let mut solver = GsSolver::new();
        solver.add_equation(friction);
        solver.add_equation(contact);
        solver.solve(DT, &mut bodies);

        let eqs = solver.equations();
        let normal = eqs[1].multiplier;
        let tangential = eqs[0].multiplier;
        assert!(normal > 0.0);
        assert!(tangential.abs() <= 0.3 * normal * (1.0 + 1e-9));
        // The ball slows down but does not reverse
        assert!(bodies[ball].velocity.x < 3.0 && bodies[ball].velocity.x > 0.0);
    }

    #[test]
    fn test_gravity_estimate_keeps_creation_bound() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::new(3.0, 0.0, 0.0));
        let slip = 0.3 * GRAVITY;
        let mut friction = Equation::friction(
            ground,
            ball,
            FrictionRow {
                ri: Vec3::zeros(),
                rj: Vec3::new(0.0, 0.0, -0.5),
                t: Vec3::x(),
                mu: 0.3,
                contact_id: Some(1),
            },
            slip,
        );
        friction.id = 2;
        let mut solver = GsSolver::new().with_friction_coupling(FrictionCoupling::GravityEstimate);
        solver.add_equation(resting_contact(ground, ball));
        solver.add_equation(friction);
        solver.solve(DT, &mut bodies);
        assert_relative_eq!(solver.equations()[1].max_force, slip);
    }

    #[test]
    fn test_disabled_and_degenerate_equations_are_skipped() {
        let (mut bodies, ground, ball) = ground_and_ball(Vec3::zeros());
        let mut solver = GsSolver::new();
        let mut disabled = resting_contact(ground, ball);
        disabled.enabled = false;
        solver.add_equation(disabled);
        assert!(solver.equations().is_empty());

        let mut self_pair = resting_contact(ball, ball);
        self_pair.id = 5;
        solver.add_equation(self_pair);
        solver.solve(DT, &mut bodies);
        assert_eq!(bodies[ball].velocity, Vec3::zeros());
    }
}
