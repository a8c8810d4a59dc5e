//! Velocity solvers
//!
//! A solver owns the equations of one step, iterates on them and writes the
//! resulting velocity corrections into the bodies.
//!
//! - [`GsSolver`]: projected Gauss-Seidel over every equation
//! - [`SplitSolver`]: partitions the equation graph into islands first

mod gs;
mod split;

pub use gs::GsSolver;
pub use split::SplitSolver;

use crate::config::{FrictionCoupling, SolverConfig, SolverKind};
use crate::equations::Equation;
use crate::foundation::collections::BodySet;

/// Common solver interface
pub trait Solver: std::fmt::Debug {
    /// Queue an equation for the next solve; disabled equations are ignored
    fn add_equation(&mut self, equation: Equation);

    /// Drop every queued equation
    fn remove_all_equations(&mut self);

    /// Queued equations
    fn equations(&self) -> &[Equation];

    /// Move the queued equations out, multipliers included
    fn take_equations(&mut self) -> Vec<Equation>;

    /// Solve for step `dt`. The meaning of the returned count depends on the
    /// solver (iterations or islands).
    fn solve(&mut self, dt: f64, bodies: &mut BodySet) -> usize;

    /// Maximum iterations per solve
    fn iterations(&self) -> usize;

    /// Set the maximum iterations per solve
    fn set_iterations(&mut self, iterations: usize);

    /// Convergence tolerance
    fn tolerance(&self) -> f64;

    /// Set the convergence tolerance
    fn set_tolerance(&mut self, tolerance: f64);
}

/// Build the solver described by a config
pub fn create_solver(config: &SolverConfig, coupling: FrictionCoupling) -> Box<dyn Solver> {
    let mut gs = GsSolver::new().with_friction_coupling(coupling);
    gs.set_iterations(config.iterations);
    gs.set_tolerance(config.tolerance);
    match config.kind {
        SolverKind::GaussSeidel => Box::new(gs),
        SolverKind::Split => Box::new(SplitSolver::new(gs)),
    }
}
