//! Island splitting solver
//!
//! Bodies are nodes, equations are edges. A breadth-first search from every
//! unvisited dynamic body collects one island; static, kinematic and sleeping
//! bodies are never expanded, so they cut the graph while still taking part
//! in the equations that touch them. Each island is solved on its own by the
//! wrapped [`GsSolver`].

use super::{GsSolver, Solver};
use crate::body::Body;
use crate::equations::Equation;
use crate::foundation::collections::{BodyHandle, BodySet, SecondaryMap};
use crate::foundation::logging::debug;
use std::collections::VecDeque;

fn is_cut_point(body: &Body) -> bool {
    !body.is_dynamic() || body.is_sleeping()
}

/// Solver that partitions equations into connected islands
#[derive(Debug, Clone)]
pub struct SplitSolver {
    sub_solver: GsSolver,
    equations: Vec<Equation>,

    adjacency: SecondaryMap<BodyHandle, Vec<usize>>,
    visited: SecondaryMap<BodyHandle, ()>,
    queue: VecDeque<BodyHandle>,
    island: Vec<usize>,
}

impl SplitSolver {
    /// Wrap a sub-solver; its iteration and tolerance settings are used per island
    pub fn new(sub_solver: GsSolver) -> Self {
        Self {
            sub_solver,
            equations: Vec::new(),
            adjacency: SecondaryMap::new(),
            visited: SecondaryMap::new(),
            queue: VecDeque::new(),
            island: Vec::new(),
        }
    }

    fn build_adjacency(&mut self) {
        self.adjacency.clear();
        for (k, eq) in self.equations.iter().enumerate() {
            for handle in [eq.body_i, eq.body_j] {
                if let Some(entry) = self.adjacency.entry(handle) {
                    entry.or_default().push(k);
                }
            }
        }
    }

    /// Breadth-first search from `seed`, filling `self.island` with equation indices
    fn collect_island(&mut self, seed: BodyHandle, bodies: &BodySet, taken: &mut [bool]) {
        self.island.clear();
        self.queue.clear();
        self.queue.push_back(seed);
        self.visited.insert(seed, ());

        while let Some(node) = self.queue.pop_front() {
            let Some(edges) = self.adjacency.get(node) else {
                continue;
            };
            for &k in edges {
                if !taken[k] {
                    taken[k] = true;
                    self.island.push(k);
                }
                let eq = &self.equations[k];
                let other = if eq.body_i == node { eq.body_j } else { eq.body_i };
                if self.visited.contains_key(other) {
                    continue;
                }
                if bodies.get(other).is_some_and(|b| !is_cut_point(b)) {
                    self.visited.insert(other, ());
                    self.queue.push_back(other);
                }
            }
        }

        let equations = &self.equations;
        self.island.sort_unstable_by_key(|&k| equations[k].id);
    }
}

impl Solver for SplitSolver {
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

    /// Returns the number of islands
    fn solve(&mut self, dt: f64, bodies: &mut BodySet) -> usize {
        self.build_adjacency();
        self.visited.clear();

        let mut taken = vec![false; self.equations.len()];
        let mut solved: Vec<Equation> = Vec::with_capacity(self.equations.len());

        let seeds: Vec<BodyHandle> = bodies
            .iter()
            .filter(|(_, body)| !is_cut_point(body))
            .map(|(handle, _)| handle)
            .collect();

        let mut islands = 0;
        for seed in seeds {
            if self.visited.contains_key(seed) {
                continue;
            }
            islands += 1;
            self.collect_island(seed, bodies, &mut taken);
            if self.island.is_empty() {
                continue;
            }

            self.sub_solver.remove_all_equations();
            for &k in &self.island {
                self.sub_solver.add_equation(self.equations[k].clone());
            }
            self.sub_solver.solve(dt, bodies);
            solved.append(&mut self.sub_solver.take_equations());
        }

        // Rows between cut points only are left untouched
        solved.extend(
            self.equations
                .drain(..)
                .zip(taken)
                .filter_map(|(eq, taken)| (!taken).then_some(eq)),
        );
        self.equations = solved;

        debug!("Split solver: {} equations in {islands} islands", self.equations.len());
        islands
    }

    fn iterations(&self) -> usize {
        self.sub_solver.iterations()
    }

    fn set_iterations(&mut self, iterations: usize) {
        self.sub_solver.set_iterations(iterations);
    }

    fn tolerance(&self) -> f64 {
        self.sub_solver.tolerance()
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.sub_solver.set_tolerance(tolerance);
    }
}
