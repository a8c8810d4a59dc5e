//! The step loop

use super::World;
use crate::body::{Body, BodyType, SleepTransition};
use crate::error::{PhysicsError, PhysicsResult};
use crate::events::WorldEvent;
use crate::foundation::collections::{ordered_pair, BodyHandle};
use crate::foundation::logging::{debug, trace};
use crate::foundation::math::slerp;
use crate::foundation::time::Stopwatch;
use std::collections::{HashMap, HashSet};

/// Result of [`World::step`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Internal steps taken
    pub substeps: usize,
    /// Events no registered handler consumed, in the order they happened
    pub events: Vec<WorldEvent>,
}

const fn sleep_event(transition: SleepTransition, body: BodyHandle) -> WorldEvent {
    match transition {
        SleepTransition::Sleepy => WorldEvent::Sleepy { body },
        SleepTransition::Sleep => WorldEvent::Sleep { body },
        SleepTransition::WakeUp => WorldEvent::WakeUp { body },
    }
}

/// A sleeping dynamic body that may sleep is woken by an awake, moving,
/// non-static partner
fn should_wake(sleeper: &Body, other: &Body) -> bool {
    let speed_squared = other.velocity.norm_squared() + other.angular_velocity.norm_squared();
    let limit_squared = other.sleep_speed_limit * other.sleep_speed_limit;
    sleeper.allow_sleep
        && sleeper.body_type() == BodyType::Dynamic
        && sleeper.is_sleeping()
        && other.is_awake()
        && other.body_type() != BodyType::Static
        && speed_squared >= 2.0 * limit_squared
}

impl World {
    /// Advance the simulation.
    ///
    /// With `time_since_last_called == 0` exactly one step of `dt` is taken.
    /// Otherwise the elapsed time is accumulated and consumed in fixed steps
    /// of `dt`, at most `max_sub_steps` of them; time beyond that is dropped.
    /// Interpolated body states are then set between the last two steps.
    pub fn step(&mut self, dt: f64, time_since_last_called: f64, max_sub_steps: usize) -> PhysicsResult<StepOutcome> {
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::InvalidTimeStep(dt));
        }
        if !time_since_last_called.is_finite() || time_since_last_called < 0.0 {
            return Err(PhysicsError::InvalidTimeStep(time_since_last_called));
        }

        let mut substeps = 0;
        if time_since_last_called <= 0.0 {
            self.internal_step(dt);
            substeps = 1;
            for body in self.bodies.values_mut() {
                body.interpolated_position = body.position;
                body.interpolated_orientation = body.orientation;
            }
        } else {
            self.accumulator += time_since_last_called;
            while self.accumulator >= dt && substeps < max_sub_steps {
                self.internal_step(dt);
                self.accumulator -= dt;
                substeps += 1;
            }
            self.accumulator %= dt;

            let t = self.accumulator / dt;
            for body in self.bodies.values_mut() {
                body.interpolated_position = body.previous_position.lerp(&body.position, t);
                body.interpolated_orientation = slerp(&body.previous_orientation, &body.orientation, t);
            }
        }

        Ok(StepOutcome {
            substeps,
            events: self.events.dispatch(),
        })
    }

    /// One fixed step of `dt`
    pub(super) fn internal_step(&mut self, dt: f64) {
        let total = Stopwatch::start_new();
        let gravity = self.config.gravity;

        for body in self.bodies.values_mut() {
            if body.body_type() == BodyType::Dynamic {
                body.force += gravity * body.mass();
            }
        }

        let phase = Stopwatch::start_new();
        for body in self.bodies.values_mut() {
            if body.aabb_needs_update() {
                body.update_aabb();
            }
        }
        self.pairs.clear();
        self.broadphase.collision_pairs(&self.bodies, &mut self.pairs);
        self.remove_connected_pairs();
        self.profile.broadphase = phase.elapsed_millis();

        self.collision_matrix.tick();

        let phase = Stopwatch::start_new();
        self.narrowphase.get_contacts(
            &self.pairs,
            &self.bodies,
            &self.materials,
            dt,
            &gravity,
            &mut self.next_equation_id,
        );
        let (contacts, frictions) = self.narrowphase.take_equations();
        self.contacts = contacts;
        self.frictions = frictions;
        self.profile.narrowphase = phase.elapsed_millis();

        self.solver.remove_all_equations();
        for eq in &self.frictions {
            self.solver.add_equation(eq.clone());
        }
        for eq in &self.contacts {
            self.solver.add_equation(eq.clone());
        }

        self.process_contacts();
        self.apply_deferred_wake_ups();
        self.emit_contact_events();

        for constraint in self.constraints.values_mut() {
            if !constraint.update(&self.bodies) {
                continue;
            }
            for eq in constraint.equations() {
                self.solver.add_equation(eq.clone());
            }
        }

        let phase = Stopwatch::start_new();
        let solved = self.solver.solve(dt, &mut self.bodies);
        self.copy_multipliers();
        self.solver.remove_all_equations();
        self.profile.solve = phase.elapsed_millis();

        debug!(
            "Step {}: {} pairs, {} contacts, {} friction rows, solver returned {}",
            self.step_number,
            self.pairs.len(),
            self.contacts.len(),
            self.frictions.len(),
            solved
        );

        let phase = Stopwatch::start_new();
        for body in self.bodies.values_mut() {
            if body.body_type() == BodyType::Dynamic {
                body.velocity *= (1.0 - body.linear_damping).powf(dt);
                body.angular_velocity *= (1.0 - body.angular_damping).powf(dt);
            }
        }

        let normalize = self.step_number % (u64::from(self.config.quat_normalize_skip) + 1) == 0;
        let fast = self.config.quat_normalize_fast;
        for body in self.bodies.values_mut() {
            body.integrate(dt, normalize, fast);
            body.clear_forces();
        }
        self.profile.integrate = phase.elapsed_millis();

        self.time += dt;
        self.step_number += 1;

        if self.config.allow_sleep {
            let time = self.time;
            for (handle, body) in &mut self.bodies {
                if let Some(transition) = body.sleep_tick(time) {
                    self.events.push(sleep_event(transition, handle));
                }
            }
        }

        self.profile.total = total.elapsed_millis();
    }

    /// Drop pairs joined by a constraint that disables their collisions
    fn remove_connected_pairs(&mut self) {
        let excluded: HashSet<_> = self
            .constraints
            .values()
            .filter(|c| !c.collide_connected)
            .map(|c| ordered_pair(c.body_a(), c.body_b()))
            .collect();
        if !excluded.is_empty() {
            self.pairs.retain(|&(a, b)| !excluded.contains(&ordered_pair(a, b)));
        }
    }

    /// Wake-up marks, the collision matrix, `Collide` events and overlap bookkeeping
    fn process_contacts(&mut self) {
        let allow_sleep = self.config.allow_sleep;
        let mut run: Option<((BodyHandle, BodyHandle), usize)> = None;

        for index in 0..self.contacts.len() {
            let (hi, hj) = (self.contacts[index].body_i, self.contacts[index].body_j);
            let Some([bi, bj]) = self.bodies.get_disjoint_mut([hi, hj]) else {
                continue;
            };

            if allow_sleep {
                let (wake_i, wake_j) = (should_wake(bi, bj), should_wake(bj, bi));
                bi.wake_up_after_narrowphase |= wake_i;
                bj.wake_up_after_narrowphase |= wake_j;
            }

            let (id_i, id_j) = (bi.id(), bj.id());
            self.collision_matrix.set(id_i, id_j, true);
            let pair = (hi, hj);
            if let Some((current, count)) = run.as_mut() {
                if *current == pair {
                    *count += 1;
                    continue;
                }
            }
            if let Some((previous, count)) = run.replace((pair, 1)) {
                self.emit_collide(previous, count);
            }
        }
        if let Some((pair, count)) = run {
            self.emit_collide(pair, count);
        }

        self.body_overlaps.tick();
        self.shape_overlaps.tick();
        for overlap in self.narrowphase.overlaps() {
            self.body_overlaps.set(overlap.body_a, overlap.body_b);
            self.shape_overlaps
                .set((overlap.body_a, overlap.shape_a), (overlap.body_b, overlap.shape_b));
        }
    }

    /// `Collide` for a pair that did not collide last step
    fn emit_collide(&mut self, (body, other): (BodyHandle, BodyHandle), contact_count: usize) {
        let (Some(a), Some(b)) = (self.bodies.get(body), self.bodies.get(other)) else {
            return;
        };
        if !self.collision_matrix.get_previous(a.id(), b.id()) {
            trace!("Bodies {} and {} collide with {} contact(s)", a.id(), b.id(), contact_count);
            self.events.push(WorldEvent::Collide {
                body,
                other,
                contact_count,
            });
        }
    }

    fn apply_deferred_wake_ups(&mut self) {
        for (handle, body) in &mut self.bodies {
            if body.wake_up_after_narrowphase {
                if let Some(transition) = body.wake_up() {
                    self.events.push(sleep_event(transition, handle));
                }
            }
        }
    }

    fn emit_contact_events(&mut self) {
        let (additions, removals) = &mut self.body_diff;
        self.body_overlaps.diff(additions, removals);
        for &(body_a, body_b) in additions.iter() {
            self.events.push(WorldEvent::BeginContact { body_a, body_b });
        }
        for &(body_a, body_b) in removals.iter() {
            self.events.push(WorldEvent::EndContact { body_a, body_b });
        }

        let (additions, removals) = &mut self.shape_diff;
        self.shape_overlaps.diff(additions, removals);
        for &((body_a, shape_a), (body_b, shape_b)) in additions.iter() {
            self.events.push(WorldEvent::BeginShapeContact { body_a, body_b, shape_a, shape_b });
        }
        for &((body_a, shape_a), (body_b, shape_b)) in removals.iter() {
            self.events.push(WorldEvent::EndShapeContact { body_a, body_b, shape_a, shape_b });
        }
    }

    /// Solved multipliers back into the stored contacts and the constraints
    fn copy_multipliers(&mut self) {
        let solved: HashMap<u64, f64> = self
            .solver
            .take_equations()
            .into_iter()
            .map(|eq| (eq.id, eq.multiplier))
            .collect();
        if solved.is_empty() {
            return;
        }

        let rows = self
            .contacts
            .iter_mut()
            .chain(self.frictions.iter_mut())
            .chain(self.constraints.values_mut().flat_map(|c| c.equations_mut().iter_mut()));
        for eq in rows {
            if let Some(&multiplier) = solved.get(&eq.id) {
                eq.multiplier = multiplier;
            }
        }
    }
}
