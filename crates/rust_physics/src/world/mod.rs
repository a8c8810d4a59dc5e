//! Simulation world
//!
//! The [`World`] owns every body, constraint and material and runs the step
//! pipeline: broadphase, narrowphase, solver and integration. Bodies and
//! constraints are addressed through generation-checked handles.

mod step;

pub use step::StepOutcome;

use crate::body::{Body, SleepTransition};
use crate::broadphase::{create_broadphase, Broadphase, BodyPair};
use crate::collision::{CollisionMatrix, OverlapKeeper};
use crate::config::WorldConfig;
use crate::constraints::Constraint;
use crate::equations::Equation;
use crate::error::{PhysicsError, PhysicsResult};
use crate::events::{EventHandler, EventQueue, EventType, WorldEvent};
use crate::foundation::collections::{BodyHandle, BodySet, ConstraintHandle, SlotMap};
use crate::foundation::logging::{debug, info};
use crate::foundation::math::Vec3;
use crate::foundation::time::StepProfile;
use crate::material::{ContactParams, Material, MaterialId, MaterialLibrary};
use crate::narrowphase::Narrowphase;
use crate::solver::{create_solver, Solver};

/// A shape on a body: the body handle and the shape index
pub type ShapeKey = (BodyHandle, usize);

/// Rigid-body simulation
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    bodies: BodySet,
    constraints: SlotMap<ConstraintHandle, Constraint>,
    materials: MaterialLibrary,

    broadphase: Box<dyn Broadphase>,
    narrowphase: Narrowphase,
    solver: Box<dyn Solver>,

    collision_matrix: CollisionMatrix,
    body_overlaps: OverlapKeeper<BodyHandle>,
    shape_overlaps: OverlapKeeper<ShapeKey>,
    events: EventQueue,

    // Output of the last internal step
    contacts: Vec<Equation>,
    frictions: Vec<Equation>,
    profile: StepProfile,

    // Step scratch
    pairs: Vec<BodyPair>,
    body_diff: (Vec<(BodyHandle, BodyHandle)>, Vec<(BodyHandle, BodyHandle)>),
    shape_diff: (Vec<(ShapeKey, ShapeKey)>, Vec<(ShapeKey, ShapeKey)>),

    next_body_id: u32,
    next_constraint_id: u32,
    next_equation_id: u64,
    time: f64,
    step_number: u64,
    accumulator: f64,
}

impl World {
    /// Create a world from a validated config
    pub fn new(config: WorldConfig) -> PhysicsResult<Self> {
        config.validate().map_err(PhysicsError::InvalidConfig)?;
        let broadphase = create_broadphase(&config.broadphase)?;
        let solver = create_solver(&config.solver, config.friction_coupling);
        let narrowphase = Narrowphase::new().with_friction_reduction(config.enable_friction_reduction);
        let materials = MaterialLibrary::new(config.default_contact_material);

        info!(
            "Physics world created: gravity {:?}, {:?} solver with {} iterations, sleep {}",
            config.gravity, config.solver.kind, config.solver.iterations, config.allow_sleep
        );

        Ok(Self {
            config,
            bodies: BodySet::with_key(),
            constraints: SlotMap::with_key(),
            materials,
            broadphase,
            narrowphase,
            solver,
            collision_matrix: CollisionMatrix::new(),
            body_overlaps: OverlapKeeper::new(),
            shape_overlaps: OverlapKeeper::new(),
            events: EventQueue::new(),
            contacts: Vec::new(),
            frictions: Vec::new(),
            profile: StepProfile::default(),
            pairs: Vec::new(),
            body_diff: (Vec::new(), Vec::new()),
            shape_diff: (Vec::new(), Vec::new()),
            next_body_id: 0,
            next_constraint_id: 0,
            next_equation_id: 0,
            time: 0.0,
            step_number: 0,
            accumulator: 0.0,
        })
    }

    /// Config the world was built from, with the current gravity
    pub const fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Add a body and return its handle
    pub fn add_body(&mut self, mut body: Body) -> BodyHandle {
        body.id = self.next_body_id;
        self.next_body_id += 1;
        body.init_position = body.position;
        body.previous_position = body.position;
        body.interpolated_position = body.position;
        body.previous_orientation = body.orientation;
        body.interpolated_orientation = body.orientation;
        body.update_aabb();
        self.bodies.insert(body)
    }

    /// Remove a body together with every constraint attached to it
    pub fn remove_body(&mut self, handle: BodyHandle) -> PhysicsResult<Body> {
        let body = self.bodies.remove(handle).ok_or(PhysicsError::UnknownBody)?;
        let before = self.constraints.len();
        self.constraints
            .retain(|_, c| c.body_a() != handle && c.body_b() != handle);
        let dropped = before - self.constraints.len();
        if dropped > 0 {
            debug!("Removed body {} and {} constraint(s) attached to it", body.id(), dropped);
        }
        Ok(body)
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Look up a body for editing
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Every body
    pub const fn bodies(&self) -> &BodySet {
        &self.bodies
    }

    /// Add a constraint, waking both of its bodies
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> PhysicsResult<ConstraintHandle> {
        let ends = [constraint.body_a(), constraint.body_b()];
        if ends.iter().any(|&handle| !self.bodies.contains_key(handle)) {
            return Err(PhysicsError::UnknownBody);
        }

        constraint.id = self.next_constraint_id;
        self.next_constraint_id += 1;
        for eq in constraint.equations_mut() {
            eq.id = self.next_equation_id;
            self.next_equation_id += 1;
        }

        for handle in ends {
            if let Some(SleepTransition::WakeUp) = self.bodies.get_mut(handle).and_then(Body::wake_up) {
                self.events.push(WorldEvent::WakeUp { body: handle });
            }
        }
        Ok(self.constraints.insert(constraint))
    }

    /// Remove a constraint
    pub fn remove_constraint(&mut self, handle: ConstraintHandle) -> PhysicsResult<Constraint> {
        self.constraints.remove(handle).ok_or(PhysicsError::UnknownConstraint)
    }

    /// Look up a constraint
    pub fn constraint(&self, handle: ConstraintHandle) -> Option<&Constraint> {
        self.constraints.get(handle)
    }

    /// Look up a constraint for editing
    pub fn constraint_mut(&mut self, handle: ConstraintHandle) -> Option<&mut Constraint> {
        self.constraints.get_mut(handle)
    }

    /// Every constraint
    pub const fn constraints(&self) -> &SlotMap<ConstraintHandle, Constraint> {
        &self.constraints
    }

    /// Register a material
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.add_material(material)
    }

    /// Register the contact parameters of a material pair
    pub fn add_contact_material(&mut self, a: MaterialId, b: MaterialId, params: ContactParams) -> PhysicsResult<()> {
        params.validate().map_err(PhysicsError::InvalidConfig)?;
        self.materials.add_contact_material(a, b, params);
        Ok(())
    }

    /// Contact parameters registered for a material pair
    pub fn contact_material(&self, a: MaterialId, b: MaterialId) -> Option<&ContactParams> {
        self.materials.find_contact_params(Some(a), Some(b))
    }

    /// Material registry
    pub const fn materials(&self) -> &MaterialLibrary {
        &self.materials
    }

    /// Handle events of one type before they are returned from `step`
    pub fn register_event_handler(&mut self, event_type: EventType, handler: Box<dyn EventHandler>) {
        self.events.register_handler(event_type, handler);
    }

    /// Gravity acceleration
    pub const fn gravity(&self) -> &Vec3 {
        &self.config.gravity
    }

    /// Change gravity
    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.config.gravity = gravity;
    }

    /// Whether bodies may fall asleep
    pub const fn allow_sleep(&self) -> bool {
        self.config.allow_sleep
    }

    /// Turn sleeping on or off
    pub fn set_allow_sleep(&mut self, allow: bool) {
        self.config.allow_sleep = allow;
    }

    /// Simulated seconds
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Internal steps taken so far
    pub const fn step_number(&self) -> u64 {
        self.step_number
    }

    /// Contact rows of the last internal step, multipliers included
    pub fn contacts(&self) -> &[Equation] {
        &self.contacts
    }

    /// Friction rows of the last internal step
    pub fn frictions(&self) -> &[Equation] {
        &self.frictions
    }

    /// Timings of the last internal step
    pub const fn profile(&self) -> &StepProfile {
        &self.profile
    }

    /// Body pairs that touched in the last internal step and the one before
    pub const fn collision_matrix(&self) -> &CollisionMatrix {
        &self.collision_matrix
    }

    /// Whether any dynamic body is awake
    pub fn has_active_bodies(&self) -> bool {
        self.bodies.values().any(|b| b.is_dynamic() && !b.is_sleeping())
    }

    /// Apply a world force to a body, queueing `WakeUp` if it was asleep
    pub fn apply_force(&mut self, handle: BodyHandle, force: &Vec3, relative_point: &Vec3) -> PhysicsResult<()> {
        self.edit_awake(handle, |body| body.apply_force(force, relative_point))
    }

    /// Apply a world torque to a body, queueing `WakeUp` if it was asleep
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: &Vec3) -> PhysicsResult<()> {
        self.edit_awake(handle, |body| body.apply_torque(torque))
    }

    /// Apply a world impulse to a body, queueing `WakeUp` if it was asleep
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: &Vec3, relative_point: &Vec3) -> PhysicsResult<()> {
        self.edit_awake(handle, |body| body.apply_impulse(impulse, relative_point))
    }

    fn edit_awake(
        &mut self,
        handle: BodyHandle,
        edit: impl FnOnce(&mut Body) -> Option<SleepTransition>,
    ) -> PhysicsResult<()> {
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::UnknownBody)?;
        if let Some(SleepTransition::WakeUp) = edit(body) {
            self.events.push(WorldEvent::WakeUp { body: handle });
        }
        Ok(())
    }

    /// Zero the accumulated force and torque of every body
    pub fn clear_forces(&mut self) {
        for body in self.bodies.values_mut() {
            body.clear_forces();
        }
    }
}
