//! Rigid bodies
//!
//! A [`Body`] owns its shapes, its mass properties and its kinematic state.
//! The world drives it through force accumulation, solver velocity
//! corrections, integration and the sleep state machine.
//!
//! Mass and inertia have a "solve" copy that the solver reads. Static,
//! kinematic and sleeping bodies get zero solve mass so they act as fixed
//! anchors without losing their real mass.

use crate::collision::{Aabb, CollisionFilter};
use crate::error::{PhysicsError, PhysicsResult};
use crate::foundation::math::{
    integrate_quat, normalize_exact, normalize_fast, rotate_diagonal, Mat3, Quat, Transform, Unit, Vec3,
};
use crate::material::MaterialId;
use crate::shapes::{box_inertia, Shape};
use std::sync::Arc;

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    /// Moves under forces and contacts
    Dynamic,
    /// Never moves
    Static,
    /// Moves with its user-set velocity, unaffected by forces and contacts
    Kinematic,
}

/// Sleep state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepState {
    /// Simulated normally
    Awake,
    /// Slow for a while, may fall asleep
    Sleepy,
    /// Frozen until woken
    Sleeping,
}

/// Sleep state change worth reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SleepTransition {
    /// The body became sleepy
    Sleepy,
    /// The body fell asleep
    Sleep,
    /// A sleeping body woke up
    WakeUp,
}

/// Shape attached to a body
#[derive(Debug, Clone)]
pub struct BodyShape {
    /// Shared geometry
    pub shape: Arc<Shape>,
    /// Offset from the body origin in body space
    pub offset: Vec3,
    /// Orientation relative to the body
    pub orientation: Quat,
    /// Shape-level collision filter
    pub filter: CollisionFilter,
    /// Whether contacts with this shape produce a response
    pub collision_response: bool,
    /// Shape material, takes precedence over the body material
    pub material: Option<MaterialId>,
}

impl BodyShape {
    /// Attach a shape at the body origin
    pub fn new(shape: impl Into<Arc<Shape>>) -> Self {
        Self {
            shape: shape.into(),
            offset: Vec3::zeros(),
            orientation: Quat::identity(),
            filter: CollisionFilter::default(),
            collision_response: true,
            material: None,
        }
    }

    /// Set the placement relative to the body
    #[must_use]
    pub const fn with_transform(mut self, offset: Vec3, orientation: Quat) -> Self {
        self.offset = offset;
        self.orientation = orientation;
        self
    }

    /// Set the collision filter
    #[must_use]
    pub const fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the material
    #[must_use]
    pub const fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Placement relative to the body
    pub const fn local_transform(&self) -> Transform {
        Transform::new(self.offset, self.orientation)
    }
}

/// Rigid body
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) id: u32,
    body_type: BodyType,

    mass: f64,
    inv_mass: f64,
    pub(crate) inv_mass_solve: f64,
    inertia: Vec3,
    inv_inertia: Vec3,
    inv_inertia_world: Mat3,
    pub(crate) inv_inertia_world_solve: Mat3,
    fixed_rotation: bool,

    /// Position of the center of mass
    pub position: Vec3,
    /// Position before the last integration
    pub previous_position: Vec3,
    /// Position interpolated for rendering
    pub interpolated_position: Vec3,
    /// Position at creation
    pub init_position: Vec3,
    /// Orientation
    pub orientation: Quat,
    /// Orientation before the last integration
    pub previous_orientation: Quat,
    /// Orientation interpolated for rendering
    pub interpolated_orientation: Quat,
    /// Linear velocity
    pub velocity: Vec3,
    /// Angular velocity in world space
    pub angular_velocity: Vec3,
    /// Accumulated force, cleared every step
    pub force: Vec3,
    /// Accumulated torque, cleared every step
    pub torque: Vec3,

    /// Per-axis multiplier on linear motion (0 locks an axis)
    pub linear_factor: Vec3,
    /// Per-axis multiplier on angular motion
    pub angular_factor: Vec3,
    /// Fraction of linear velocity lost per second
    pub linear_damping: f64,
    /// Fraction of angular velocity lost per second
    pub angular_damping: f64,

    /// Body-level collision filter
    pub filter: CollisionFilter,
    /// Whether contacts produce a response
    pub collision_response: bool,
    /// Body material
    pub material: Option<MaterialId>,

    shapes: Vec<BodyShape>,
    bounding_radius: f64,
    aabb: Aabb,
    aabb_needs_update: bool,

    /// Whether the body may fall asleep
    pub allow_sleep: bool,
    sleep_state: SleepState,
    /// Speed under which the body counts as slow
    pub sleep_speed_limit: f64,
    /// Seconds a body has to stay slow before sleeping
    pub sleep_time_limit: f64,
    time_last_sleepy: f64,
    pub(crate) wake_up_after_narrowphase: bool,

    pub(crate) vlambda: Vec3,
    pub(crate) wlambda: Vec3,
}

impl Body {
    /// Create a body; zero mass makes it static
    pub fn new(mass: f64) -> Self {
        let mass = if mass.is_finite() { mass.max(0.0) } else { 0.0 };
        let mut body = Self {
            id: 0,
            body_type: if mass > 0.0 { BodyType::Dynamic } else { BodyType::Static },
            mass,
            inv_mass: 0.0,
            inv_mass_solve: 0.0,
            inertia: Vec3::zeros(),
            inv_inertia: Vec3::zeros(),
            inv_inertia_world: Mat3::zeros(),
            inv_inertia_world_solve: Mat3::zeros(),
            fixed_rotation: false,
            position: Vec3::zeros(),
            previous_position: Vec3::zeros(),
            interpolated_position: Vec3::zeros(),
            init_position: Vec3::zeros(),
            orientation: Quat::identity(),
            previous_orientation: Quat::identity(),
            interpolated_orientation: Quat::identity(),
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            force: Vec3::zeros(),
            torque: Vec3::zeros(),
            linear_factor: Vec3::repeat(1.0),
            angular_factor: Vec3::repeat(1.0),
            linear_damping: 0.01,
            angular_damping: 0.01,
            filter: CollisionFilter::default(),
            collision_response: true,
            material: None,
            shapes: Vec::new(),
            bounding_radius: 0.0,
            aabb: Aabb::default(),
            aabb_needs_update: true,
            allow_sleep: true,
            sleep_state: SleepState::Awake,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            time_last_sleepy: 0.0,
            wake_up_after_narrowphase: false,
            vlambda: Vec3::zeros(),
            wlambda: Vec3::zeros(),
        };
        body.update_mass_properties();
        body
    }

    /// Create a static body
    pub fn fixed() -> Self {
        Self::new(0.0)
    }

    /// Create a kinematic body
    pub fn kinematic() -> Self {
        Self::new(0.0).with_body_type(BodyType::Kinematic)
    }

    /// Place the body
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self.previous_position = position;
        self.interpolated_position = position;
        self.init_position = position;
        self.aabb_needs_update = true;
        self
    }

    /// Orient the body
    #[must_use]
    pub fn with_orientation(mut self, orientation: Quat) -> Self {
        self.orientation = orientation;
        self.previous_orientation = orientation;
        self.interpolated_orientation = orientation;
        self.aabb_needs_update = true;
        self.update_inertia_world(true);
        self
    }

    /// Set the linear velocity
    #[must_use]
    pub const fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the angular velocity
    #[must_use]
    pub const fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Attach a shape at the body origin
    #[must_use]
    pub fn with_shape(mut self, shape: impl Into<Arc<Shape>>) -> Self {
        self.add_shape(BodyShape::new(shape));
        self
    }

    /// Attach a shape with an offset and orientation
    #[must_use]
    pub fn with_shape_at(mut self, shape: impl Into<Arc<Shape>>, offset: Vec3, orientation: Quat) -> Self {
        self.add_shape(BodyShape::new(shape).with_transform(offset, orientation));
        self
    }

    /// Change the body type
    #[must_use]
    pub fn with_body_type(mut self, body_type: BodyType) -> Self {
        self.set_body_type(body_type);
        self
    }

    /// Set the body material
    #[must_use]
    pub const fn with_material(mut self, material: MaterialId) -> Self {
        self.material = Some(material);
        self
    }

    /// Set damping
    #[must_use]
    pub const fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Set the collision filter
    #[must_use]
    pub const fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Lock rotation
    #[must_use]
    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self.update_mass_properties();
        self
    }

    /// Configure sleeping
    #[must_use]
    pub const fn with_sleep(mut self, allow: bool, speed_limit: f64, time_limit: f64) -> Self {
        self.allow_sleep = allow;
        self.sleep_speed_limit = speed_limit;
        self.sleep_time_limit = time_limit;
        self
    }

    /// Identifier assigned by the world (0 before insertion)
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Body type
    pub const fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Mass (0 for static bodies)
    pub const fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass
    pub const fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Inverse mass seen by the solver
    pub const fn inv_mass_solve(&self) -> f64 {
        self.inv_mass_solve
    }

    /// Diagonal of the local inertia tensor
    pub const fn inertia(&self) -> &Vec3 {
        &self.inertia
    }

    /// Diagonal of the inverse local inertia tensor
    pub const fn inv_inertia(&self) -> &Vec3 {
        &self.inv_inertia
    }

    /// Inverse inertia tensor in world space
    pub const fn inv_inertia_world(&self) -> &Mat3 {
        &self.inv_inertia_world
    }

    /// Inverse world inertia seen by the solver
    pub const fn inv_inertia_world_solve(&self) -> &Mat3 {
        &self.inv_inertia_world_solve
    }

    /// Whether rotation is locked
    pub const fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    /// Attached shapes
    pub fn shapes(&self) -> &[BodyShape] {
        &self.shapes
    }

    /// Bounding sphere radius around the body origin
    pub const fn bounding_radius(&self) -> f64 {
        self.bounding_radius
    }

    /// Cached world bounding box, refreshed by [`Body::update_aabb`]
    pub const fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Whether the cached box is stale
    pub const fn aabb_needs_update(&self) -> bool {
        self.aabb_needs_update
    }

    /// Current sleep state
    pub const fn sleep_state(&self) -> SleepState {
        self.sleep_state
    }

    /// Whether the body is sleeping
    pub fn is_sleeping(&self) -> bool {
        self.sleep_state == SleepState::Sleeping
    }

    /// Whether the body is awake
    pub fn is_awake(&self) -> bool {
        self.sleep_state == SleepState::Awake
    }

    /// Whether the body is dynamic
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    /// Rigid transform of the body
    pub const fn transform(&self) -> Transform {
        Transform::new(self.position, self.orientation)
    }

    /// World transform of one attached shape
    pub fn shape_transform(&self, index: usize) -> Option<Transform> {
        self.shapes
            .get(index)
            .map(|s| self.transform().combine(&s.local_transform()))
    }

    /// Attach a shape and refresh derived properties
    pub fn add_shape(&mut self, shape: BodyShape) {
        self.shapes.push(shape);
        self.shapes_changed();
    }

    /// Edit shape geometry in place; derived properties are refreshed afterwards.
    ///
    /// Geometry shared with other bodies is cloned first.
    pub fn modify_shape<R>(&mut self, index: usize, edit: impl FnOnce(&mut Shape) -> R) -> Option<R> {
        let result = self.shapes.get_mut(index).map(|s| edit(Arc::make_mut(&mut s.shape)))?;
        self.shapes_changed();
        Some(result)
    }

    fn shapes_changed(&mut self) {
        self.update_mass_properties();
        self.update_bounding_radius();
        self.aabb_needs_update = true;
    }

    /// Change the body type and refresh solve masses
    pub fn set_body_type(&mut self, body_type: BodyType) {
        self.body_type = body_type;
        self.update_solve_mass_properties();
    }

    /// Change the mass; zero turns a dynamic body static and vice versa
    pub fn set_mass(&mut self, mass: f64) -> PhysicsResult<()> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::InvalidMass(mass));
        }
        self.mass = mass;
        match self.body_type {
            BodyType::Dynamic if mass == 0.0 => self.body_type = BodyType::Static,
            BodyType::Static if mass > 0.0 => self.body_type = BodyType::Dynamic,
            _ => {}
        }
        self.update_mass_properties();
        Ok(())
    }

    /// Recompute inverse mass and inertia from the attached shapes.
    ///
    /// A single centered shape uses its own inertia; anything else uses the
    /// box spanned by the shapes in body space.
    pub fn update_mass_properties(&mut self) {
        self.inv_mass = if self.mass > 0.0 { 1.0 / self.mass } else { 0.0 };
        self.inertia = match self.shapes.as_slice() {
            [] => Vec3::zeros(),
            [single] if single.offset == Vec3::zeros() && single.orientation == Quat::identity() => {
                single.shape.local_inertia(self.mass)
            }
            _ => {
                let local = self.local_aabb();
                box_inertia(&local.extents(), self.mass)
            }
        };
        let fixed = self.fixed_rotation;
        self.inv_inertia = self.inertia.map(|i| if i > 0.0 && !fixed { 1.0 / i } else { 0.0 });
        self.update_inertia_world(true);
    }

    fn local_aabb(&self) -> Aabb {
        let mut boxes = self
            .shapes
            .iter()
            .filter(|s| s.shape.bounding_radius().is_finite())
            .map(|s| s.shape.world_aabb(&s.local_transform()));
        let mut aabb = boxes.next().unwrap_or_default();
        for b in boxes {
            aabb.extend(&b);
        }
        aabb
    }

    /// Recompute the bounding sphere radius
    pub fn update_bounding_radius(&mut self) {
        self.bounding_radius = self
            .shapes
            .iter()
            .map(|s| s.offset.norm() + s.shape.bounding_radius())
            .fold(0.0, f64::max);
    }

    /// Recompute the world box from the shapes
    pub fn update_aabb(&mut self) {
        let transform = self.transform();
        let mut boxes = self
            .shapes
            .iter()
            .map(|s| s.shape.world_aabb(&transform.combine(&s.local_transform())));
        let mut aabb = boxes.next().unwrap_or_else(|| Aabb::new(self.position, self.position));
        for b in boxes {
            aabb.extend(&b);
        }
        self.aabb = aabb;
        self.aabb_needs_update = false;
    }

    /// Rotate the inverse inertia into world space; isotropic tensors are
    /// skipped unless `force` is set
    pub fn update_inertia_world(&mut self, force: bool) {
        let i = &self.inv_inertia;
        if force || i.x != i.y || i.y != i.z {
            self.inv_inertia_world = rotate_diagonal(i, &self.orientation);
        }
        self.update_solve_mass_properties();
    }

    /// Refresh what the solver sees as mass
    pub fn update_solve_mass_properties(&mut self) {
        if self.sleep_state == SleepState::Sleeping || self.body_type != BodyType::Dynamic {
            self.inv_mass_solve = 0.0;
            self.inv_inertia_world_solve = Mat3::zeros();
        } else {
            self.inv_mass_solve = self.inv_mass;
            self.inv_inertia_world_solve = self.inv_inertia_world;
        }
    }

    /// Apply a world force at a point relative to the center of mass.
    ///
    /// A sleeping body wakes up; the returned transition lets the caller
    /// report it. `World::apply_force` queues it as an event.
    pub fn apply_force(&mut self, force: &Vec3, relative_point: &Vec3) -> Option<SleepTransition> {
        if self.body_type != BodyType::Dynamic {
            return None;
        }
        let transition = self.wake_up_if_sleeping();
        self.force += force;
        self.torque += relative_point.cross(force);
        transition
    }

    /// Apply a body-space force at a body-space point
    pub fn apply_local_force(&mut self, local_force: &Vec3, local_point: &Vec3) -> Option<SleepTransition> {
        let force = self.vector_to_world_frame(local_force);
        let point = self.vector_to_world_frame(local_point);
        self.apply_force(&force, &point)
    }

    /// Apply a world torque
    pub fn apply_torque(&mut self, torque: &Vec3) -> Option<SleepTransition> {
        if self.body_type != BodyType::Dynamic {
            return None;
        }
        let transition = self.wake_up_if_sleeping();
        self.torque += torque;
        transition
    }

    /// Apply a world impulse at a point relative to the center of mass
    pub fn apply_impulse(&mut self, impulse: &Vec3, relative_point: &Vec3) -> Option<SleepTransition> {
        if self.body_type != BodyType::Dynamic {
            return None;
        }
        let transition = self.wake_up_if_sleeping();
        self.velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia_world * relative_point.cross(impulse);
        transition
    }

    /// Apply a body-space impulse at a body-space point
    pub fn apply_local_impulse(&mut self, local_impulse: &Vec3, local_point: &Vec3) -> Option<SleepTransition> {
        let impulse = self.vector_to_world_frame(local_impulse);
        let point = self.vector_to_world_frame(local_point);
        self.apply_impulse(&impulse, &point)
    }

    fn wake_up_if_sleeping(&mut self) -> Option<SleepTransition> {
        if self.sleep_state == SleepState::Sleeping {
            self.wake_up()
        } else {
            None
        }
    }

    /// Velocity of a world point attached to the body
    pub fn velocity_at_world_point(&self, world_point: &Vec3) -> Vec3 {
        self.velocity + self.angular_velocity.cross(&(world_point - self.position))
    }

    /// World point into body space
    pub fn point_to_local_frame(&self, world_point: &Vec3) -> Vec3 {
        self.transform().point_to_local(world_point)
    }

    /// Body-space point into world space
    pub fn point_to_world_frame(&self, local_point: &Vec3) -> Vec3 {
        self.transform().point_to_world(local_point)
    }

    /// World direction into body space
    pub fn vector_to_local_frame(&self, world_vector: &Vec3) -> Vec3 {
        self.orientation.inverse_transform_vector(world_vector)
    }

    /// Body-space direction into world space
    pub fn vector_to_world_frame(&self, local_vector: &Vec3) -> Vec3 {
        self.orientation * local_vector
    }

    /// Wake the body. Returns [`SleepTransition::WakeUp`] if it was sleeping.
    pub fn wake_up(&mut self) -> Option<SleepTransition> {
        let was = self.sleep_state;
        self.sleep_state = SleepState::Awake;
        self.wake_up_after_narrowphase = false;
        if was == SleepState::Sleeping {
            self.update_solve_mass_properties();
            Some(SleepTransition::WakeUp)
        } else {
            None
        }
    }

    /// Put the body to sleep and stop it
    pub fn sleep(&mut self) {
        self.sleep_state = SleepState::Sleeping;
        self.velocity = Vec3::zeros();
        self.angular_velocity = Vec3::zeros();
        self.wake_up_after_narrowphase = false;
        self.update_solve_mass_properties();
    }

    /// Advance the sleep state machine at simulation time `time`
    pub fn sleep_tick(&mut self, time: f64) -> Option<SleepTransition> {
        if !self.allow_sleep {
            return None;
        }
        let speed_squared = self.velocity.norm_squared() + self.angular_velocity.norm_squared();
        let limit_squared = self.sleep_speed_limit * self.sleep_speed_limit;
        match self.sleep_state {
            SleepState::Awake if speed_squared < limit_squared => {
                self.sleep_state = SleepState::Sleepy;
                self.time_last_sleepy = time;
                Some(SleepTransition::Sleepy)
            }
            SleepState::Sleepy if speed_squared > limit_squared => self.wake_up(),
            SleepState::Sleepy if time - self.time_last_sleepy > self.sleep_time_limit => {
                self.sleep();
                Some(SleepTransition::Sleep)
            }
            _ => None,
        }
    }

    /// Semi-implicit Euler step
    pub fn integrate(&mut self, dt: f64, normalize_quat: bool, fast_normalize: bool) {
        self.previous_position = self.position;
        self.previous_orientation = self.orientation;

        if self.body_type == BodyType::Static || self.sleep_state == SleepState::Sleeping {
            return;
        }

        if self.body_type == BodyType::Dynamic {
            let i_m_dt = self.inv_mass * dt;
            self.velocity += self.force.component_mul(&self.linear_factor) * i_m_dt;
            let angular = self.inv_inertia_world * self.torque;
            self.angular_velocity += angular.component_mul(&self.angular_factor) * dt;
        }

        self.position += self.velocity * dt;

        let q = integrate_quat(self.orientation.quaternion(), &self.angular_velocity, &self.angular_factor, dt);
        self.orientation = if !normalize_quat {
            // Drift is corrected by the next normalized step
            Unit::new_unchecked(q)
        } else if fast_normalize {
            normalize_fast(&q)
        } else {
            normalize_exact(&q)
        };

        self.aabb_needs_update = true;
        self.update_inertia_world(false);
    }

    /// Clear accumulated force and torque
    pub fn clear_forces(&mut self) {
        self.force = Vec3::zeros();
        self.torque = Vec3::zeros();
    }
}
