//! Narrow-phase contact generation
//!
//! For every candidate body pair the narrowphase walks the shape pairs, runs
//! the matching geometry routine and turns the resulting points into contact
//! and friction equations.
//!
//! Geometry routines write world-space [`ContactPoint`]s whose normal points
//! out of the first shape. A pair is always dispatched with the lower
//! [`ShapeKind`] first; when the caller's order is the other way round the
//! points are flipped back. Compounds are unpacked before dispatch.

mod convex;
mod mesh;
mod particle;
mod sphere;
mod terrain;

pub use convex::{CLIP_MAX_DEPTH, CLIP_MIN_DEPTH, MAX_PLANE_CONTACTS};

use crate::body::{Body, BodyType};
use crate::broadphase::BodyPair;
use crate::equations::{ContactRow, Equation, FrictionRow, DEFAULT_MAX_FORCE};
use crate::foundation::collections::{BodyHandle, BodySet};
use crate::foundation::logging::{trace, warn};
use crate::foundation::math::{tangents, Transform, Vec3};
use crate::material::{MaterialLibrary, ResolvedContact};
use crate::shapes::{Shape, ShapeKind};
use std::collections::HashSet;

/// One point of contact between two shapes, in world space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactPoint {
    /// Point on the surface of the first shape
    pub point_a: Vec3,
    /// Point on the surface of the second shape
    pub point_b: Vec3,
    /// Unit normal pointing out of the first shape
    pub normal: Vec3,
}

impl ContactPoint {
    /// Create a contact point
    pub const fn new(point_a: Vec3, point_b: Vec3, normal: Vec3) -> Self {
        Self {
            point_a,
            point_b,
            normal,
        }
    }

    /// The same contact seen from the other shape
    #[must_use]
    pub fn flipped(&self) -> Self {
        Self::new(self.point_b, self.point_a, -self.normal)
    }

    /// Signed separation along the normal, negative when penetrating
    pub fn depth(&self) -> f64 {
        (self.point_b - self.point_a).dot(&self.normal)
    }
}

/// Shape pair that touched during the last step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeOverlap {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Shape index on the first body
    pub shape_a: usize,
    /// Shape index on the second body
    pub shape_b: usize,
}

/// Whether a contact routine exists for a kind pair (in either order)
pub const fn is_supported_pair(a: ShapeKind, b: ShapeKind) -> bool {
    let (low, high) = if a.value() <= b.value() { (a, b) } else { (b, a) };
    !matches!(
        (low, high),
        (ShapeKind::Plane, ShapeKind::Plane | ShapeKind::Heightfield)
            | (
                ShapeKind::Heightfield,
                ShapeKind::Heightfield | ShapeKind::Particle | ShapeKind::Trimesh
            )
            | (ShapeKind::Particle, ShapeKind::Particle | ShapeKind::Trimesh)
            | (ShapeKind::Trimesh, ShapeKind::Trimesh)
    )
}

/// Whether `point` lies inside a convex polygon, seen along `normal`.
/// Points on the boundary count as inside.
fn point_in_polygon(polygon: &[Vec3], normal: &Vec3, point: &Vec3) -> bool {
    let mut positive = false;
    let mut negative = false;
    for (i, v) in polygon.iter().enumerate() {
        let next = polygon[(i + 1) % polygon.len()];
        let side = (next - v).cross(&(point - v)).dot(normal);
        if side > 0.0 {
            positive = true;
        } else if side < 0.0 {
            negative = true;
        }
        if positive && negative {
            return false;
        }
    }
    true
}

/// Whether the points of a pair may be merged into one friction pair
fn friction_reducible(a: ShapeKind, b: ShapeKind) -> bool {
    let hull_or_plane = |k: ShapeKind| k.is_convex_hull() || k == ShapeKind::Plane;
    hull_or_plane(a) && hull_or_plane(b) && (a.is_convex_hull() || b.is_convex_hull())
}

/// Both bodies and everything the equations of a shape pair share
struct PairFrame<'a> {
    handles: BodyPair,
    bodies: (&'a Body, &'a Body),
    resolved: ResolvedContact,
    enabled: bool,
    dt: f64,
    gravity_length: f64,
}

fn allocate_id(next_id: &mut u64) -> u64 {
    let id = *next_id;
    *next_id += 1;
    id
}

/// Contact generator
#[derive(Debug, Clone, Default)]
pub struct Narrowphase {
    friction_reduction: bool,
    contacts: Vec<Equation>,
    frictions: Vec<Equation>,
    overlaps: Vec<ShapeOverlap>,
    points: Vec<ContactPoint>,
    triangles: Vec<usize>,
    warned: HashSet<(ShapeKind, ShapeKind)>,
}

impl Narrowphase {
    /// Create a narrowphase with one friction pair per contact point
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the friction of hull contacts into one averaged pair per shape pair
    #[must_use]
    pub const fn with_friction_reduction(mut self, enabled: bool) -> Self {
        self.friction_reduction = enabled;
        self
    }

    /// Whether friction reduction is on
    pub const fn friction_reduction(&self) -> bool {
        self.friction_reduction
    }

    /// Turn friction reduction on or off
    pub fn set_friction_reduction(&mut self, enabled: bool) {
        self.friction_reduction = enabled;
    }

    /// Contact rows of the last pass
    pub fn contacts(&self) -> &[Equation] {
        &self.contacts
    }

    /// Friction rows of the last pass
    pub fn frictions(&self) -> &[Equation] {
        &self.frictions
    }

    /// Shape pairs that produced points in the last pass
    pub fn overlaps(&self) -> &[ShapeOverlap] {
        &self.overlaps
    }

    /// Move the contact and friction rows out
    pub fn take_equations(&mut self) -> (Vec<Equation>, Vec<Equation>) {
        (std::mem::take(&mut self.contacts), std::mem::take(&mut self.frictions))
    }

    /// Drop the output of the last pass
    pub fn clear(&mut self) {
        self.contacts.clear();
        self.frictions.clear();
        self.overlaps.clear();
    }

    /// Generate the equations of one step.
    ///
    /// Pairs between a kinematic body and a static or kinematic one only
    /// register their overlaps. Equation ids are drawn from `next_id`.
    pub fn get_contacts(
        &mut self,
        pairs: &[BodyPair],
        bodies: &BodySet,
        materials: &MaterialLibrary,
        dt: f64,
        gravity: &Vec3,
        next_id: &mut u64,
    ) {
        self.clear();
        let gravity_length = gravity.norm();

        for &(hi, hj) in pairs {
            let (Some(bi), Some(bj)) = (bodies.get(hi), bodies.get(hj)) else {
                continue;
            };
            let just_test = matches!(
                (bi.body_type(), bj.body_type()),
                (BodyType::Kinematic, BodyType::Static | BodyType::Kinematic)
                    | (BodyType::Static, BodyType::Kinematic)
            );

            for (index_a, sa) in bi.shapes().iter().enumerate() {
                let ta = bi.transform().combine(&sa.local_transform());
                for (index_b, sb) in bj.shapes().iter().enumerate() {
                    if !sa.filter.interacts_with(&sb.filter) {
                        continue;
                    }
                    let tb = bj.transform().combine(&sb.local_transform());
                    if (tb.position - ta.position).norm() > sa.shape.bounding_radius() + sb.shape.bounding_radius() {
                        continue;
                    }

                    let mut points = std::mem::take(&mut self.points);
                    points.clear();
                    self.collide(&sa.shape, &ta, &sb.shape, &tb, &mut points);

                    if !points.is_empty() {
                        self.overlaps.push(ShapeOverlap {
                            body_a: hi,
                            body_b: hj,
                            shape_a: index_a,
                            shape_b: index_b,
                        });
                        if !just_test {
                            let frame = PairFrame {
                                handles: (hi, hj),
                                bodies: (bi, bj),
                                resolved: materials.resolve_layered((sa.material, sb.material), (bi.material, bj.material)),
                                enabled: bi.collision_response
                                    && bj.collision_response
                                    && sa.collision_response
                                    && sb.collision_response,
                                dt,
                                gravity_length,
                            };
                            let reduce =
                                self.friction_reduction && friction_reducible(sa.shape.kind(), sb.shape.kind());
                            self.add_equations(&frame, &points, reduce, next_id);
                        }
                    }
                    self.points = points;
                }
            }
        }

        trace!(
            "Narrowphase: {} contacts, {} friction rows, {} shape overlaps",
            self.contacts.len(),
            self.frictions.len(),
            self.overlaps.len()
        );
    }

    /// Contact points between two placed shapes, appended to `out`.
    ///
    /// Normals point out of `a`. Unsupported pairs produce nothing and are
    /// logged once per kind pair.
    pub fn collide(&mut self, a: &Shape, ta: &Transform, b: &Shape, tb: &Transform, out: &mut Vec<ContactPoint>) {
        if let Shape::Compound(compound) = a {
            for child in compound.children() {
                let tc = ta.combine(&child.transform);
                if (tb.position - tc.position).norm() <= child.shape.bounding_radius() + b.bounding_radius() {
                    self.collide(&child.shape, &tc, b, tb, out);
                }
            }
            return;
        }
        if let Shape::Compound(compound) = b {
            for child in compound.children() {
                let tc = tb.combine(&child.transform);
                if (tc.position - ta.position).norm() <= a.bounding_radius() + child.shape.bounding_radius() {
                    self.collide(a, ta, &child.shape, &tc, out);
                }
            }
            return;
        }

        let (kind_a, kind_b) = (a.kind(), b.kind());
        if !is_supported_pair(kind_a, kind_b) {
            self.warn_unsupported(kind_a, kind_b);
            return;
        }
        if kind_a.value() <= kind_b.value() {
            self.dispatch(a, ta, b, tb, out);
        } else {
            let start = out.len();
            self.dispatch(b, tb, a, ta, out);
            flip(&mut out[start..]);
        }
    }

    fn warn_unsupported(&mut self, a: ShapeKind, b: ShapeKind) {
        let key = if a <= b { (a, b) } else { (b, a) };
        if self.warned.insert(key) {
            warn!("No contact routine for {:?} against {:?}; the pair is ignored", key.0, key.1);
        }
    }

    /// Run the routine of an ordered pair (`a` has the lower kind)
    fn dispatch(&mut self, a: &Shape, ta: &Transform, b: &Shape, tb: &Transform, out: &mut Vec<ContactPoint>) {
        match (a, b) {
            (Shape::Sphere(s), Shape::Sphere(o)) => sphere::sphere_sphere(s, ta, o, tb, out),
            (Shape::Sphere(s), Shape::Plane) => sphere::sphere_plane(s, ta, tb, out),
            (Shape::Sphere(s), Shape::Box(cuboid)) => sphere::sphere_box(s, ta, cuboid, tb, out),
            (Shape::Sphere(s), Shape::Heightfield(field)) => terrain::sphere_heightfield(s, ta, field, tb, out),
            (Shape::Sphere(s), Shape::Particle) => particle::sphere_particle(s, ta, tb, out),
            (Shape::Sphere(s), Shape::Trimesh(mesh)) => {
                mesh::sphere_trimesh(s, ta, mesh, tb, &mut self.triangles, out);
            }
            (Shape::Sphere(s), other) => {
                if let Some(hull) = other.convex_hull() {
                    sphere::sphere_convex(s, ta, hull, tb, out);
                }
            }
            (Shape::Plane, Shape::Particle) => particle::plane_particle(ta, tb, out),
            (Shape::Plane, Shape::Trimesh(mesh)) => mesh::plane_trimesh(ta, mesh, tb, out),
            (Shape::Plane, other) => {
                if let Some(hull) = other.convex_hull() {
                    convex::plane_convex(ta, hull, tb, out);
                }
            }
            // Kinds ordered before a cylinder but handled hull-first
            (Shape::Heightfield(field), other) => {
                if let Some(hull) = other.convex_hull() {
                    let start = out.len();
                    terrain::convex_heightfield(hull, tb, field, ta, out);
                    flip(&mut out[start..]);
                }
            }
            (Shape::Particle, other) => {
                if let Some(hull) = other.convex_hull() {
                    let start = out.len();
                    particle::convex_particle(hull, tb, ta, out);
                    flip(&mut out[start..]);
                }
            }
            (first, Shape::Heightfield(field)) => {
                if let Some(hull) = first.convex_hull() {
                    terrain::convex_heightfield(hull, ta, field, tb, out);
                }
            }
            (first, Shape::Particle) => {
                if let Some(hull) = first.convex_hull() {
                    particle::convex_particle(hull, ta, tb, out);
                }
            }
            (first, Shape::Trimesh(mesh)) => {
                if let Some(hull) = first.convex_hull() {
                    mesh::convex_trimesh(hull, ta, mesh, tb, &mut self.triangles, out);
                }
            }
            (first, second) => {
                if let (Some(ha), Some(hb)) = (first.convex_hull(), second.convex_hull()) {
                    convex::convex_convex(ha, ta, hb, tb, out);
                }
            }
        }
    }

    fn add_equations(&mut self, frame: &PairFrame<'_>, points: &[ContactPoint], reduce: bool, next_id: &mut u64) {
        let (bi, bj) = frame.bodies;
        let params = &frame.resolved.params;
        let first = self.contacts.len();

        for point in points {
            let row = ContactRow {
                ri: point.point_a - bi.position,
                rj: point.point_b - bj.position,
                ni: point.normal,
                restitution: frame.resolved.restitution,
            };
            let mut eq = Equation::contact(frame.handles.0, frame.handles.1, row, DEFAULT_MAX_FORCE);
            eq.set_spook_params(
                params.contact_equation_stiffness,
                params.contact_equation_relaxation,
                frame.dt,
            );
            eq.enabled = frame.enabled;
            eq.id = allocate_id(next_id);
            self.contacts.push(eq);
        }

        if frame.resolved.friction <= 0.0 {
            return;
        }

        if reduce && points.len() > 1 {
            let count = points.len() as f64;
            let rows: Vec<ContactRow> = self.contacts[first..].iter().filter_map(|eq| eq.as_contact().copied()).collect();
            let ri = rows.iter().map(|row| row.ri).sum::<Vec3>() / count;
            let rj = rows.iter().map(|row| row.rj).sum::<Vec3>() / count;
            let normal = rows
                .iter()
                .map(|row| row.ni)
                .sum::<Vec3>()
                .try_normalize(f64::EPSILON)
                .unwrap_or(points[0].normal);
            self.add_friction_pair(frame, ri, rj, &normal, None, next_id);
            return;
        }

        for k in first..self.contacts.len() {
            let id = self.contacts[k].id;
            if let Some(row) = self.contacts[k].as_contact().copied() {
                self.add_friction_pair(frame, row.ri, row.rj, &row.ni, Some(id), next_id);
            }
        }
    }

    fn add_friction_pair(
        &mut self,
        frame: &PairFrame<'_>,
        ri: Vec3,
        rj: Vec3,
        normal: &Vec3,
        contact_id: Option<u64>,
        next_id: &mut u64,
    ) {
        let (bi, bj) = frame.bodies;
        let params = &frame.resolved.params;
        let inv_mass_sum = bi.inv_mass() + bj.inv_mass();
        let reduced_mass = if inv_mass_sum > 0.0 { 1.0 / inv_mass_sum } else { 0.0 };
        let mu = frame.resolved.friction;
        let slip_force = mu * frame.gravity_length * reduced_mass;

        let (t1, t2) = tangents(normal);
        for t in [t1, t2] {
            let row = FrictionRow {
                ri,
                rj,
                t,
                mu,
                contact_id,
            };
            let mut eq = Equation::friction(frame.handles.0, frame.handles.1, row, slip_force);
            eq.set_spook_params(
                params.friction_equation_stiffness,
                params.friction_equation_relaxation,
                frame.dt,
            );
            eq.enabled = frame.enabled;
            eq.id = allocate_id(next_id);
            self.frictions.push(eq);
        }
    }
}

fn flip(points: &mut [ContactPoint]) {
    for point in points {
        *point = point.flipped();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::BodyShape;
    use crate::collision::{CollisionFilter, CollisionGroups};
    use crate::equations::EquationKind;
    use crate::shapes::CompoundChild;
    use approx::assert_relative_eq;
    use std::sync::Arc;

    const DT: f64 = 1.0 / 60.0;

    fn gravity() -> Vec3 {
        Vec3::new(0.0, 0.0, -9.82)
    }

    fn resting_box(bodies: &mut BodySet) -> (BodyHandle, BodyHandle) {
        let ground = bodies.insert(Body::fixed().with_shape(Shape::Plane));
        let cube = bodies.insert(
            Body::new(1.0)
                .with_shape(Shape::cuboid(Vec3::repeat(0.5)).unwrap())
                .with_position(Vec3::new(0.0, 0.0, 0.49)),
        );
        (ground, cube)
    }

    fn run(narrowphase: &mut Narrowphase, bodies: &BodySet, pairs: &[BodyPair]) -> u64 {
        let mut next_id = 0;
        narrowphase.get_contacts(pairs, bodies, &MaterialLibrary::default(), DT, &gravity(), &mut next_id);
        next_id
    }

    #[test]
    fn test_supported_pairs() {
        assert!(is_supported_pair(ShapeKind::Sphere, ShapeKind::Trimesh));
        assert!(is_supported_pair(ShapeKind::Cylinder, ShapeKind::Heightfield));
        assert!(is_supported_pair(ShapeKind::Compound, ShapeKind::Plane));
        assert!(!is_supported_pair(ShapeKind::Plane, ShapeKind::Plane));
        assert!(!is_supported_pair(ShapeKind::Trimesh, ShapeKind::Heightfield));
        assert!(!is_supported_pair(ShapeKind::Trimesh, ShapeKind::Particle));
    }

    #[test]
    fn test_swapped_order_flips_output() {
        let mut narrowphase = Narrowphase::new();
        let sphere = Shape::sphere(1.0).unwrap();
        let ts = Transform::from_position(Vec3::new(0.0, 0.0, 0.9));
        let tp = Transform::default();

        let mut forward = Vec::new();
        narrowphase.collide(&sphere, &ts, &Shape::Plane, &tp, &mut forward);
        let mut backward = Vec::new();
        narrowphase.collide(&Shape::Plane, &tp, &sphere, &ts, &mut backward);

        assert_eq!(forward.len(), 1);
        assert_eq!(backward.len(), 1);
        assert_relative_eq!(forward[0].normal, -Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(backward[0].normal, Vec3::z(), epsilon = 1e-12);
        assert_relative_eq!(backward[0].point_a, forward[0].point_b, epsilon = 1e-12);
        assert_relative_eq!(backward[0].point_b, forward[0].point_a, epsilon = 1e-12);
    }

    #[test]
    fn test_cylinder_on_heightfield_normal_points_out_of_first_shape() {
        let mut narrowphase = Narrowphase::new();
        let field = Shape::heightfield(vec![vec![0.0; 5]; 5], 1.0).unwrap();
        let cylinder = Shape::cylinder(0.5, 0.5, 1.0, 8).unwrap();
        let tc = Transform::from_position(Vec3::new(2.0, 2.0, 0.48));

        let mut out = Vec::new();
        narrowphase.collide(&field, &Transform::default(), &cylinder, &tc, &mut out);
        assert!(!out.is_empty());
        assert!(out.iter().all(|p| p.normal.z > 0.99));
    }

    #[test]
    fn test_unsupported_pair_warns_once() {
        let mut narrowphase = Narrowphase::new();
        let field = Shape::heightfield(vec![vec![0.0; 3]; 3], 1.0).unwrap();
        let t = Transform::default();
        let mut out = Vec::new();
        narrowphase.collide(&Shape::Plane, &t, &Shape::Plane, &t, &mut out);
        narrowphase.collide(&Shape::Plane, &t, &Shape::Plane, &t, &mut out);
        narrowphase.collide(&field, &t, &Shape::Plane, &t, &mut out);
        assert!(out.is_empty());
        assert_eq!(narrowphase.warned.len(), 2);
    }

    #[test]
    fn test_compound_children_collide_separately() {
        let ball = Arc::new(Shape::sphere(0.5).unwrap());
        let compound = Shape::compound(vec![
            CompoundChild {
                shape: Arc::clone(&ball),
                transform: Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)),
            },
            CompoundChild {
                shape: ball,
                transform: Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            },
        ])
        .unwrap();

        let mut bodies = BodySet::with_key();
        let ground = bodies.insert(Body::fixed().with_shape(Shape::Plane));
        let dumbbell = bodies.insert(
            Body::new(1.0)
                .with_shape(compound)
                .with_position(Vec3::new(0.0, 0.0, 0.4)),
        );
        let mut narrowphase = Narrowphase::new();
        run(&mut narrowphase, &bodies, &[(ground, dumbbell)]);

        assert_eq!(narrowphase.contacts().len(), 2);
        let mut xs: Vec<f64> = narrowphase
            .contacts()
            .iter()
            .map(|eq| {
                let row = eq.as_contact().unwrap();
                assert_relative_eq!(row.ni, Vec3::z(), epsilon = 1e-12);
                row.rj.x
            })
            .collect();
        xs.sort_by(f64::total_cmp);
        assert_relative_eq!(xs[0], -1.0, epsilon = 1e-12);
        assert_relative_eq!(xs[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_box_on_plane_builds_contacts_and_friction() {
        let mut bodies = BodySet::with_key();
        let (ground, cube) = resting_box(&mut bodies);
        let mut narrowphase = Narrowphase::new();
        let next_id = run(&mut narrowphase, &bodies, &[(ground, cube)]);

        assert_eq!(narrowphase.contacts().len(), 4);
        assert_eq!(narrowphase.frictions().len(), 8);
        assert_eq!(next_id, 12);
        assert_eq!(narrowphase.overlaps().len(), 1);

        let contact_ids: Vec<u64> = narrowphase.contacts().iter().map(|eq| eq.id).collect();
        for eq in narrowphase.contacts() {
            let row = eq.as_contact().unwrap();
            assert_eq!((eq.body_i, eq.body_j), (ground, cube));
            assert_relative_eq!(row.ni, Vec3::z(), epsilon = 1e-12);
            assert_relative_eq!(row.rj.z, -0.5, epsilon = 1e-12);
            assert_relative_eq!(row.ri.z, 0.0, epsilon = 1e-12);
            assert!(eq.enabled);
        }
        for eq in narrowphase.frictions() {
            let EquationKind::Friction(row) = eq.kind else {
                panic!("expected a friction row");
            };
            assert!(contact_ids.contains(&row.contact_id.unwrap()));
            assert_relative_eq!(row.t.dot(&Vec3::z()), 0.0, epsilon = 1e-12);
            // mu * g * reduced mass, with a static partner
            assert_relative_eq!(eq.max_force, 0.3 * 9.82, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_reversed_body_order_reverses_normals() {
        let mut bodies = BodySet::with_key();
        let (ground, cube) = resting_box(&mut bodies);
        let mut narrowphase = Narrowphase::new();
        run(&mut narrowphase, &bodies, &[(cube, ground)]);

        assert_eq!(narrowphase.contacts().len(), 4);
        for eq in narrowphase.contacts() {
            let row = eq.as_contact().unwrap();
            assert_relative_eq!(row.ni, -Vec3::z(), epsilon = 1e-12);
            assert_relative_eq!(row.ri.z, -0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_friction_reduction_averages_one_pair() {
        let mut bodies = BodySet::with_key();
        let (ground, cube) = resting_box(&mut bodies);
        let mut narrowphase = Narrowphase::new().with_friction_reduction(true);
        run(&mut narrowphase, &bodies, &[(ground, cube)]);

        assert_eq!(narrowphase.contacts().len(), 4);
        assert_eq!(narrowphase.frictions().len(), 2);
        for eq in narrowphase.frictions() {
            let EquationKind::Friction(row) = eq.kind else {
                panic!("expected a friction row");
            };
            assert_eq!(row.contact_id, None);
            assert_relative_eq!(row.rj, Vec3::new(0.0, 0.0, -0.5), epsilon = 1e-12);
        }
    }

    #[test]
    fn test_kinematic_against_static_only_reports_overlap() {
        let mut bodies = BodySet::with_key();
        let ground = bodies.insert(Body::fixed().with_shape(Shape::Plane));
        let platform = bodies.insert(
            Body::kinematic()
                .with_shape(Shape::cuboid(Vec3::repeat(0.5)).unwrap())
                .with_position(Vec3::new(0.0, 0.0, 0.3)),
        );
        let mut narrowphase = Narrowphase::new();
        let next_id = run(&mut narrowphase, &bodies, &[(platform, ground)]);

        assert!(narrowphase.contacts().is_empty());
        assert!(narrowphase.frictions().is_empty());
        assert_eq!(next_id, 0);
        assert_eq!(
            narrowphase.overlaps(),
            &[ShapeOverlap {
                body_a: platform,
                body_b: ground,
                shape_a: 0,
                shape_b: 0
            }]
        );
    }

    #[test]
    fn test_disabled_response_keeps_disabled_rows() {
        let mut bodies = BodySet::with_key();
        let (ground, cube) = resting_box(&mut bodies);
        bodies[cube].collision_response = false;
        let mut narrowphase = Narrowphase::new();
        run(&mut narrowphase, &bodies, &[(ground, cube)]);

        assert_eq!(narrowphase.contacts().len(), 4);
        assert!(narrowphase.contacts().iter().all(|eq| !eq.enabled));
        assert!(narrowphase.frictions().iter().all(|eq| !eq.enabled));
    }

    #[test]
    fn test_shape_filters_are_respected() {
        let mut bodies = BodySet::with_key();
        let ground = bodies.insert(Body::fixed().with_shape(Shape::Plane));
        let mut ghost = Body::new(1.0).with_position(Vec3::new(0.0, 0.0, 0.4));
        ghost.add_shape(
            BodyShape::new(Shape::sphere(0.5).unwrap())
                .with_filter(CollisionFilter::new(CollisionGroups::GROUP_2, CollisionGroups::GROUP_2)),
        );
        let ghost = bodies.insert(ghost);
        let mut narrowphase = Narrowphase::new();
        run(&mut narrowphase, &bodies, &[(ground, ghost)]);
        assert!(narrowphase.contacts().is_empty());
        assert!(narrowphase.overlaps().is_empty());
    }
}
