use std::f64::consts::PI;

use statrs::function::gamma::gamma;

use crate::packing::field::FieldSet;
use crate::packing::orientation::rotation_matrix;

/// Shape class of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeType {
	Ellipsoid,
	SuperEllipsoid,
	CubeOctahedron,
	Cylinder,
	/// Falls back to ellipsoid geometry.
	Unknown,
}

/// Inputs to the primary radius computation.
#[derive(Debug, Clone, Copy)]
pub struct ShapeArgs {
	pub volume: f32,
	pub b_over_a: f32,
	pub c_over_a: f32,
	pub omega3: f32,
}

/// Moment-invariant normalization that makes a sphere score omega3 = 1.
fn omega3_norm() -> f64 {
	(4.0 * PI / 15.0).powi(3) / (4.0 * PI / 3.0).powi(5)
}

/// omega3 of a body with full volume `volume` and second moment `moment` about each axis.
fn omega3_invariant(volume: f64, moment: f64) -> f64 {
	omega3_norm() * volume.powi(5) / moment.powi(3)
}

const SUPERELLIPSOID_MIN_EXPONENT: f64 = 2.0;
const SUPERELLIPSOID_MAX_EXPONENT: f64 = 40.0;

/// Volume of |x|^n + |y|^n + |z|^n <= 1.
fn superball_volume(n: f64) -> f64 {
	8.0 * gamma(1.0 + 1.0 / n).powi(3) / gamma(1.0 + 3.0 / n)
}

fn superball_moment(n: f64) -> f64 {
	8.0 * gamma(3.0 / n) * gamma(1.0 / n).powi(2) / (n.powi(3) * gamma(1.0 + 5.0 / n))
}

/// Volume of the cube |x_i| <= 1 with its eight corner tetrahedra of leg `t` cut away.
fn cube_octahedron_volume(t: f64) -> f64 {
	8.0 * (1.0 - t.powi(3) / 6.0)
}

/// Second moment about one axis of the same body.
fn cube_octahedron_moment(t: f64) -> f64 {
	8.0 * (1.0 / 3.0 - (t.powi(3) / 6.0 - t.powi(4) / 12.0 + t.powi(5) / 60.0))
}

/// Solve `f(p) = target` for a monotone `f` on `[lo, hi]`.
fn bisect(mut lo: f64, mut hi: f64, target: f64, f: impl Fn(f64) -> f64) -> f64 {
	let increasing = f(hi) > f(lo);
	for _ in 0..60 {
		let mid = 0.5 * (lo + hi);
		if (f(mid) < target) == increasing {
			lo = mid;
		} else {
			hi = mid;
		}
	}
	0.5 * (lo + hi)
}

/// A shape class with its omega3-dependent parameter already resolved.
///
/// `inside` takes a point already rotated into the grain frame and divided by the semi-axes.
/// Scores are negative outside, zero on the surface, and grow towards the centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrainShape {
	Ellipsoid,
	/// Exponent of |x|^n + |y|^n + |z|^n <= 1.
	SuperEllipsoid { exponent: f32 },
	/// Cube |x_i| <= 1 cut by the octahedron |x|+|y|+|z| <= `truncation`, in [2, 3].
	CubeOctahedron { truncation: f32 },
	Cylinder,
}

impl GrainShape {
	/// Resolve the shape parameters of a class for a given omega3.
	pub fn new(shape_type: ShapeType, omega3: f32) -> Self {
		match shape_type {
			ShapeType::Ellipsoid | ShapeType::Unknown => GrainShape::Ellipsoid,
			ShapeType::SuperEllipsoid => {
				let f = |n: f64| omega3_invariant(superball_volume(n), superball_moment(n));
				let target = omega3 as f64;
				let exponent = if target >= f(SUPERELLIPSOID_MIN_EXPONENT) {
					SUPERELLIPSOID_MIN_EXPONENT
				} else if target <= f(SUPERELLIPSOID_MAX_EXPONENT) {
					SUPERELLIPSOID_MAX_EXPONENT
				} else {
					bisect(SUPERELLIPSOID_MIN_EXPONENT, SUPERELLIPSOID_MAX_EXPONENT, target, f)
				};
				GrainShape::SuperEllipsoid { exponent: exponent as f32 }
			}
			ShapeType::CubeOctahedron => {
				let f = |t: f64| omega3_invariant(cube_octahedron_volume(t), cube_octahedron_moment(t));
				let target = omega3 as f64;
				let depth = if target <= f(0.0) {
					0.0
				} else if target >= f(1.0) {
					1.0
				} else {
					bisect(0.0, 1.0, target, f)
				};
				GrainShape::CubeOctahedron { truncation: (3.0 - depth) as f32 }
			}
			ShapeType::Cylinder => GrainShape::Cylinder,
		}
	}

	/// Volume of the shape with unit semi-axes.
	fn unit_volume(&self) -> f32 {
		match *self {
			GrainShape::Ellipsoid => (4.0 / 3.0 * PI) as f32,
			GrainShape::SuperEllipsoid { exponent } => superball_volume(exponent as f64) as f32,
			GrainShape::CubeOctahedron { truncation } => cube_octahedron_volume(3.0 - truncation as f64) as f32,
			GrainShape::Cylinder => (2.0 * PI) as f32,
		}
	}

	/// Primary semi-axis giving the requested volume.
	pub fn radius_for_primary_axis(&self, args: &ShapeArgs) -> f32 {
		let denom = self.unit_volume() * args.b_over_a * args.c_over_a;
		(args.volume / denom).cbrt()
	}

	/// Membership score of a point in the normalized grain frame.
	pub fn inside(&self, x: f32, y: f32, z: f32) -> f32 {
		match *self {
			GrainShape::Ellipsoid => 1.0 - (x * x + y * y + z * z),
			GrainShape::SuperEllipsoid { exponent } => {
				1.0 - (x.abs().powf(exponent) + y.abs().powf(exponent) + z.abs().powf(exponent))
			}
			GrainShape::CubeOctahedron { truncation } => {
				let cube = 1.0 - x.abs().max(y.abs()).max(z.abs());
				let octahedron = (truncation - (x.abs() + y.abs() + z.abs())) / truncation;
				cube.min(octahedron)
			}
			GrainShape::Cylinder => {
				let axial = 1.0 - x.abs();
				let radial = 1.0 - (y * y + z * z);
				axial.min(radial)
			}
		}
	}
}

/// A grain's shape posed in the sample frame.
#[derive(Debug, Clone, Copy)]
pub struct GrainBody {
	pub centroid: [f32; 3],
	/// Sample-to-grain rotation built from the axis Euler angles.
	pub rotation: [[f32; 3]; 3],
	/// Semi-axes: primary, primary * b/a, primary * c/a.
	pub radii: [f32; 3],
	pub shape: GrainShape,
}

impl GrainBody {
	/// Pose grain `gid` of `field` using its phase's shape class.
	pub fn from_field(field: &FieldSet, gid: usize, shape_type: ShapeType) -> Self {
		let axis = field.axis_lengths[gid];
		let shape = GrainShape::new(shape_type, field.omega3s[gid]);
		let args = ShapeArgs {
			volume: field.volumes[gid],
			b_over_a: axis[1],
			c_over_a: axis[2],
			omega3: field.omega3s[gid],
		};
		let primary = shape.radius_for_primary_axis(&args);
		Self {
			centroid: field.centroids[gid],
			rotation: rotation_matrix(field.axis_euler_angles[gid]),
			radii: [primary, primary * axis[1], primary * axis[2]],
			shape,
		}
	}

	pub fn primary_radius(&self) -> f32 {
		self.radii[0]
	}

	/// The same body with every semi-axis multiplied by `factor`.
	pub fn scaled(&self, factor: f32) -> Self {
		let mut body = *self;
		for r in body.radii.iter_mut() {
			*r *= factor;
		}
		body
	}

	/// Membership score of a point given as an offset from the centroid.
	#[inline]
	pub fn inside_offset(&self, dx: f32, dy: f32, dz: f32) -> f32 {
		let g = &self.rotation;
		let xp = dx * g[0][0] + dy * g[0][1] + dz * g[0][2];
		let yp = dx * g[1][0] + dy * g[1][1] + dz * g[1][2];
		let zp = dx * g[2][0] + dy * g[2][1] + dz * g[2][2];
		self.shape.inside(xp / self.radii[0], yp / self.radii[1], zp / self.radii[2])
	}
}
