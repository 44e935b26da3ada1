use std::f32::consts::TAU;
use std::f64::consts::{FRAC_PI_2, PI};

use rand::Rng;
use rand::rngs::StdRng;

/// Cells per axis of the discretized orientation space.
pub const ODF_CELLS_PER_AXIS: usize = 36;
/// Total number of orientation bins.
pub const ODF_BINS: usize = ODF_CELLS_PER_AXIS * ODF_CELLS_PER_AXIS * ODF_CELLS_PER_AXIS;

/// Turns an orientation bin into Euler angles `(phi1, Phi, phi2)` in the fundamental zone.
pub trait OrientationSampler {
	fn euler_angles_for_bin(&self, bin: usize, rng: &mut StdRng) -> [f32; 3];
}

/// Sample-to-crystal rotation matrix of Bunge Euler angles.
pub fn rotation_matrix(euler: [f32; 3]) -> [[f32; 3]; 3] {
	let [phi1, big_phi, phi2] = euler;
	let (s1, c1) = phi1.sin_cos();
	let (s, c) = big_phi.sin_cos();
	let (s2, c2) = phi2.sin_cos();
	[
		[c1 * c2 - s1 * s2 * c, s1 * c2 + c1 * s2 * c, s2 * s],
		[-c1 * s2 - s1 * c2 * c, -s1 * s2 + c1 * c2 * c, c2 * s],
		[s1 * s, -c1 * s, c],
	]
}

/// Bunge Euler angles of a rotation matrix built like `rotation_matrix`.
pub fn euler_from_matrix(g: &[[f32; 3]; 3]) -> [f32; 3] {
	let big_phi = g[2][2].clamp(-1.0, 1.0).acos();
	let (phi1, phi2) = if big_phi.sin().abs() > 1.0e-6 {
		(g[2][0].atan2(-g[2][1]), g[0][2].atan2(g[1][2]))
	} else {
		(g[0][1].atan2(g[0][0]), 0.0)
	};
	[phi1.rem_euclid(TAU), big_phi, phi2.rem_euclid(TAU)]
}

/// Unit quaternion `[w, x, y, z]`.
type Quat = [f64; 4];

fn quat_multiply(a: &Quat, b: &Quat) -> Quat {
	[
		a[0] * b[0] - a[1] * b[1] - a[2] * b[2] - a[3] * b[3],
		a[0] * b[1] + a[1] * b[0] + a[2] * b[3] - a[3] * b[2],
		a[0] * b[2] - a[1] * b[3] + a[2] * b[0] + a[3] * b[1],
		a[0] * b[3] + a[1] * b[2] - a[2] * b[1] + a[3] * b[0],
	]
}

fn quat_to_matrix(q: &Quat) -> [[f32; 3]; 3] {
	let [q0, q1, q2, q3] = *q;
	[
		[
			(q0 * q0 + q1 * q1 - q2 * q2 - q3 * q3) as f32,
			(2.0 * (q1 * q2 + q0 * q3)) as f32,
			(2.0 * (q1 * q3 - q0 * q2)) as f32,
		],
		[
			(2.0 * (q1 * q2 - q0 * q3)) as f32,
			(q0 * q0 - q1 * q1 + q2 * q2 - q3 * q3) as f32,
			(2.0 * (q2 * q3 + q0 * q1)) as f32,
		],
		[
			(2.0 * (q1 * q3 + q0 * q2)) as f32,
			(2.0 * (q2 * q3 - q0 * q1)) as f32,
			(q0 * q0 - q1 * q1 - q2 * q2 + q3 * q3) as f32,
		],
	]
}

/// Identity plus the three two-fold axes.
const ORTHORHOMBIC_SYMMETRY: [Quat; 4] = [
	[1.0, 0.0, 0.0, 0.0],
	[0.0, 1.0, 0.0, 0.0],
	[0.0, 0.0, 1.0, 0.0],
	[0.0, 0.0, 0.0, 1.0],
];

/// Orthorhombic (mmm) sampler over a 36 x 36 x 36 lattice of homochoric cells.
///
/// A bin picks a cell; the sampler draws a point inside it, maps it back to an axis-angle
/// rotation and reduces that rotation into the fundamental zone.
#[derive(Debug, Clone)]
pub struct OrthoRhombicSampler {
	/// Half-width of the homochoric cube, the image of a pi/2 rotation.
	half_width: f64,
	step: f64,
}

impl Default for OrthoRhombicSampler {
	fn default() -> Self {
		let half_width = (0.75 * (FRAC_PI_2 - FRAC_PI_2.sin())).cbrt();
		Self {
			half_width,
			step: half_width / (ODF_CELLS_PER_AXIS as f64 / 2.0),
		}
	}
}

impl OrthoRhombicSampler {
	pub fn new() -> Self {
		Self::default()
	}

	/// Rotation angle whose homochoric radius is `h`, from |h|^3 = 3/4 (w - sin w).
	fn homochoric_angle(h: f64) -> f64 {
		let target = h.powi(3);
		let (mut lo, mut hi) = (0.0f64, PI);
		for _ in 0..60 {
			let mid = 0.5 * (lo + hi);
			if 0.75 * (mid - mid.sin()) < target {
				lo = mid;
			} else {
				hi = mid;
			}
		}
		0.5 * (lo + hi)
	}

	/// Quaternion of a homochoric vector.
	fn homochoric_to_quat(h: [f64; 3]) -> Quat {
		let norm = (h[0] * h[0] + h[1] * h[1] + h[2] * h[2]).sqrt();
		if norm < 1.0e-12 {
			return [1.0, 0.0, 0.0, 0.0];
		}
		let w = Self::homochoric_angle(norm);
		let (s, c) = (0.5 * w).sin_cos();
		[c, s * h[0] / norm, s * h[1] / norm, s * h[2] / norm]
	}

	/// Symmetric equivalent nearest the identity, with a non-negative scalar part.
	pub fn reduce_to_fundamental_zone(q: &Quat) -> Quat {
		let mut best = *q;
		for sym in ORTHORHOMBIC_SYMMETRY.iter() {
			let candidate = quat_multiply(q, sym);
			if candidate[0].abs() > best[0].abs() {
				best = candidate;
			}
		}
		if best[0] < 0.0 {
			best = [-best[0], -best[1], -best[2], -best[3]];
		}
		best
	}

	/// Uniform homochoric point inside the cell of `bin`.
	fn homochoric_point(&self, bin: usize, rng: &mut StdRng) -> [f64; 3] {
		let bin = bin % ODF_BINS;
		let cells = [
			bin % ODF_CELLS_PER_AXIS,
			(bin / ODF_CELLS_PER_AXIS) % ODF_CELLS_PER_AXIS,
			bin / (ODF_CELLS_PER_AXIS * ODF_CELLS_PER_AXIS),
		];
		let mut h = [0.0f64; 3];
		for (axis, cell) in cells.iter().enumerate() {
			let jitter: f64 = rng.gen_range(0.0..1.0);
			h[axis] = -self.half_width + (*cell as f64 + jitter) * self.step;
		}
		h
	}
}

impl OrientationSampler for OrthoRhombicSampler {
	fn euler_angles_for_bin(&self, bin: usize, rng: &mut StdRng) -> [f32; 3] {
		let q = Self::homochoric_to_quat(self.homochoric_point(bin, rng));
		let q = Self::reduce_to_fundamental_zone(&q);
		euler_from_matrix(&quat_to_matrix(&q))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rand::SeedableRng;

	fn assert_matrix_close(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3]) {
		for i in 0..3 {
			for j in 0..3 {
				assert!((a[i][j] - b[i][j]).abs() < 1.0e-4, "{:?} vs {:?}", a, b);
			}
		}
	}

	#[test]
	fn rotation_matrix_is_orthonormal() {
		let g = rotation_matrix([0.3, 1.1, 2.4]);
		for i in 0..3 {
			for j in 0..3 {
				let dot: f32 = (0..3).map(|k| g[i][k] * g[j][k]).sum();
				let expected = if i == j { 1.0 } else { 0.0 };
				assert!((dot - expected).abs() < 1.0e-5);
			}
		}
	}

	#[test]
	fn euler_round_trips_through_matrix() {
		for euler in [[0.3f32, 1.1, 2.4], [5.0, 0.4, 0.2], [1.0, 0.0, 0.0], [2.0, std::f32::consts::PI, 0.0]] {
			let g = rotation_matrix(euler);
			let back = rotation_matrix(euler_from_matrix(&g));
			assert_matrix_close(&g, &back);
		}
	}

	#[test]
	fn quaternion_matrix_matches_euler_convention() {
		let mut rng = StdRng::seed_from_u64(7);
		let sampler = OrthoRhombicSampler::new();
		for bin in [0usize, 17, 1000, ODF_BINS - 1] {
			let q = OrthoRhombicSampler::homochoric_to_quat(sampler.homochoric_point(bin, &mut rng));
			let g = quat_to_matrix(&q);
			assert_matrix_close(&g, &rotation_matrix(euler_from_matrix(&g)));
		}
	}

	#[test]
	fn reduced_quaternions_sit_in_fundamental_zone() {
		let mut rng = StdRng::seed_from_u64(11);
		let sampler = OrthoRhombicSampler::new();
		for bin in (0..ODF_BINS).step_by(997) {
			let q = OrthoRhombicSampler::homochoric_to_quat(sampler.homochoric_point(bin, &mut rng));
			let fz = OrthoRhombicSampler::reduce_to_fundamental_zone(&q);
			assert!(fz[0] >= 0.0);
			for axis in 1..4 {
				assert!(fz[0] + 1.0e-9 >= fz[axis].abs());
			}
		}
	}

	#[test]
	fn sampling_is_reproducible() {
		let sampler = OrthoRhombicSampler::new();
		let mut a = StdRng::seed_from_u64(3);
		let mut b = StdRng::seed_from_u64(3);
		assert_eq!(sampler.euler_angles_for_bin(4242, &mut a), sampler.euler_angles_for_bin(4242, &mut b));
	}
}
