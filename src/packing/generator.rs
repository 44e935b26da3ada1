use std::f32::consts::PI;

use rand::Rng;
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use statrs::distribution::{Beta, LogNormal};

use crate::packing::error::{PackError, Result};
use crate::packing::orientation::OrientationSampler;
use crate::packing::shapes::ShapeType;
use crate::packing::stats::{BetaParams, PhaseStatistics, StatsCollection};

/// Attributes of one generated grain, before it is placed.
#[derive(Debug, Clone, PartialEq)]
pub struct GrainDescriptor {
	pub volume: f32,
	pub equivalent_diameter: f32,
	/// `[1, b/a, c/a]`
	pub axis_lengths: [f32; 3],
	pub axis_euler_angles: [f32; 3],
	pub omega3: f32,
	pub phase: usize,
	pub neighborhoods: [i32; 3],
}

/// Draws grain descriptors; the only state it touches is the caller's random generator.
pub struct GrainGenerator<'a> {
	stats: &'a StatsCollection,
	sampler: &'a dyn OrientationSampler,
}

impl<'a> GrainGenerator<'a> {
	pub fn new(stats: &'a StatsCollection, sampler: &'a dyn OrientationSampler) -> Self {
		Self { stats, sampler }
	}

	/// Generate one grain of `phase` (1-based id).
	pub fn generate(&self, phase: usize, rng: &mut StdRng) -> Result<GrainDescriptor> {
		let stats = self.stats.phase(phase);
		let invalid = |reason: String| PackError::InvalidStatistics { phase, reason };

		let size_law = LogNormal::new(stats.mu as f64, stats.sigma as f64)
			.map_err(|e| invalid(format!("size law: {}", e)))?;
		let mut diameter = stats.max_diameter;
		while diameter >= stats.max_diameter || diameter < stats.min_diameter {
			diameter = size_law.sample(rng) as f32;
		}
		let volume = (4.0 / 3.0) * PI * (diameter / 2.0).powi(3);

		let bin = stats.diameter_bin(diameter);
		let b_over_a = beta_distribution(&stats.b_over_a, bin, "b/a").map_err(invalid)?;
		let c_over_a = beta_distribution(&stats.c_over_a, bin, "c/a").map_err(invalid)?;
		let (mut r2, mut r3) = (0.0f32, 1.0f32);
		while r2 < r3 {
			r2 = b_over_a.sample(rng) as f32;
			r3 = c_over_a.sample(rng) as f32;
		}

		let omega3 = if stats.shape_type == ShapeType::Ellipsoid {
			1.0
		} else {
			let omega3_dist = beta_distribution(&stats.omega3, bin, "omega3").map_err(invalid)?;
			omega3_dist.sample(rng) as f32
		};

		let odf_bin = orientation_bin(stats, rng.gen_range(0.0..1.0));
		let axis_euler_angles = self.sampler.euler_angles_for_bin(odf_bin, rng);

		Ok(GrainDescriptor {
			volume,
			equivalent_diameter: diameter,
			axis_lengths: [1.0, r2, r3],
			axis_euler_angles,
			omega3,
			phase,
			neighborhoods: [0; 3],
		})
	}
}

fn beta_distribution(table: &[BetaParams], bin: usize, name: &str) -> std::result::Result<Beta, String> {
	let params = PhaseStatistics::beta_for_bin(table, bin).ok_or_else(|| format!("{} table is empty", name))?;
	Beta::new(params.alpha as f64, params.beta as f64).map_err(|e| format!("{} bin {}: {}", name, bin, e))
}

/// First orientation bin whose cumulative probability reaches `u`.
fn orientation_bin(stats: &PhaseStatistics, u: f32) -> usize {
	let cdf = &stats.axis_odf;
	cdf.partition_point(|&c| c < u).min(cdf.len().saturating_sub(1))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::packing::orientation::OrthoRhombicSampler;
	use rand::SeedableRng;

	#[test]
	fn generated_grains_respect_statistics() {
		let stats = StatsCollection::new(vec![PhaseStatistics::equiaxed(1.2, 0.3, 2.0, 2.0, 0.5)]);
		let sampler = OrthoRhombicSampler::new();
		let generator = GrainGenerator::new(&stats, &sampler);
		let mut rng = StdRng::seed_from_u64(42);
		let phase = stats.phase(1);
		for _ in 0..500 {
			let grain = generator.generate(1, &mut rng).unwrap();
			assert!(grain.equivalent_diameter >= phase.min_diameter);
			assert!(grain.equivalent_diameter < phase.max_diameter);
			assert!(grain.axis_lengths[1] >= grain.axis_lengths[2]);
			assert_eq!(grain.omega3, 1.0);
			assert_eq!(grain.phase, 1);
		}
	}

	#[test]
	fn non_ellipsoids_sample_omega3() {
		let stats = StatsCollection::new(vec![
			PhaseStatistics::equiaxed(1.2, 0.3, 2.0, 2.0, 0.5).with_shape_type(ShapeType::SuperEllipsoid),
		]);
		let sampler = OrthoRhombicSampler::new();
		let generator = GrainGenerator::new(&stats, &sampler);
		let mut rng = StdRng::seed_from_u64(5);
		let grain = generator.generate(1, &mut rng).unwrap();
		assert!(grain.omega3 > 0.0 && grain.omega3 <= 1.0);
	}

	#[test]
	fn orientation_bin_follows_cdf() {
		let mut phase = PhaseStatistics::equiaxed(1.2, 0.3, 2.0, 2.0, 0.5);
		phase.axis_odf = vec![0.0, 0.0, 0.5, 1.0];
		assert_eq!(orientation_bin(&phase, 0.25), 2);
		assert_eq!(orientation_bin(&phase, 0.5), 2);
		assert_eq!(orientation_bin(&phase, 0.75), 3);
		phase.axis_odf = vec![0.2, 0.4];
		assert_eq!(orientation_bin(&phase, 0.9), 1);
	}

	#[test]
	fn same_seed_same_grain() {
		let stats = StatsCollection::new(vec![PhaseStatistics::equiaxed(1.2, 0.3, 2.0, 2.0, 0.5)]);
		let sampler = OrthoRhombicSampler::new();
		let generator = GrainGenerator::new(&stats, &sampler);
		let a = generator.generate(1, &mut StdRng::seed_from_u64(9)).unwrap();
		let b = generator.generate(1, &mut StdRng::seed_from_u64(9)).unwrap();
		assert_eq!(a, b);
	}
}
