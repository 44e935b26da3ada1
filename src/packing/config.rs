use crate::packing::error::{PackError, Result};

/// Configuration for one packing run.
#[derive(Debug, Clone)]
pub struct PackingConfig {
	/// Number of fine voxels along I, J, K.
	pub dims: [usize; 3],
	/// Physical size of one voxel along each axis.
	pub resolution: [f32; 3],
	/// Wrap grains across opposite domain faces.
	pub periodic: bool,
	/// Seed for the session random generator.
	pub seed: u64,
	/// Fraction of the domain volume to fill with generated grains.
	pub target_volume_fraction: f32,
	/// Random relocation trials per grain during initial placement.
	pub placement_trials: usize,
	/// Improvement iterations per generated grain.
	pub adjustments_per_grain: usize,
	/// Nudge half-width, in coarse packing cells.
	pub nudge_cells: f32,
	/// Improvement iterations between diagnostic records.
	pub diagnostic_interval: usize,
	/// Empirical packing-efficiency correction for open (non-periodic) boundaries.
	pub boundary_compensation_scale: f32,
	/// Cleanup + gap-fill rounds before falling back to neighbour growth.
	pub max_cleanup_passes: usize,
	/// Compact grain ids after cleanup.
	pub renumber: bool,
	/// Show progress bars and stderr reports.
	pub verbose: bool,
}

impl Default for PackingConfig {
	fn default() -> Self {
		Self {
			dims: [64, 64, 64],
			resolution: [1.0, 1.0, 1.0],
			periodic: false,
			seed: 0x5eed,
			target_volume_fraction: 1.0,
			placement_trials: 10,
			adjustments_per_grain: 100,
			nudge_cells: 2.0,
			diagnostic_interval: 25,
			boundary_compensation_scale: 0.25,
			max_cleanup_passes: 4,
			renumber: false,
			verbose: false,
		}
	}
}

impl PackingConfig {
	/// Creates a new configuration with default values.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets the voxel dimensions of the domain.
	pub fn with_dims(mut self, len_i: usize, len_j: usize, len_k: usize) -> Self {
		self.dims = [len_i, len_j, len_k];
		self
	}

	/// Sets the same voxel size on every axis.
	pub fn with_resolution(mut self, res: f32) -> Self {
		self.resolution = [res, res, res];
		self
	}

	pub fn with_periodic(mut self, periodic: bool) -> Self {
		self.periodic = periodic;
		self
	}

	pub fn with_seed(mut self, seed: u64) -> Self {
		self.seed = seed;
		self
	}

	/// Sets the target volume fraction.
	pub fn with_target_volume_fraction(mut self, fraction: f32) -> Self {
		self.target_volume_fraction = fraction;
		self
	}

	/// Sets the improvement budget per grain.
	pub fn with_adjustments_per_grain(mut self, adjustments: usize) -> Self {
		self.adjustments_per_grain = adjustments;
		self
	}

	pub fn with_boundary_compensation_scale(mut self, scale: f32) -> Self {
		self.boundary_compensation_scale = scale;
		self
	}

	pub fn with_renumber(mut self, renumber: bool) -> Self {
		self.renumber = renumber;
		self
	}

	pub fn with_verbose(mut self, verbose: bool) -> Self {
		self.verbose = verbose;
		self
	}

	/// Physical extent of the domain along each axis.
	pub fn extent(&self) -> [f32; 3] {
		[
			self.dims[0] as f32 * self.resolution[0],
			self.dims[1] as f32 * self.resolution[1],
			self.dims[2] as f32 * self.resolution[2],
		]
	}

	/// Reject configurations that cannot produce a packing.
	pub fn validate(&self) -> Result<()> {
		if self.dims.iter().any(|&d| d == 0) {
			return Err(PackError::InvalidConfig(format!("domain dimensions must be non-zero, got {:?}", self.dims)));
		}
		if self.resolution.iter().any(|&r| !(r > 0.0) || !r.is_finite()) {
			return Err(PackError::InvalidConfig(format!("resolution must be positive, got {:?}", self.resolution)));
		}
		if !(self.target_volume_fraction > 0.0) || !self.target_volume_fraction.is_finite() {
			return Err(PackError::InvalidConfig(format!(
				"target volume fraction must be positive, got {}",
				self.target_volume_fraction
			)));
		}
		if self.diagnostic_interval == 0 {
			return Err(PackError::InvalidConfig("diagnostic interval must be at least 1".to_string()));
		}
		if self.boundary_compensation_scale < 0.0 {
			return Err(PackError::InvalidConfig("boundary compensation scale must not be negative".to_string()));
		}
		Ok(())
	}
}
