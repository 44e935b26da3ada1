use statrs::function::erf::erf;

use crate::packing::error::{PackError, Result};
use crate::packing::orientation::ODF_BINS;
use crate::packing::shapes::ShapeType;

/// Bins in the simulated and target size histograms.
pub const SIZE_DIST_BINS: usize = 40;

/// Role of a phase in the microstructure. Only primary phases are packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseType {
	Primary,
	Precipitate,
	Transformation,
	Matrix,
}

/// Parameters of a beta distribution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaParams {
	pub alpha: f32,
	pub beta: f32,
}

impl BetaParams {
	pub fn new(alpha: f32, beta: f32) -> Self {
		Self { alpha, beta }
	}

	fn is_populated(&self) -> bool {
		self.alpha > 0.0 && self.beta > 0.0
	}
}

/// Neighbour-count power law `alpha * x^beta + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLawParams {
	pub alpha: f32,
	pub k: f32,
	pub beta: f32,
}

impl PowerLawParams {
	pub fn new(alpha: f32, k: f32, beta: f32) -> Self {
		Self { alpha, k, beta }
	}

	pub fn evaluate(&self, x: f32) -> f32 {
		self.alpha * x.powf(self.beta) + self.k
	}
}

/// Target statistics of one phase: a lognormal size law with cut-offs, beta parameters binned
/// by diameter for the axis ratios and omega3, power-law neighbour parameters binned the same
/// way, and a cumulative axis-orientation distribution.
#[derive(Debug, Clone)]
pub struct PhaseStatistics {
	pub phase_type: PhaseType,
	pub shape_type: ShapeType,
	pub phase_fraction: f32,
	/// Mean of ln(diameter).
	pub mu: f32,
	/// Standard deviation of ln(diameter).
	pub sigma: f32,
	pub min_diameter: f32,
	pub max_diameter: f32,
	/// Width of one diameter bin in the binned tables.
	pub bin_step_size: f32,
	pub b_over_a: Vec<BetaParams>,
	pub c_over_a: Vec<BetaParams>,
	pub omega3: Vec<BetaParams>,
	pub neighbor_params: Vec<PowerLawParams>,
	/// Cumulative distribution over orientation bins.
	pub axis_odf: Vec<f32>,
}

impl PhaseStatistics {
	/// Equiaxed primary phase with cut-offs expressed in standard deviations of ln(d).
	pub fn equiaxed(mu: f32, sigma: f32, min_cutoff: f32, max_cutoff: f32, bin_step_size: f32) -> Self {
		let min_diameter = (mu - min_cutoff * sigma).exp();
		let max_diameter = (mu + max_cutoff * sigma).exp();
		let num_bins = (((max_diameter - min_diameter) / bin_step_size) as usize + 1).max(1);

		let axis_odf = (0..ODF_BINS)
			.map(|bin| (bin + 1) as f32 / ODF_BINS as f32)
			.collect();

		Self {
			phase_type: PhaseType::Primary,
			shape_type: ShapeType::Ellipsoid,
			phase_fraction: 1.0,
			mu,
			sigma,
			min_diameter,
			max_diameter,
			bin_step_size,
			b_over_a: vec![BetaParams::new(15.0, 1.5); num_bins],
			c_over_a: vec![BetaParams::new(15.0, 1.5); num_bins],
			omega3: vec![BetaParams::new(10.0, 1.5); num_bins],
			neighbor_params: vec![PowerLawParams::new(14.0, 2.0, 1.0); num_bins],
			axis_odf,
		}
	}

	pub fn with_shape_type(mut self, shape_type: ShapeType) -> Self {
		self.shape_type = shape_type;
		self
	}

	pub fn with_phase_fraction(mut self, fraction: f32) -> Self {
		self.phase_fraction = fraction;
		self
	}

	pub fn with_phase_type(mut self, phase_type: PhaseType) -> Self {
		self.phase_type = phase_type;
		self
	}

	/// Number of diameter bins in the binned tables.
	pub fn num_diameter_bins(&self) -> usize {
		self.b_over_a.len()
	}

	/// Diameter bin used to index the binned tables, clamped into range.
	pub fn diameter_bin(&self, diameter: f32) -> usize {
		let bin = ((diameter - self.min_diameter) / self.bin_step_size).max(0.0) as usize;
		bin.min(self.num_diameter_bins().saturating_sub(1))
	}

	/// Beta parameters for `bin`, falling back to the nearest populated bin below (then above).
	pub fn beta_for_bin(table: &[BetaParams], bin: usize) -> Option<BetaParams> {
		let bin = bin.min(table.len().checked_sub(1)?);
		table[..=bin]
			.iter()
			.rev()
			.chain(table[bin + 1..].iter())
			.find(|p| p.is_populated())
			.copied()
	}

	/// Lognormal cumulative probability of a diameter.
	pub fn size_cdf(&self, diameter: f32) -> f32 {
		if diameter <= 0.0 {
			return 0.0;
		}
		let z = (diameter.ln() - self.mu) as f64 / (std::f64::consts::SQRT_2 * self.sigma as f64);
		(0.5 + 0.5 * erf(z)) as f32
	}

	/// Width of one bin of the 40-bin size histogram.
	pub fn size_dist_step(&self) -> f32 {
		((2.0 * self.max_diameter) - (self.min_diameter / 2.0)) / SIZE_DIST_BINS as f32
	}

	/// Bin of the 40-bin size histogram a diameter falls in.
	pub fn size_dist_bin(&self, diameter: f32) -> usize {
		let pos = (diameter - (self.min_diameter / 2.0)) / self.size_dist_step();
		pos.clamp(0.0, (SIZE_DIST_BINS - 1) as f32) as usize
	}

	/// Target size histogram, one CDF increment per bin.
	pub fn size_histogram(&self) -> [f32; SIZE_DIST_BINS] {
		let step = self.size_dist_step();
		let mut hist = [0.0f32; SIZE_DIST_BINS];
		let mut previous_total = 0.0f32;
		for (j, slot) in hist.iter_mut().enumerate() {
			let upper = ((j + 1) as f32 * step) + (self.min_diameter / 2.0);
			*slot = self.size_cdf(upper) - previous_total;
			previous_total += *slot;
		}
		hist
	}

	/// Target neighbour counts per diameter bin, at 0.5, 1.5 and 2.5 radii.
	pub fn neighbor_targets(&self) -> Vec<[f32; 3]> {
		self.neighbor_params
			.iter()
			.map(|p| [p.evaluate(0.5), p.evaluate(1.5), p.evaluate(2.5)])
			.collect()
	}

	fn validate(&self, phase: usize) -> Result<()> {
		let invalid = |reason: String| PackError::InvalidStatistics { phase, reason };

		if !(self.min_diameter > 0.0) || !(self.max_diameter > self.min_diameter) {
			return Err(invalid(format!(
				"diameter range [{}, {}) is empty",
				self.min_diameter, self.max_diameter
			)));
		}
		if !(self.sigma > 0.0) || !self.sigma.is_finite() || !self.mu.is_finite() {
			return Err(invalid(format!("size law mu={} sigma={} is not sampleable", self.mu, self.sigma)));
		}
		if !(self.bin_step_size > 0.0) {
			return Err(invalid("bin step size must be positive".to_string()));
		}
		let num_bins = self.num_diameter_bins();
		if num_bins == 0 {
			return Err(invalid("b/a table is unset".to_string()));
		}
		for (name, table) in [("c/a", &self.c_over_a), ("omega3", &self.omega3)] {
			if table.len() != num_bins {
				return Err(invalid(format!("{} table has {} bins, expected {}", name, table.len(), num_bins)));
			}
		}
		if self.neighbor_params.len() != num_bins {
			return Err(invalid(format!(
				"neighbour table has {} bins, expected {}",
				self.neighbor_params.len(),
				num_bins
			)));
		}
		for (name, table) in [("b/a", &self.b_over_a), ("c/a", &self.c_over_a), ("omega3", &self.omega3)] {
			if table.iter().any(|p| p.alpha < 0.0 || p.beta < 0.0) {
				return Err(invalid(format!("{} table has negative parameters", name)));
			}
			if !table.iter().any(|p| p.is_populated()) {
				return Err(invalid(format!("{} table has no populated bin", name)));
			}
		}
		if self.axis_odf.is_empty() {
			return Err(invalid("axis orientation distribution is unset".to_string()));
		}
		if self.axis_odf.len() > ODF_BINS {
			return Err(invalid(format!("axis orientation distribution has more than {} bins", ODF_BINS)));
		}
		if self.axis_odf.windows(2).any(|w| w[1] < w[0]) {
			return Err(invalid("axis orientation distribution is not cumulative".to_string()));
		}
		let acceptance = self.size_cdf(self.max_diameter) - self.size_cdf(self.min_diameter);
		if !(acceptance > 1.0e-6) {
			return Err(invalid(format!(
				"size law almost never lands in [{}, {})",
				self.min_diameter, self.max_diameter
			)));
		}
		Ok(())
	}
}

/// All phases of a microstructure. Phase ids are 1-based; id 0 is never a phase.
#[derive(Debug, Clone, Default)]
pub struct StatsCollection {
	pub phases: Vec<PhaseStatistics>,
}

impl StatsCollection {
	pub fn new(phases: Vec<PhaseStatistics>) -> Self {
		Self { phases }
	}

	/// Statistics of phase `id` (1-based).
	pub fn phase(&self, id: usize) -> &PhaseStatistics {
		&self.phases[id - 1]
	}

	pub fn shape_type(&self, id: usize) -> ShapeType {
		self.phase(id).shape_type
	}

	/// Number of phase slots including the reserved id 0.
	pub fn num_phase_slots(&self) -> usize {
		self.phases.len() + 1
	}

	/// Primary phase ids and their cumulative, renormalized selection fractions.
	pub fn primary_phase_table(&self) -> (Vec<usize>, Vec<f32>) {
		let mut ids = Vec::new();
		let mut fractions = Vec::new();
		for (idx, phase) in self.phases.iter().enumerate() {
			if phase.phase_type == PhaseType::Primary {
				ids.push(idx + 1);
				fractions.push(phase.phase_fraction);
			}
		}
		let total: f32 = fractions.iter().sum();
		let mut running = 0.0f32;
		for fraction in fractions.iter_mut() {
			running += *fraction / total;
			*fraction = running;
		}
		(ids, fractions)
	}

	/// Validate every primary phase before any packing work starts.
	pub fn validate(&self) -> Result<()> {
		if self.phases.is_empty() {
			return Err(PackError::MissingStatistics("no phases supplied".to_string()));
		}
		let mut total_fraction = 0.0f32;
		for (idx, phase) in self.phases.iter().enumerate() {
			if phase.phase_type != PhaseType::Primary {
				continue;
			}
			if phase.phase_fraction < 0.0 || !phase.phase_fraction.is_finite() {
				return Err(PackError::InvalidStatistics {
					phase: idx + 1,
					reason: format!("phase fraction {} is invalid", phase.phase_fraction),
				});
			}
			total_fraction += phase.phase_fraction;
			phase.validate(idx + 1)?;
		}
		if !(total_fraction > 0.0) {
			return Err(PackError::MissingStatistics("no primary phase with a positive fraction".to_string()));
		}
		Ok(())
	}
}
