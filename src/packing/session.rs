use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::packing::config::PackingConfig;
use crate::packing::diagnostics::DiagnosticLog;
use crate::packing::distributions::{NeighborDistribution, SizeDistribution};
use crate::packing::error::{PackError, Result};
use crate::packing::field::FieldSet;
use crate::packing::orientation::{OrientationSampler, OrthoRhombicSampler};
use crate::packing::packing_grid::PackingGrid;
use crate::packing::stats::StatsCollection;
use crate::voxel_grid::cleanup::CleanupReport;
use crate::voxel_grid::grid::VoxelGrid;

/// Outcome of `PackingSession::run`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackingSummary {
	/// Grains produced by seeding.
	pub generated_grains: usize,
	/// Grains still owning voxels at the end.
	pub active_grains: usize,
	pub filling_error: f32,
	pub size_affinity: f32,
	pub neighbor_affinity: f32,
	pub accepted_moves: usize,
	pub gap_passes: usize,
	pub cleanup: CleanupReport,
	/// Old to new grain ids when renumbering ran.
	pub renumbering: Option<Vec<usize>>,
}

/// Owns everything a packing run touches: configuration, statistics, the grain field, both
/// grids, the evaluators and the single random generator every sample is drawn from.
pub struct PackingSession {
	pub config: PackingConfig,
	pub stats: StatsCollection,
	pub field: FieldSet,
	pub voxels: VoxelGrid,
	pub packing_grid: PackingGrid,
	pub diagnostics: DiagnosticLog,
	pub(crate) rng: StdRng,
	pub(crate) sampler: Box<dyn OrientationSampler>,
	pub(crate) size_distribution: SizeDistribution,
	pub(crate) neighbor_distribution: NeighborDistribution,
	pub(crate) size_affinity: f32,
	pub(crate) neighbor_affinity: f32,
	pub(crate) accepted_moves: usize,
	cancel: Arc<AtomicBool>,
}

impl PackingSession {
	/// Validate the configuration and statistics and set up an empty session.
	pub fn new(config: PackingConfig, stats: StatsCollection) -> Result<Self> {
		config.validate()?;
		stats.validate()?;

		let voxels = VoxelGrid::new(config.dims[0], config.dims[1], config.dims[2], config.resolution);
		let packing_grid = PackingGrid::new(&config);
		let size_distribution = SizeDistribution::new(&stats);
		let neighbor_distribution = NeighborDistribution::new(&stats);
		let rng = StdRng::seed_from_u64(config.seed);

		Ok(Self {
			config,
			stats,
			field: FieldSet::new(),
			voxels,
			packing_grid,
			diagnostics: DiagnosticLog::new(),
			rng,
			sampler: Box::new(OrthoRhombicSampler::new()),
			size_distribution,
			neighbor_distribution,
			size_affinity: 0.0,
			neighbor_affinity: 0.0,
			accepted_moves: 0,
			cancel: Arc::new(AtomicBool::new(false)),
		})
	}

	/// Replace the bundled orthorhombic orientation sampler.
	pub fn with_orientation_sampler(mut self, sampler: Box<dyn OrientationSampler>) -> Self {
		self.sampler = sampler;
		self
	}

	/// Stream diagnostic records to `sink` as well as keeping them in memory.
	pub fn with_diagnostics(mut self, sink: Box<dyn Write>) -> Self {
		self.diagnostics = DiagnosticLog::with_sink(sink);
		self
	}

	/// Flag that aborts the run at the next grain or stage boundary when set.
	pub fn cancel_flag(&self) -> Arc<AtomicBool> {
		Arc::clone(&self.cancel)
	}

	pub(crate) fn check_cancelled(&self) -> Result<()> {
		if self.cancel.load(Ordering::Relaxed) {
			return Err(PackError::Cancelled);
		}
		Ok(())
	}

	/// Progress bar for one stage, hidden unless the run is verbose.
	pub(crate) fn stage_bar(&self, len: u64, label: &str) -> ProgressBar {
		if !self.config.verbose {
			return ProgressBar::hidden();
		}
		let pb = ProgressBar::new(len);
		let template = format!("{}: [{{bar:40.cyan/blue}}] {{pos}}/{{len}} ({{eta}})", label);
		pb.set_style(
			ProgressStyle::default_bar()
			.template(&template)
			.unwrap_or_else(|_| ProgressStyle::default_bar())
			.progress_chars("#>-"),
		);
		pb
	}

	/// Run every stage: seeding, placement, improvement, voxel assignment, gap-fill, cleanup
	/// and, when configured, renumbering.
	pub fn run(&mut self) -> Result<PackingSummary> {
		let generated_grains = self.seed_grains()?;
		self.check_cancelled()?;
		self.place_grains()?;
		self.check_cancelled()?;
		self.improve_packing()?;
		self.check_cancelled()?;

		let periodic = self.config.periodic;
		self.voxels.assign_voxels(&mut self.field, &self.stats, periodic);
		self.check_cancelled()?;
		let gap_passes = self.voxels.assign_gaps(&self.field, &self.stats, periodic)?;
		self.check_cancelled()?;
		let cleanup = self
			.voxels
			.cleanup_grains(&mut self.field, &self.stats, periodic, self.config.max_cleanup_passes)?;

		let renumbering = if self.config.renumber {
			Some(self.voxels.renumber_grains(&mut self.field))
		} else {
			None
		};

		let summary = PackingSummary {
			generated_grains,
			active_grains: self.field.num_active(),
			filling_error: self.packing_grid.current_error(),
			size_affinity: self.size_affinity,
			neighbor_affinity: self.neighbor_affinity,
			accepted_moves: self.accepted_moves,
			gap_passes,
			cleanup,
			renumbering,
		};

		if self.config.verbose {
			self.voxels.report_memory();
			eprintln!("Packing Summary:");
			eprintln!("-------------------------");
			eprintln!("  Generated Grains: {}", summary.generated_grains);
			eprintln!("  Active Grains: {}", summary.active_grains);
			eprintln!("  Filling Error: {:.4}", summary.filling_error);
			eprintln!("  Size Affinity: {:.4}", summary.size_affinity);
			eprintln!("  Neighbor Affinity: {:.4}", summary.neighbor_affinity);
			eprintln!("  Accepted Moves: {}", summary.accepted_moves);
			eprintln!("  Gap-Fill Passes: {}", summary.gap_passes);
			eprintln!("  Cleanup Passes: {}", summary.cleanup.passes);
			eprintln!("  Invalidated Voxels: {}", summary.cleanup.invalidated);
			eprintln!("-------------------------");
		}
		Ok(summary)
	}
}
