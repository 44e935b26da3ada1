use indicatif::ProgressBar;
use rand::Rng;

use crate::packing::diagnostics::DiagnosticRecord;
use crate::packing::distributions::{compute_all_neighborhoods, determine_neighbors};
use crate::packing::error::Result;
use crate::packing::generator::GrainGenerator;
use crate::packing::session::PackingSession;
use crate::packing::shapes::GrainBody;

/// Size-affinity slack granted per consecutive rejection while seeding.
const REJECTION_RELAXATION: f32 = 0.001;

impl PackingSession {
	/// Generate grains until their volume covers the target fraction of the domain.
	///
	/// A candidate is kept when it raises the size affinity, or when the affinity beats a
	/// threshold that relaxes with every consecutive rejection. Open domains get a second round
	/// up to a boundary-compensated target, since grains cut by the faces leave part of their
	/// volume outside. Returns the number of grains generated.
	pub fn seed_grains(&mut self) -> Result<usize> {
		let extent = self.config.extent();
		let domain_volume = extent[0] * extent[1] * extent[2];
		let target = self.config.target_volume_fraction * domain_volume;

		let pb = self.stage_bar(target.ceil().max(1.0) as u64, "Generating Grains");
		let mut current_volume = 0.0f32;
		let mut affinity = 0.0f32;
		self.seed_until(target, &mut current_volume, &mut affinity, &pb)?;

		if !self.config.periodic {
			let n = self.field.num_grains() as f32;
			let (sx, sy, sz) = (extent[0], extent[1], extent[2]);
			let xgrains = ((n * (sx / sy) * (sx / sz)).cbrt() + 1.0) as i64;
			let ygrains = (xgrains as f32 * (sy / sx) + 1.0) as i64;
			let zgrains = (xgrains as f32 * (sz / sx) + 1.0) as i64;
			let interior = ((xgrains - 2) * (ygrains - 2) * (zgrains - 2)) as f32;
			let factor = self.config.boundary_compensation_scale
				* (1.0 - interior / (xgrains * ygrains * zgrains) as f32);
			let limit = target * (1.0 + factor);
			pb.set_length(limit.ceil().max(1.0) as u64);
			self.seed_until(limit, &mut current_volume, &mut affinity, &pb)?;
		}
		pb.finish_and_clear();

		self.size_affinity = affinity;
		Ok(self.field.num_grains())
	}

	fn seed_until(
		&mut self,
		limit: f32,
		current_volume: &mut f32,
		affinity: &mut f32,
		pb: &ProgressBar,
	) -> Result<()> {
		let (phase_ids, cumulative) = self.stats.primary_phase_table();
		let generator = GrainGenerator::new(&self.stats, self.sampler.as_ref());
		let mut rejections = 0usize;

		while *current_volume < limit {
			self.check_cancelled()?;
			rejections += 1;
			let u: f32 = self.rng.gen_range(0.0..1.0);
			let slot = cumulative.iter().position(|&c| u < c).unwrap_or(cumulative.len() - 1);
			let grain = generator.generate(phase_ids[slot], &mut self.rng)?;

			let candidate = self.size_distribution.affinity(&self.field, Some(&grain));
			if candidate - *affinity > 0.0 || candidate > 1.0 - rejections as f32 * REJECTION_RELAXATION {
				self.field.transfer_attributes(&grain);
				*affinity = candidate;
				*current_volume += grain.volume;
				rejections = 0;
				pb.set_position(current_volume.min(limit) as u64);
			}
		}
		Ok(())
	}

	/// Uniform position inside the domain.
	fn random_position(&mut self) -> [f32; 3] {
		let extent = self.config.extent();
		[
			self.rng.gen_range(0.0..1.0f32) * extent[0],
			self.rng.gen_range(0.0..1.0f32) * extent[1],
			self.rng.gen_range(0.0..1.0f32) * extent[2],
		]
	}

	/// Move grain `gid` to `new` on the packing grid and keep the move when the filling error
	/// does not increase; otherwise restore the previous position exactly.
	fn try_move(&mut self, gid: usize, new: [f32; 3]) -> bool {
		let old = self.field.centroids[gid];
		let old_error = self.packing_grid.current_error();

		self.packing_grid.filling_error(None, Some(gid));
		self.packing_grid.move_grain(gid, old, new);
		self.field.centroids[gid] = new;
		let error = self.packing_grid.filling_error(Some(gid), None);
		if error <= old_error {
			return true;
		}

		self.packing_grid.filling_error(None, Some(gid));
		self.packing_grid.move_grain(gid, new, old);
		self.field.centroids[gid] = old;
		self.packing_grid.filling_error(Some(gid), None);
		false
	}

	/// Put every grain on the packing grid, starting from the domain centre and keeping the best
	/// of a few random relocations.
	pub fn place_grains(&mut self) -> Result<()> {
		let extent = self.config.extent();
		let centre = [extent[0] / 2.0, extent[1] / 2.0, extent[2] / 2.0];
		let num_grains = self.field.num_grains();
		let pb = self.stage_bar(num_grains as u64, "Placing Grains");

		for gid in 1..=num_grains {
			self.check_cancelled()?;
			self.field.centroids[gid] = centre;
			let shape_type = self.stats.shape_type(self.field.phases[gid]);
			let body = GrainBody::from_field(&self.field, gid, shape_type);
			self.packing_grid.insert_grain(gid, &body);
			self.packing_grid.filling_error(Some(gid), None);

			for _ in 0..self.config.placement_trials {
				let position = self.random_position();
				self.try_move(gid, position);
			}
			pb.inc(1);
		}
		pb.finish_and_clear();
		Ok(())
	}

	/// Alternate jumps and nudges of random grains, keeping moves that do not worsen the
	/// filling error. Neighbour counts follow every accepted move and the neighbour affinity is
	/// reported, but it never decides a move. Returns the number of accepted moves.
	pub fn improve_packing(&mut self) -> Result<usize> {
		let num_grains = self.field.num_grains();
		compute_all_neighborhoods(&mut self.field);
		self.neighbor_affinity = self.neighbor_distribution.affinity(&self.field);
		self.accepted_moves = 0;
		if num_grains == 0 {
			return Ok(0);
		}

		let extent = self.config.extent();
		let periodic = self.config.periodic;
		let nudge = [
			self.config.nudge_cells * self.packing_grid.resolution[0],
			self.config.nudge_cells * self.packing_grid.resolution[1],
			self.config.nudge_cells * self.packing_grid.resolution[2],
		];
		let total = self.config.adjustments_per_grain * num_grains;
		let pb = self.stage_bar(total as u64, "Improving Packing");

		for iteration in 0..total {
			self.check_cancelled()?;
			if iteration % self.config.diagnostic_interval == 0 {
				let record = DiagnosticRecord {
					iteration,
					filling_error: self.packing_grid.current_error(),
					size_affinity: self.size_affinity,
					neighbor_affinity: self.neighbor_affinity,
					grains: num_grains,
					accepted_moves: self.accepted_moves,
				};
				self.diagnostics.record(record)?;
			}

			let pick = (self.rng.gen_range(0.0..1.0f32) * (num_grains + 1) as f32) as usize;
			let gid = pick.clamp(1, num_grains);
			let old = self.field.centroids[gid];

			let new = if iteration % 2 == 0 {
				self.random_position()
			} else {
				let mut moved = [0.0f32; 3];
				for axis in 0..3 {
					let offset = 2.0 * (self.rng.gen_range(0.0..1.0f32) - 0.5) * nudge[axis];
					let c = old[axis] + offset;
					moved[axis] = if periodic {
						c.rem_euclid(extent[axis])
					} else {
						c.clamp(0.0, extent[axis])
					};
				}
				moved
			};

			if self.try_move(gid, new) {
				self.accepted_moves += 1;
				self.field.centroids[gid] = old;
				determine_neighbors(&mut self.field, gid, -1);
				self.field.centroids[gid] = new;
				determine_neighbors(&mut self.field, gid, 1);
				self.neighbor_affinity = self.neighbor_distribution.affinity(&self.field);
			}
			pb.inc(1);
		}
		pb.finish_and_clear();
		self.diagnostics.flush()?;

		for gid in 1..=num_grains {
			self.field.pack_qualities[gid] = self.packing_grid.pack_quality(gid);
		}
		Ok(self.accepted_moves)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::f32::consts::PI;

	use crate::packing::config::PackingConfig;
	use crate::packing::generator::GrainDescriptor;
	use crate::packing::shapes::ShapeType;
	use crate::packing::stats::{PhaseStatistics, PowerLawParams, StatsCollection};

	fn equiaxed_stats() -> StatsCollection {
		StatsCollection::new(vec![PhaseStatistics::equiaxed(1.5, 0.15, 2.0, 2.0, 0.5)])
	}

	fn sphere(diameter: f32) -> GrainDescriptor {
		GrainDescriptor {
			volume: (PI / 6.0) * diameter.powi(3),
			equivalent_diameter: diameter,
			axis_lengths: [1.0, 1.0, 1.0],
			axis_euler_angles: [0.0; 3],
			omega3: 1.0,
			phase: 1,
			neighborhoods: [0; 3],
		}
	}

	/// Put grain `gid` at `centroid` and count it into the packing grid.
	fn place_at(session: &mut PackingSession, gid: usize, centroid: [f32; 3]) {
		session.field.centroids[gid] = centroid;
		let body = GrainBody::from_field(&session.field, gid, ShapeType::Ellipsoid);
		session.packing_grid.insert_grain(gid, &body);
		session.packing_grid.filling_error(Some(gid), None);
	}

	#[test]
	fn seeding_stops_once_target_volume_is_reached() {
		let config = PackingConfig::new().with_dims(16, 16, 16).with_periodic(true).with_seed(21);
		let target = config.target_volume_fraction * 16.0 * 16.0 * 16.0;
		let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();

		let n = session.seed_grains().unwrap();
		assert_eq!(n, session.field.num_grains());
		let total: f32 = session.field.volumes.iter().sum();
		let before_last: f32 = session.field.volumes[..n].iter().sum();
		assert!(total >= target, "{} < {}", total, target);
		assert!(before_last < target, "seeding ran past the target: {} >= {}", before_last, target);
	}

	#[test]
	fn open_domain_seeds_a_compensation_round() {
		let seed = |periodic: bool| {
			let config = PackingConfig::new().with_dims(16, 16, 16).with_periodic(periodic).with_seed(4);
			let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();
			session.seed_grains().unwrap();
			session.field.volumes.clone()
		};
		let periodic = seed(true);
		let open = seed(false);

		assert!(open.len() > periodic.len());
		assert_eq!(&open[..periodic.len()], &periodic[..]);
		let periodic_total: f32 = periodic.iter().sum();
		let open_total: f32 = open.iter().sum();
		assert!(open_total > periodic_total);
	}

	#[test]
	fn zero_compensation_scale_skips_the_extra_round() {
		let seed = |periodic: bool| {
			let config = PackingConfig::new()
				.with_dims(16, 16, 16)
				.with_periodic(periodic)
				.with_seed(4)
				.with_boundary_compensation_scale(0.0);
			let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();
			session.seed_grains().unwrap();
			session.field.volumes.clone()
		};
		assert_eq!(seed(true), seed(false));
	}

	#[test]
	fn rejected_move_restores_error_and_centroid() {
		let config = PackingConfig::new().with_dims(32, 32, 32);
		let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();
		session.field.transfer_attributes(&sphere(8.0));
		session.field.transfer_attributes(&sphere(8.0));
		place_at(&mut session, 1, [8.0, 8.0, 8.0]);
		place_at(&mut session, 2, [24.0, 24.0, 24.0]);

		let error = session.packing_grid.current_error();
		let centroid = session.field.centroids[2];
		let cells = session.packing_grid.cells(2).to_vec();

		assert!(!session.try_move(2, [8.0, 8.0, 8.0]));
		assert_eq!(session.packing_grid.current_error().to_bits(), error.to_bits());
		assert_eq!(session.field.centroids[2], centroid);
		assert_eq!(session.packing_grid.cells(2), &cells[..]);
		assert!(session.packing_grid.is_placed(2));
	}

	#[test]
	fn separating_stacked_grains_is_accepted() {
		let config = PackingConfig::new().with_dims(32, 32, 32);
		let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();
		session.field.transfer_attributes(&sphere(8.0));
		session.field.transfer_attributes(&sphere(8.0));
		place_at(&mut session, 1, [8.0, 8.0, 8.0]);
		place_at(&mut session, 2, [8.0, 8.0, 8.0]);
		let stacked = session.packing_grid.current_error();

		assert!(session.try_move(2, [24.0, 24.0, 24.0]));
		assert!(session.packing_grid.current_error() < stacked);
		assert_eq!(session.field.centroids[2], [24.0, 24.0, 24.0]);
	}

	#[test]
	fn improvement_runs_full_budget_at_zero_error() {
		// One coarse cell, covered by the only grain: the filling error is already 0
		let mut config = PackingConfig::new().with_dims(2, 2, 2).with_adjustments_per_grain(5);
		config.diagnostic_interval = 1;
		let mut session = PackingSession::new(config, equiaxed_stats()).unwrap();
		session.field.transfer_attributes(&sphere(4.0));
		place_at(&mut session, 1, [1.0, 1.0, 1.0]);
		assert_eq!(session.packing_grid.current_error(), 0.0);

		session.improve_packing().unwrap();
		let records = &session.diagnostics.records;
		assert_eq!(records.len(), 5);
		for (iteration, record) in records.iter().enumerate() {
			assert_eq!(record.iteration, iteration);
			assert_eq!(record.filling_error, 0.0);
		}
		assert_eq!(session.packing_grid.current_error(), 0.0);
	}

	#[test]
	fn neighbour_targets_do_not_steer_moves() {
		let run = |neighbor_params: Option<PowerLawParams>| {
			let mut phase = PhaseStatistics::equiaxed(1.5, 0.15, 2.0, 2.0, 0.5);
			if let Some(params) = neighbor_params {
				phase.neighbor_params = vec![params; phase.neighbor_params.len()];
			}
			let config = PackingConfig::new()
				.with_dims(16, 16, 16)
				.with_periodic(true)
				.with_seed(13)
				.with_adjustments_per_grain(5);
			let mut session = PackingSession::new(config, StatsCollection::new(vec![phase])).unwrap();
			session.seed_grains().unwrap();
			session.place_grains().unwrap();
			let accepted = session.improve_packing().unwrap();
			(accepted, session.field.centroids.clone(), session.neighbor_affinity)
		};
		let (accepted_a, centroids_a, affinity_a) = run(None);
		let (accepted_b, centroids_b, affinity_b) = run(Some(PowerLawParams::new(0.5, 0.0, 3.0)));

		assert_eq!(accepted_a, accepted_b);
		assert_eq!(centroids_a, centroids_b);
		assert_ne!(affinity_a, affinity_b);
	}
}
