use std::collections::VecDeque;
use std::f32::consts::PI;

use bitvec::vec::BitVec;

use crate::packing::error::{PackError, Result};
use crate::packing::field::FieldSet;
use crate::packing::stats::StatsCollection;
use crate::voxel_grid::grid::VoxelGrid;

/// What a cleanup run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
	/// Fragment scans followed by gap-fill.
	pub passes: usize,
	/// Voxels invalidated over all scans.
	pub invalidated: usize,
	/// Voxels handed to a neighbouring grain after the last scan.
	pub regrown: usize,
}

impl VoxelGrid {
	/// Face-connected component of grain voxels containing `seed`, and whether it reaches a face
	/// of the domain. Every voxel of the component is marked in `checked`.
	fn flood_component(&self, seed: usize, periodic: bool, checked: &mut BitVec) -> (Vec<usize>, bool) {
		let gid = self.grain_ids[seed];
		let mut component = vec![seed];
		let mut queue = VecDeque::from([seed]);
		let mut touches_surface = false;
		checked.set(seed, true);

		while let Some(index) = queue.pop_front() {
			if self.on_boundary(index) {
				touches_surface = true;
			}
			for neighbor in self.face_neighbors(index, periodic) {
				if !checked[neighbor] && self.grain_ids[neighbor] == gid {
					checked.set(neighbor, true);
					component.push(neighbor);
					queue.push_back(neighbor);
				}
			}
		}
		(component, touches_surface)
	}

	/// Keep one face-connected component per grain and invalidate every other component.
	///
	/// When a grain shows up in several components the larger one survives (ties keep the one
	/// found first). A grain's first component is also dropped when it holds fewer than
	/// `min_sizes[phase]` voxels and does not reach a face of the domain. Returns the number of
	/// voxels set to -1.
	pub fn remove_fragments(&mut self, field: &FieldSet, min_sizes: &[usize], periodic: bool) -> usize {
		let mut checked = BitVec::repeat(false, self.total_voxels);
		let mut kept: Vec<Vec<usize>> = vec![Vec::new(); field.num_grains() + 1];
		let mut invalidated = 0usize;

		for seed in 0..self.total_voxels {
			if checked[seed] || self.grain_ids[seed] <= 0 {
				continue;
			}
			let gid = self.grain_ids[seed] as usize;
			let (component, touches_surface) = self.flood_component(seed, periodic, &mut checked);

			let doomed = if !kept[gid].is_empty() {
				if kept[gid].len() < component.len() {
					std::mem::replace(&mut kept[gid], component)
				} else {
					component
				}
			} else {
				let min_size = min_sizes.get(field.phases[gid]).copied().unwrap_or(0);
				if component.len() >= min_size || touches_surface {
					kept[gid] = component;
					Vec::new()
				} else {
					component
				}
			};

			invalidated += doomed.len();
			for index in doomed {
				self.grain_ids[index] = -1;
			}
		}
		invalidated
	}

	/// Hand every voxel with id <= 0 to an adjacent grain, one ring per round. A voxel takes the
	/// id most common among its owned face neighbours, the smallest id on a tie. Returns the
	/// number of voxels assigned.
	pub fn grow_from_neighbors(&mut self, periodic: bool) -> Result<usize> {
		let mut grown = 0usize;
		loop {
			let remaining = self.count_unassigned();
			if remaining == 0 {
				return Ok(grown);
			}
			let snapshot = self.grain_ids.clone();
			let mut progress = 0usize;
			for index in 0..self.total_voxels {
				if snapshot[index] > 0 {
					continue;
				}
				let mut candidates: Vec<i32> = self
					.face_neighbors(index, periodic)
					.into_iter()
					.map(|n| snapshot[n])
					.filter(|&id| id > 0)
					.collect();
				if candidates.is_empty() {
					continue;
				}
				candidates.sort_unstable();
				let mut best = (0usize, 0i32);
				let mut run = 0usize;
				for (pos, &id) in candidates.iter().enumerate() {
					run = if pos > 0 && candidates[pos - 1] == id { run + 1 } else { 1 };
					if run > best.0 {
						best = (run, id);
					}
				}
				self.grain_ids[index] = best.1;
				progress += 1;
			}
			if progress == 0 {
				return Err(PackError::NoActiveGrains(remaining));
			}
			grown += progress;
		}
	}

	/// Remove detached fragments and undersized interior grains, refilling what they leave.
	///
	/// Scans and gap-fill alternate up to `max_passes` times while a scan still invalidates
	/// voxels. If fragments survive that, a last scan is followed by neighbour growth. Grains
	/// that end up without voxels are deactivated and the voxel phases are refreshed.
	///
	/// Inflating a non-ellipsoid grain in gap-fill tends to re-create the fragments the scan just
	/// removed, so with super-ellipsoid, cube-octahedron or cylinder grains the passes usually run
	/// out and neighbour growth is what removes the last fragments and undersized interior grains.
	pub fn cleanup_grains(
		&mut self,
		field: &mut FieldSet,
		stats: &StatsCollection,
		periodic: bool,
		max_passes: usize,
	) -> Result<CleanupReport> {
		let voxel_volume = self.voxel_volume();
		let mut min_sizes = vec![0usize; stats.num_phase_slots()];
		for (phase, slot) in min_sizes.iter_mut().enumerate().skip(1) {
			let min_diameter = stats.phase(phase).min_diameter;
			*slot = (PI / 6.0 * min_diameter.powi(3) / voxel_volume) as usize;
		}

		let mut report = CleanupReport::default();
		let mut settled = false;
		for _ in 0..max_passes {
			let invalidated = self.remove_fragments(field, &min_sizes, periodic);
			report.passes += 1;
			report.invalidated += invalidated;
			if invalidated == 0 {
				settled = true;
				break;
			}
			self.assign_gaps(field, stats, periodic)?;
		}
		if !settled {
			let invalidated = self.remove_fragments(field, &min_sizes, periodic);
			report.invalidated += invalidated;
			if self.count_unassigned() > 0 {
				report.regrown = self.grow_from_neighbors(periodic)?;
			}
		}

		let counts = self.grain_voxel_counts(field.num_grains() + 1);
		let active: Vec<usize> = field.active_grains().collect();
		for gid in active {
			if counts[gid] == 0 {
				field.deactivate(gid);
			}
		}
		self.update_phases(&field.phases);
		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::packing::generator::GrainDescriptor;
	use crate::packing::shapes::ShapeType;
	use crate::packing::stats::PhaseStatistics;

	fn stats() -> StatsCollection {
		// min diameter exp(0) = 1, so the minimum interior grain size is 0 voxels
		StatsCollection::new(vec![PhaseStatistics::equiaxed(1.0, 0.5, 2.0, 2.0, 0.5)])
	}

	fn field_with(count: usize) -> FieldSet {
		let mut field = FieldSet::new();
		for _ in 0..count {
			field.transfer_attributes(&GrainDescriptor {
				volume: 1.0,
				equivalent_diameter: 1.0,
				axis_lengths: [1.0, 1.0, 1.0],
				axis_euler_angles: [0.0; 3],
				omega3: 1.0,
				phase: 1,
				neighborhoods: [0; 3],
			});
		}
		field
	}

	#[test]
	fn smaller_fragment_is_invalidated() {
		let mut grid = VoxelGrid::new(6, 1, 1, [1.0; 3]);
		grid.grain_ids = vec![1, 1, 1, 2, 1, 2];
		let field = field_with(2);
		let removed = grid.remove_fragments(&field, &[0, 0], false);
		assert_eq!(removed, 2);
		assert_eq!(grid.grain_ids, vec![1, 1, 1, 2, -1, -1]);
	}

	#[test]
	fn equal_fragments_keep_the_first() {
		let mut grid = VoxelGrid::new(5, 1, 1, [1.0; 3]);
		grid.grain_ids = vec![1, 1, 2, 1, 1];
		let field = field_with(2);
		grid.remove_fragments(&field, &[0, 0], false);
		assert_eq!(grid.grain_ids, vec![1, 1, 2, -1, -1]);
	}

	#[test]
	fn periodic_components_join_across_faces() {
		let mut grid = VoxelGrid::new(5, 1, 1, [1.0; 3]);
		grid.grain_ids = vec![1, 2, 2, 2, 1];
		let field = field_with(2);
		assert_eq!(grid.remove_fragments(&field, &[0, 0], true), 0);
		assert_eq!(grid.remove_fragments(&field, &[0, 0], false), 1);
	}

	#[test]
	fn small_interior_grain_is_dropped() {
		let mut grid = VoxelGrid::new(5, 5, 5, [1.0; 3]);
		grid.grain_ids = vec![1; 125];
		let centre = grid.ijk_to_index(2, 2, 2);
		grid.grain_ids[centre] = 2;
		let field = field_with(2);
		grid.remove_fragments(&field, &[0, 4], false);
		assert_eq!(grid.grain_ids[centre], -1);
	}

	#[test]
	fn neighbour_growth_prefers_majority_then_smallest() {
		let mut grid = VoxelGrid::new(3, 3, 1, [1.0; 3]);
		grid.grain_ids = vec![3, 2, 3, 2, -1, 3, 1, 1, 0];
		let grown = grid.grow_from_neighbors(false).unwrap();
		assert_eq!(grown, 2);
		assert_eq!(grid.grain_id_ijk(1, 1, 0), 2);
		assert_eq!(grid.grain_id_ijk(2, 2, 0), 1);
	}

	#[test]
	fn cleanup_leaves_single_components() {
		let stats = stats();
		let mut grid = VoxelGrid::new(6, 2, 1, [1.0; 3]);
		grid.grain_ids = vec![1, 1, 2, 2, 1, 2, 1, 1, 2, 2, 2, 2];
		let mut field = field_with(2);
		field.centroids[1] = [0.5, 0.5, 0.0];
		field.centroids[2] = [4.0, 0.5, 0.0];
		let report = grid.cleanup_grains(&mut field, &stats, false, 4).unwrap();
		assert!(report.invalidated > 0);
		assert_eq!(grid.count_unassigned(), 0);
		let mut checked = BitVec::repeat(false, grid.total_voxels);
		let mut seen = Vec::new();
		for seed in 0..grid.total_voxels {
			if checked[seed] {
				continue;
			}
			let gid = grid.grain_ids[seed];
			grid.flood_component(seed, false, &mut checked);
			assert!(!seen.contains(&gid), "grain {} split into several components", gid);
			seen.push(gid);
		}
	}

	#[test]
	fn exhausted_passes_fall_back_to_neighbour_growth() {
		let stats = StatsCollection::new(vec![
			PhaseStatistics::equiaxed(1.0, 0.5, 2.0, 2.0, 0.5).with_shape_type(ShapeType::Cylinder),
		]);
		let mut grid = VoxelGrid::new(6, 1, 1, [1.0; 3]);
		grid.grain_ids = vec![1, 1, 1, 2, 1, 2];
		let mut field = field_with(2);

		let report = grid.cleanup_grains(&mut field, &stats, false, 0).unwrap();
		assert_eq!(report, CleanupReport { passes: 0, invalidated: 2, regrown: 2 });
		assert_eq!(grid.grain_ids, vec![1, 1, 1, 2, 2, 2]);
		assert_eq!(grid.phases, vec![1; 6]);
		assert_eq!(field.num_active(), 2);
	}
}
