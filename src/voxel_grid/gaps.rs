use crate::packing::error::{PackError, Result};
use crate::packing::field::FieldSet;
use crate::packing::shapes::GrainBody;
use crate::packing::stats::StatsCollection;
use crate::voxel_grid::grid::VoxelGrid;

/// Radius scale of the first gap-fill pass, and the growth per further pass.
const GAP_START_SCALE: f32 = 1.0;
const GAP_SCALE_STEP: f32 = 0.5;

impl VoxelGrid {
	/// Hand every unclaimed or contested voxel to a grain.
	///
	/// Each pass inflates every active grain by the current scale and scores the voxels with
	/// id <= 0 it covers; the grain scoring a voxel highest takes it at the end of the pass.
	/// Passes repeat with a growing scale until no such voxel remains. Returns the number of
	/// passes run.
	pub fn assign_gaps(&mut self, field: &FieldSet, stats: &StatsCollection, periodic: bool) -> Result<usize> {
		let mut unassigned = self.count_unassigned();
		let mut passes = 0usize;
		if unassigned == 0 {
			self.update_phases(&field.phases);
			return Ok(passes);
		}

		let bodies: Vec<(i32, GrainBody)> = field
			.active_grains()
			.map(|gid| (gid as i32, GrainBody::from_field(field, gid, stats.shape_type(field.phases[gid]))))
			.collect();
		if bodies.is_empty() {
			return Err(PackError::NoActiveGrains(unassigned));
		}

		let mut scale = GAP_START_SCALE;
		let mut new_owners = vec![0i32; self.total_voxels];
		let mut best_scores = vec![-1.0f32; self.total_voxels];
		while unassigned > 0 {
			for (gid, body) in bodies.iter() {
				let grown = body.scaled(scale);
				let ids = &self.grain_ids;
				for (index, inside) in self.scan_body(&grown, periodic, |idx| ids[idx] > 0) {
					if inside > best_scores[index] {
						new_owners[index] = *gid;
						best_scores[index] = inside;
					}
				}
			}

			unassigned = 0;
			for index in 0..self.total_voxels {
				if best_scores[index] >= 0.0 {
					self.grain_ids[index] = new_owners[index];
				}
				if self.grain_ids[index] <= 0 {
					unassigned += 1;
				}
				new_owners[index] = 0;
				best_scores[index] = -1.0;
			}
			scale += GAP_SCALE_STEP;
			passes += 1;
		}

		self.update_phases(&field.phases);
		Ok(passes)
	}
}
