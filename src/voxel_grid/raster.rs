use crate::packing::field::FieldSet;
use crate::packing::shapes::GrainBody;
use crate::packing::stats::StatsCollection;
use crate::voxel_grid::grid::VoxelGrid;

impl VoxelGrid {
	/// Voxels covered by `body`, with their membership scores.
	/// The bounding box spans the primary radius; periodic boxes may reach one extent past either
	/// face and wrap back in, open boxes are clamped to the grid. Voxels for which `skip` returns
	/// true are not evaluated.
	pub fn scan_body(&self, body: &GrainBody, periodic: bool, skip: impl Fn(usize) -> bool) -> Vec<(usize, f32)> {
		let radius = body.primary_radius();
		let cutoff = radius * radius;
		let lens = [self.len_i as i64, self.len_j as i64, self.len_k as i64];

		let mut lo = [0i64; 3];
		let mut hi = [0i64; 3];
		for axis in 0..3 {
			let res = self.resolution[axis];
			let n = lens[axis];
			let center = ((body.centroid[axis] - res / 2.0) / res) as i64;
			let half = (radius / res + 1.0) as i64;
			if periodic {
				lo[axis] = (center - half).max(-n);
				hi[axis] = (center + half).min(2 * n - 1);
			} else {
				lo[axis] = (center - half).max(0);
				hi[axis] = (center + half).min(n - 1);
			}
		}

		let mut covered = Vec::new();
		for iter_k in lo[2]..=hi[2] {
			let Some(k) = self.wrap_axis(iter_k, 2, periodic) else { continue };
			let dz = iter_k as f32 * self.resolution[2] - body.centroid[2];
			for iter_j in lo[1]..=hi[1] {
				let Some(j) = self.wrap_axis(iter_j, 1, periodic) else { continue };
				let dy = iter_j as f32 * self.resolution[1] - body.centroid[1];
				for iter_i in lo[0]..=hi[0] {
					let Some(i) = self.wrap_axis(iter_i, 0, periodic) else { continue };
					let index = self.ijk_to_index(i, j, k);
					if skip(index) {
						continue;
					}
					let dx = iter_i as f32 * self.resolution[0] - body.centroid[0];
					if dx * dx + dy * dy + dz * dz >= cutoff {
						continue;
					}
					let inside = body.inside_offset(dx, dy, dz);
					if inside >= 0.0 {
						covered.push((index, inside));
					}
				}
			}
		}
		covered
	}

	/// Rasterize every active grain into the grid.
	///
	/// An unclaimed voxel goes to the grain covering it. A voxel claimed by a different grain
	/// becomes contested (-1) and is taken off that grain's count; contested voxels stay
	/// contested. Grains left without voxels are deactivated. Returns the voxel count per grain id.
	pub fn assign_voxels(&mut self, field: &mut FieldSet, stats: &StatsCollection, periodic: bool) -> Vec<usize> {
		let mut sizes = vec![0usize; field.num_grains() + 1];
		let grains: Vec<usize> = field.active_grains().collect();

		for &gid in grains.iter() {
			let body = GrainBody::from_field(field, gid, stats.shape_type(field.phases[gid]));
			let owner_id = gid as i32;
			for (index, _) in self.scan_body(&body, periodic, |_| false) {
				let owner = self.grain_ids[index];
				if owner == owner_id {
					continue;
				}
				if owner > 0 {
					sizes[owner as usize] -= 1;
					self.grain_ids[index] = -1;
				} else if owner == 0 {
					self.grain_ids[index] = owner_id;
					sizes[gid] += 1;
				}
			}
		}

		for &gid in grains.iter() {
			if sizes[gid] == 0 {
				field.deactivate(gid);
			}
		}
		sizes
	}
}
