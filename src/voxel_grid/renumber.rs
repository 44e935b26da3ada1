use crate::packing::field::FieldSet;
use crate::voxel_grid::grid::VoxelGrid;

impl VoxelGrid {
	/// Compact the active grains to ids `1..=M` and rewrite the voxel ids to match.
	/// Returns the old to new id map (0 for dropped grains).
	pub fn renumber_grains(&mut self, field: &mut FieldSet) -> Vec<usize> {
		let map = field.retain_active();
		for id in self.grain_ids.iter_mut() {
			if *id > 0 {
				*id = map.get(*id as usize).copied().unwrap_or(0) as i32;
			}
		}
		self.update_phases(&field.phases);
		map
	}
}
