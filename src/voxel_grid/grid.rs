/// Fine voxel grid holding one grain id per voxel.
///
/// Grain ids: 0 = unclaimed, > 0 = owning grain, -1 = contested or invalidated.
#[derive(Clone)]
pub struct VoxelGrid {
	pub len_i: usize,  // Number of voxels along I
	pub len_j: usize,  // Number of voxels along J
	pub len_k: usize,  // Number of voxels along K
	pub total_voxels: usize, // Total number of voxels IxJxK
	pub resolution: [f32; 3],  // Size of each voxel along X, Y, Z
	pub grain_ids: Vec<i32>,  // Owner of each voxel
	pub phases: Vec<usize>,  // Phase of the owning grain, 0 while unowned
}

impl VoxelGrid {
	/// Create a new voxel grid with every voxel unclaimed
	pub fn new(len_i: usize, len_j: usize, len_k: usize, resolution: [f32; 3]) -> Self {
		let total_voxels = len_i * len_j * len_k;

		Self {
			len_i,
			len_j,
			len_k,
			total_voxels,
			resolution,
			grain_ids: vec![0; total_voxels],
			phases: vec![0; total_voxels],
		}
	}

	/// Physical extent of the grid along X, Y, Z
	pub fn extent(&self) -> [f32; 3] {
		[
			self.len_i as f32 * self.resolution[0],
			self.len_j as f32 * self.resolution[1],
			self.len_k as f32 * self.resolution[2],
		]
	}

	/// Volume of one voxel
	pub fn voxel_volume(&self) -> f32 {
		self.resolution[0] * self.resolution[1] * self.resolution[2]
	}
}
