use bitvec::vec::BitVec;

use crate::packing::generator::GrainDescriptor;

/// Parallel per-grain attribute arrays indexed by grain id.
///
/// Index 0 is reserved and never describes a grain, so every array always holds
/// `num_grains() + 1` entries and they grow together.
#[derive(Debug, Clone)]
pub struct FieldSet {
	pub volumes: Vec<f32>,
	pub equivalent_diameters: Vec<f32>,
	/// `[1, b/a, c/a]`
	pub axis_lengths: Vec<[f32; 3]>,
	pub axis_euler_angles: Vec<[f32; 3]>,
	pub omega3s: Vec<f32>,
	pub phases: Vec<usize>,
	pub centroids: Vec<[f32; 3]>,
	/// Neighbour counts in the three distance shells.
	pub neighborhoods: Vec<[i32; 3]>,
	pub active: BitVec,
	/// Mean squared coarse-cell occupancy seen when the grain was last added.
	pub pack_qualities: Vec<f32>,
}

impl Default for FieldSet {
	fn default() -> Self {
		Self {
			volumes: vec![0.0],
			equivalent_diameters: vec![0.0],
			axis_lengths: vec![[0.0; 3]],
			axis_euler_angles: vec![[0.0; 3]],
			omega3s: vec![0.0],
			phases: vec![0],
			centroids: vec![[0.0; 3]],
			neighborhoods: vec![[0; 3]],
			active: BitVec::repeat(false, 1),
			pack_qualities: vec![0.0],
		}
	}
}

impl FieldSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Number of grains ever transferred, active or not.
	#[inline]
	pub fn num_grains(&self) -> usize {
		self.volumes.len() - 1
	}

	#[inline]
	pub fn is_active(&self, gid: usize) -> bool {
		gid != 0 && gid < self.active.len() && self.active[gid]
	}

	pub fn deactivate(&mut self, gid: usize) {
		if gid != 0 && gid < self.active.len() {
			self.active.set(gid, false);
		}
	}

	/// Ids of the active grains in ascending order.
	pub fn active_grains(&self) -> impl Iterator<Item = usize> + '_ {
		self.active.iter_ones().filter(|&gid| gid != 0)
	}

	pub fn num_active(&self) -> usize {
		self.active_grains().count()
	}

	/// Copy a generated descriptor into the next grain id and activate it.
	/// The centroid starts at the origin until the optimizer places the grain.
	pub fn transfer_attributes(&mut self, grain: &GrainDescriptor) -> usize {
		let gid = self.volumes.len();
		self.volumes.push(grain.volume);
		self.equivalent_diameters.push(grain.equivalent_diameter);
		self.axis_lengths.push(grain.axis_lengths);
		self.axis_euler_angles.push(grain.axis_euler_angles);
		self.omega3s.push(grain.omega3);
		self.phases.push(grain.phase);
		self.centroids.push([0.0; 3]);
		self.neighborhoods.push(grain.neighborhoods);
		self.active.push(true);
		self.pack_qualities.push(0.0);
		gid
	}

	/// Drop inactive grains and compact the survivors to ids `1..=M`, preserving order.
	/// Returns the old to new id map; dropped grains (and id 0) map to 0.
	pub fn retain_active(&mut self) -> Vec<usize> {
		let mut map = vec![0usize; self.volumes.len()];
		let mut next = 1usize;
		for old in 1..self.volumes.len() {
			if !self.active[old] {
				continue;
			}
			map[old] = next;
			if old != next {
				self.volumes[next] = self.volumes[old];
				self.equivalent_diameters[next] = self.equivalent_diameters[old];
				self.axis_lengths[next] = self.axis_lengths[old];
				self.axis_euler_angles[next] = self.axis_euler_angles[old];
				self.omega3s[next] = self.omega3s[old];
				self.phases[next] = self.phases[old];
				self.centroids[next] = self.centroids[old];
				self.neighborhoods[next] = self.neighborhoods[old];
				self.pack_qualities[next] = self.pack_qualities[old];
			}
			next += 1;
		}
		self.volumes.truncate(next);
		self.equivalent_diameters.truncate(next);
		self.axis_lengths.truncate(next);
		self.axis_euler_angles.truncate(next);
		self.omega3s.truncate(next);
		self.phases.truncate(next);
		self.centroids.truncate(next);
		self.neighborhoods.truncate(next);
		self.pack_qualities.truncate(next);
		self.active = BitVec::repeat(true, next);
		self.active.set(0, false);
		map
	}
}
