use std::mem::size_of;
use crate::voxel_grid::grid;

/// Format large numbers with KB, MB, GB, TB suffixes
fn format_bytes(bytes: usize) -> String {
	const KB: usize = 1024;
	const MB: usize = KB * 1024;
	const GB: usize = MB * 1024;
	const TB: usize = GB * 1024;

	if bytes >= TB {
		format!("{:.2} TB", bytes as f64 / TB as f64)
	} else if bytes >= GB {
		format!("{:.2} GB", bytes as f64 / GB as f64)
	} else if bytes >= MB {
		format!("{:.2} MB", bytes as f64 / MB as f64)
	} else if bytes >= KB {
		format!("{:.2} KB", bytes as f64 / KB as f64)
	} else {
		format!("{} bytes", bytes)
	}
}

impl grid::VoxelGrid {
	/// Report memory usage and print a detailed breakdown
	pub fn report_memory(&self) {
		let struct_overhead = size_of::<Self>() - 2 * size_of::<Vec<u8>>(); // Exclude dynamic storage
		let id_bytes = self.grain_ids.capacity() * size_of::<i32>();
		let phase_bytes = self.phases.capacity() * size_of::<usize>();
		let total_memory = struct_overhead + id_bytes + phase_bytes;

		eprintln!("VoxelGrid Memory Report:");
		eprintln!("-------------------------");
		eprintln!("  Dimensions: {} x {} x {}", self.len_i, self.len_j, self.len_k);
		eprintln!("  Total Voxels: {:e}", self.total_voxels as f64); // Scientific notation
		eprintln!(
			"  Resolution: {:.2} x {:.2} x {:.2}",
			self.resolution[0], self.resolution[1], self.resolution[2]
		);
		eprintln!("  Struct Overhead: {}", format_bytes(struct_overhead));
		eprintln!("  Grain Ids: {}", format_bytes(id_bytes));
		eprintln!("  Phases: {}", format_bytes(phase_bytes));
		eprintln!("  Total Memory Used: {}", format_bytes(total_memory));
		eprintln!("-------------------------");
	}

	/// Convert (i, j, k) to a linear index
	#[inline]
	pub fn ijk_to_index(&self, i: usize, j: usize, k: usize) -> usize {
		i + j * self.len_i + k * self.len_i * self.len_j
	}

	/// Convert a linear index back to (i, j, k)
	#[inline]
	pub fn index_to_ijk(&self, index: usize) -> (usize, usize, usize) {
		let k = index / (self.len_i * self.len_j);
		let j = (index % (self.len_i * self.len_j)) / self.len_i;
		let i = index % self.len_i;
		(i, j, k)
	}

	/// Grain id of a voxel using (i, j, k) coordinates
	#[inline]
	pub fn grain_id_ijk(&self, i: usize, j: usize, k: usize) -> i32 {
		self.grain_ids[self.ijk_to_index(i, j, k)]
	}

	/// Map a possibly out-of-range signed coordinate onto the grid, wrapping when periodic
	#[inline]
	pub fn wrap_axis(&self, c: i64, axis: usize, periodic: bool) -> Option<usize> {
		let n = match axis {
			0 => self.len_i,
			1 => self.len_j,
			_ => self.len_k,
		} as i64;
		if periodic {
			Some(c.rem_euclid(n) as usize)
		} else if c < 0 || c >= n {
			None
		} else {
			Some(c as usize)
		}
	}

	/// Face neighbours of a voxel, wrapped across faces when periodic
	pub fn face_neighbors(&self, index: usize, periodic: bool) -> Vec<usize> {
		let (i, j, k) = self.index_to_ijk(index);
		let (i, j, k) = (i as i64, j as i64, k as i64);
		let steps = [(-1, 0, 0), (1, 0, 0), (0, -1, 0), (0, 1, 0), (0, 0, -1), (0, 0, 1)];
		let mut neighbors = Vec::with_capacity(6);
		for (di, dj, dk) in steps {
			let ni = self.wrap_axis(i + di, 0, periodic);
			let nj = self.wrap_axis(j + dj, 1, periodic);
			let nk = self.wrap_axis(k + dk, 2, periodic);
			if let (Some(ni), Some(nj), Some(nk)) = (ni, nj, nk) {
				let neighbor = self.ijk_to_index(ni, nj, nk);
				if neighbor != index {
					neighbors.push(neighbor);
				}
			}
		}
		neighbors
	}

	/// True when the voxel lies on one of the six domain faces
	#[inline]
	pub fn on_boundary(&self, index: usize) -> bool {
		let (i, j, k) = self.index_to_ijk(index);
		i == 0 || j == 0 || k == 0 || i + 1 == self.len_i || j + 1 == self.len_j || k + 1 == self.len_k
	}

	/// Count voxels that no grain owns (id 0 or -1)
	pub fn count_unassigned(&self) -> usize {
		self.grain_ids.iter().filter(|&&id| id <= 0).count()
	}

	/// Voxel count of every grain id in `0..num_slots`; slot 0 stays 0
	pub fn grain_voxel_counts(&self, num_slots: usize) -> Vec<usize> {
		let mut counts = vec![0usize; num_slots];
		for &id in self.grain_ids.iter() {
			if id > 0 && (id as usize) < num_slots {
				counts[id as usize] += 1;
			}
		}
		counts
	}

	/// Refresh the per-voxel phase array from the grain phases
	pub fn update_phases(&mut self, grain_phases: &[usize]) {
		for (phase, &id) in self.phases.iter_mut().zip(self.grain_ids.iter()) {
			*phase = if id > 0 { grain_phases.get(id as usize).copied().unwrap_or(0) } else { 0 };
		}
	}
}
