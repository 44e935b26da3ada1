use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use bitvec::vec::BitVec;

use crate::packing::config::PackingConfig;
use crate::packing::shapes::GrainBody;

/// Coarse occupancy lattice at twice the voxel spacing, used while grains are positioned.
///
/// Each grain keeps the coarse cells its shape covers; a cell list is computed once on insertion
/// and afterwards only translated. The filling error `sum((occ - 1)^2)` is kept as an exact
/// integer, so adding and then removing a grain restores the previous value bit for bit.
#[derive(Debug, Clone)]
pub struct PackingGrid {
	/// Cells along each axis.
	pub dims: [usize; 3],
	/// Physical size of one cell.
	pub resolution: [f32; 3],
	pub periodic: bool,
	occupancy: Vec<u32>,
	/// `sum((occ - 1)^2)` over every cell.
	raw_error: i64,
	/// Unwrapped cell coordinates covered by each grain, indexed by grain id.
	cell_lists: Vec<Vec<[i32; 3]>>,
	/// Grains whose cells are currently counted in `occupancy`.
	placed: BitVec,
	pack_qualities: Vec<f32>,
}

impl PackingGrid {
	pub fn new(config: &PackingConfig) -> Self {
		let dims = [
			(config.dims[0] / 2).max(1),
			(config.dims[1] / 2).max(1),
			(config.dims[2] / 2).max(1),
		];
		let total = dims[0] * dims[1] * dims[2];
		Self {
			dims,
			resolution: [config.resolution[0] * 2.0, config.resolution[1] * 2.0, config.resolution[2] * 2.0],
			periodic: config.periodic,
			occupancy: vec![0; total],
			raw_error: total as i64,
			cell_lists: vec![Vec::new()],
			placed: BitVec::repeat(false, 1),
			pack_qualities: vec![0.0],
		}
	}

	#[inline]
	pub fn total_cells(&self) -> usize {
		self.occupancy.len()
	}

	/// Normalized filling error; 1.0 for an empty grid.
	#[inline]
	pub fn current_error(&self) -> f32 {
		(self.raw_error as f64 / self.total_cells() as f64) as f32
	}

	pub fn occupancy(&self, i: usize, j: usize, k: usize) -> u32 {
		self.occupancy[i + j * self.dims[0] + k * self.dims[0] * self.dims[1]]
	}

	/// Covered cells of grain `gid` in unwrapped coordinates.
	pub fn cells(&self, gid: usize) -> &[[i32; 3]] {
		self.cell_lists.get(gid).map(|c| c.as_slice()).unwrap_or(&[])
	}

	pub fn is_placed(&self, gid: usize) -> bool {
		gid < self.placed.len() && self.placed[gid]
	}

	/// Mean squared occupancy met by grain `gid` the last time it was added.
	pub fn pack_quality(&self, gid: usize) -> f32 {
		self.pack_qualities.get(gid).copied().unwrap_or(0.0)
	}

	fn ensure_slot(&mut self, gid: usize) {
		if gid >= self.cell_lists.len() {
			self.cell_lists.resize_with(gid + 1, Vec::new);
			self.placed.resize(gid + 1, false);
			self.pack_qualities.resize(gid + 1, 0.0);
		}
	}

	/// Centre cell of a coordinate along `axis`.
	#[inline]
	fn center_cell(&self, coord: f32, axis: usize) -> i32 {
		let res = self.resolution[axis];
		((coord - res / 2.0) / res) as i32
	}

	/// Compute and store the cell list of grain `gid` posed as `body`.
	/// The grain is not counted in the occupancy until it is added.
	pub fn insert_grain(&mut self, gid: usize, body: &GrainBody) {
		self.ensure_slot(gid);
		let radius = body.primary_radius();
		let mut lo = [0i32; 3];
		let mut hi = [0i32; 3];
		for axis in 0..3 {
			let n = self.dims[axis] as i32;
			let center = self.center_cell(body.centroid[axis], axis);
			let half = (radius / self.resolution[axis] + 1.0) as i32;
			lo[axis] = (center - half).max(-n);
			hi[axis] = (center + half).min(2 * n - 1);
		}

		let mut cells = Vec::new();
		for col in lo[0]..=hi[0] {
			let dx = col as f32 * self.resolution[0] - body.centroid[0];
			for row in lo[1]..=hi[1] {
				let dy = row as f32 * self.resolution[1] - body.centroid[1];
				for plane in lo[2]..=hi[2] {
					let dz = plane as f32 * self.resolution[2] - body.centroid[2];
					if body.inside_offset(dx, dy, dz) >= 0.0 {
						cells.push([col, row, plane]);
					}
				}
			}
		}
		self.cell_lists[gid] = cells;
	}

	/// Linear index of a stored cell, or `None` when it falls outside a non-periodic grid.
	#[inline]
	fn resolve(&self, cell: &[i32; 3]) -> Option<usize> {
		let mut idx = [0usize; 3];
		for axis in 0..3 {
			let n = self.dims[axis] as i32;
			let c = cell[axis];
			if self.periodic {
				idx[axis] = c.rem_euclid(n) as usize;
			} else if c < 0 || c >= n {
				return None;
			} else {
				idx[axis] = c as usize;
			}
		}
		Some(idx[0] + idx[1] * self.dims[0] + idx[2] * self.dims[0] * self.dims[1])
	}

	/// Count grain `add` into the occupancy and/or take grain `remove` out of it, returning the
	/// updated normalized filling error. Adding a grain that is already counted, or removing one
	/// that is not, leaves the grid untouched.
	pub fn filling_error(&mut self, add: Option<usize>, remove: Option<usize>) -> f32 {
		if let Some(gid) = add {
			if gid != 0 && gid < self.cell_lists.len() && !self.placed[gid] {
				let cells = std::mem::take(&mut self.cell_lists[gid]);
				let mut quality = 0.0f64;
				for cell in cells.iter() {
					if let Some(idx) = self.resolve(cell) {
						let occ = self.occupancy[idx] as i64;
						self.raw_error += 2 * occ - 1;
						quality += (occ * occ) as f64;
						self.occupancy[idx] += 1;
					}
				}
				self.pack_qualities[gid] = if cells.is_empty() { 0.0 } else { (quality / cells.len() as f64) as f32 };
				self.cell_lists[gid] = cells;
				self.placed.set(gid, true);
			}
		}
		if let Some(gid) = remove {
			if gid != 0 && gid < self.cell_lists.len() && self.placed[gid] {
				let cells = std::mem::take(&mut self.cell_lists[gid]);
				for cell in cells.iter() {
					if let Some(idx) = self.resolve(cell) {
						let occ = self.occupancy[idx] as i64;
						self.raw_error += -2 * occ + 3;
						self.occupancy[idx] -= 1;
					}
				}
				self.cell_lists[gid] = cells;
				self.placed.set(gid, false);
			}
		}
		self.current_error()
	}

	/// Translate the stored cells of grain `gid` from centroid `old` to centroid `new`.
	/// Call this only while the grain is removed from the occupancy.
	pub fn move_grain(&mut self, gid: usize, old: [f32; 3], new: [f32; 3]) {
		if gid >= self.cell_lists.len() {
			return;
		}
		let mut shift = [0i32; 3];
		for axis in 0..3 {
			shift[axis] = self.center_cell(new[axis], axis) - self.center_cell(old[axis], axis);
		}
		if shift == [0, 0, 0] {
			return;
		}
		for cell in self.cell_lists[gid].iter_mut() {
			cell[0] += shift[0];
			cell[1] += shift[1];
			cell[2] += shift[2];
		}
	}

	/// Write the occupancy counters as ASCII VTK structured points.
	pub fn write_vtk(&self, path: &Path) -> io::Result<()> {
		let mut out = BufWriter::new(File::create(path)?);
		writeln!(out, "# vtk DataFile Version 2.0")?;
		writeln!(out, "Packing grid occupancy")?;
		writeln!(out, "ASCII")?;
		writeln!(out, "DATASET STRUCTURED_POINTS")?;
		writeln!(out, "DIMENSIONS {} {} {}", self.dims[0], self.dims[1], self.dims[2])?;
		writeln!(out, "ORIGIN 0.0 0.0 0.0")?;
		writeln!(out, "SPACING {} {} {}", self.resolution[0], self.resolution[1], self.resolution[2])?;
		writeln!(out, "POINT_DATA {}", self.total_cells())?;
		writeln!(out)?;
		writeln!(out, "SCALARS Occupancy int 1")?;
		writeln!(out, "LOOKUP_TABLE default")?;
		for row in self.occupancy.chunks(20) {
			let line: Vec<String> = row.iter().map(|occ| occ.to_string()).collect();
			writeln!(out, "{}", line.join(" "))?;
		}
		out.flush()
	}
}
