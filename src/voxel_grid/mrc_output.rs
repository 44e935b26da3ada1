use std::fs::File;
use std::io::{BufWriter, Result, Write};
use std::path::Path;

use crate::voxel_grid::grid;

/// MRC Header Struct
#[derive(Debug)]
pub struct MRCHeader {
	len_i: i32, len_j: i32, len_k: i32,  // Grid dimensions
	mode: i32,                  // Data mode (2: float32)
	istart: i32, jstart: i32, kstart: i32,  // Start positions
	m_i: i32, m_j: i32, m_k: i32,  // Grid size
	x_length: f32, y_length: f32, z_length: f32,  // Physical size
	alpha: f32, beta: f32, gamma: f32,  // Angles
	mapc: i32, mapr: i32, maps: i32,  // Axis mapping
	amin: f32, amax: f32, amean: f32,  // Data range
	ispg: i32, nsymbt: i32,  // Symmetry
	extra: [i32; 25],  // User space
	xorigin: f32, yorigin: f32, zorigin: f32,  // Origin
	map: [u8; 4], machst: [u8; 4], rms: f32, nlabl: i32,  // Metadata
	label: [[u8; 80]; 10],  // Labels
}

/// Size of the fixed MRC header in bytes
pub const MRC_HEADER_BYTES: usize = 1024;

impl MRCHeader {
	/// Create a new float32 header for a grid with the given value range
	pub fn new(len_i: usize, len_j: usize, len_k: usize, resolution: [f32; 3], amin: f32, amax: f32, amean: f32) -> Self {
		let mut label = [[0u8; 80]; 10];
		let text = b"grain ids";
		label[0][..text.len()].copy_from_slice(text);
		MRCHeader {
			len_i: len_i as i32, len_j: len_j as i32, len_k: len_k as i32,
			mode: 2,  // FLOAT32 mode
			istart: 0, jstart: 0, kstart: 0,
			m_i: len_i as i32, m_j: len_j as i32, m_k: len_k as i32,
			x_length: (len_i as f32) * resolution[0],
			y_length: (len_j as f32) * resolution[1],
			z_length: (len_k as f32) * resolution[2],
			alpha: 90.0, beta: 90.0, gamma: 90.0,
			mapc: 1, mapr: 2, maps: 3,
			amin, amax, amean,
			ispg: 0, nsymbt: 0,
			extra: [0; 25],
			xorigin: 0.0, yorigin: 0.0, zorigin: 0.0,
			map: *b"MAP ",
			machst: [0x44, 0x44, 0x00, 0x00],  // little-endian stamp
			rms: 0.0,
			nlabl: 1,
			label,
		}
	}

	/// Write the header as 1024 little-endian bytes
	pub fn write_to(&self, out: &mut impl Write) -> Result<()> {
		let ints = [
			self.len_i, self.len_j, self.len_k, self.mode,
			self.istart, self.jstart, self.kstart,
			self.m_i, self.m_j, self.m_k,
		];
		for v in ints {
			out.write_all(&v.to_le_bytes())?;
		}
		let floats = [
			self.x_length, self.y_length, self.z_length,
			self.alpha, self.beta, self.gamma,
		];
		for v in floats {
			out.write_all(&v.to_le_bytes())?;
		}
		for v in [self.mapc, self.mapr, self.maps] {
			out.write_all(&v.to_le_bytes())?;
		}
		for v in [self.amin, self.amax, self.amean] {
			out.write_all(&v.to_le_bytes())?;
		}
		for v in [self.ispg, self.nsymbt] {
			out.write_all(&v.to_le_bytes())?;
		}
		for v in self.extra {
			out.write_all(&v.to_le_bytes())?;
		}
		for v in [self.xorigin, self.yorigin, self.zorigin] {
			out.write_all(&v.to_le_bytes())?;
		}
		out.write_all(&self.map)?;
		out.write_all(&self.machst)?;
		out.write_all(&self.rms.to_le_bytes())?;
		out.write_all(&self.nlabl.to_le_bytes())?;
		for line in self.label.iter() {
			out.write_all(line)?;
		}
		Ok(())
	}
}

impl grid::VoxelGrid {
	/// Save the grain ids as an MRC float32 volume
	pub fn write_to_mrc_file(&self, path: &Path) -> Result<()> {
		let mut out = BufWriter::new(File::create(path)?);

		let (mut amin, mut amax, mut total) = (f32::MAX, f32::MIN, 0.0f64);
		for &id in self.grain_ids.iter() {
			let v = id as f32;
			amin = amin.min(v);
			amax = amax.max(v);
			total += v as f64;
		}
		if self.grain_ids.is_empty() {
			amin = 0.0;
			amax = 0.0;
		}
		let amean = (total / self.total_voxels.max(1) as f64) as f32;

		let header = MRCHeader::new(self.len_i, self.len_j, self.len_k, self.resolution, amin, amax, amean);
		header.write_to(&mut out)?;

		for &id in self.grain_ids.iter() {
			out.write_all(&(id as f32).to_le_bytes())?;
		}
		out.flush()
	}
}
