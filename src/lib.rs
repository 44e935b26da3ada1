pub mod voxel_grid {
	pub mod info;
	pub mod grid;
	pub mod utils;
	pub mod raster;
	pub mod gaps;
	pub mod cleanup;
	pub mod renumber;
	pub mod mrc_output;
}

pub mod packing {
	pub mod error;
	pub mod config;
	pub mod stats;
	pub mod shapes;
	pub mod orientation;
	pub mod field;
	pub mod generator;
	pub mod packing_grid;
	pub mod distributions;
	pub mod diagnostics;
	pub mod session;
	pub mod optimizer;
}

pub use packing::config::PackingConfig;
pub use packing::error::{PackError, Result};
pub use packing::session::{PackingSession, PackingSummary};
pub use packing::stats::{PhaseStatistics, StatsCollection};
