use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use grain_packer::packing::shapes::ShapeType;
use grain_packer::voxel_grid::info;
use grain_packer::{PackingConfig, PackingSession, PhaseStatistics, StatsCollection};

#[derive(Parser)]
#[command(name = "grain_packer")]
#[command(about = "Pack statistically generated grains into a voxel microstructure")]
#[command(version)]
struct Cli {
	/// Voxels along I, J, K
	#[arg(long, num_args = 3, value_names = ["I", "J", "K"], default_values_t = vec![64, 64, 64])]
	dims: Vec<usize>,

	/// Physical size of one voxel
	#[arg(short, long, default_value = "1.0")]
	resolution: f32,

	/// Wrap grains across opposite faces
	#[arg(short, long)]
	periodic: bool,

	/// Random seed
	#[arg(short, long, default_value = "24301")]
	seed: u64,

	/// Mean of ln(diameter)
	#[arg(long, default_value = "2.0")]
	mu: f32,

	/// Standard deviation of ln(diameter)
	#[arg(long, default_value = "0.2")]
	sigma: f32,

	/// Lower diameter cutoff, in sigmas below mu
	#[arg(long, default_value = "3.0")]
	min_cutoff: f32,

	/// Upper diameter cutoff, in sigmas above mu
	#[arg(long, default_value = "3.0")]
	max_cutoff: f32,

	/// Width of one diameter bin
	#[arg(long, default_value = "0.5")]
	bin_step: f32,

	/// Grain shape
	#[arg(long, value_enum, default_value = "ellipsoid")]
	shape: ShapeArg,

	/// Fraction of the domain volume to fill with generated grains
	#[arg(long, default_value = "1.0")]
	target_fraction: f32,

	/// Improvement iterations per grain
	#[arg(long, default_value = "100")]
	adjustments: usize,

	/// Compact grain ids after cleanup
	#[arg(long)]
	renumber: bool,

	/// Output MRC file of grain ids
	#[arg(short, long, default_value = "grains.mrc")]
	output: PathBuf,

	/// Output VTK file of the packing grid occupancy
	#[arg(long)]
	vtk: Option<PathBuf>,

	/// Output file for the improvement diagnostics
	#[arg(long)]
	errors: Option<PathBuf>,

	/// Show progress bars and reports
	#[arg(short, long)]
	verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ShapeArg {
	Ellipsoid,
	SuperEllipsoid,
	CubeOctahedron,
	Cylinder,
}

impl From<ShapeArg> for ShapeType {
	fn from(arg: ShapeArg) -> Self {
		match arg {
			ShapeArg::Ellipsoid => ShapeType::Ellipsoid,
			ShapeArg::SuperEllipsoid => ShapeType::SuperEllipsoid,
			ShapeArg::CubeOctahedron => ShapeType::CubeOctahedron,
			ShapeArg::Cylinder => ShapeType::Cylinder,
		}
	}
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	info::print_banner();
	info::print_compile_info();

	let phase = PhaseStatistics::equiaxed(cli.mu, cli.sigma, cli.min_cutoff, cli.max_cutoff, cli.bin_step)
		.with_shape_type(cli.shape.into());
	let stats = StatsCollection::new(vec![phase]);

	let config = PackingConfig::new()
		.with_dims(cli.dims[0], cli.dims[1], cli.dims[2])
		.with_resolution(cli.resolution)
		.with_periodic(cli.periodic)
		.with_seed(cli.seed)
		.with_target_volume_fraction(cli.target_fraction)
		.with_adjustments_per_grain(cli.adjustments)
		.with_renumber(cli.renumber)
		.with_verbose(cli.verbose);

	let mut session = PackingSession::new(config, stats).context("Invalid packing input")?;
	if let Some(path) = &cli.errors {
		let file = File::create(path)
			.with_context(|| format!("Failed to create diagnostics file {}", path.display()))?;
		session = session.with_diagnostics(Box::new(BufWriter::new(file)));
	}

	let start = Instant::now();
	let summary = session.run().context("Packing failed")?;
	eprintln!("Packed {} grains in {:.2?}", summary.active_grains, start.elapsed());

	if let Some(path) = &cli.vtk {
		session
			.packing_grid
			.write_vtk(path)
			.with_context(|| format!("Failed to write VTK file {}", path.display()))?;
	}

	let start = Instant::now();
	session
		.voxels
		.write_to_mrc_file(&cli.output)
		.with_context(|| format!("Failed to write MRC file {}", cli.output.display()))?;
	eprintln!("Wrote {} in {:.2?}", cli.output.display(), start.elapsed());

	Ok(())
}
