use std::collections::VecDeque;
use std::fs;

use grain_packer::packing::field::FieldSet;
use grain_packer::packing::shapes::ShapeType;
use grain_packer::voxel_grid::grid::VoxelGrid;
use grain_packer::voxel_grid::mrc_output::MRC_HEADER_BYTES;
use grain_packer::{PackingConfig, PackingSession, PhaseStatistics, StatsCollection};

fn small_stats(shape_type: ShapeType) -> StatsCollection {
	// ln(d) ~ N(1.5, 0.15): diameters of roughly 3.3 to 6.0 voxels
	let phase = PhaseStatistics::equiaxed(1.5, 0.15, 2.0, 2.0, 0.5).with_shape_type(shape_type);
	StatsCollection::new(vec![phase])
}

fn small_config(seed: u64) -> PackingConfig {
	PackingConfig::new()
		.with_dims(16, 16, 16)
		.with_seed(seed)
		.with_adjustments_per_grain(10)
}

/// Number of face-connected components of grain `gid`.
fn count_components(grid: &VoxelGrid, gid: i32, periodic: bool) -> usize {
	let mut seen = vec![false; grid.total_voxels];
	let mut components = 0;
	for start in 0..grid.total_voxels {
		if seen[start] || grid.grain_ids[start] != gid {
			continue;
		}
		components += 1;
		seen[start] = true;
		let mut queue = VecDeque::from([start]);
		while let Some(index) = queue.pop_front() {
			for neighbor in grid.face_neighbors(index, periodic) {
				if !seen[neighbor] && grid.grain_ids[neighbor] == gid {
					seen[neighbor] = true;
					queue.push_back(neighbor);
				}
			}
		}
	}
	components
}

#[test]
fn open_domain_is_fully_assigned() {
	let mut session = PackingSession::new(small_config(7), small_stats(ShapeType::Ellipsoid)).unwrap();
	let summary = session.run().unwrap();

	assert!(summary.generated_grains > 0);
	assert!(summary.active_grains > 0);
	assert!(summary.active_grains <= summary.generated_grains);
	assert!(session.voxels.grain_ids.iter().all(|&id| id > 0));
	assert!(session.voxels.phases.iter().all(|&phase| phase == 1));

	for gid in session.field.active_grains() {
		assert!(session.voxels.grain_ids.contains(&(gid as i32)), "active grain {} owns no voxels", gid);
	}
	for &id in session.voxels.grain_ids.iter() {
		assert!(session.field.is_active(id as usize), "voxel owned by inactive grain {}", id);
	}
}

#[test]
fn every_grain_is_one_connected_piece() {
	for periodic in [false, true] {
		let config = small_config(11).with_periodic(periodic);
		let mut session = PackingSession::new(config, small_stats(ShapeType::Ellipsoid)).unwrap();
		session.run().unwrap();
		for gid in session.field.active_grains() {
			assert_eq!(count_components(&session.voxels, gid as i32, periodic), 1, "grain {}", gid);
		}
	}
}

#[test]
fn same_seed_gives_the_same_microstructure() {
	let run = |seed| {
		let mut session = PackingSession::new(small_config(seed), small_stats(ShapeType::SuperEllipsoid)).unwrap();
		let summary = session.run().unwrap();
		(summary, session)
	};
	let (first, a) = run(42);
	let (second, b) = run(42);
	assert_eq!(first, second);
	assert_eq!(a.voxels.grain_ids, b.voxels.grain_ids);
	assert_eq!(a.voxels.phases, b.voxels.phases);

	let (fa, fb) = (&a.field, &b.field);
	assert_eq!(fa.volumes, fb.volumes);
	assert_eq!(fa.equivalent_diameters, fb.equivalent_diameters);
	assert_eq!(fa.axis_lengths, fb.axis_lengths);
	assert_eq!(fa.axis_euler_angles, fb.axis_euler_angles);
	assert_eq!(fa.omega3s, fb.omega3s);
	assert_eq!(fa.phases, fb.phases);
	assert_eq!(fa.centroids, fb.centroids);
	assert_eq!(fa.neighborhoods, fb.neighborhoods);
	assert_eq!(fa.pack_qualities, fb.pack_qualities);
	let active = |field: &FieldSet| field.active.iter().map(|bit| *bit).collect::<Vec<bool>>();
	assert_eq!(active(fa), active(fb));
}

#[test]
fn renumbering_leaves_contiguous_ids() {
	let config = small_config(3).with_renumber(true);
	let mut session = PackingSession::new(config, small_stats(ShapeType::Cylinder)).unwrap();
	let summary = session.run().unwrap();

	let map = summary.renumbering.unwrap();
	assert_eq!(map.len(), summary.generated_grains + 1);
	assert_eq!(session.field.num_grains(), summary.active_grains);
	assert_eq!(session.field.num_active(), summary.active_grains);

	let max_id = session.voxels.grain_ids.iter().copied().max().unwrap();
	assert_eq!(max_id as usize, summary.active_grains);
	for gid in 1..=summary.active_grains as i32 {
		assert!(session.voxels.grain_ids.contains(&gid), "id {} is unused", gid);
	}
}

#[test]
fn outputs_are_written() {
	let dir = tempfile::tempdir().unwrap();
	let errors = dir.path().join("errors.txt");
	let mrc = dir.path().join("grains.mrc");
	let vtk = dir.path().join("packing.vtk");

	let config = small_config(5).with_periodic(true);
	let mut session = PackingSession::new(config, small_stats(ShapeType::CubeOctahedron))
		.unwrap()
		.with_diagnostics(Box::new(fs::File::create(&errors).unwrap()));
	session.run().unwrap();
	session.voxels.write_to_mrc_file(&mrc).unwrap();
	session.packing_grid.write_vtk(&vtk).unwrap();

	let recorded = session.diagnostics.records.len();
	assert!(recorded > 0);
	let text = fs::read_to_string(&errors).unwrap();
	assert_eq!(text.lines().count(), recorded);
	assert!(text.lines().all(|line| line.split_whitespace().count() == 6));

	assert_eq!(fs::metadata(&mrc).unwrap().len() as usize, MRC_HEADER_BYTES + 16 * 16 * 16 * 4);
	let vtk_text = fs::read_to_string(&vtk).unwrap();
	assert!(vtk_text.starts_with("# vtk DataFile Version 2.0"));
	assert!(vtk_text.contains("SCALARS Occupancy int 1"));
}
