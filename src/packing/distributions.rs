use crate::packing::field::FieldSet;
use crate::packing::generator::GrainDescriptor;
use crate::packing::stats::{SIZE_DIST_BINS, StatsCollection};

/// Bhattacharyya coefficient; larger means the simulated histogram is closer to its target.
fn bhattacharyya(sim: &[f32], target: &[f32]) -> f32 {
	sim.iter().zip(target.iter()).map(|(s, t)| (s * t).sqrt()).sum()
}

#[derive(Debug, Clone)]
struct SizeTarget {
	phase: usize,
	min_diameter: f32,
	step: f32,
	histogram: [f32; SIZE_DIST_BINS],
}

impl SizeTarget {
	fn bin(&self, diameter: f32) -> usize {
		let pos = (diameter - self.min_diameter / 2.0) / self.step;
		pos.clamp(0.0, (SIZE_DIST_BINS - 1) as f32) as usize
	}
}

/// 40-bin size histograms of every primary phase.
#[derive(Debug, Clone)]
pub struct SizeDistribution {
	targets: Vec<SizeTarget>,
}

impl SizeDistribution {
	pub fn new(stats: &StatsCollection) -> Self {
		let (ids, _) = stats.primary_phase_table();
		let targets = ids
			.into_iter()
			.map(|phase| {
				let p = stats.phase(phase);
				SizeTarget {
					phase,
					min_diameter: p.min_diameter,
					step: p.size_dist_step(),
					histogram: p.size_histogram(),
				}
			})
			.collect();
		Self { targets }
	}

	/// Affinity of the active grains, plus `candidate` when given, to the target histograms.
	pub fn affinity(&self, field: &FieldSet, candidate: Option<&GrainDescriptor>) -> f32 {
		let mut total = 0.0f32;
		for target in self.targets.iter() {
			let mut sim = [0.0f32; SIZE_DIST_BINS];
			let mut count = 0usize;
			for gid in field.active_grains() {
				if field.phases[gid] == target.phase {
					sim[target.bin(field.equivalent_diameters[gid])] += 1.0;
					count += 1;
				}
			}
			if let Some(grain) = candidate {
				if grain.phase == target.phase {
					sim[target.bin(grain.equivalent_diameter)] += 1.0;
					count += 1;
				}
			}
			if count == 0 {
				continue;
			}
			for s in sim.iter_mut() {
				*s /= count as f32;
			}
			total += bhattacharyya(&sim, &target.histogram);
		}
		total
	}
}

#[derive(Debug, Clone)]
struct NeighborTarget {
	phase: usize,
	min_diameter: f32,
	max_diameter: f32,
	bin_step: f32,
	/// Expected counts per diameter bin in the three shells.
	counts: Vec<[f32; 3]>,
}

impl NeighborTarget {
	fn bin(&self, diameter: f32) -> usize {
		let d = diameter.clamp(self.min_diameter, self.max_diameter);
		let bin = ((d - self.min_diameter) / self.bin_step) as usize;
		bin.min(self.counts.len().saturating_sub(1))
	}
}

/// Per-diameter-bin neighbour counts of every primary phase.
#[derive(Debug, Clone)]
pub struct NeighborDistribution {
	targets: Vec<NeighborTarget>,
}

impl NeighborDistribution {
	pub fn new(stats: &StatsCollection) -> Self {
		let (ids, _) = stats.primary_phase_table();
		let targets = ids
			.into_iter()
			.map(|phase| {
				let p = stats.phase(phase);
				NeighborTarget {
					phase,
					min_diameter: p.min_diameter,
					max_diameter: p.max_diameter,
					bin_step: p.bin_step_size,
					counts: p.neighbor_targets(),
				}
			})
			.collect();
		Self { targets }
	}

	/// Affinity of the current neighbourhood counters to the targets. Empty bins contribute 0.
	pub fn affinity(&self, field: &FieldSet) -> f32 {
		let mut total = 0.0f32;
		for target in self.targets.iter() {
			let bins = target.counts.len();
			let mut sim = vec![[0.0f32; 3]; bins];
			let mut count = vec![0usize; bins];
			for gid in field.active_grains() {
				if field.phases[gid] != target.phase {
					continue;
				}
				let bin = target.bin(field.equivalent_diameters[gid]);
				for (shell, &n) in field.neighborhoods[gid].iter().enumerate() {
					if n > 0 {
						sim[bin][shell] += n as f32;
					}
				}
				count[bin] += 1;
			}
			for (bin, shells) in sim.iter_mut().enumerate() {
				if count[bin] == 0 {
					continue;
				}
				for s in shells.iter_mut() {
					*s /= count[bin] as f32;
				}
				total += bhattacharyya(&*shells, &target.counts[bin]);
			}
		}
		total
	}
}

/// Apply the shell updates of one grain pair. Each grain's radius defines the shells it counts
/// the other grain into.
fn update_pair(field: &mut FieldSet, a: usize, b: usize, delta: i32) {
	let ca = field.centroids[a];
	let cb = field.centroids[b];
	let dist = ((ca[0] - cb[0]).powi(2) + (ca[1] - cb[1]).powi(2) + (ca[2] - cb[2]).powi(2)).sqrt();
	let ra = field.equivalent_diameters[a] / 2.0;
	let rb = field.equivalent_diameters[b] / 2.0;
	if ra > 0.0 && dist < 3.0 * ra {
		for shell in (dist / ra) as usize..3 {
			field.neighborhoods[b][shell] += delta;
		}
	}
	if rb > 0.0 && dist < 3.0 * rb {
		for shell in (dist / rb) as usize..3 {
			field.neighborhoods[a][shell] += delta;
		}
	}
}

/// Add (`delta = 1`) or withdraw (`delta = -1`) the neighbour contributions of grain `gid`
/// against every other active grain.
pub fn determine_neighbors(field: &mut FieldSet, gid: usize, delta: i32) {
	let others: Vec<usize> = field.active_grains().filter(|&n| n != gid).collect();
	for n in others {
		update_pair(field, gid, n, delta);
	}
}

/// Recount every active grain's neighbourhood from scratch, each unordered pair once.
pub fn compute_all_neighborhoods(field: &mut FieldSet) {
	for counts in field.neighborhoods.iter_mut() {
		*counts = [0; 3];
	}
	let active: Vec<usize> = field.active_grains().collect();
	for (idx, &a) in active.iter().enumerate() {
		for &b in active[idx + 1..].iter() {
			update_pair(field, a, b, 1);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::packing::stats::PhaseStatistics;

	fn grain(diameter: f32) -> GrainDescriptor {
		GrainDescriptor {
			volume: (std::f32::consts::PI / 6.0) * diameter.powi(3),
			equivalent_diameter: diameter,
			axis_lengths: [1.0, 1.0, 1.0],
			axis_euler_angles: [0.0; 3],
			omega3: 1.0,
			phase: 1,
			neighborhoods: [0; 3],
		}
	}

	fn stats() -> StatsCollection {
		StatsCollection::new(vec![PhaseStatistics::equiaxed(1.5, 0.2, 3.0, 3.0, 0.5)])
	}

	#[test]
	fn empty_population_has_zero_size_affinity() {
		let dist = SizeDistribution::new(&stats());
		assert_eq!(dist.affinity(&FieldSet::new(), None), 0.0);
	}

	#[test]
	fn typical_grain_beats_outlier() {
		let stats = stats();
		let dist = SizeDistribution::new(&stats);
		let field = FieldSet::new();
		let typical = dist.affinity(&field, Some(&grain(1.5f32.exp())));
		let outlier = dist.affinity(&field, Some(&grain(stats.phase(1).min_diameter)));
		assert!(typical > outlier);
		assert!(typical <= 1.0 + 1.0e-4);
	}

	#[test]
	fn incremental_neighbors_match_full_count() {
		let mut field = FieldSet::new();
		let centres = [[0.0, 0.0, 0.0], [3.0, 0.0, 0.0], [0.0, 4.0, 0.0], [20.0, 20.0, 20.0]];
		for (idx, c) in centres.iter().enumerate() {
			let gid = field.transfer_attributes(&grain(4.0 + idx as f32));
			field.centroids[gid] = *c;
		}
		compute_all_neighborhoods(&mut field);
		let full = field.neighborhoods.clone();
		assert_eq!(full[4], [0, 0, 0]);
		assert!(full[1][2] > 0);

		determine_neighbors(&mut field, 2, -1);
		field.centroids[2] = [30.0, 0.0, 0.0];
		determine_neighbors(&mut field, 2, 1);
		field.centroids[2] = [3.0, 0.0, 0.0];
		determine_neighbors(&mut field, 2, -1);
		let moved = field.neighborhoods.clone();
		determine_neighbors(&mut field, 2, 1);
		assert_eq!(field.neighborhoods, full);
		assert_ne!(moved, full);
	}

	#[test]
	fn neighbor_affinity_is_positive_with_neighbours() {
		let stats = stats();
		let dist = NeighborDistribution::new(&stats);
		let mut field = FieldSet::new();
		for c in [[0.0, 0.0, 0.0], [4.0, 0.0, 0.0], [0.0, 4.0, 0.0]] {
			let gid = field.transfer_attributes(&grain(4.5));
			field.centroids[gid] = c;
		}
		assert_eq!(dist.affinity(&field), 0.0);
		compute_all_neighborhoods(&mut field);
		assert!(dist.affinity(&field) > 0.0);
	}
}
