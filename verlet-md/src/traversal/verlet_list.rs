//! Cell-list based Verlet (neighbor) lists

use std::sync::Arc;

use anyhow::{Result, anyhow};
use num::Integer;
use rayon::prelude::*;

use crate::{
    runtime::{BoundaryCondition, Domain, ParticleHandle, ParticleStore, Property},
    utils::{IndexRange, Real3D},
};

use super::{PairOperation, PairSet};

/// Tuning parameters of a Verlet list
#[derive(Clone, Debug)]
pub struct VerletListDetails {
    /// Number of worker threads for neighbor list construction
    pub num_workers: usize,
    /// Skin factor (this factor is multiplied to the cutoff region to guarantee
    /// the correctness of the neighbor list for more than one tick)
    pub skin_factor: f64,
    /// Explicit cell size (must not be smaller than the skinned cutoff)
    pub cell_size: Option<f64>,
    /// The neighbor list is rebuilt after this number of mutating traversals
    pub rebuild_interval: usize
}

impl Default for VerletListDetails {
    fn default() -> Self {
        Self {
            num_workers: 1,
            skin_factor: 1.2,
            cell_size: None,
            rebuild_interval: 1
        }
    }
}

macro_rules! get_index_from_coords_3d {
    ($ixyz:expr, $nx:expr, $ny:expr) => {
        $ixyz[0] + $ixyz[1] * $nx + $ixyz[2] * $nx * $ny
    };
}

macro_rules! decompose_index_to_coords_3d {
    ($idx:expr, $nx:expr, $ny:expr) => { {
        let (tmp, ix) = $idx.div_rem(&$nx);
        let (iz, iy) = tmp.div_rem(&$ny);
        [ix, iy, iz]
    }};
}

/// Cell grid spanning the particles of one rebuild
struct CellGrid {
    /// Lower corner of the grid per axis
    low: [f64; 3],
    /// Width of a cell per axis (never smaller than the bin size)
    width: [f64; 3],
    /// Number of cells per axis
    topo: [usize; 3],
    /// Total number of cells
    num_cells: usize,
    /// Wrap-around per axis
    periodic: [bool; 3]
}

impl CellGrid {
    fn new(domain: &Domain, positions: &[Real3D], bin_size: f64) -> Result<Self> {
        // No axis gets more cells than the cube root of the particle count,
        // otherwise a single far away particle on an open axis would blow
        // up the grid (cells only ever grow wider)
        let max_cells_per_axis = ((positions.len() as f64).cbrt().ceil() as usize).max(1);
        let mut low = [0.0; 3];
        let mut width = [bin_size; 3];
        let mut topo = [1; 3];
        let mut periodic = [false; 3];
        for (k, axis) in domain.axes().iter().enumerate() {
            let (lo, hi) = match axis {
                Some(axis) if axis.is_periodic() => {
                    periodic[k] = true;
                    (axis.low, axis.high)
                }
                // Open axes only span the particles currently present
                _ => positions.iter()
                    .map(|p| p[k])
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)))
            };
            if !(lo < hi) {
                // Empty or degenerate extent: a single cell holds everything
                low[k] = if lo.is_finite() { lo } else { 0.0 };
                continue;
            }
            let n = (((hi - lo) / bin_size).floor() as usize).clamp(1, max_cells_per_axis);
            low[k] = lo;
            topo[k] = n;
            width[k] = (hi - lo) / n as f64;
        }
        let num_cells = topo[0].checked_mul(topo[1])
            .and_then(|n| n.checked_mul(topo[2]))
            .ok_or_else(|| anyhow!("Cell grid of {}x{}x{} cells is too large", topo[0], topo[1], topo[2]))?;
        Ok(Self { low, width, topo, num_cells, periodic })
    }

    fn num_cells(&self) -> usize {
        self.num_cells
    }

    /// Cell coordinates of a (folded) position, clamped into the grid
    fn cell_of(&self, p: &Real3D) -> [usize; 3] {
        let mut c = [0; 3];
        for k in 0..3 {
            let x = ((p[k] - self.low[k]) / self.width[k]).floor();
            c[k] = if x <= 0.0 { 0 } else { (x as usize).min(self.topo[k] - 1) };
        }
        c
    }

    /// Linear indices of the cell itself and its direct neighbors (without duplicates)
    fn neighbor_cells(&self, cell: usize) -> Vec<usize> {
        let [nx, ny, _] = self.topo;
        let c = decompose_index_to_coords_3d!(cell, nx, ny);
        let mut neighbors = Vec::with_capacity(27);
        for dz in -1isize..=1 {
            for dy in -1isize..=1 {
                for dx in -1isize..=1 {
                    let mut n = [0usize; 3];
                    let mut valid = true;
                    for (k, d) in [dx, dy, dz].into_iter().enumerate() {
                        let m = self.topo[k] as isize;
                        let idx = c[k] as isize + d;
                        if self.periodic[k] {
                            n[k] = idx.rem_euclid(m) as usize;
                        }
                        else if idx < 0 || idx >= m {
                            valid = false;
                        }
                        else {
                            n[k] = idx as usize;
                        }
                    }
                    if valid {
                        neighbors.push(get_index_from_coords_3d!(n, nx, ny));
                    }
                }
            }
        }
        // Small periodic grids wrap onto the same cell more than once
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }
}

/// Pair set holding all pairs closer than the skinned cutoff at the last rebuild
///
/// The list contains the pairs `(i, j)` with `i` in the particle range and
/// `j > i` anywhere in the store. Lists over disjoint ranges covering the
/// store thus enumerate every pair exactly once.
///
/// Pairs are stored in compressed form: for local particle `i` the neighbors
/// are `neighbor_list[neighbor_list_index[i-1]..neighbor_list_index[i]]`.
pub struct VerletList {
    /// Particle data the list is built from
    store: Arc<ParticleStore>,
    /// Simulation domain (periodicity and cell geometry)
    domain: Arc<Domain>,
    /// Particles covered by this list
    range: IndexRange,
    /// Interaction cutoff (without skin)
    cutoff: f64,
    /// Size of a single cell
    bin_size: f64,
    /// Skinned cutoff length square (must not be larger than square of bin_size)
    cutoff_length_sqr: f64,
    /// Rebuild interval in mutating traversals
    rebuild_interval: usize,
    /// Mutating traversals since the last rebuild
    traversals_since_rebuild: usize,
    /// Number of rebuilds so far
    num_rebuilds: usize,
    /// Thread pool for neighbor list rebuilding
    thread_pool: rayon::ThreadPool,
    /// End offsets into `neighbor_list` per local particle
    neighbor_list_index: Vec<usize>,
    /// Concatenated neighbor indices
    neighbor_list: Vec<usize>
}

impl VerletList {
    /// Create and build a new Verlet list for the particles in `range`
    pub fn new(store: Arc<ParticleStore>, domain: Arc<Domain>, range: IndexRange, cutoff: f64,
        details: VerletListDetails) -> Result<Self>
    {
        if !(cutoff > 0.0) || !cutoff.is_finite() {
            return Err(anyhow!("Verlet list cutoff must be positive and finite (got {})", cutoff));
        }
        if !(details.skin_factor >= 1.0) || !details.skin_factor.is_finite() {
            return Err(anyhow!("Skin factor must be at least 1 (got {})", details.skin_factor));
        }
        if details.rebuild_interval == 0 {
            return Err(anyhow!("Rebuild interval must be at least 1"));
        }
        if range.end > store.get_particle_count() {
            return Err(anyhow!("Particle range {}..{} exceeds the {} stored particles",
                range.start, range.end, store.get_particle_count()));
        }
        let cutoff_length = details.skin_factor * cutoff;
        let bin_size = details.cell_size.unwrap_or(cutoff_length);
        if bin_size < cutoff_length {
            return Err(anyhow!("Cell size {} is smaller than the skinned cutoff {}", bin_size, cutoff_length));
        }
        if cutoff_length > domain.max_minimum_image_cutoff() {
            log::warn!("Skinned cutoff {} exceeds half the periodic box length {}; pairs may be missed",
                cutoff_length, domain.max_minimum_image_cutoff());
        }
        let thread_pool = rayon::ThreadPoolBuilder::new()
            .num_threads(details.num_workers.max(1))
            .build()?;
        let mut result = Self {
            store, domain, range, cutoff, bin_size,
            cutoff_length_sqr: cutoff_length * cutoff_length,
            rebuild_interval: details.rebuild_interval,
            traversals_since_rebuild: 0,
            num_rebuilds: 0,
            thread_pool,
            neighbor_list_index: vec![],
            neighbor_list: vec![]
        };
        result.rebuild()?;
        Ok(result)
    }

    /// Rebuild the neighbor list from the current positions
    pub fn rebuild(&mut self) -> Result<()> {
        let x = self.store.vector(Property::Position)?;
        let positions = x.as_slice();
        let domain = &*self.domain;
        let folded = positions.iter().map(|p| domain.fold(*p)).collect::<Vec<_>>();
        let grid = CellGrid::new(domain, &folded, self.bin_size)?;
        // Bin all particles into cells (partners may lie outside of the range)
        let [nx, ny, _] = grid.topo;
        let mut cells = vec![vec![]; grid.num_cells()];
        let lookup_table = folded.iter()
            .enumerate()
            .map(|(i, p)| {
                let cell = get_index_from_coords_3d!(grid.cell_of(p), nx, ny);
                cells[cell].push(i);
                cell
            })
            .collect::<Vec<_>>();
        let neighbor_cells = (0..grid.num_cells())
            .map(|cell| grid.neighbor_cells(cell))
            .collect::<Vec<_>>();
        // Scan neighboring cells for every particle of the range in parallel
        let cutoff_length_sqr = self.cutoff_length_sqr;
        let neighbors = self.thread_pool.install(|| {
            self.range.indices().into_par_iter()
                .map(|i| {
                    let mut found = vec![];
                    for cell in &neighbor_cells[lookup_table[i]] {
                        for &j in &cells[*cell] {
                            if j > i && domain.minimum_image(positions[i], positions[j]).sqr() < cutoff_length_sqr {
                                found.push(j);
                            }
                        }
                    }
                    found.sort_unstable();
                    found
                })
                .collect::<Vec<_>>()
        });
        // Compress into index / list form
        self.neighbor_list.clear();
        self.neighbor_list_index.clear();
        for found in neighbors {
            self.neighbor_list.extend(found);
            self.neighbor_list_index.push(self.neighbor_list.len());
        }
        self.traversals_since_rebuild = 0;
        self.num_rebuilds += 1;
        log::debug!("Rebuilt Verlet list: {} particles, {} cells, {} pairs",
            self.range.len(), grid.num_cells(), self.neighbor_list.len());
        Ok(())
    }

    /// Number of pairs currently in the list
    pub fn num_pairs(&self) -> usize {
        self.neighbor_list.len()
    }

    /// Number of rebuilds (including the initial build)
    pub fn num_rebuilds(&self) -> usize {
        self.num_rebuilds
    }

    /// Skinned cutoff used for list construction
    pub fn cutoff_length(&self) -> f64 {
        self.cutoff_length_sqr.sqrt()
    }

    /// Neighbors (global indices, all larger than `particle`) of a particle in the range
    pub fn neighbors(&self, particle: ParticleHandle) -> &[usize] {
        if !self.range.contains(particle.index()) {
            return &[];
        }
        let local_idx = particle.index() - self.range.start;
        let lower_offset = if local_idx == 0 { 0 } else { self.neighbor_list_index[local_idx - 1] };
        &self.neighbor_list[lower_offset..self.neighbor_list_index[local_idx]]
    }
}

impl PairSet for VerletList {
    fn for_each<O: PairOperation + ?Sized>(&self, op: &mut O) -> Result<()> {
        let mut lower_offset = 0;
        for (local_idx, upper_offset) in self.neighbor_list_index.iter().enumerate() {
            let i = ParticleHandle(self.range.start + local_idx);
            for j in &self.neighbor_list[lower_offset..*upper_offset] {
                op.visit(i, ParticleHandle(*j));
            }
            lower_offset = *upper_offset;
        }
        Ok(())
    }

    fn for_each_mut<O: PairOperation + ?Sized>(&mut self, op: &mut O) -> Result<()> {
        if self.traversals_since_rebuild >= self.rebuild_interval {
            self.rebuild()?;
        }
        self.traversals_since_rebuild += 1;
        self.for_each(op)
    }

    fn cutoff(&self) -> Option<f64> {
        Some(self.cutoff)
    }
}

#[cfg(test)]
mod test {
    use crate::runtime::OutOfBoundsBehavior;

    use super::*;

    fn store_with(positions: &[Real3D]) -> Arc<ParticleStore> {
        let store = ParticleStore::new(positions.len()).unwrap();
        store.vector_mut(Property::Position).unwrap().as_mut_slice().copy_from_slice(positions);
        Arc::new(store)
    }

    #[test]
    fn test_pairs_across_periodic_boundary() {
        let store = store_with(&[
            Real3D::new(0.1, 5.0, 5.0),
            Real3D::new(9.9, 5.0, 5.0),
            Real3D::new(5.0, 5.0, 5.0),
        ]);
        let domain = Arc::new(Domain::cube(10.0, OutOfBoundsBehavior::Periodic).unwrap());
        let list = VerletList::new(store, domain, IndexRange::new(0, 3), 1.0, VerletListDetails::default()).unwrap();
        assert_eq!(list.num_pairs(), 1);
        assert_eq!(list.neighbors(ParticleHandle(0)), &[1]);
        assert_eq!(list.cutoff(), Some(1.0));
    }

    #[test]
    fn test_rebuild_interval() {
        let store = store_with(&[Real3D::new(0.0, 0.0, 0.0), Real3D::new(0.5, 0.0, 0.0)]);
        let domain = Arc::new(Domain::open());
        let details = VerletListDetails { rebuild_interval: 2, ..Default::default() };
        let mut list = VerletList::new(store.clone(), domain, IndexRange::new(0, 2), 1.0, details).unwrap();
        assert_eq!(list.num_rebuilds(), 1);
        let mut count = 0;
        list.for_each_mut(&mut |_: ParticleHandle, _: ParticleHandle| count += 1).unwrap();
        list.for_each_mut(&mut |_: ParticleHandle, _: ParticleHandle| count += 1).unwrap();
        assert_eq!(list.num_rebuilds(), 1);
        // Move the particles apart: the next rebuild drops the pair
        store.vector_mut(Property::Position).unwrap()[ParticleHandle(1)] = Real3D::new(5.0, 0.0, 0.0);
        list.for_each_mut(&mut |_: ParticleHandle, _: ParticleHandle| count += 1).unwrap();
        assert_eq!(list.num_rebuilds(), 2);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_far_apart_particles_in_open_domain() {
        let store = store_with(&[
            Real3D::new(0.0, 0.0, 0.0),
            Real3D::new(0.5, 0.0, 0.0),
            Real3D::new(1e4, 1e4, 1e4),
            Real3D::new(-1e12, 3.0, 0.0),
        ]);
        let list = VerletList::new(store, Arc::new(Domain::open()), IndexRange::new(0, 4), 1.0,
            VerletListDetails::default()).unwrap();
        assert_eq!(list.num_pairs(), 1);
        assert_eq!(list.neighbors(ParticleHandle(0)), &[1]);
        assert!(list.neighbors(ParticleHandle(2)).is_empty());
    }

    #[test]
    fn test_grid_size_is_bounded() {
        let positions = [Real3D::zero(), Real3D::new(1e15, -1e15, 1e15)];
        let grid = CellGrid::new(&Domain::open(), &positions, 1e-3).unwrap();
        assert!(grid.num_cells() <= 8);
        assert!(grid.width.iter().all(|w| *w >= 1e-3));
    }

    #[test]
    fn test_invalid_details() {
        let store = store_with(&[Real3D::zero()]);
        let domain = Arc::new(Domain::open());
        let range = IndexRange::new(0, 1);
        assert!(VerletList::new(store.clone(), domain.clone(), range, -1.0, VerletListDetails::default()).is_err());
        let details = VerletListDetails { cell_size: Some(0.5), ..Default::default() };
        assert!(VerletList::new(store.clone(), domain.clone(), range, 1.0, details).is_err());
        let details = VerletListDetails { rebuild_interval: 0, ..Default::default() };
        assert!(VerletList::new(store.clone(), domain.clone(), range, 1.0, details).is_err());
        assert!(VerletList::new(store, domain, IndexRange::new(0, 2), 1.0, VerletListDetails::default()).is_err());
    }
}
