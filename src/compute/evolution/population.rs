//! Double-buffered population storage.
//!
//! The store holds two complete [`Generation`]s. Each repeat reads the current
//! one and fills the next one slot by slot; committing swaps the two sets
//! without touching their contents. Survivors take their voxel grid along by
//! ownership transfer, so unchanged genomes never pay for redevelopment.

use crate::compute::{Body, VoxelGrid};

/// One full set of population buffers.
#[derive(Debug, Clone)]
pub struct Generation<G> {
    pub genomes: Vec<G>,
    pub phenotypes: Vec<VoxelGrid>,
    pub fitness: Vec<f32>,
}

impl<G> Generation<G> {
    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

/// Caller-owned population: initial genomes in, final genomes, bodies and
/// fitness out.
#[derive(Debug, Clone)]
pub struct Population<G> {
    pub genomes: Vec<G>,
    pub bodies: Vec<Body>,
    pub fitness: Vec<f32>,
}

impl<G> Default for Population<G> {
    fn default() -> Self {
        Self {
            genomes: Vec::new(),
            bodies: Vec::new(),
            fitness: Vec::new(),
        }
    }
}

impl<G> Population<G> {
    /// Population seeded with the given genomes.
    pub fn from_genomes(genomes: Vec<G>) -> Self {
        Self {
            genomes,
            bodies: Vec::new(),
            fitness: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.genomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genomes.is_empty()
    }
}

/// Current and next generation plus the per-repeat bookkeeping.
#[derive(Debug)]
pub struct PopulationStore<G> {
    current: Generation<G>,
    next: Generation<G>,
    invalidated: Vec<usize>,
    /// For each current slot already carried over this repeat, the next slot
    /// that now owns its voxel grid.
    holders: Vec<Option<usize>>,
}

impl<G: Clone> PopulationStore<G> {
    /// Allocate both buffer sets for `genomes.len()` slots.
    pub fn new(genomes: Vec<G>, voxel_side: usize) -> Self {
        let n = genomes.len();
        let allocate = |genomes: Vec<G>| Generation {
            genomes,
            phenotypes: (0..n).map(|_| VoxelGrid::new(voxel_side)).collect(),
            fitness: vec![0.0; n],
        };
        let next = allocate(genomes.clone());
        Self {
            current: allocate(genomes),
            next,
            invalidated: Vec::with_capacity(n),
            holders: vec![None; n],
        }
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    pub fn current(&self) -> &Generation<G> {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut Generation<G> {
        &mut self.current
    }

    /// Reset the repeat bookkeeping before the next generation is built.
    pub fn begin_generation(&mut self) {
        self.invalidated.clear();
        self.holders.fill(None);
    }

    /// Carry current slot `src` unchanged into next slot `dst`.
    ///
    /// Genome and fitness are copied. The first carry-over of `src` in a
    /// repeat moves its voxel grid into `dst`; later ones copy the grid from
    /// the slot that received it.
    pub fn carry_over(&mut self, src: usize, dst: usize) {
        self.next.genomes[dst].clone_from(&self.current.genomes[src]);
        self.next.fitness[dst] = self.current.fitness[src];

        match self.holders[src] {
            None => {
                std::mem::swap(
                    &mut self.current.phenotypes[src],
                    &mut self.next.phenotypes[dst],
                );
                self.holders[src] = Some(dst);
            }
            Some(holder) => {
                let (from, to) = pair_mut(&mut self.next.phenotypes, holder, dst);
                to.copy_from(from);
            }
        }
    }

    /// Place a new genome in next slot `dst` and mark the slot invalidated.
    pub fn set_offspring(&mut self, dst: usize, genome: G) {
        self.next.genomes[dst] = genome;
        self.invalidated.push(dst);
    }

    /// Swap the current and next buffer sets.
    pub fn commit_generation(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
        self.invalidated.sort_unstable();
    }

    /// Slots whose genome changed in the last generation, ascending once committed.
    pub fn invalidated(&self) -> &[usize] {
        &self.invalidated
    }

    /// Current generation together with the invalidated slots.
    pub fn split_invalidated(&mut self) -> (&mut Generation<G>, &[usize]) {
        (&mut self.current, &self.invalidated)
    }

    /// Consume the store, keeping only the current genomes.
    pub fn into_genomes(self) -> Vec<G> {
        self.current.genomes
    }

    /// Move the final population into caller-owned storage and release the
    /// scratch buffers. Bodies are projected into the caller's existing
    /// allocations.
    pub fn finalize(self, out: &mut Population<G>) {
        let Generation {
            genomes,
            phenotypes,
            fitness,
        } = self.current;

        out.genomes = genomes;
        out.fitness = fitness;
        out.bodies.resize_with(phenotypes.len(), Body::default);
        for (body, grid) in out.bodies.iter_mut().zip(&phenotypes) {
            body.isolate_into(grid);
        }
    }
}

/// Shared and mutable references to two distinct elements.
fn pair_mut<T>(items: &mut [T], shared: usize, unique: usize) -> (&T, &mut T) {
    debug_assert_ne!(shared, unique);
    if shared < unique {
        let (left, right) = items.split_at_mut(unique);
        (&left[shared], &mut right[0])
    } else {
        let (left, right) = items.split_at_mut(shared);
        (&right[0], &mut left[unique])
    }
}
