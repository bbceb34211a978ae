//! Genome encoding: the codec interface, the locus table and the byte codec.

use std::fmt::Write as _;
use std::ops::Range;

use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::schema::GenomeLayout;

/// Elementary genetic operators over an opaque, fixed-size genome.
pub trait GenomeCodec {
    type Genome: Clone + std::fmt::Debug;

    /// Breakpoints recombination may cut at. Computed once per run.
    fn loci(&self) -> LocusTable;

    /// Random genome.
    fn generate(&self, rng: &mut StdRng) -> Self::Genome;

    /// Point mutation in place, each locus changing with `probability`.
    fn mutate(&self, genome: &mut Self::Genome, probability: f32, rng: &mut StdRng);

    /// Offspring taking `second`'s material between two random breakpoints.
    fn crossover_two_point(
        &self,
        first: &Self::Genome,
        second: &Self::Genome,
        loci: &LocusTable,
        rng: &mut StdRng,
    ) -> Self::Genome;

    /// Offspring taking every locus segment from either parent at random.
    fn crossover_uniform(
        &self,
        first: &Self::Genome,
        second: &Self::Genome,
        loci: &LocusTable,
        rng: &mut StdRng,
    ) -> Self::Genome;

    /// Genetic distance between two genomes.
    fn distance(&self, first: &Self::Genome, second: &Self::Genome) -> u64;
}

/// Ordered byte offsets at which a genome may be cut.
///
/// Built from a [`GenomeLayout`]: one breakpoint per byte of cell rule data
/// (`0..cell_bytes`), then one breakpoint per global locus, `global_stride`
/// bytes apart. Segment `i` spans from breakpoint `i` to breakpoint `i + 1`,
/// the last one to the end of the genome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocusTable {
    loci: Vec<usize>,
    genome_len: usize,
}

impl LocusTable {
    pub fn new(layout: &GenomeLayout) -> Self {
        let cell_bytes = layout.cell_bytes();
        let global_count = layout.global_loci * layout.fields;
        let mut loci = Vec::with_capacity(cell_bytes + global_count);
        loci.extend(0..cell_bytes);
        loci.extend((0..global_count).map(|k| cell_bytes + layout.global_stride * k));
        Self {
            loci,
            genome_len: layout.genome_len(),
        }
    }

    /// Table from explicit offsets, which must be strictly increasing and
    /// below `genome_len`.
    pub fn from_offsets(loci: Vec<usize>, genome_len: usize) -> Self {
        debug_assert!(loci.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(loci.last().is_none_or(|&l| l < genome_len));
        Self { loci, genome_len }
    }

    pub fn loci(&self) -> &[usize] {
        &self.loci
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    pub fn genome_len(&self) -> usize {
        self.genome_len
    }

    /// Byte range of segment `index`.
    pub fn segment(&self, index: usize) -> Range<usize> {
        let end = self
            .loci
            .get(index + 1)
            .copied()
            .unwrap_or(self.genome_len);
        self.loci[index]..end
    }

    pub fn segments(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        (0..self.loci.len()).map(|i| self.segment(i))
    }
}

/// Genome stored as raw bytes in [`GenomeLayout`] order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ByteGenome(Vec<u8>);

impl ByteGenome {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hexadecimal rendering.
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in &self.0 {
            let _ = write!(out, "{:02x}", byte);
        }
        out
    }
}

/// Byte-level operators for [`ByteGenome`]s of a fixed layout.
#[derive(Debug, Clone)]
pub struct ByteCodec {
    layout: GenomeLayout,
}

impl ByteCodec {
    pub fn new(layout: GenomeLayout) -> Self {
        Self { layout }
    }
}

impl GenomeCodec for ByteCodec {
    type Genome = ByteGenome;

    fn loci(&self) -> LocusTable {
        LocusTable::new(&self.layout)
    }

    fn generate(&self, rng: &mut StdRng) -> ByteGenome {
        let mut bytes = vec![0u8; self.layout.genome_len()];
        rng.fill(&mut bytes[..]);
        ByteGenome(bytes)
    }

    fn mutate(&self, genome: &mut ByteGenome, probability: f32, rng: &mut StdRng) {
        for byte in genome.0.iter_mut() {
            if rng.r#gen::<f32>() < probability {
                *byte = rng.r#gen();
            }
        }
    }

    fn crossover_two_point(
        &self,
        first: &ByteGenome,
        second: &ByteGenome,
        loci: &LocusTable,
        rng: &mut StdRng,
    ) -> ByteGenome {
        let mut child = first.clone();
        let n = loci.len();
        if n < 2 {
            return child;
        }

        let a = rng.gen_range(0..n);
        let mut b = rng.gen_range(0..n - 1);
        if b >= a {
            b += 1;
        }
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let span = loci.loci()[lo]..loci.loci()[hi];
        child.0[span.clone()].copy_from_slice(&second.0[span]);
        child
    }

    fn crossover_uniform(
        &self,
        first: &ByteGenome,
        second: &ByteGenome,
        loci: &LocusTable,
        rng: &mut StdRng,
    ) -> ByteGenome {
        let mut child = first.clone();
        for segment in loci.segments() {
            if rng.gen_bool(0.5) {
                child.0[segment.clone()].copy_from_slice(&second.0[segment]);
            }
        }
        child
    }

    fn distance(&self, first: &ByteGenome, second: &ByteGenome) -> u64 {
        first
            .0
            .iter()
            .zip(second.0.iter())
            .map(|(a, b)| (a ^ b).count_ones() as u64)
            .sum()
    }
}
