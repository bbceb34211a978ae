//! Redevelopment of changed genomes and the rescoring policy.

use crate::compute::{Body, DevelopError, DevelopmentSession, VoxelGrid};
use crate::schema::Weights;

use super::population::Generation;

/// Develop one genome into a phenotype buffer.
pub fn develop_into<G, S>(
    session: &mut S,
    genome: &G,
    steps: u32,
    grid: &mut VoxelGrid,
) -> Result<(), DevelopError>
where
    S: DevelopmentSession<G> + ?Sized,
{
    session.load(genome)?;
    session.develop(steps)?;
    session.extract_body(grid)
}

/// Redevelop the given slots, in the order given. Returns the number developed.
pub fn redevelop<G, S>(
    session: &mut S,
    generation: &mut Generation<G>,
    slots: &[usize],
    steps: u32,
) -> Result<usize, DevelopError>
where
    S: DevelopmentSession<G> + ?Sized,
{
    for &slot in slots {
        log::debug!("Developing genome {}", slot);
        develop_into(
            session,
            &generation.genomes[slot],
            steps,
            &mut generation.phenotypes[slot],
        )?;
    }
    Ok(slots.len())
}

/// Which slots need a new fitness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescoreScope {
    /// Only slots whose genome changed.
    Invalidated,
    /// Every slot, because the weights changed.
    All,
}

impl RescoreScope {
    /// Scope for moving from `previous` to `current` effective weights.
    pub fn for_weights<W: Weights>(previous: &W, current: &W) -> Self {
        if current.bit_eq(previous) {
            Self::Invalidated
        } else {
            Self::All
        }
    }
}

/// Rescore slots of a generation. Returns the number of slots scored.
///
/// `scratch` receives each body projection and is reused across calls.
#[allow(clippy::too_many_arguments)]
pub fn rescore<G, W, T, F>(
    generation: &mut Generation<G>,
    scope: RescoreScope,
    invalidated: &[usize],
    fitness_fn: &F,
    targets: &T,
    weights: &W,
    scratch: &mut Body,
) -> usize
where
    F: Fn(&Body, &T, &W) -> f32 + ?Sized,
{
    let n = generation.len();
    let mut score = |slot: usize| {
        scratch.isolate_into(&generation.phenotypes[slot]);
        generation.fitness[slot] = fitness_fn(&*scratch, targets, weights);
    };

    match scope {
        RescoreScope::Invalidated => {
            invalidated.iter().for_each(|&slot| score(slot));
            invalidated.len()
        }
        RescoreScope::All => {
            (0..n).for_each(&mut score);
            n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Session that stamps the loaded genome value into voxel (0, 0, 0).
    #[derive(Default)]
    struct StampSession {
        loaded: Option<u8>,
        developed: Vec<u8>,
    }

    impl DevelopmentSession<u8> for StampSession {
        fn load(&mut self, genome: &u8) -> Result<(), DevelopError> {
            self.loaded = Some(*genome);
            Ok(())
        }

        fn develop(&mut self, _steps: u32) -> Result<(), DevelopError> {
            let genome = self.loaded.ok_or(DevelopError::NotLoaded)?;
            self.developed.push(genome);
            Ok(())
        }

        fn extract_body(&mut self, out: &mut VoxelGrid) -> Result<(), DevelopError> {
            let genome = self.loaded.ok_or(DevelopError::NotLoaded)?;
            out.clear();
            out.set(0, 0, 0, genome);
            Ok(())
        }
    }

    fn generation(genomes: Vec<u8>) -> Generation<u8> {
        let n = genomes.len();
        Generation {
            genomes,
            phenotypes: (0..n).map(|_| VoxelGrid::new(2)).collect(),
            fitness: vec![-1.0; n],
        }
    }

    /// Fitness: stamped value times the weight.
    fn stamp_fitness(body: &Body, _targets: &(), weight: &f32) -> f32 {
        body.cells.first().map(|c| (c.cell_type as f32 + 1.0) * weight).unwrap_or(0.0)
    }

    #[test]
    fn test_redevelop_only_listed_slots() {
        let mut session = StampSession::default();
        let mut generation = generation(vec![5, 6, 7, 8]);
        let developed = redevelop(&mut session, &mut generation, &[1, 3], 4).unwrap();

        assert_eq!(developed, 2);
        assert_eq!(session.developed, vec![6, 8]);
        assert_eq!(generation.phenotypes[1].get(0, 0, 0), 6);
        assert_eq!(generation.phenotypes[0].occupied(), 0);
    }

    #[test]
    fn test_rescore_scope() {
        assert_eq!(
            RescoreScope::for_weights(&1.0f32, &1.0f32),
            RescoreScope::Invalidated
        );
        assert_eq!(
            RescoreScope::for_weights(&[1.0f32, 2.0], &[1.0, 2.5]),
            RescoreScope::All
        );
    }

    #[test]
    fn test_rescore_invalidated_only() {
        let mut session = StampSession::default();
        let mut generation = generation(vec![1, 2, 3]);
        redevelop(&mut session, &mut generation, &[0, 1, 2], 1).unwrap();

        let mut scratch = Body::default();
        let scored = rescore(
            &mut generation,
            RescoreScope::Invalidated,
            &[2],
            &stamp_fitness,
            &(),
            &2.0,
            &mut scratch,
        );
        assert_eq!(scored, 1);
        assert_eq!(generation.fitness, vec![-1.0, -1.0, 6.0]);

        let scored = rescore(
            &mut generation,
            RescoreScope::All,
            &[2],
            &stamp_fitness,
            &(),
            &1.0,
            &mut scratch,
        );
        assert_eq!(scored, 3);
        assert_eq!(generation.fitness, vec![1.0, 2.0, 3.0]);
    }
}
