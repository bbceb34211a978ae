//! Selection plan interpreter.
//!
//! Each stage repeat builds the next generation substage by substage, commits
//! it, redevelops the slots whose genome changed and rescores. Only changed
//! genomes are redeveloped; the whole population is rescored only when the
//! effective fitness weights change between repeats.

use std::time::Instant;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::compute::{Body, Developer};
use crate::schema::{
    ConfigError, EvolutionConfig, RankingMethod, SelectionPlan, Substage, SubstageKind, Weights,
};

use super::EvolveError;
use super::fitness::{best_fitness, mean_fitness};
use super::genome::{GenomeCodec, LocusTable};
use super::mating::select_mates;
use super::population::{Population, PopulationStore};
use super::ranking::{Ranker, StandardRanker, inside_out_permutation};
use super::redevelop::{RescoreScope, develop_into, redevelop, rescore};

/// Boxed genetic distance function.
pub type DistanceFn<G> = Box<dyn Fn(&G, &G) -> u64>;

/// Summary of one completed stage repeat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Stage index within the plan.
    pub stage: usize,
    /// Repeat index within the stage.
    pub repeat: usize,
    /// Effective weights differ from the previous repeat's.
    pub weights_changed: bool,
    /// Genomes redeveloped this repeat.
    pub developed: usize,
    /// Slots rescored this repeat.
    pub rescored: usize,
    /// Best fitness of the new generation.
    pub best_fitness: f32,
    /// Mean fitness of the new generation.
    pub mean_fitness: f32,
}

/// Statistics of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionStats {
    /// Stage repeats executed.
    pub generations: usize,
    /// Developmental simulations run, initial population included.
    pub developments: usize,
    /// Fitness evaluations, initial population included.
    pub evaluations: usize,
    /// Wall-clock duration of the run.
    pub elapsed_seconds: f64,
    /// Best fitness of the final population.
    pub best_fitness: f32,
}

/// Drives a selection plan over a population.
pub struct Evolver<C: GenomeCodec, D, R = StandardRanker> {
    codec: C,
    developer: D,
    ranker: R,
    config: EvolutionConfig,
    rng: StdRng,
    distance: Option<DistanceFn<C::Genome>>,
}

impl<C, D> Evolver<C, D, StandardRanker>
where
    C: GenomeCodec,
    D: Developer<C::Genome>,
{
    /// Create an evolver with the standard ranking algorithms.
    ///
    /// The run-scoped generator is seeded from `config.random_seed`, or from
    /// entropy when no seed is configured.
    pub fn new(codec: C, developer: D, config: EvolutionConfig) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            codec,
            developer,
            ranker: StandardRanker,
            config,
            rng,
            distance: None,
        }
    }
}

impl<C, D, R> Evolver<C, D, R>
where
    C: GenomeCodec,
    D: Developer<C::Genome>,
    R: Ranker,
{
    /// Replace the ranking algorithms.
    pub fn with_ranker<R2: Ranker>(self, ranker: R2) -> Evolver<C, D, R2> {
        Evolver {
            codec: self.codec,
            developer: self.developer,
            ranker,
            config: self.config,
            rng: self.rng,
            distance: self.distance,
        }
    }

    /// Use a custom genetic distance for mate selection instead of the codec's.
    pub fn with_distance<F>(mut self, distance: F) -> Self
    where
        F: Fn(&C::Genome, &C::Genome) -> u64 + 'static,
    {
        self.distance = Some(Box::new(distance));
        self
    }

    /// Run the plan (blocking).
    pub fn run<W, T, F>(
        &mut self,
        population: &mut Population<C::Genome>,
        plan: &SelectionPlan<W, T>,
        fitness: F,
    ) -> Result<EvolutionStats, EvolveError>
    where
        W: Weights,
        F: Fn(&Body, &T, &W) -> f32,
    {
        self.run_with_callback(population, plan, fitness, |_| {})
    }

    /// Run the plan, reporting after every stage repeat.
    ///
    /// `population.genomes` seeds the run; missing genomes up to the
    /// population size are generated. On success `population` holds the final
    /// genomes, bodies and fitness.
    ///
    /// On error `population` is left as it was if the failure happened before
    /// development started. A failure during the run puts the genomes of the
    /// current generation back into `population.genomes` (the seeded and
    /// generated genomes if the initial development failed); bodies and
    /// fitness are left untouched.
    pub fn run_with_callback<W, T, F, P>(
        &mut self,
        population: &mut Population<C::Genome>,
        plan: &SelectionPlan<W, T>,
        fitness: F,
        mut progress: P,
    ) -> Result<EvolutionStats, EvolveError>
    where
        W: Weights,
        F: Fn(&Body, &T, &W) -> f32,
        P: FnMut(&GenerationReport),
    {
        let start_time = Instant::now();

        self.config.validate()?;
        let size = self.config.population_size;
        plan.validate(size)?;
        if population.genomes.len() > size {
            return Err(ConfigError::TooManyGenomes(population.genomes.len(), size).into());
        }

        let Self {
            codec,
            developer,
            ranker,
            config,
            rng,
            distance,
        } = self;
        let codec: &C = codec;

        let mut session = developer.open_session().inspect_err(|e| {
            log::error!("Cannot create development context: {}", e);
        })?;

        let loci = codec.loci();
        let custom_distance = distance.as_ref();
        let distance = |a: &C::Genome, b: &C::Genome| -> u64 {
            match custom_distance {
                Some(d) => d(a, b),
                None => codec.distance(a, b),
            }
        };

        // Initial population
        let mut genomes = std::mem::take(&mut population.genomes);
        if genomes.len() < size {
            log::info!("Generating {} genomes", size - genomes.len());
            let missing = size - genomes.len();
            genomes.extend((0..missing).map(|_| codec.generate(rng)));
        }
        let mut store = PopulationStore::new(genomes, config.voxel_side);
        let mut scratch = Body::default();

        let mut executor = SubstageExecutor {
            codec,
            ranker,
            rng,
            loci: &loci,
            distance: &distance,
            maximize: plan.maximize_fitness,
        };

        let mut developments = 0;
        let mut evaluations = 0;
        let mut generations = 0;

        let mut drive = || -> Result<(), EvolveError> {
            let mut previous = plan.stages[0].weights_at(0);
            {
                let generation = store.current_mut();
                for slot in 0..size {
                    log::debug!("Developing genome {}", slot);
                    develop_into(
                        &mut session,
                        &generation.genomes[slot],
                        config.development_steps,
                        &mut generation.phenotypes[slot],
                    )?;
                }
                rescore(
                    generation,
                    RescoreScope::All,
                    &[],
                    &fitness,
                    &plan.targets,
                    &previous,
                    &mut scratch,
                );
            }
            developments += size;
            evaluations += size;

            for (i, stage) in plan.stages.iter().enumerate() {
                for j in 0..stage.repeats {
                    log::info!("Stage {}, repeat {}", i, j);

                    store.begin_generation();
                    let mut cursor = 0;
                    for substage in &stage.substages {
                        executor.execute(substage, cursor, &mut store)?;
                        cursor += substage.individuals;
                    }
                    store.commit_generation();

                    let weights = stage.weights_at(j);
                    let scope = RescoreScope::for_weights(&previous, &weights);
                    let (generation, invalidated) = store.split_invalidated();
                    let developed = redevelop(
                        &mut session,
                        generation,
                        invalidated,
                        config.development_steps,
                    )?;
                    let rescored = rescore(
                        generation,
                        scope,
                        invalidated,
                        &fitness,
                        &plan.targets,
                        &weights,
                        &mut scratch,
                    );
                    previous = weights;

                    developments += developed;
                    evaluations += rescored;
                    generations += 1;

                    let report = GenerationReport {
                        stage: i,
                        repeat: j,
                        weights_changed: scope == RescoreScope::All,
                        developed,
                        rescored,
                        best_fitness: best_fitness(&generation.fitness, plan.maximize_fitness),
                        mean_fitness: mean_fitness(&generation.fitness),
                    };
                    log::info!(
                        "Stage {}, repeat {}: developed {}, rescored {}, best {:.4}, mean {:.4}",
                        i,
                        j,
                        report.developed,
                        report.rescored,
                        report.best_fitness,
                        report.mean_fitness
                    );
                    progress(&report);
                }
            }
            Ok(())
        };

        if let Err(e) = drive() {
            log::error!("Run aborted after {} generations: {}", generations, e);
            population.genomes = store.into_genomes();
            return Err(e);
        }

        let best = best_fitness(&store.current().fitness, plan.maximize_fitness);
        store.finalize(population);

        Ok(EvolutionStats {
            generations,
            developments,
            evaluations,
            elapsed_seconds: start_time.elapsed().as_secs_f64(),
            best_fitness: best,
        })
    }
}

/// Run a plan with a custom distance function and the standard ranking
/// algorithms.
pub fn evolve<C, D, W, T, F, Dist>(
    codec: C,
    developer: D,
    config: EvolutionConfig,
    population: &mut Population<C::Genome>,
    plan: &SelectionPlan<W, T>,
    fitness: F,
    distance: Dist,
) -> Result<EvolutionStats, EvolveError>
where
    C: GenomeCodec,
    D: Developer<C::Genome>,
    W: Weights,
    F: Fn(&Body, &T, &W) -> f32,
    Dist: Fn(&C::Genome, &C::Genome) -> u64 + 'static,
{
    Evolver::new(codec, developer, config)
        .with_distance(distance)
        .run(population, plan, fitness)
}

#[derive(Debug, Clone, Copy)]
enum Crossover {
    TwoPoint,
    Uniform,
}

/// Fills slices of the next generation, one substage at a time.
struct SubstageExecutor<'a, C, R, D: ?Sized> {
    codec: &'a C,
    ranker: &'a mut R,
    rng: &'a mut StdRng,
    loci: &'a LocusTable,
    distance: &'a D,
    maximize: bool,
}

impl<C, R, D> SubstageExecutor<'_, C, R, D>
where
    C: GenomeCodec,
    R: Ranker,
    D: Fn(&C::Genome, &C::Genome) -> u64 + ?Sized,
{
    fn execute(
        &mut self,
        substage: &Substage,
        cursor: usize,
        store: &mut PopulationStore<C::Genome>,
    ) -> Result<(), EvolveError> {
        let count = substage.individuals;
        match substage.kind {
            SubstageKind::TwoPointCrossover { genetic_distance } => {
                self.recombine(Crossover::TwoPoint, genetic_distance, count, cursor, store)
            }
            SubstageKind::UniformCrossover { genetic_distance } => {
                self.recombine(Crossover::Uniform, genetic_distance, count, cursor, store)
            }
            SubstageKind::Mutate { probability } => {
                self.mutate(probability, count, cursor, store);
                Ok(())
            }
            // Every remaining kind is a survival kind and has a ranking method.
            survival => match survival.ranking() {
                Some(method) => self.survive(method, count, cursor, store),
                None => Ok(()),
            },
        }
    }

    /// Carry ranking winners over unchanged.
    fn survive(
        &mut self,
        method: RankingMethod,
        count: usize,
        cursor: usize,
        store: &mut PopulationStore<C::Genome>,
    ) -> Result<(), EvolveError> {
        let population_size = store.len();
        let mut winners = vec![0usize; count];
        self.ranker.rank(
            method,
            &store.current().fitness,
            self.maximize,
            &mut winners,
            self.rng,
        );

        for (l, &winner) in winners.iter().enumerate() {
            if winner >= population_size {
                return Err(EvolveError::InvalidWinner {
                    index: winner,
                    population_size,
                });
            }
            store.carry_over(winner, cursor + l);
        }
        Ok(())
    }

    /// Breed one offspring per slot from assortatively mated pairs.
    fn recombine(
        &mut self,
        operator: Crossover,
        genetic_distance: f32,
        count: usize,
        cursor: usize,
        store: &mut PopulationStore<C::Genome>,
    ) -> Result<(), EvolveError> {
        let pairs = {
            let current = store.current();
            select_mates(
                &current.genomes,
                &current.fitness,
                self.maximize,
                count,
                genetic_distance,
                &mut *self.ranker,
                self.distance,
                &mut *self.rng,
            )?
        };

        for (l, (parent, partner)) in pairs.into_iter().enumerate() {
            let genomes = &store.current().genomes;
            let (first, second) = (&genomes[parent], &genomes[partner]);
            let child = match operator {
                Crossover::TwoPoint => {
                    self.codec
                        .crossover_two_point(first, second, self.loci, self.rng)
                }
                Crossover::Uniform => {
                    self.codec
                        .crossover_uniform(first, second, self.loci, self.rng)
                }
            };
            store.set_offspring(cursor + l, child);
        }
        Ok(())
    }

    /// Copy and mutate the first `count` individuals of a random permutation.
    fn mutate(
        &mut self,
        probability: f32,
        count: usize,
        cursor: usize,
        store: &mut PopulationStore<C::Genome>,
    ) {
        let permutation = inside_out_permutation(store.len(), self.rng);
        for (l, &source) in permutation.iter().take(count).enumerate() {
            let mut genome = store.current().genomes[source].clone();
            self.codec.mutate(&mut genome, probability, self.rng);
            store.set_offspring(cursor + l, genome);
        }
    }
}
