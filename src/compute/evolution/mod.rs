//! Generational scheduling for developmentally encoded populations.
//!
//! # Overview
//!
//! - **Genome** (`genome`): codec interface, locus table, byte codec
//! - **Ranking** (`ranking`): roulette, linear, exponential and tournament selection
//! - **Mating** (`mating`): assortative partner choice for recombination
//! - **Population** (`population`): double-buffered slots with ownership-transferring commits
//! - **Redevelopment** (`redevelop`): development of changed genomes and rescoring policy
//! - **Scheduler** (`scheduler`): the selection plan interpreter
//! - **Fitness** (`fitness`): reference shape fitness and summaries
//!
//! # Example
//!
//! ```rust,no_run
//! use evo_devo::compute::GrowthDeveloper;
//! use evo_devo::compute::evolution::{ByteCodec, Evolver, Population, shape_fitness};
//! use evo_devo::schema::RunConfig;
//!
//! let config = RunConfig::default();
//! let codec = ByteCodec::new(config.layout);
//! let developer = GrowthDeveloper::new(config.layout, config.evolution.voxel_side);
//!
//! let mut evolver = Evolver::new(codec, developer, config.evolution.clone());
//! let mut population = Population::default();
//! let stats = evolver.run(&mut population, &config.plan, shape_fitness).unwrap();
//!
//! println!("Best fitness after {} generations: {:.3}", stats.generations, stats.best_fitness);
//! ```

mod fitness;
mod genome;
mod mating;
mod population;
mod ranking;
mod redevelop;
mod scheduler;

pub use fitness::{best_fitness, best_index, mean_fitness, shape_fitness};
pub use genome::{ByteCodec, ByteGenome, GenomeCodec, LocusTable};
pub use mating::select_mates;
pub use population::{Generation, Population, PopulationStore};
pub use ranking::{Ranker, StandardRanker, inside_out_permutation};
pub use redevelop::{RescoreScope, develop_into, redevelop, rescore};
pub use scheduler::{DistanceFn, EvolutionStats, Evolver, GenerationReport, evolve};

use crate::compute::DevelopError;
use crate::schema::{ConfigError, PlanError};

/// Errors aborting an evolutionary run.
#[derive(Debug, thiserror::Error)]
pub enum EvolveError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid selection plan: {0}")]
    Plan(#[from] PlanError),

    #[error("Development failed: {0}")]
    Develop(#[from] DevelopError),

    #[error("Ranking returned index {index} for a population of {population_size}")]
    InvalidWinner {
        index: usize,
        population_size: usize,
    },

    #[error("No mating partner left for parent {parent}")]
    NoMatingPartner { parent: usize },
}
