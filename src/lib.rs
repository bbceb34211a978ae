//! Evo-Devo - Generational evolution of developmentally encoded bodies.
//!
//! Genomes are not scored directly. Each one is grown into a voxel body by a
//! developmental simulator, and the body is scored. A declarative selection
//! plan decides, generation by generation, who survives, who breeds and who
//! mutates. Only genomes that changed are grown again.
//!
//! # Architecture
//!
//! The crate is split into two main modules:
//!
//! - `schema`: Run configuration, genome layout and selection plans
//! - `compute`: Voxel bodies, development sessions and the evolution scheduler
//!
//! # Example
//!
//! ```rust,no_run
//! use evo_devo::{
//!     compute::{
//!         GrowthDeveloper,
//!         evolution::{ByteCodec, Evolver, Population, shape_fitness},
//!     },
//!     schema::RunConfig,
//! };
//!
//! // Default run: 16 individuals, two stages
//! let config = RunConfig::default();
//!
//! let codec = ByteCodec::new(config.layout);
//! let developer = GrowthDeveloper::new(config.layout, config.evolution.voxel_side);
//! let mut evolver = Evolver::new(codec, developer, config.evolution.clone());
//!
//! // Start from randomly generated genomes
//! let mut population = Population::default();
//! let stats = evolver.run(&mut population, &config.plan, shape_fitness).unwrap();
//!
//! println!("Best fitness: {}", stats.best_fitness);
//! ```

pub mod compute;
pub mod schema;

// Re-export commonly used types
pub use compute::evolution::{EvolutionStats, EvolveError, Evolver, Population};
pub use compute::{Body, GrowthDeveloper, VoxelGrid};
pub use schema::{EvolutionConfig, RunConfig, SelectionPlan};
