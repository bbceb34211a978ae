//! Evo-Devo CLI - Run evolutionary experiments from JSON configuration.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::PathBuf;

use serde::Serialize;

use evo_devo::{
    compute::{
        GrowthDeveloper,
        evolution::{
            ByteCodec, EvolutionStats, Evolver, Population, best_index, mean_fitness,
            shape_fitness,
        },
    },
    schema::RunConfig,
};

/// Final population as written to the output file.
#[derive(Serialize)]
struct RunResult {
    stats: EvolutionStats,
    individuals: Vec<IndividualResult>,
}

#[derive(Serialize)]
struct IndividualResult {
    genome: String,
    fitness: f32,
    cells: usize,
}

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json>", args[0]);
        eprintln!();
        eprintln!("Run an evolutionary experiment from JSON configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to run configuration file");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);

    // Load configuration
    let config = RunConfig::from_path(&config_path).unwrap_or_else(|e| {
        eprintln!("Error loading config: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = config.validate() {
        eprintln!("Invalid config: {}", e);
        std::process::exit(1);
    }

    let population_size = config.evolution.population_size;
    println!("Evo-Devo Run");
    println!("============");
    println!(
        "Population: {} ({} development steps, {}^3 voxels)",
        population_size, config.evolution.development_steps, config.evolution.voxel_side
    );
    println!(
        "Genome: {} bytes ({} cell types, {} fields)",
        config.layout.genome_len(),
        config.layout.cell_types,
        config.layout.fields
    );
    println!(
        "Plan: {} stages, {} generations",
        config.plan.stages.len(),
        config.plan.generations()
    );
    println!(
        "Targets: {} cells, height {}",
        config.plan.targets.cell_count, config.plan.targets.height
    );
    match config.evolution.random_seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: entropy"),
    }
    println!();

    let codec = ByteCodec::new(config.layout);
    let developer = GrowthDeveloper::new(config.layout, config.evolution.voxel_side);
    let mut evolver = Evolver::new(codec, developer, config.evolution.clone());
    let mut population = Population::default();

    // Run evolution
    println!("Running evolution...");
    let stats = evolver
        .run_with_callback(&mut population, &config.plan, shape_fitness, |report| {
            println!(
                "  Stage {} repeat {}: best={:.4}, mean={:.4}, developed={}, rescored={}",
                report.stage,
                report.repeat,
                report.best_fitness,
                report.mean_fitness,
                report.developed,
                report.rescored
            );
        })
        .unwrap_or_else(|e| {
            eprintln!("Evolution failed: {}", e);
            std::process::exit(1);
        });

    println!();
    println!("Final population:");
    println!("  Best fitness: {:.6}", stats.best_fitness);
    println!("  Mean fitness: {:.6}", mean_fitness(&population.fitness));
    if let Some(best) = best_index(&population.fitness, config.plan.maximize_fitness) {
        let body = &population.bodies[best];
        println!(
            "  Best body: {} cells, height {}",
            body.count(),
            body.height()
        );
    }
    println!(
        "  Developments: {}, evaluations: {}",
        stats.developments, stats.evaluations
    );
    println!(
        "Time: {:.2}s ({:.1} generations/s)",
        stats.elapsed_seconds,
        stats.generations as f64 / stats.elapsed_seconds.max(f64::EPSILON)
    );

    if let Some(output) = &config.output {
        let result = RunResult {
            individuals: population
                .genomes
                .iter()
                .zip(&population.fitness)
                .zip(&population.bodies)
                .map(|((genome, &fitness), body)| IndividualResult {
                    genome: genome.to_hex(),
                    fitness,
                    cells: body.count(),
                })
                .collect(),
            stats,
        };

        let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
            eprintln!("Error serializing result: {}", e);
            std::process::exit(1);
        });
        fs::write(output, json).unwrap_or_else(|e| {
            eprintln!("Error writing {}: {}", output.display(), e);
            std::process::exit(1);
        });
        println!("Wrote {}", output.display());
    }
}

fn print_example_config() {
    let config = RunConfig::default();
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing example config: {}", e);
            std::process::exit(1);
        }
    }
}
