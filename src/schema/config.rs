//! Configuration types for evolutionary runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{PlanError, SelectionPlan, SelectionStage, Substage};

/// Largest supported voxel grid side (the developmental volume is `side^3`).
pub const MAX_VOXEL_SIDE: usize = 256;

/// Population and development settings for one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Number of population slots.
    pub population_size: usize,
    /// Developmental steps simulated per genome.
    pub development_steps: u32,
    /// Side of the cubic voxel grid a body develops in.
    #[serde(default = "default_voxel_side")]
    pub voxel_side: usize,
    /// Random seed for reproducibility. Seeded from entropy when absent.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_voxel_side() -> usize {
    64
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            population_size: 16,
            development_steps: 24,
            voxel_side: default_voxel_side(),
            random_seed: None,
        }
    }
}

impl EvolutionConfig {
    /// Validate run parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < 2 {
            return Err(ConfigError::PopulationTooSmall);
        }
        if self.development_steps == 0 {
            return Err(ConfigError::InvalidSteps);
        }
        if self.voxel_side == 0 || self.voxel_side > MAX_VOXEL_SIDE {
            return Err(ConfigError::InvalidVoxelSide(self.voxel_side));
        }
        Ok(())
    }
}

/// Byte segmentation of a genome.
///
/// A genome holds `fields` rule fields of `field_bytes` bytes for each of the
/// `cell_types` stem cell types, followed by `global_loci * fields` global
/// loci of `global_stride` bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenomeLayout {
    pub cell_types: usize,
    pub fields: usize,
    #[serde(default = "default_field_bytes")]
    pub field_bytes: usize,
    #[serde(default = "default_global_loci")]
    pub global_loci: usize,
    #[serde(default = "default_global_stride")]
    pub global_stride: usize,
}

fn default_field_bytes() -> usize {
    8
}
fn default_global_loci() -> usize {
    7
}
fn default_global_stride() -> usize {
    2
}

impl Default for GenomeLayout {
    fn default() -> Self {
        Self {
            cell_types: 4,
            fields: 4,
            field_bytes: default_field_bytes(),
            global_loci: default_global_loci(),
            global_stride: default_global_stride(),
        }
    }
}

impl GenomeLayout {
    /// Bytes of per-cell-type rule data.
    #[inline]
    pub fn cell_bytes(&self) -> usize {
        self.cell_types * self.fields * self.field_bytes
    }

    /// Bytes of global data following the cell rules.
    #[inline]
    pub fn global_bytes(&self) -> usize {
        self.global_loci * self.fields * self.global_stride
    }

    /// Total genome length in bytes.
    #[inline]
    pub fn genome_len(&self) -> usize {
        self.cell_bytes() + self.global_bytes()
    }

    /// Validate the segmentation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cell_types == 0 || self.fields == 0 || self.field_bytes == 0 {
            return Err(ConfigError::InvalidLayout(
                "cell types, fields and field bytes must be non-zero".into(),
            ));
        }
        if self.global_loci > 0 && self.global_stride == 0 {
            return Err(ConfigError::InvalidLayout(
                "global stride must be non-zero when global loci are present".into(),
            ));
        }
        if self.cell_types > u8::MAX as usize {
            return Err(ConfigError::InvalidLayout(format!(
                "at most {} cell types fit in a voxel",
                u8::MAX
            )));
        }
        Ok(())
    }
}

/// Targets of the reference shape fitness function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeTargets {
    /// Desired number of cells.
    pub cell_count: usize,
    /// Desired vertical extent in voxels.
    pub height: usize,
}

impl Default for ShapeTargets {
    fn default() -> Self {
        Self {
            cell_count: 400,
            height: 20,
        }
    }
}

/// Everything the CLI needs for one run, loaded from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub layout: GenomeLayout,
    /// Plan scored by the shape fitness (weights: cell count, height).
    pub plan: SelectionPlan<[f32; 2], ShapeTargets>,
    /// Where to write the final population, if anywhere.
    #[serde(default)]
    pub output: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        let evolution = EvolutionConfig::default();
        let size = evolution.population_size;
        Self {
            evolution,
            layout: GenomeLayout::default(),
            plan: SelectionPlan {
                stages: vec![
                    SelectionStage {
                        substages: vec![
                            Substage::tournament(3, size / 4),
                            Substage::two_point_crossover(0.5, size / 4),
                            Substage::uniform_crossover(0.3, size / 4),
                            Substage::mutate(0.05, size - 3 * (size / 4)),
                        ],
                        base: [1.0, 0.0],
                        increment: [0.0, 0.1],
                        repeats: 10,
                    },
                    SelectionStage {
                        substages: vec![
                            Substage::exponential(0.8, size / 2),
                            Substage::mutate(0.02, size - size / 2),
                        ],
                        base: [1.0, 1.0],
                        increment: [0.0, 0.0],
                        repeats: 5,
                    },
                ],
                maximize_fitness: true,
                targets: ShapeTargets::default(),
            },
            output: None,
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate every part of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.evolution.validate()?;
        self.layout.validate()?;
        self.plan.validate(self.evolution.population_size)?;
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Population size must be at least 2")]
    PopulationTooSmall,
    #[error("Development steps must be positive")]
    InvalidSteps,
    #[error("Voxel side {0} outside 1..=256")]
    InvalidVoxelSide(usize),
    #[error("Invalid genome layout: {0}")]
    InvalidLayout(String),
    #[error("{0} initial genomes exceed the population size {1}")]
    TooManyGenomes(usize, usize),
    #[error("Invalid selection plan: {0}")]
    Plan(#[from] PlanError),
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}
