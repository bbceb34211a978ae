//! Selection plan types: stages, substages and interpolated fitness weights.
//!
//! A plan is an ordered list of stages. Each stage is repeated `repeats` times;
//! repeat `j` scores the population with `base + increment * j`. Every repeat
//! builds one generation out of the stage's substages, which fill contiguous
//! slices of the next population in order.

use serde::{Deserialize, Serialize};

/// Fitness weights that can be linearly interpolated across stage repeats.
pub trait Weights: Clone + std::fmt::Debug {
    /// Effective weights for repeat `repeat`: `base + increment * repeat`.
    fn interpolate(base: &Self, increment: &Self, repeat: usize) -> Self;

    /// Bitwise equality. Two weight sets are interchangeable for scoring only if
    /// every component has the same bit pattern.
    fn bit_eq(&self, other: &Self) -> bool;

    /// Number of components.
    fn dimension(&self) -> usize;
}

impl Weights for f32 {
    fn interpolate(base: &Self, increment: &Self, repeat: usize) -> Self {
        base + increment * repeat as f32
    }

    fn bit_eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }

    fn dimension(&self) -> usize {
        1
    }
}

impl<const N: usize> Weights for [f32; N] {
    fn interpolate(base: &Self, increment: &Self, repeat: usize) -> Self {
        std::array::from_fn(|i| f32::interpolate(&base[i], &increment[i], repeat))
    }

    fn bit_eq(&self, other: &Self) -> bool {
        self.iter().zip(other.iter()).all(|(a, b)| a.bit_eq(b))
    }

    fn dimension(&self) -> usize {
        N
    }
}

impl Weights for Vec<f32> {
    fn interpolate(base: &Self, increment: &Self, repeat: usize) -> Self {
        base.iter()
            .zip(increment.iter())
            .map(|(b, i)| f32::interpolate(b, i, repeat))
            .collect()
    }

    fn bit_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.bit_eq(b))
    }

    fn dimension(&self) -> usize {
        self.len()
    }
}

/// Ordered selection pipeline driving a whole evolutionary run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionPlan<W, T> {
    /// Stages, executed in order.
    pub stages: Vec<SelectionStage<W>>,
    /// Whether higher fitness is better. Applies to every stage.
    #[serde(default = "default_maximize")]
    pub maximize_fitness: bool,
    /// Fitness function targets, opaque to the scheduler.
    pub targets: T,
}

fn default_maximize() -> bool {
    true
}

/// A block of substages executed `repeats` times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionStage<W> {
    /// Substages, each producing a contiguous slice of the next generation.
    pub substages: Vec<Substage>,
    /// Weights used at repeat 0.
    pub base: W,
    /// Weight change per repeat.
    pub increment: W,
    /// Number of generations this stage runs for.
    #[serde(default = "default_repeats")]
    pub repeats: usize,
}

fn default_repeats() -> usize {
    1
}

impl<W: Weights> SelectionStage<W> {
    /// Effective weights at repeat `repeat` (0-indexed).
    pub fn weights_at(&self, repeat: usize) -> W {
        W::interpolate(&self.base, &self.increment, repeat)
    }
}

impl<W> SelectionStage<W> {
    /// Total number of individuals the stage produces per repeat.
    pub fn individuals(&self) -> usize {
        self.substages.iter().map(|s| s.individuals).sum()
    }
}

/// One selection or variation operator of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Substage {
    /// Operator and its parameter.
    #[serde(flatten)]
    pub kind: SubstageKind,
    /// Number of next-generation slots this substage fills.
    pub individuals: usize,
}

/// Substage operator with its kind-specific parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SubstageKind {
    /// Fitness-proportional survival.
    Roulette,
    /// Linear ranking survival.
    Linear {
        /// Expected offspring of the best individual, in `[1, 2]`.
        selection_pressure: f32,
    },
    /// Exponential ranking survival.
    Exponential {
        /// Weight ratio between consecutive ranks, in `(0, 1]`.
        base: f32,
    },
    /// Tournament survival.
    Tournament {
        /// Contestants per tournament.
        size: usize,
    },
    /// Two-point crossover with assortative mating.
    TwoPointCrossover {
        /// Desired normalized genetic distance between mates, in `[0, 1]`.
        genetic_distance: f32,
    },
    /// Uniform crossover with assortative mating.
    UniformCrossover {
        /// Desired normalized genetic distance between mates, in `[0, 1]`.
        genetic_distance: f32,
    },
    /// Point mutation of randomly chosen individuals.
    Mutate {
        /// Per-locus mutation probability, in `[0, 1]`.
        probability: f32,
    },
}

impl SubstageKind {
    /// Ranking method for the survival kinds, `None` for variation kinds.
    pub fn ranking(&self) -> Option<RankingMethod> {
        match *self {
            Self::Roulette => Some(RankingMethod::Roulette),
            Self::Linear { selection_pressure } => {
                Some(RankingMethod::Linear { selection_pressure })
            }
            Self::Exponential { base } => Some(RankingMethod::Exponential { base }),
            Self::Tournament { size } => Some(RankingMethod::Tournament { size }),
            Self::TwoPointCrossover { .. } | Self::UniformCrossover { .. } | Self::Mutate { .. } => {
                None
            }
        }
    }
}

impl Substage {
    pub fn roulette(individuals: usize) -> Self {
        Self {
            kind: SubstageKind::Roulette,
            individuals,
        }
    }

    pub fn linear(selection_pressure: f32, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::Linear { selection_pressure },
            individuals,
        }
    }

    pub fn exponential(base: f32, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::Exponential { base },
            individuals,
        }
    }

    pub fn tournament(size: usize, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::Tournament { size },
            individuals,
        }
    }

    pub fn two_point_crossover(genetic_distance: f32, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::TwoPointCrossover { genetic_distance },
            individuals,
        }
    }

    pub fn uniform_crossover(genetic_distance: f32, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::UniformCrossover { genetic_distance },
            individuals,
        }
    }

    pub fn mutate(probability: f32, individuals: usize) -> Self {
        Self {
            kind: SubstageKind::Mutate { probability },
            individuals,
        }
    }
}

/// Ranking algorithm used to pick winners from a scored population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankingMethod {
    Roulette,
    Linear { selection_pressure: f32 },
    Exponential { base: f32 },
    Tournament { size: usize },
}

// ============================================================================
// Validation
// ============================================================================

/// Selection plan validation errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    #[error("Selection plan has no stages")]
    NoStages,
    #[error("Stage {stage} produces {produced} individuals but the population holds {expected}")]
    IndividualCountMismatch {
        stage: usize,
        produced: usize,
        expected: usize,
    },
    #[error("Stage {stage} has {base} base weights but {increment} increments")]
    WeightDimensionMismatch {
        stage: usize,
        base: usize,
        increment: usize,
    },
    #[error("Stage {stage}, substage {substage}: {reason}")]
    InvalidParameter {
        stage: usize,
        substage: usize,
        reason: String,
    },
    #[error(
        "Stage {stage}, substage {substage}: {individuals} first parents leave no mating partner in a population of {population_size}"
    )]
    NoMatingPool {
        stage: usize,
        substage: usize,
        individuals: usize,
        population_size: usize,
    },
}

impl<W: Weights, T> SelectionPlan<W, T> {
    /// Check the plan against a population size.
    ///
    /// The scheduler itself assumes a valid plan; this is the layer that
    /// enforces it.
    pub fn validate(&self, population_size: usize) -> Result<(), PlanError> {
        if self.stages.is_empty() {
            return Err(PlanError::NoStages);
        }

        for (stage_index, stage) in self.stages.iter().enumerate() {
            let produced = stage.individuals();
            if produced != population_size {
                return Err(PlanError::IndividualCountMismatch {
                    stage: stage_index,
                    produced,
                    expected: population_size,
                });
            }

            if stage.base.dimension() != stage.increment.dimension() {
                return Err(PlanError::WeightDimensionMismatch {
                    stage: stage_index,
                    base: stage.base.dimension(),
                    increment: stage.increment.dimension(),
                });
            }

            if stage.repeats == 0 {
                log::warn!("Stage {} has zero repeats and will be skipped", stage_index);
            }

            for (substage_index, substage) in stage.substages.iter().enumerate() {
                let invalid = |reason: String| PlanError::InvalidParameter {
                    stage: stage_index,
                    substage: substage_index,
                    reason,
                };

                match substage.kind {
                    SubstageKind::Roulette => {}
                    SubstageKind::Linear { selection_pressure } => {
                        if !(1.0..=2.0).contains(&selection_pressure) {
                            return Err(invalid(format!(
                                "selection pressure {} outside [1, 2]",
                                selection_pressure
                            )));
                        }
                    }
                    SubstageKind::Exponential { base } => {
                        if !(base > 0.0 && base <= 1.0) {
                            return Err(invalid(format!(
                                "exponential base {} outside (0, 1]",
                                base
                            )));
                        }
                    }
                    SubstageKind::Tournament { size } => {
                        if size == 0 {
                            return Err(invalid("tournament size must be positive".into()));
                        }
                    }
                    SubstageKind::TwoPointCrossover { genetic_distance }
                    | SubstageKind::UniformCrossover { genetic_distance } => {
                        if !(0.0..=1.0).contains(&genetic_distance) {
                            return Err(invalid(format!(
                                "genetic distance {} outside [0, 1]",
                                genetic_distance
                            )));
                        }
                        if substage.individuals >= population_size && substage.individuals > 0 {
                            return Err(PlanError::NoMatingPool {
                                stage: stage_index,
                                substage: substage_index,
                                individuals: substage.individuals,
                                population_size,
                            });
                        }
                    }
                    SubstageKind::Mutate { probability } => {
                        if !(0.0..=1.0).contains(&probability) {
                            return Err(invalid(format!(
                                "mutation probability {} outside [0, 1]",
                                probability
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

impl<W, T> SelectionPlan<W, T> {
    /// Total number of generations the plan runs for.
    pub fn generations(&self) -> usize {
        self.stages.iter().map(|s| s.repeats).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(substages: Vec<Substage>) -> SelectionPlan<f32, ()> {
        SelectionPlan {
            stages: vec![SelectionStage {
                substages,
                base: 1.0,
                increment: 0.0,
                repeats: 1,
            }],
            maximize_fitness: true,
            targets: (),
        }
    }

    #[test]
    fn test_weights_interpolation() {
        let stage = SelectionStage {
            substages: vec![],
            base: [1.0f32, 0.5],
            increment: [0.25, -0.5],
            repeats: 3,
        };
        assert_eq!(stage.weights_at(0), [1.0, 0.5]);
        assert_eq!(stage.weights_at(2), [1.5, -0.5]);
    }

    #[test]
    fn test_bit_equality() {
        assert!(1.0f32.bit_eq(&1.0));
        assert!(!0.0f32.bit_eq(&-0.0));
        assert!(f32::NAN.bit_eq(&f32::NAN));
        assert!(!vec![1.0f32].bit_eq(&vec![1.0, 2.0]));
    }

    #[test]
    fn test_valid_plan() {
        let plan = plan(vec![Substage::tournament(2, 6), Substage::mutate(0.1, 4)]);
        assert_eq!(plan.validate(10), Ok(()));
        assert_eq!(plan.generations(), 1);
    }

    #[test]
    fn test_empty_plan_rejected() {
        let plan: SelectionPlan<f32, ()> = SelectionPlan {
            stages: vec![],
            maximize_fitness: true,
            targets: (),
        };
        assert_eq!(plan.validate(4), Err(PlanError::NoStages));
    }

    #[test]
    fn test_count_mismatch_rejected() {
        let plan = plan(vec![Substage::roulette(3)]);
        assert_eq!(
            plan.validate(4),
            Err(PlanError::IndividualCountMismatch {
                stage: 0,
                produced: 3,
                expected: 4
            })
        );
    }

    #[test]
    fn test_weight_dimensions_must_match() {
        let plan = SelectionPlan {
            stages: vec![SelectionStage {
                substages: vec![Substage::roulette(4)],
                base: vec![1.0f32, 0.5],
                increment: vec![0.1],
                repeats: 2,
            }],
            maximize_fitness: true,
            targets: (),
        };
        assert_eq!(
            plan.validate(4),
            Err(PlanError::WeightDimensionMismatch {
                stage: 0,
                base: 2,
                increment: 1
            })
        );
    }

    #[test]
    fn test_crossover_needs_partners() {
        let plan = plan(vec![Substage::uniform_crossover(0.5, 4)]);
        assert!(matches!(
            plan.validate(4),
            Err(PlanError::NoMatingPool { individuals: 4, .. })
        ));
    }

    #[test]
    fn test_parameter_ranges() {
        assert!(plan(vec![Substage::mutate(1.5, 4)]).validate(4).is_err());
        assert!(plan(vec![Substage::tournament(0, 4)]).validate(4).is_err());
        assert!(plan(vec![Substage::linear(2.5, 4)]).validate(4).is_err());
        assert!(plan(vec![Substage::exponential(0.0, 4)]).validate(4).is_err());
        assert!(
            plan(vec![Substage::roulette(2), Substage::two_point_crossover(-0.1, 2)])
                .validate(4)
                .is_err()
        );
    }

    #[test]
    fn test_substage_serialization() {
        let substage = Substage::tournament(3, 8);
        let json = serde_json::to_string(&substage).unwrap();
        assert_eq!(json, r#"{"type":"Tournament","size":3,"individuals":8}"#);

        let parsed: Substage =
            serde_json::from_str(r#"{"type":"Mutate","probability":0.25,"individuals":2}"#)
                .unwrap();
        assert_eq!(parsed, Substage::mutate(0.25, 2));
    }

    #[test]
    fn test_ranking_methods() {
        assert_eq!(
            SubstageKind::Roulette.ranking(),
            Some(RankingMethod::Roulette)
        );
        assert_eq!(
            SubstageKind::Linear {
                selection_pressure: 1.5
            }
            .ranking(),
            Some(RankingMethod::Linear {
                selection_pressure: 1.5
            })
        );
        assert_eq!(
            SubstageKind::Tournament { size: 2 }.ranking(),
            Some(RankingMethod::Tournament { size: 2 })
        );
        assert_eq!(SubstageKind::Mutate { probability: 0.1 }.ranking(), None);
        assert_eq!(
            SubstageKind::TwoPointCrossover {
                genetic_distance: 0.3
            }
            .ranking(),
            None
        );
    }
}
