//! Reference fitness function and population fitness summaries.

use crate::compute::Body;
use crate::schema::ShapeTargets;

/// Shape fitness: how close a body is to a target cell count and height.
///
/// `weights[0]` scales the relative cell count error, `weights[1]` the
/// relative height error. Scores lie in `(0, 1]`; higher is better.
pub fn shape_fitness(body: &Body, targets: &ShapeTargets, weights: &[f32; 2]) -> f32 {
    let count_error = relative_error(body.count(), targets.cell_count);
    let height_error = relative_error(body.height(), targets.height);
    let penalty = weights[0].max(0.0) * count_error + weights[1].max(0.0) * height_error;
    1.0 / (1.0 + penalty)
}

fn relative_error(actual: usize, target: usize) -> f32 {
    actual.abs_diff(target) as f32 / target.max(1) as f32
}

/// Best score of a population.
pub fn best_fitness(fitness: &[f32], maximize: bool) -> f32 {
    if maximize {
        fitness.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    } else {
        fitness.iter().copied().fold(f32::INFINITY, f32::min)
    }
}

/// Mean score of a population, 0 when empty.
pub fn mean_fitness(fitness: &[f32]) -> f32 {
    if fitness.is_empty() {
        0.0
    } else {
        fitness.iter().sum::<f32>() / fitness.len() as f32
    }
}

/// Index of the best individual, if any.
pub fn best_index(fitness: &[f32], maximize: bool) -> Option<usize> {
    let scored = fitness.iter().enumerate();
    let best = if maximize {
        scored.max_by(|a, b| a.1.total_cmp(b.1))
    } else {
        scored.min_by(|a, b| a.1.total_cmp(b.1))
    };
    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Cell;

    fn column(height: u16) -> Body {
        Body {
            cells: (0..height)
                .map(|y| Cell {
                    x: 0,
                    y,
                    z: 0,
                    cell_type: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_perfect_shape() {
        let targets = ShapeTargets {
            cell_count: 10,
            height: 10,
        };
        assert_eq!(shape_fitness(&column(10), &targets, &[1.0, 1.0]), 1.0);
    }

    #[test]
    fn test_weights_scale_errors() {
        let targets = ShapeTargets {
            cell_count: 10,
            height: 5,
        };
        let body = column(10);
        // Count matches; height is off by 100%.
        assert_eq!(shape_fitness(&body, &targets, &[1.0, 0.0]), 1.0);
        assert_eq!(shape_fitness(&body, &targets, &[1.0, 1.0]), 0.5);
        assert!(shape_fitness(&body, &targets, &[1.0, 3.0]) < 0.5);
    }

    #[test]
    fn test_empty_body() {
        let targets = ShapeTargets::default();
        let score = shape_fitness(&Body::default(), &targets, &[1.0, 1.0]);
        assert_eq!(score, 1.0 / 3.0);
    }

    #[test]
    fn test_summaries() {
        let fitness = [0.5, 2.0, -1.0];
        assert_eq!(best_fitness(&fitness, true), 2.0);
        assert_eq!(best_fitness(&fitness, false), -1.0);
        assert_eq!(best_index(&fitness, true), Some(1));
        assert_eq!(best_index(&fitness, false), Some(2));
        assert_eq!(mean_fitness(&fitness), 0.5);
        assert_eq!(best_index(&[], true), None);
    }
}
