//! Assortative mating: pairing fitness-selected parents with partners at a
//! desired genetic distance.

use rand::rngs::StdRng;

use crate::schema::RankingMethod;

use super::EvolveError;
use super::ranking::Ranker;

/// Choose `count` (first parent, partner) pairs.
///
/// First parents are drawn by roulette ranking. Partners come from the rest
/// of the population (every index not drawn as a first parent). For each
/// first parent, candidate distances are normalized by the largest distance
/// from that parent to any candidate, and the candidate closest to
/// `desired_distance` wins. An exact match ends the scan; otherwise ties go to
/// the lowest index.
#[allow(clippy::too_many_arguments)]
pub fn select_mates<G, R, D>(
    genomes: &[G],
    fitness: &[f32],
    maximize: bool,
    count: usize,
    desired_distance: f32,
    ranker: &mut R,
    distance: &D,
    rng: &mut StdRng,
) -> Result<Vec<(usize, usize)>, EvolveError>
where
    R: Ranker + ?Sized,
    D: Fn(&G, &G) -> u64 + ?Sized,
{
    let mut parents = vec![0usize; count];
    ranker.rank(RankingMethod::Roulette, fitness, maximize, &mut parents, rng);

    let mut excluded = vec![false; genomes.len()];
    for &parent in &parents {
        let slot = excluded
            .get_mut(parent)
            .ok_or(EvolveError::InvalidWinner {
                index: parent,
                population_size: genomes.len(),
            })?;
        *slot = true;
    }
    let candidates: Vec<usize> = (0..genomes.len()).filter(|&m| !excluded[m]).collect();

    let mut pairs = Vec::with_capacity(count);
    for &parent in &parents {
        let first = &genomes[parent];
        let max_distance = candidates
            .iter()
            .map(|&m| distance(first, &genomes[m]))
            .max()
            .ok_or(EvolveError::NoMatingPartner { parent })?;

        let mut best_delta = f32::MAX;
        let mut partner = None;
        for &m in &candidates {
            let normalized = if max_distance == 0 {
                0.0
            } else {
                distance(first, &genomes[m]) as f32 / max_distance as f32
            };
            let delta = (desired_distance - normalized).abs();
            if delta < best_delta {
                best_delta = delta;
                partner = Some(m);
                if delta == 0.0 {
                    break;
                }
            }
        }

        let partner = partner.ok_or(EvolveError::NoMatingPartner { parent })?;
        pairs.push((parent, partner));
    }

    Ok(pairs)
}
