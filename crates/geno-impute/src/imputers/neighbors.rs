use crate::distance::DistanceMatrix;
use std::cmp::Ordering;

/// A candidate voter and its distance to the sample being imputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub sample: usize,
    pub distance: f64,
}

/// Rank `candidates` by ascending distance to `target`.
///
/// Equal distances are ordered by sample index so the ranking is
/// deterministic. `target` itself is never returned, even if listed.
pub fn rank_neighbors(
    distances: &DistanceMatrix,
    target: usize,
    candidates: &[usize],
) -> Vec<Neighbor> {
    let mut ranked: Vec<Neighbor> = candidates
        .iter()
        .filter(|&&sample| sample != target)
        .map(|&sample| Neighbor {
            sample,
            distance: distances.distance(target, sample),
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then(a.sample.cmp(&b.sample))
    });
    ranked
}

/// The `k` nearest candidates to `target` (fewer if not enough candidates).
pub fn nearest_neighbors(
    distances: &DistanceMatrix,
    target: usize,
    candidates: &[usize],
    k: usize,
) -> Vec<Neighbor> {
    let mut ranked = rank_neighbors(distances, target, candidates);
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DistanceMetric;
    use crate::types::{Alphabet, GenotypeMatrix};

    fn distances() -> DistanceMatrix {
        let m = GenotypeMatrix::new(
            vec![
                vec![Some(0), Some(0), Some(0)],
                vec![Some(1), Some(1), Some(1)],
                vec![Some(0), Some(0), Some(1)],
                vec![Some(0), Some(1), Some(0)],
            ],
            Alphabet::biallelic(),
        )
        .unwrap();
        DistanceMatrix::compute(&m, None, DistanceMetric::Mismatch)
    }

    #[test]
    fn test_ranked_by_distance_then_index() {
        let d = distances();
        let ranked = rank_neighbors(&d, 0, &[1, 2, 3]);
        let order: Vec<usize> = ranked.iter().map(|n| n.sample).collect();
        // 2 and 3 are both one mismatch away; index breaks the tie
        assert_eq!(order, vec![2, 3, 1]);
        assert_eq!(ranked[0].distance, 1.0);
        assert_eq!(ranked[2].distance, 3.0);
    }

    #[test]
    fn test_target_is_never_its_own_neighbor() {
        let d = distances();
        let ranked = rank_neighbors(&d, 2, &[0, 1, 2, 3]);
        assert!(ranked.iter().all(|n| n.sample != 2));
        assert_eq!(ranked.len(), 3);
    }

    #[test]
    fn test_nearest_truncates() {
        let d = distances();
        assert_eq!(nearest_neighbors(&d, 0, &[1, 2, 3], 2).len(), 2);
        assert_eq!(nearest_neighbors(&d, 0, &[1, 2, 3], 10).len(), 3);
        assert!(nearest_neighbors(&d, 0, &[], 3).is_empty());
    }
}
