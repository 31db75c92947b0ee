//! Spherical k-means over unit-length embeddings.
//!
//! Similarity is cosine throughout, so centroids are re-normalised after
//! every update and movement is measured as `1 - cos(old, new)`.
//! Initialisation is deterministic farthest-point seeding, which makes a run
//! a pure function of the (id-ordered) input.

use nr_core::similarity::{dot, normalize};

/// Points closer than this (in cosine distance) count as coinciding.
const COINCIDENT: f32 = 1e-6;

#[derive(Debug, Clone)]
pub struct KMeansParams {
    pub k: usize,
    pub max_iterations: usize,
    pub tolerance: f32,
}

#[derive(Debug, Clone)]
pub struct KMeansOutcome {
    /// Centroid index for every input point.
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f32>>,
    pub iterations: usize,
    pub converged: bool,
}

impl KMeansOutcome {
    /// Point indices per centroid, ascending. Centroids that own no point
    /// yield an empty group.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        let mut groups = vec![Vec::new(); self.centroids.len()];
        for (point, &centroid) in self.assignments.iter().enumerate() {
            groups[centroid].push(point);
        }
        groups
    }
}

/// Number of clusters for a corpus of `n` embedded articles.
///
/// `ceil(sqrt(n / 2))` capped at `max_clusters`, or `fixed` when set; never
/// more than `n` and never zero for a non-empty corpus.
pub fn cluster_count(n: usize, max_clusters: usize, fixed: Option<usize>) -> usize {
    if n == 0 {
        return 0;
    }
    let k = match fixed {
        Some(fixed) => fixed,
        None => ((n as f64 / 2.0).sqrt().ceil() as usize).min(max_clusters),
    };
    k.clamp(1, n)
}

/// Clusters `points`, which must all have the same length.
///
/// Inputs are normalised here; callers may pass raw embeddings.
pub fn spherical_kmeans(points: &[Vec<f32>], params: &KMeansParams) -> KMeansOutcome {
    if points.is_empty() || params.k == 0 {
        return KMeansOutcome {
            assignments: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let points: Vec<Vec<f32>> = points.iter().map(|p| normalize(p)).collect();
    let mut centroids = farthest_point_init(&points, params.k);
    let mut assignments = vec![0; points.len()];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < params.max_iterations {
        iterations += 1;
        for (point, slot) in points.iter().zip(assignments.iter_mut()) {
            *slot = nearest(point, &centroids);
        }

        let mut movement = 0.0f32;
        for (index, centroid) in centroids.iter_mut().enumerate() {
            let mut sum = vec![0.0f32; centroid.len()];
            let mut members = 0;
            for (point, _) in points
                .iter()
                .zip(&assignments)
                .filter(|(_, &assigned)| assigned == index)
            {
                for (s, x) in sum.iter_mut().zip(point) {
                    *s += x;
                }
                members += 1;
            }
            // Empty clusters and members cancelling out keep the old centroid
            if members == 0 || sum.iter().all(|x| *x == 0.0) {
                continue;
            }
            let updated = normalize(&sum);
            movement = movement.max(1.0 - dot(centroid, &updated));
            *centroid = updated;
        }

        if movement < params.tolerance {
            converged = true;
            break;
        }
    }

    tracing::debug!(
        k = centroids.len(),
        iterations,
        converged,
        "k-means finished"
    );
    KMeansOutcome {
        assignments,
        centroids,
        iterations,
        converged,
    }
}

/// Seeds with the first non-zero point, then repeatedly adds the point
/// farthest from its nearest chosen centroid. Zero vectors are never chosen
/// as seeds. Stops early once every point coincides with a chosen centroid.
fn farthest_point_init(points: &[Vec<f32>], k: usize) -> Vec<Vec<f32>> {
    let candidates: Vec<&Vec<f32>> = points
        .iter()
        .filter(|p| p.iter().any(|x| *x != 0.0))
        .collect();
    let Some(&first) = candidates.first() else {
        return vec![points[0].clone()];
    };

    let mut centroids = vec![first.clone()];
    let mut closest: Vec<f32> = candidates.iter().map(|p| dot(p, first)).collect();

    while centroids.len() < k {
        let mut best: Option<(usize, f32)> = None;
        for (index, similarity) in closest.iter().enumerate() {
            let distance = 1.0 - similarity;
            if best.map_or(true, |(_, d)| distance > d) {
                best = Some((index, distance));
            }
        }
        match best {
            Some((index, distance)) if distance > COINCIDENT => {
                let chosen = candidates[index].clone();
                for (point, similarity) in candidates.iter().zip(closest.iter_mut()) {
                    *similarity = similarity.max(dot(point, &chosen));
                }
                centroids.push(chosen);
            }
            _ => break,
        }
    }
    centroids
}

/// Index of the most similar centroid; ties go to the lowest index.
fn nearest(point: &[f32], centroids: &[Vec<f32>]) -> usize {
    let mut best = 0;
    let mut best_similarity = f32::NEG_INFINITY;
    for (index, centroid) in centroids.iter().enumerate() {
        let similarity = dot(point, centroid);
        if similarity > best_similarity {
            best = index;
            best_similarity = similarity;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(k: usize) -> KMeansParams {
        KMeansParams {
            k,
            max_iterations: 100,
            tolerance: 1e-4,
        }
    }

    #[test]
    fn test_cluster_count() {
        assert_eq!(cluster_count(0, 5, None), 0);
        assert_eq!(cluster_count(1, 5, None), 1);
        assert_eq!(cluster_count(2, 5, None), 1);
        assert_eq!(cluster_count(8, 5, None), 2);
        assert_eq!(cluster_count(30, 5, None), 4);
        assert_eq!(cluster_count(1000, 5, None), 5);
        assert_eq!(cluster_count(3, 5, Some(10)), 3);
        assert_eq!(cluster_count(30, 5, Some(7)), 7);
    }

    #[test]
    fn test_two_obvious_groups() {
        let points = vec![
            vec![1.0, 0.0],
            vec![0.95, 0.05],
            vec![0.0, 1.0],
            vec![0.05, 0.95],
            vec![0.9, 0.1],
        ];
        let outcome = spherical_kmeans(&points, &params(2));
        assert!(outcome.converged);
        let groups = outcome.groups();
        assert_eq!(groups, vec![vec![0, 1, 4], vec![2, 3]]);
    }

    #[test]
    fn test_zero_vector_does_not_seed() {
        let points = vec![
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.99, 0.01],
            vec![0.0, 1.0],
            vec![0.01, 0.99],
        ];
        let outcome = spherical_kmeans(&points, &params(2));
        assert_eq!(outcome.centroids.len(), 2);
        assert!(outcome.centroids.iter().all(|c| c.iter().any(|x| *x != 0.0)));
        assert_eq!(outcome.groups(), vec![vec![0, 1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_all_zero_vectors() {
        let points = vec![vec![0.0, 0.0]; 4];
        let outcome = spherical_kmeans(&points, &params(2));
        assert_eq!(outcome.centroids.len(), 1);
        assert_eq!(outcome.groups(), vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_identical_points_collapse() {
        let points = vec![vec![0.3, 0.4]; 6];
        let outcome = spherical_kmeans(&points, &params(3));
        assert_eq!(outcome.centroids.len(), 1);
        assert!(outcome.assignments.iter().all(|&a| a == 0));
    }

    #[test]
    fn test_deterministic() {
        let points: Vec<Vec<f32>> = (0..20)
            .map(|i| {
                let angle = i as f32 * 0.3;
                vec![angle.cos(), angle.sin(), (i % 3) as f32]
            })
            .collect();
        let a = spherical_kmeans(&points, &params(4));
        let b = spherical_kmeans(&points, &params(4));
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.assignments.len(), points.len());
    }

    #[test]
    fn test_terminates_at_iteration_cap() {
        let points: Vec<Vec<f32>> = (0..10).map(|i| vec![1.0, i as f32]).collect();
        let outcome = spherical_kmeans(
            &points,
            &KMeansParams {
                k: 3,
                max_iterations: 1,
                tolerance: 1e-12,
            },
        );
        assert_eq!(outcome.iterations, 1);
    }

    #[test]
    fn test_empty_input() {
        let outcome = spherical_kmeans(&[], &params(3));
        assert!(outcome.assignments.is_empty());
        assert!(outcome.groups().is_empty());
    }
}
