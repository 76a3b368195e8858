//! Seeded synthetic vote generation for tests and demos.
//!
//! Produces sparse unipolar vote matrices with known source accuracies so
//! end-to-end behavior can be checked against ground truth.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sprs::{CsMat, TriMat};

/// Ground-truth description of one synthetic labeling source.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    /// The single class this source ever votes for, in 1..=k.
    pub polarity: usize,
    /// P(vote is correct | source votes).
    pub accuracy: f64,
    /// P(source considers a data point at all).
    pub propensity: f64,
}

/// Generate a single-task vote matrix over `n` data points with cardinality
/// `k`, plus the true labels.
///
/// True labels are uniform over 1..=k. Each source independently considers
/// each point with its propensity; a considering source emits its polarity
/// class when that matches how it (noisily, per its accuracy) perceives the
/// true label, and abstains otherwise. Deterministic for a fixed seed.
pub fn generate_votes(
    n: usize,
    k: usize,
    sources: &[SourceSpec],
    seed: u64,
) -> (CsMat<usize>, Vec<usize>) {
    assert!(k >= 1, "cardinality must be at least 1");
    for (j, s) in sources.iter().enumerate() {
        assert!(
            (1..=k).contains(&s.polarity),
            "source {} polarity {} outside 1..={}",
            j,
            s.polarity,
            k
        );
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let truth: Vec<usize> = (0..n).map(|_| rng.gen_range(1..=k)).collect();

    let mut votes = TriMat::new((n, sources.len()));
    for (row, &y) in truth.iter().enumerate() {
        for (col, s) in sources.iter().enumerate() {
            if !rng.gen_bool(s.propensity) {
                continue;
            }
            // A correct perception votes the polarity when y matches it; an
            // incorrect one votes the polarity when y does not.
            let correct = rng.gen_bool(s.accuracy);
            let emits = if correct {
                y == s.polarity
            } else {
                y != s.polarity
            };
            if emits {
                votes.add_triplet(row, col, s.polarity);
            }
        }
    }

    (votes.to_csc(), truth)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs() -> Vec<SourceSpec> {
        vec![
            SourceSpec {
                polarity: 1,
                accuracy: 0.9,
                propensity: 0.8,
            },
            SourceSpec {
                polarity: 2,
                accuracy: 0.6,
                propensity: 0.5,
            },
        ]
    }

    #[test]
    fn deterministic_for_fixed_seed() {
        let (a, truth_a) = generate_votes(50, 2, &specs(), 7);
        let (b, truth_b) = generate_votes(50, 2, &specs(), 7);
        assert_eq!(truth_a, truth_b);
        assert_eq!(a.to_dense(), b.to_dense());
    }

    #[test]
    fn votes_are_unipolar_and_in_range() {
        let (votes, truth) = generate_votes(200, 3, &specs(), 42);
        assert_eq!(truth.len(), 200);
        for (col, s) in specs().iter().enumerate() {
            for (_, &v) in votes.outer_view(col).unwrap().iter() {
                assert_eq!(v, s.polarity);
            }
        }
    }
}
