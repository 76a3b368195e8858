//! Polarity inference and empirical overlaps estimation.
//!
//! From a sparse vote matrix this module infers each source's polarity (the
//! single class it ever votes for on a task) and builds the pairwise
//! agreement statistic the fitter trains against: a co-presence matrix
//! normalized by labeling propensity and sign-corrected by polarity.

use ndarray::Array2;
use sprs::{CsMat, TriMat};

use crate::error::LabelModelError;

/// Entries of the overlaps matrix are clamped to this magnitude to keep the
/// factorization loss away from saturated agreement statistics.
const OVERLAP_CLAMP: f64 = 0.95;

/// Infer the polarity (labeled class) of source `j` on task `t`.
///
/// Scans the non-zero votes in column `j` of the CSC vote matrix. Returns
/// the single distinct vote value found, or 0 if the source never votes on
/// this task. A source voting for more than one distinct class is a fatal
/// input error.
pub fn infer_polarity(
    l_t: &CsMat<usize>,
    t: usize,
    j: usize,
) -> Result<usize, LabelModelError> {
    assert!(l_t.is_csc(), "vote matrix must be in CSC format");

    let mut vals: Vec<usize> = match l_t.outer_view(j) {
        Some(col) => col.iter().map(|(_, &v)| v).filter(|&v| v != 0).collect(),
        None => Vec::new(),
    };
    vals.sort_unstable();
    vals.dedup();

    match vals.len() {
        0 => Ok(0),
        1 => Ok(vals[0]),
        _ => Err(LabelModelError::NonUnipolar {
            source: j,
            task: t,
            values: vals,
        }),
    }
}

/// Build the empirical overlaps matrix for task `t`.
///
/// In the unipolar categorical setting the empirical count of non-zero
/// co-votes is sufficient: whether a co-vote was an agreement or a
/// disagreement is a function of the two sources' polarities alone.
///
/// Steps:
/// 1. infer the polarity of every source (fails on non-unipolar input),
/// 2. binarize the votes and form the co-presence matrix `(Bᵀ·B) / N`,
/// 3. divide out each source's labeling propensity (the diagonal),
/// 4. sign-correct every off-diagonal entry from the polarities,
/// 5. resolve NaNs (always-abstaining sources yield 0/0) to 0,
/// 6. clamp to [-0.95, 0.95].
pub fn overlaps_matrix(l_t: &CsMat<usize>, t: usize) -> Result<Array2<f64>, LabelModelError> {
    assert!(l_t.is_csc(), "vote matrix must be in CSC format");
    let (n, m) = l_t.shape();

    let p: Vec<usize> = (0..m)
        .map(|j| infer_polarity(l_t, t, j))
        .collect::<Result<_, _>>()?;

    // Presence/absence of a vote, ignoring which class.
    let mut binarized = TriMat::new((n, m));
    for (&v, (row, col)) in l_t.iter() {
        if v != 0 {
            binarized.add_triplet(row, col, 1.0f64);
        }
    }
    let binarized: CsMat<f64> = binarized.to_csc();

    let co_presence = &binarized.transpose_view() * &binarized;
    let mut o = co_presence.to_dense().mapv(|v| v / n as f64);

    // Divide out the empirical labeling propensities.
    let beta: Vec<f64> = (0..m).map(|i| o[[i, i]]).collect();
    for i in 0..m {
        for j in 0..m {
            o[[i, j]] /= beta[i] * beta[j];
        }
    }

    // Correct the off-diagonal entries given the known polarities. The
    // diagonal is the propensity-normalized self-overlap and is not fit
    // against downstream.
    for i in 0..m {
        for j in 0..m {
            if i != j {
                let c = if p[i] == p[j] { 1.0 } else { -1.0 };
                o[[i, j]] = c * (o[[i, j]] - 1.0);
            }
        }
    }

    // NaNs arise from 0/0 when a source abstains on every data point. That
    // is insufficient data, not malformed data: resolve to 0.
    o.mapv_inplace(|v| if v.is_nan() { 0.0 } else { v });
    o.mapv_inplace(|v| v.clamp(-OVERLAP_CLAMP, OVERLAP_CLAMP));

    Ok(o)
}
