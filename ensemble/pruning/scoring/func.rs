use ndarray::{Array2, ArrayView1, ArrayView2, ArrayView3, Axis};

/// Index of the largest entry, first one on ties; `NaN` entries never win.
#[must_use]
pub fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    let mut best_value = f64::NEG_INFINITY;
    for (idx, &value) in row.iter().enumerate() {
        if value > best_value {
            best = idx;
            best_value = value;
        }
    }
    best
}

/// Row-wise argmax of an `N × C` matrix.
#[must_use]
pub fn predicted_labels(matrix: ArrayView2<'_, f64>) -> Vec<usize> {
    matrix.outer_iter().map(argmax).collect()
}

/// Element-wise sum of the selected classifiers' `N × C` matrices.
///
/// An empty selection yields a zero matrix, whose argmax is class 0 for
/// every sample.
#[must_use]
pub fn summed(predictions: ArrayView3<'_, f64>, selected: &[usize]) -> Array2<f64> {
    let (_, samples, classes) = predictions.dim();
    let mut total = Array2::<f64>::zeros((samples, classes));
    for &member in selected {
        total += &predictions.index_axis(Axis(0), member);
    }
    total
}

/// Candidate blended into the sub-ensemble as one more equal vote:
/// `(Σ selected + candidate) / (|selected| + 1)`.
#[must_use]
pub fn blended(predictions: ArrayView3<'_, f64>, candidate: usize, selected: &[usize]) -> Array2<f64> {
    let mut total = summed(predictions, selected);
    total += &predictions.index_axis(Axis(0), candidate);
    total /= (selected.len() + 1) as f64;
    total
}

/// Fraction of labels that differ from the target.
#[must_use]
pub fn error_rate(labels: &[usize], target: &[usize]) -> f64 {
    if target.is_empty() {
        return 0.0;
    }
    let wrong = labels
        .iter()
        .zip(target)
        .filter(|(label, truth)| label != truth)
        .count();
    wrong as f64 / target.len() as f64
}

/// Derives a per-round seed so every candidate of a round shares one stream.
#[must_use]
pub const fn round_seed(seed: u64, round: usize) -> u64 {
    let mut z = seed ^ (round as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
