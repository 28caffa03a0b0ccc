use ndarray::{ArrayView3, Axis};

use super::{
    func::{blended, predicted_labels},
    ScoringError, ScoringFunction,
};

/// Negated ROC-AUC of the sub-ensemble extended by the candidate.
///
/// Binary problems rank samples by the blended prediction's argmax class;
/// multi-class problems average one-vs-rest AUCs over the blended
/// probability columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct NegativeAuc;

impl ScoringFunction for NegativeAuc {
    fn name(&self) -> &str {
        "neg_auc"
    }

    fn score(
        &self,
        candidate: usize,
        predictions: ArrayView3<'_, f64>,
        selected: &[usize],
        target: &[usize],
    ) -> Result<f64, ScoringError> {
        let blend = blended(predictions, candidate, selected);
        let classes = blend.ncols();
        if classes < 2 {
            return Err(ScoringError::Undefined(
                "AUC needs at least two classes".into(),
            ));
        }

        if classes == 2 {
            let scores: Vec<f64> = predicted_labels(blend.view())
                .into_iter()
                .map(|label| label as f64)
                .collect();
            let positives: Vec<bool> = target.iter().map(|&label| label == 1).collect();
            let auc = roc_auc(&positives, &scores).ok_or_else(|| {
                ScoringError::Undefined("target contains a single class".into())
            })?;
            return Ok(-auc);
        }

        let mut total = 0.0;
        for class in 0..classes {
            let positives: Vec<bool> = target.iter().map(|&label| label == class).collect();
            let column = blend.index_axis(Axis(1), class);
            let scores: Vec<f64> = column.iter().copied().collect();
            total += roc_auc(&positives, &scores).ok_or_else(|| {
                ScoringError::Undefined(format!(
                    "class {class} is absent from or the only class in the target"
                ))
            })?;
        }
        Ok(-(total / classes as f64))
    }
}

/// Area under the ROC curve via the rank-sum statistic, ties sharing their
/// average rank. `None` when either class is empty.
#[must_use]
pub fn roc_auc(positives: &[bool], scores: &[f64]) -> Option<f64> {
    let n_pos = positives.iter().filter(|&&positive| positive).count();
    let n_neg = positives.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && scores[order[end]] == scores[order[start]] {
            end += 1;
        }
        // Ranks are one-based; a tie group [start, end) shares the mean rank.
        let average_rank = (start + end + 1) as f64 / 2.0;
        for &idx in &order[start..end] {
            if positives[idx] {
                positive_rank_sum += average_rank;
            }
        }
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn auc_of_perfect_ranking_is_one() {
        let auc = roc_auc(&[false, false, true, true], &[0.1, 0.2, 0.8, 0.9]).unwrap();
        assert!((auc - 1.0).abs() < 1e-12);
    }

    #[test]
    fn auc_handles_ties() {
        let auc = roc_auc(&[false, true], &[0.5, 0.5]).unwrap();
        assert!((auc - 0.5).abs() < 1e-12);
        let auc = roc_auc(&[false, true, false, true], &[0.0, 1.0, 1.0, 1.0]).unwrap();
        assert!((auc - 0.75).abs() < 1e-12);
    }

    #[test]
    fn auc_is_undefined_for_one_class() {
        assert!(roc_auc(&[true, true], &[0.1, 0.2]).is_none());
    }

    #[test]
    fn binary_score_uses_hard_predictions() {
        let mut predictions = Array3::<f64>::zeros((1, 4, 2));
        for (sample, label) in [0, 0, 1, 1].into_iter().enumerate() {
            predictions[[0, sample, label]] = 0.9;
            predictions[[0, sample, 1 - label]] = 0.1;
        }
        let score = NegativeAuc
            .score(0, predictions.view(), &[], &[0, 0, 1, 1])
            .unwrap();
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn multiclass_averages_one_vs_rest() {
        let mut predictions = Array3::<f64>::zeros((1, 3, 3));
        for sample in 0..3 {
            predictions[[0, sample, sample]] = 1.0;
        }
        let score = NegativeAuc
            .score(0, predictions.view(), &[], &[0, 1, 2])
            .unwrap();
        assert!((score + 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_class_target_fails() {
        let predictions = Array3::<f64>::from_elem((1, 3, 2), 0.5);
        let err = NegativeAuc
            .score(0, predictions.view(), &[], &[1, 1, 1])
            .unwrap_err();
        assert!(matches!(err, ScoringError::Undefined(_)));
    }
}
