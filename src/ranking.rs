//! Top-K selection over a probability vector.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prediction {
    pub class_id: usize,
    pub score: f32,
}

/// Returns the `k` highest-probability entries, sorted descending by score
/// with ties broken by ascending class ID. Asking for more entries than the
/// vector holds returns them all.
pub fn top_k(probs: &[f32], k: usize) -> Vec<Prediction> {
    let mut ranked: Vec<Prediction> = probs
        .iter()
        .enumerate()
        .map(|(class_id, &score)| Prediction { class_id, score })
        .collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.class_id.cmp(&b.class_id))
    });
    ranked.truncate(k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_the_k_largest_in_descending_order() {
        let probs = [0.1, 0.7, 0.05, 0.15];
        let top = top_k(&probs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0], Prediction { class_id: 1, score: 0.7 });
        assert_eq!(top[1], Prediction { class_id: 3, score: 0.15 });
    }

    #[test]
    fn ties_break_by_ascending_class_id() {
        let probs = [0.25, 0.25, 0.5, 0.25];
        let top = top_k(&probs, 3);
        assert_eq!(top[0].class_id, 2);
        assert_eq!(top[1].class_id, 0);
        assert_eq!(top[2].class_id, 1);
    }

    #[test]
    fn k_larger_than_vector_returns_everything() {
        let probs = [0.3, 0.7];
        let top = top_k(&probs, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].class_id, 1);
    }

    #[test]
    fn zero_k_returns_nothing() {
        assert!(top_k(&[0.5, 0.5], 0).is_empty());
    }

    #[test]
    fn returned_set_is_exactly_the_k_largest() {
        let probs = [0.01, 0.2, 0.03, 0.4, 0.05, 0.31];
        let top = top_k(&probs, 3);
        let ids: Vec<usize> = top.iter().map(|p| p.class_id).collect();
        assert_eq!(ids, vec![3, 5, 1]);
    }
}
