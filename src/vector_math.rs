use std::cmp::Ordering;

/// Cosine similarity in `[-1, 1]`.
///
/// Mismatched lengths and zero vectors yield `0.0` rather than an error:
/// a chunk that cannot be compared is simply irrelevant.
pub fn cosine_similarity(query: &[f32], candidate: &[f32]) -> f32 {
    if query.len() != candidate.len() || query.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut query_sq = 0.0f64;
    let mut candidate_sq = 0.0f64;
    for (a, b) in query.iter().zip(candidate.iter()) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        query_sq += a * a;
        candidate_sq += b * b;
    }

    let denom = query_sq.sqrt() * candidate_sq.sqrt();
    if denom <= f64::EPSILON {
        return 0.0;
    }

    ((dot / denom).clamp(-1.0, 1.0)) as f32
}

/// Ranks candidate vectors against the query, highest similarity first.
/// The sort is stable, so equal scores keep candidate order.
pub fn rank_descending_by_cosine<'a, I>(query: &[f32], candidates: I) -> Vec<(usize, f32)>
where
    I: IntoIterator<Item = &'a [f32]>,
{
    let mut scores: Vec<(usize, f32)> = candidates
        .into_iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, cosine_similarity(query, candidate)))
        .collect();

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(left: f32, right: f32) -> bool {
        (left - right).abs() < 1e-5
    }

    #[test]
    fn cosine_is_one_for_identical_vectors() {
        let vec = vec![1.0, 2.0, 3.0, 4.0];
        assert!(approx_eq(cosine_similarity(&vec, &vec), 1.0));
    }

    #[test]
    fn cosine_is_minus_one_for_negated_vectors() {
        let vec = vec![0.5, -2.0, 3.0];
        let neg: Vec<f32> = vec.iter().map(|v| -v).collect();
        assert!(approx_eq(cosine_similarity(&vec, &neg), -1.0));
    }

    #[test]
    fn cosine_is_zero_for_orthogonal_vectors() {
        assert!(approx_eq(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0));
    }

    #[test]
    fn zero_vector_scores_zero_not_nan() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]);
        assert!(approx_eq(score, 0.0));
    }

    #[test]
    fn mismatched_lengths_score_zero() {
        assert!(approx_eq(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0));
    }

    #[test]
    fn ranking_returns_highest_similarity_first() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.8, 0.2], vec![0.1, 0.9], vec![0.9, 0.0]];
        let ranked =
            rank_descending_by_cosine(&query, candidates.iter().map(Vec::as_slice));

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].0, 2);
        assert_eq!(ranked[2].0, 1);
    }

    #[test]
    fn ranking_keeps_input_order_on_ties() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![2.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let ranked =
            rank_descending_by_cosine(&query, candidates.iter().map(Vec::as_slice));

        // Both unit-direction duplicates score 1.0; the earlier one stays first.
        assert_eq!(ranked[0].0, 0);
        assert_eq!(ranked[1].0, 1);
    }
}
