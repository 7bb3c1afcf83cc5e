use std::cmp::Ordering;

/// Shift applied to cosine similarity so that search scores are never negative.
pub const SCORE_SHIFT: f32 = 1.0;

/// Cosine similarity in [-1, 1]; 0.0 for empty, mismatched or zero-norm inputs.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        (dot / denom).clamp(-1.0, 1.0)
    }
}

pub fn shifted_score(query: &[f32], candidate: &[f32]) -> f32 {
    cosine_similarity(query, candidate) + SCORE_SHIFT
}

/// Scores candidates and returns `(index, score)` pairs, best first.
/// Equal scores keep candidate order.
pub fn rank_descending(query: &[f32], candidates: &[&[f32]]) -> Vec<(usize, f32)> {
    let mut scores: Vec<(usize, f32)> = candidates
        .iter()
        .enumerate()
        .map(|(idx, candidate)| (idx, shifted_score(query, candidate)))
        .collect();

    scores.sort_by(|left, right| right.1.partial_cmp(&left.1).unwrap_or(Ordering::Equal));
    scores
}
