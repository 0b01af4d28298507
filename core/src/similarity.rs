//! Similarity measures over sparse term vectors.
//!
//! Ranking uses cosine; Euclidean distance and Jaccard are kept for comparing
//! measures side by side.

use crate::vectorizer::SparseVector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Similarity {
    #[default]
    Cosine,
    Euclidean,
    Jaccard,
}

impl Similarity {
    /// Score two vectors so that larger always means closer.
    pub fn score(self, a: &SparseVector, b: &SparseVector, mag_a: f64, mag_b: f64) -> f64 {
        match self {
            Similarity::Cosine => cosine_similarity(a, b, mag_a, mag_b),
            Similarity::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
            Similarity::Jaccard => {
                let ka: BTreeSet<_> = a.keys().collect();
                let kb: BTreeSet<_> = b.keys().collect();
                jaccard_similarity(&ka, &kb)
            }
        }
    }
}

/// L2 norm.
pub fn magnitude(v: &SparseVector) -> f64 {
    v.values().map(|w| w * w).sum::<f64>().sqrt()
}

/// Dot product over shared terms; walks the smaller vector.
pub fn dot(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(id, w)| large.get(id).map(|other| w * other))
        .sum()
}

/// `dot(a, b) / (mag_a * mag_b)`, or 0 when either magnitude is 0.
pub fn cosine_similarity(a: &SparseVector, b: &SparseVector, mag_a: f64, mag_b: f64) -> f64 {
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot(a, b) / (mag_a * mag_b)
}

pub fn euclidean_distance(a: &SparseVector, b: &SparseVector) -> f64 {
    let keys: BTreeSet<_> = a.keys().chain(b.keys()).collect();
    keys.into_iter()
        .map(|id| {
            let d = a.get(id).copied().unwrap_or(0.0) - b.get(id).copied().unwrap_or(0.0);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// `|A ∩ B| / |A ∪ B|`, 0 for two empty sets.
pub fn jaccard_similarity<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
