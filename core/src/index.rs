use crate::vectorizer::{DocVector, VectorSpaceModel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type DocId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub weight: f64, // tf-idf weight of the term in doc_id's vector
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermStats {
    pub term: String,
    pub df: usize,
    pub max_weight: f64,
    pub min_weight: f64,
    pub avg_weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListLength {
    pub term: String,
    pub len: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexStats {
    pub total_terms: usize,
    pub total_postings: usize,
    pub avg_postings_per_term: f64,
    pub longest: Option<ListLength>,
    pub shortest: Option<ListLength>,
}

/// term -> postings, each list sorted by weight descending then doc id ascending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvertedIndex {
    postings: BTreeMap<String, Vec<Posting>>,
}

impl InvertedIndex {
    pub fn new() -> Self { Self::default() }

    /// Build postings from fitted document vectors. Every weight is copied
    /// straight from the vector, so lists never disagree with the documents.
    pub fn build<'a, I>(vectors: I, vsm: &VectorSpaceModel) -> Self
    where
        I: IntoIterator<Item = (DocId, &'a DocVector)>,
    {
        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        for (doc_id, vector) in vectors {
            for (term_id, weight) in &vector.weights {
                if let Some(term) = vsm.term(*term_id) {
                    postings.entry(term.to_string()).or_default().push(Posting { doc_id, weight: *weight });
                }
            }
        }
        for list in postings.values_mut() {
            list.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.doc_id.cmp(&b.doc_id)));
        }
        tracing::debug!(num_terms = postings.len(), "built inverted index");
        Self { postings }
    }

    pub fn posting_list(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Up to `top_k` highest-weighted postings for `term`.
    pub fn search_term(&self, term: &str, top_k: usize) -> &[Posting] {
        let list = self.posting_list(term);
        &list[..top_k.min(list.len())]
    }

    pub fn docs_for_term(&self, term: &str) -> Vec<DocId> {
        self.posting_list(term).iter().map(|p| p.doc_id).collect()
    }

    /// Documents sharing at least one term with `terms`.
    pub fn candidates<S: AsRef<str>>(&self, terms: &[S]) -> BTreeSet<DocId> {
        terms
            .iter()
            .flat_map(|t| self.posting_list(t.as_ref()))
            .map(|p| p.doc_id)
            .collect()
    }

    /// OR query: sums each document's weights over the matching terms.
    pub fn search_multi_terms<S: AsRef<str>>(&self, terms: &[S], top_k: usize) -> Vec<(DocId, f64)> {
        let mut scores: BTreeMap<DocId, f64> = BTreeMap::new();
        for term in terms {
            for p in self.posting_list(term.as_ref()) {
                *scores.entry(p.doc_id).or_insert(0.0) += p.weight;
            }
        }
        let mut out: Vec<(DocId, f64)> = scores.into_iter().collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        out.truncate(top_k);
        out
    }

    pub fn term_stats(&self, term: &str) -> Option<TermStats> {
        let list = self.postings.get(term)?;
        if list.is_empty() {
            return None;
        }
        let weights = list.iter().map(|p| p.weight);
        let max_weight = weights.clone().fold(f64::NEG_INFINITY, f64::max);
        let min_weight = weights.clone().fold(f64::INFINITY, f64::min);
        let avg_weight = weights.sum::<f64>() / list.len() as f64;
        Some(TermStats { term: term.to_string(), df: list.len(), max_weight, min_weight, avg_weight })
    }

    pub fn stats(&self) -> IndexStats {
        let total_terms = self.postings.len();
        let total_postings: usize = self.postings.values().map(Vec::len).sum();
        let avg_postings_per_term = if total_terms > 0 { total_postings as f64 / total_terms as f64 } else { 0.0 };
        let as_len = |(term, list): (&String, &Vec<Posting>)| ListLength { term: term.clone(), len: list.len() };
        // first term wins on equal lengths
        let longest = self
            .postings
            .iter()
            .rev()
            .max_by_key(|(_, l)| l.len())
            .map(as_len);
        let shortest = self.postings.iter().min_by_key(|(_, l)| l.len()).map(as_len);
        IndexStats { total_terms, total_postings, avg_postings_per_term, longest, shortest }
    }

    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.postings.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize { self.postings.len() }

    pub fn is_empty(&self) -> bool { self.postings.is_empty() }
}
