//! TF-IDF vector space model.
//!
//! `TF(t, d) = count(t in d) / len(d)`, `IDF(t) = log10(N / df(t))`, and the
//! weight of `t` in `d` is their product. Vocabulary and IDF are fitted once
//! and frozen; queries are projected through [`VectorSpaceModel::transform`].

use crate::error::{Result, SearchError};
use crate::similarity::magnitude;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type TermId = u32;

/// Sparse term vector keyed by term id; only observed terms are stored.
pub type SparseVector = BTreeMap<TermId, f64>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocVector {
    pub weights: SparseVector,
    /// L2 norm of `weights`, zero for an empty vector.
    pub magnitude: f64,
}

impl DocVector {
    pub fn new(weights: SparseVector) -> Self {
        let magnitude = magnitude(&weights);
        Self { weights, magnitude }
    }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermEntry {
    pub term: String,
    pub df: u32,
    pub idf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermInfo {
    pub term: String,
    pub term_id: TermId,
    pub df: u32,
    pub idf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSpaceModel {
    /// term -> id; ids follow lexicographic term order
    dictionary: BTreeMap<String, TermId>,
    /// indexed by term id
    terms: Vec<TermEntry>,
    num_docs: u32,
}

/// Per-term relative frequencies of a term sequence.
pub fn term_frequencies(terms: &[String]) -> BTreeMap<&str, f64> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for t in terms {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let len = terms.len() as f64;
    counts.into_iter().map(|(t, c)| (t, c as f64 / len)).collect()
}

impl VectorSpaceModel {
    /// Fit vocabulary and IDF over `corpus` and return every document's vector.
    pub fn fit<K: Ord + Clone>(corpus: &BTreeMap<K, Vec<String>>) -> Result<(Self, BTreeMap<K, DocVector>)> {
        if corpus.is_empty() {
            return Err(SearchError::InvalidCorpus);
        }

        let mut df: BTreeMap<&str, u32> = BTreeMap::new();
        for terms in corpus.values() {
            let unique: BTreeSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let n = corpus.len() as f64;
        let mut dictionary = BTreeMap::new();
        let mut entries = Vec::with_capacity(df.len());
        for (id, (term, df_t)) in df.into_iter().enumerate() {
            dictionary.insert(term.to_string(), id as TermId);
            entries.push(TermEntry { term: term.to_string(), df: df_t, idf: (n / df_t as f64).log10() });
        }

        let model = Self { dictionary, terms: entries, num_docs: corpus.len() as u32 };
        let vectors = corpus.iter().map(|(key, terms)| (key.clone(), model.transform(terms))).collect();
        tracing::debug!(num_docs = model.num_docs, num_terms = model.terms.len(), "fitted vector space model");
        Ok((model, vectors))
    }

    /// Project a term sequence onto the frozen vocabulary. Unknown terms are
    /// dropped but still count towards the sequence length.
    pub fn transform(&self, terms: &[String]) -> DocVector {
        if terms.is_empty() {
            return DocVector::default();
        }
        let mut counts: BTreeMap<TermId, u32> = BTreeMap::new();
        for term in terms {
            if let Some(&id) = self.dictionary.get(term) {
                *counts.entry(id).or_insert(0) += 1;
            }
        }
        let len = terms.len() as f64;
        let weights = counts
            .into_iter()
            .map(|(id, c)| (id, c as f64 / len * self.terms[id as usize].idf))
            .collect();
        DocVector::new(weights)
    }

    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    pub fn term(&self, id: TermId) -> Option<&str> { self.terms.get(id as usize).map(|e| e.term.as_str()) }

    pub fn idf(&self, term: &str) -> Option<f64> { self.entry(term).map(|e| e.idf) }

    pub fn df(&self, term: &str) -> Option<u32> { self.entry(term).map(|e| e.df) }

    fn entry(&self, term: &str) -> Option<&TermEntry> {
        self.term_id(term).map(|id| &self.terms[id as usize])
    }

    pub fn term_info(&self, term: &str) -> Option<TermInfo> {
        let term_id = self.term_id(term)?;
        let e = &self.terms[term_id as usize];
        Some(TermInfo { term: e.term.clone(), term_id, df: e.df, idf: e.idf })
    }

    /// Entries in term-id order.
    pub fn entries(&self) -> &[TermEntry] { &self.terms }

    pub fn len(&self) -> usize { self.terms.len() }

    pub fn is_empty(&self) -> bool { self.terms.is_empty() }

    pub fn num_docs(&self) -> u32 { self.num_docs }

    /// Highest-weighted terms of a vector, ties by term.
    pub fn top_terms(&self, vector: &DocVector, k: usize) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = vector
            .weights
            .iter()
            .filter_map(|(id, w)| self.term(*id).map(|t| (t.to_string(), *w)))
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        out.truncate(k);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(docs: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        docs.iter()
            .map(|(id, text)| (id.to_string(), text.split_whitespace().map(str::to_string).collect()))
            .collect()
    }

    #[test]
    fn empty_corpus_is_rejected() {
        let empty: BTreeMap<String, Vec<String>> = BTreeMap::new();
        assert!(matches!(VectorSpaceModel::fit(&empty), Err(SearchError::InvalidCorpus)));
    }

    #[test]
    fn idf_and_weights() {
        let c = corpus(&[("a", "demam sakit kepala demam"), ("b", "batuk dahak"), ("c", "demam batuk")]);
        let (vsm, vectors) = VectorSpaceModel::fit(&c).unwrap();
        assert_eq!(vsm.len(), 5);
        assert_eq!(vsm.num_docs(), 3);
        let idf_demam = (3.0f64 / 2.0).log10();
        assert!((vsm.idf("demam").unwrap() - idf_demam).abs() < 1e-12);
        let id = vsm.term_id("demam").unwrap();
        let w = vectors["a"].weights[&id];
        assert!((w - 0.5 * idf_demam).abs() < 1e-12);
    }

    #[test]
    fn term_in_every_document_has_zero_idf() {
        let c = corpus(&[("a", "obat demam"), ("b", "obat batuk")]);
        let (vsm, vectors) = VectorSpaceModel::fit(&c).unwrap();
        assert_eq!(vsm.idf("obat"), Some(0.0));
        let id = vsm.term_id("obat").unwrap();
        assert_eq!(vectors["a"].weights[&id], 0.0);
    }

    #[test]
    fn vocabulary_ids_follow_term_order() {
        let c = corpus(&[("a", "zinc asam"), ("b", "maag")]);
        let (vsm, _) = VectorSpaceModel::fit(&c).unwrap();
        assert_eq!(vsm.term(0), Some("asam"));
        assert_eq!(vsm.term(1), Some("maag"));
        assert_eq!(vsm.term(2), Some("zinc"));
    }

    #[test]
    fn transform_drops_unknown_terms() {
        let c = corpus(&[("a", "demam"), ("b", "batuk")]);
        let (vsm, _) = VectorSpaceModel::fit(&c).unwrap();
        let v = vsm.transform(&["demam".into(), "flu".into()]);
        assert_eq!(v.weights.len(), 1);
        assert!(vsm.transform(&["flu".into()]).is_empty());
        let empty = vsm.transform(&[]);
        assert_eq!(empty.magnitude, 0.0);
    }

    #[test]
    fn top_terms_sorted_by_weight() {
        let c = corpus(&[("a", "demam demam kepala"), ("b", "batuk"), ("c", "kepala")]);
        let (vsm, vectors) = VectorSpaceModel::fit(&c).unwrap();
        let top = vsm.top_terms(&vectors["a"], 1);
        assert_eq!(top[0].0, "demam");
        let info = vsm.term_info("kepala").unwrap();
        assert_eq!(info.df, 2);
        assert!(vsm.term_info("flu").is_none());
    }
}
