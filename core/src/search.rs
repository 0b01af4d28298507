//! Query pipeline over an immutable, fully built index.
//!
//! normalize -> vectorize -> candidate lookup -> score -> filter -> rank -> truncate

use crate::corpus::{Document, DrugRecord};
use crate::error::{Result, SearchError};
use crate::index::{DocId, IndexStats, InvertedIndex};
use crate::similarity::Similarity;
use crate::tokenizer::Normalizer;
use crate::vectorizer::{TermInfo, VectorSpaceModel};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub const DEFAULT_TOP_K: usize = 5;

/// Metadata constraints; `None` means unconstrained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filters {
    pub requires_prescription: Option<bool>,
    /// Inclusive `(min, max)` price bounds.
    pub price_range: Option<(u64, u64)>,
}

impl Filters {
    pub fn matches(&self, record: &DrugRecord) -> bool {
        if let Some(rx) = self.requires_prescription {
            if record.requires_prescription != rx {
                return false;
            }
        }
        if let Some((min, max)) = self.price_range {
            if record.price < min || record.price > max {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub filters: Filters,
    pub top_k: usize,
    /// Keep documents that share nothing with the query (score 0).
    pub include_zero_scores: bool,
    pub similarity: Similarity,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { filters: Filters::default(), top_k: DEFAULT_TOP_K, include_zero_scores: false, similarity: Similarity::Cosine }
    }
}

impl SearchOptions {
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_prescription(mut self, required: bool) -> Self {
        self.filters.requires_prescription = Some(required);
        self
    }

    pub fn with_price_range(mut self, min: u64, max: u64) -> Self {
        self.filters.price_range = Some((min, max));
        self
    }

    pub fn including_zero_scores(mut self) -> Self {
        self.include_zero_scores = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub id: String,
    pub score: f64,
    pub record: DrugRecord,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub results: Vec<SearchHit>,
    /// Normalized query terms, in query order.
    pub terms: Vec<String>,
    /// Matches before truncation to `top_k`.
    pub total_hits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub num_docs: usize,
    pub vocabulary_size: usize,
    pub avg_terms_per_doc: f64,
    pub index: IndexStats,
}

/// Vocabulary, document vectors and postings produced by one fit. Never
/// mutated; a corpus change means building a new instance.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    normalizer: Normalizer,
    vsm: VectorSpaceModel,
    index: InvertedIndex,
    documents: Vec<Document>, // position == doc_id
    ids: BTreeMap<String, DocId>,
}

impl SearchIndex {
    pub fn build(records: Vec<DrugRecord>) -> Result<Self> {
        Self::build_with(records, Normalizer::default())
    }

    /// Fit the index. Internal doc ids follow ascending external id.
    pub fn build_with(records: Vec<DrugRecord>, normalizer: Normalizer) -> Result<Self> {
        let mut sorted: BTreeMap<String, DrugRecord> = BTreeMap::new();
        for record in records {
            if sorted.contains_key(&record.id) {
                return Err(SearchError::DuplicateId(record.id));
            }
            sorted.insert(record.id.clone(), record);
        }

        let corpus: BTreeMap<DocId, Vec<String>> = sorted
            .values()
            .enumerate()
            .map(|(i, r)| (i as DocId, normalizer.normalize(&r.indexed_text())))
            .collect();
        let (vsm, mut vectors) = VectorSpaceModel::fit(&corpus)?;
        let index = InvertedIndex::build(vectors.iter().map(|(id, v)| (*id, v)), &vsm);

        let documents: Vec<Document> = sorted
            .into_values()
            .zip(corpus)
            .map(|(record, (doc_id, terms))| Document {
                doc_id,
                record,
                terms,
                vector: vectors.remove(&doc_id).unwrap_or_default(),
            })
            .collect();

        tracing::info!(num_docs = documents.len(), num_terms = vsm.len(), "index built");
        Self::from_parts(normalizer, vsm, index, documents)
    }

    /// Reassemble an index from its fitted parts, e.g. after loading from disk.
    pub fn from_parts(
        normalizer: Normalizer,
        vsm: VectorSpaceModel,
        index: InvertedIndex,
        documents: Vec<Document>,
    ) -> Result<Self> {
        if documents.is_empty() {
            return Err(SearchError::InvalidCorpus);
        }
        if vsm.num_docs() as usize != documents.len() {
            return Err(SearchError::Persist(format!(
                "vocabulary fitted on {} documents but {} supplied",
                vsm.num_docs(),
                documents.len()
            )));
        }
        let mut ids = BTreeMap::new();
        for (pos, doc) in documents.iter().enumerate() {
            if doc.doc_id as usize != pos {
                return Err(SearchError::Persist(format!("document {} stored at position {pos}", doc.doc_id)));
            }
            if ids.insert(doc.id().to_string(), doc.doc_id).is_some() {
                return Err(SearchError::DuplicateId(doc.id().to_string()));
            }
        }
        check_postings(&vsm, &index, &documents)?;
        Ok(Self { normalizer, vsm, index, documents, ids })
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> SearchOutcome {
        let terms = self.normalizer.normalize(query);
        if terms.is_empty() {
            return SearchOutcome::default();
        }
        let query_vec = self.vsm.transform(&terms);

        let candidates: BTreeSet<DocId> = if options.include_zero_scores {
            self.documents.iter().map(|d| d.doc_id).collect()
        } else {
            self.index.candidates(&terms)
        };
        if candidates.is_empty() {
            return SearchOutcome { terms, ..Default::default() };
        }
        let num_candidates = candidates.len();

        let mut scored: Vec<(DocId, f64)> = Vec::new();
        for doc_id in candidates {
            let doc = &self.documents[doc_id as usize];
            let score = options.similarity.score(
                &query_vec.weights,
                &doc.vector.weights,
                query_vec.magnitude,
                doc.vector.magnitude,
            );
            if score <= 0.0 && !options.include_zero_scores {
                continue;
            }
            if !options.filters.matches(&doc.record) {
                continue;
            }
            scored.push((doc_id, score));
        }

        // doc ids ascend with external ids, so this is the id tie-break
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        let total_hits = scored.len();
        scored.truncate(options.top_k);

        tracing::debug!(num_terms = terms.len(), num_candidates, total_hits, "query scored");

        let results = scored
            .into_iter()
            .map(|(doc_id, score)| {
                let doc = &self.documents[doc_id as usize];
                SearchHit { doc_id, id: doc.id().to_string(), score, record: doc.record.clone() }
            })
            .collect();
        SearchOutcome { results, terms, total_hits }
    }

    pub fn document(&self, id: &str) -> Option<&Document> {
        self.ids.get(id).map(|doc_id| &self.documents[*doc_id as usize])
    }

    pub fn top_terms(&self, id: &str, k: usize) -> Option<Vec<(String, f64)>> {
        self.document(id).map(|d| self.vsm.top_terms(&d.vector, k))
    }

    /// Look up an already normalized term.
    pub fn term_info(&self, term: &str) -> Option<TermInfo> {
        self.vsm.term_info(term)
    }

    pub fn stats(&self) -> CorpusStats {
        let total_terms: usize = self.documents.iter().map(|d| d.terms.len()).sum();
        CorpusStats {
            num_docs: self.documents.len(),
            vocabulary_size: self.vsm.len(),
            avg_terms_per_doc: total_terms as f64 / self.documents.len() as f64,
            index: self.index.stats(),
        }
    }

    pub fn normalizer(&self) -> &Normalizer { &self.normalizer }

    pub fn vocabulary(&self) -> &VectorSpaceModel { &self.vsm }

    pub fn inverted_index(&self) -> &InvertedIndex { &self.index }

    pub fn documents(&self) -> &[Document] { &self.documents }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

/// Every posting must point at a document whose vector holds that term, and
/// every vector entry must have its posting.
fn check_postings(vsm: &VectorSpaceModel, index: &InvertedIndex, documents: &[Document]) -> Result<()> {
    let mut indexed = 0usize;
    for term in index.terms() {
        let term_id = vsm
            .term_id(term)
            .ok_or_else(|| SearchError::Persist(format!("postings for {term:?}, which is not in the vocabulary")))?;
        for posting in index.posting_list(term) {
            let held = documents
                .get(posting.doc_id as usize)
                .is_some_and(|doc| doc.vector.weights.contains_key(&term_id));
            if !held {
                return Err(SearchError::Persist(format!(
                    "stale posting for {term:?} in document {}",
                    posting.doc_id
                )));
            }
            indexed += 1;
        }
    }
    let expected: usize = documents.iter().map(|d| d.vector.weights.len()).sum();
    if indexed != expected {
        return Err(SearchError::Persist(format!("{indexed} postings stored for {expected} vector entries")));
    }
    Ok(())
}
