//! Drug-record retrieval core: Indonesian text normalization, TF-IDF vector
//! space model, inverted index, similarity measures and the ranked query
//! pipeline with metadata filters.
//!
//! ```no_run
//! use medsearch_core::{DrugRecord, SearchIndex, SearchOptions};
//!
//! let index = SearchIndex::build(vec![
//!     DrugRecord::new("OBT001", "Panadol", "meredakan demam dan sakit kepala"),
//!     DrugRecord::new("OBT002", "OBH Combi", "batuk berdahak"),
//! ])?;
//! let outcome = index.search("demam", &SearchOptions::default());
//! assert_eq!(outcome.results[0].id, "OBT001");
//! # Ok::<(), medsearch_core::SearchError>(())
//! ```

pub mod corpus;
pub mod error;
pub mod index;
pub mod persist;
pub mod search;
pub mod similarity;
pub mod stemmer;
pub mod tokenizer;
pub mod vectorizer;

pub use corpus::{Document, DrugRecord};
pub use error::{Result, SearchError};
pub use index::{DocId, IndexStats, InvertedIndex, Posting, TermStats};
pub use search::{CorpusStats, Filters, SearchHit, SearchIndex, SearchOptions, SearchOutcome, DEFAULT_TOP_K};
pub use similarity::{cosine_similarity, euclidean_distance, jaccard_similarity, Similarity};
pub use stemmer::{IdentityStemmer, IndonesianStemmer, SnowballStemmer, Stemmer};
pub use tokenizer::{normalize, Normalizer, NormalizerConfig};
pub use vectorizer::{DocVector, SparseVector, TermId, TermInfo, VectorSpaceModel};
