use crate::corpus::Document;
use crate::error::{Result, SearchError};
use crate::index::InvertedIndex;
use crate::search::SearchIndex;
use crate::tokenizer::Normalizer;
use crate::vectorizer::VectorSpaceModel;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, create_dir_all, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn vocabulary(&self) -> PathBuf { self.root.join("vocabulary.bin") }
    fn documents(&self) -> PathBuf { self.root.join("documents.bin") }
    fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }

    pub fn exists(&self) -> bool { self.meta().is_file() }
}

/// Write to a sibling temp file, then rename over the target.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    let mut f = File::create(&tmp)?;
    f.write_all(bytes)?;
    f.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn save_bin<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value)?;
    write_atomic(path, &bytes)
}

fn load_bin<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut f = File::open(path)?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(bincode::deserialize(&buf)?)
}

pub fn save_vocabulary(paths: &IndexPaths, vsm: &VectorSpaceModel) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.vocabulary(), vsm)
}

pub fn load_vocabulary(paths: &IndexPaths) -> Result<VectorSpaceModel> {
    load_bin(&paths.vocabulary())
}

pub fn save_documents(paths: &IndexPaths, docs: &[Document]) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.documents(), &docs)
}

pub fn load_documents(paths: &IndexPaths) -> Result<Vec<Document>> {
    load_bin(&paths.documents())
}

pub fn save_postings(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    save_bin(&paths.postings(), index)
}

pub fn load_postings(paths: &IndexPaths) -> Result<InvertedIndex> {
    load_bin(&paths.postings())
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let json = serde_json::to_string_pretty(meta)?;
    write_atomic(&paths.meta(), json.as_bytes())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// Persist every part of a built index. Any previous meta.json is removed
/// before the parts are replaced and the new one is written last, so a
/// directory with a readable meta.json holds a complete artifact.
pub fn save_index(paths: &IndexPaths, index: &SearchIndex) -> Result<MetaFile> {
    match fs::remove_file(paths.meta()) {
        Ok(()) => tracing::debug!(root = %paths.root.display(), "removed previous meta.json"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    save_vocabulary(paths, index.vocabulary())?;
    save_documents(paths, index.documents())?;
    save_postings(paths, index.inverted_index())?;
    let meta = MetaFile {
        num_docs: index.len() as u32,
        num_terms: index.vocabulary().len() as u32,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(|e| SearchError::Persist(format!("formatting created_at: {e}")))?,
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, num_terms = meta.num_terms, "index saved");
    Ok(meta)
}

pub fn load_index(paths: &IndexPaths) -> Result<SearchIndex> {
    load_index_with(paths, Normalizer::default())
}

/// Load a persisted index; `normalizer` must match the one it was built with.
pub fn load_index_with(paths: &IndexPaths, normalizer: Normalizer) -> Result<SearchIndex> {
    let meta = load_meta(paths)?;
    if meta.version != FORMAT_VERSION {
        return Err(SearchError::Persist(format!(
            "unsupported format version {} (expected {FORMAT_VERSION})",
            meta.version
        )));
    }
    let vsm = load_vocabulary(paths)?;
    let documents = load_documents(paths)?;
    let postings = load_postings(paths)?;
    if documents.len() != meta.num_docs as usize || vsm.len() != meta.num_terms as usize {
        return Err(SearchError::Persist("meta.json does not match the stored index".into()));
    }
    let index = SearchIndex::from_parts(normalizer, vsm, postings, documents)?;
    tracing::info!(root = %paths.root.display(), num_docs = meta.num_docs, "index loaded");
    Ok(index)
}
