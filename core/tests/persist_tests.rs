use medsearch_core::persist::{
    load_index, load_meta, save_documents, save_index, save_meta, save_vocabulary, IndexPaths, FORMAT_VERSION,
};
use medsearch_core::{DrugRecord, SearchError, SearchIndex, SearchOptions};
use tempfile::tempdir;

fn corpus() -> Vec<DrugRecord> {
    let mut panadol = DrugRecord::new("OBT001", "Panadol", "Meredakan demam dan sakit kepala").with_price(12_000);
    panadol.generic_name = Some("Paracetamol".into());
    panadol.category = Some("Analgesik".into());
    panadol.tags = vec!["demam".into(), "nyeri".into()];
    vec![
        panadol,
        DrugRecord::new("OBT002", "OBH Combi", "Meredakan batuk berdahak").with_price(18_000),
        DrugRecord::new("OBT003", "Amoxicillin", "Mengobati infeksi bakteri disertai demam")
            .with_prescription(true)
            .with_price(30_000),
    ]
}

#[test]
fn round_trip_preserves_results() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let built = SearchIndex::build(corpus()).unwrap();
    let meta = save_index(&paths, &built).unwrap();
    assert_eq!(meta.num_docs, 3);
    let created = time::OffsetDateTime::parse(&meta.created_at, &time::format_description::well_known::Rfc3339);
    assert!(created.is_ok(), "created_at {:?}", meta.created_at);
    assert!(paths.exists());

    let loaded = load_index(&paths).unwrap();
    assert_eq!(built.vocabulary(), loaded.vocabulary());
    assert_eq!(built.inverted_index(), loaded.inverted_index());
    assert_eq!(built.documents(), loaded.documents());

    let opts = SearchOptions::default().with_top_k(10);
    for q in ["demam", "batuk berdahak", "infeksi demam", "paracetamol", "flu"] {
        assert_eq!(built.search(q, &opts), loaded.search(q, &opts), "query {q:?}");
    }
}

#[test]
fn missing_artifact_is_an_io_error() {
    let dir = tempdir().unwrap();
    let err = load_index(&IndexPaths::new(dir.path().join("nothing"))).unwrap_err();
    assert!(matches!(err, SearchError::Io(_)));
}

#[test]
fn version_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    let built = SearchIndex::build(corpus()).unwrap();
    let mut meta = save_index(&paths, &built).unwrap();
    meta.version = FORMAT_VERSION + 1;
    save_meta(&paths, &meta).unwrap();
    assert_eq!(load_meta(&paths).unwrap().version, FORMAT_VERSION + 1);
    assert!(matches!(load_index(&paths), Err(SearchError::Persist(_))));
}

fn replacement() -> Vec<DrugRecord> {
    vec![
        DrugRecord::new("A1", "Promag", "Mengatasi maag dan perut kembung").with_price(8_000),
        DrugRecord::new("A2", "Mylanta", "Meredakan maag dan asam lambung").with_price(20_000),
        DrugRecord::new("A3", "Antasida", "Menetralkan asam lambung").with_price(5_000),
    ]
}

#[test]
fn half_replaced_artifact_is_rejected() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &SearchIndex::build(corpus()).unwrap()).unwrap();

    // new vocabulary and documents next to the old postings and meta.json
    let next = SearchIndex::build(replacement()).unwrap();
    save_vocabulary(&paths, next.vocabulary()).unwrap();
    save_documents(&paths, next.documents()).unwrap();
    assert!(matches!(load_index(&paths), Err(SearchError::Persist(_))));
}

#[test]
fn failed_rebuild_leaves_no_meta() {
    let dir = tempdir().unwrap();
    let paths = IndexPaths::new(dir.path());
    save_index(&paths, &SearchIndex::build(corpus()).unwrap()).unwrap();

    // a directory where the postings temp file goes makes the save fail midway
    std::fs::create_dir(dir.path().join("postings.tmp")).unwrap();
    let next = SearchIndex::build(replacement()).unwrap();
    assert!(save_index(&paths, &next).is_err());
    assert!(!paths.exists());
    assert!(load_index(&paths).is_err());

    std::fs::remove_dir(dir.path().join("postings.tmp")).unwrap();
    save_index(&paths, &next).unwrap();
    let loaded = load_index(&paths).unwrap();
    let out = loaded.search("maag", &SearchOptions::default());
    let ids: Vec<&str> = out.results.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&"A1") && ids.contains(&"A2"));
}
