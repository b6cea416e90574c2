use std::sync::Arc;

use quill::index::docid::default_mapper;
use quill::{
    delete_index, list_indices, load_index, load_index_lazy, BooleanQueryEngine, Compression,
    Datastore, DocumentInput, IndexBuilder, IndexReader, IndexSpec, InvertedIndex, Optimization,
    QuillError, RankingModel, StandardAnalyzer,
};

fn corpus() -> Vec<DocumentInput> {
    vec![
        DocumentInput::raw("news_0", "zero", "apple banana apple"),
        DocumentInput::raw("news_1", "one", "banana cherry"),
        DocumentInput::raw("news_7", "seven", "apple cherry cherry durian"),
        DocumentInput::raw("wiki_0", "w zero", "banana durian"),
        DocumentInput::raw("wiki_3", "w three", "apple apple apple elderberry"),
    ]
}

fn assert_same_index(original: &InvertedIndex, loaded: &InvertedIndex) {
    assert_eq!(original.model(), loaded.model());
    assert_eq!(original.doc_count(), loaded.doc_count());
    assert_eq!(original.term_count(), loaded.term_count());
    assert_eq!(original.all_doc_ids(), loaded.all_doc_ids());

    for doc_id in original.all_doc_ids() {
        assert_eq!(original.document(&doc_id), loaded.document(&doc_id));
    }
    for (term, list) in original.terms() {
        let loaded_list = loaded.postings(term).unwrap().unwrap();
        assert_eq!(list.as_ref(), loaded_list.as_ref(), "term {term:?}");
    }
    for (term, _) in original.terms() {
        match (original.idf(term), loaded.idf(term)) {
            (Some(a), Some(b)) => assert!((a - b).abs() < 1e-9),
            (a, b) => assert_eq!(a.is_some(), b.is_some()),
        }
    }
}

#[test]
fn test_idempotent_load_across_backends_and_codecs() {
    let dir = tempfile::tempdir().unwrap();
    let index = IndexBuilder::new(RankingModel::TfIdf).build(corpus()).unwrap();

    for datastore in [Datastore::DocumentStore, Datastore::Relational] {
        for compression in [Compression::None, Compression::Elias, Compression::Zlib] {
            let spec =
                IndexSpec::new(RankingModel::TfIdf, datastore, compression, Optimization::None)
                    .unwrap();
            quill::save_index(&index, &spec, dir.path()).unwrap();
            let loaded = load_index(&spec, dir.path(), default_mapper()).unwrap();
            assert_same_index(&index, &loaded);
        }
    }
}

#[test]
fn test_lazy_reader_matches_eager_reader() {
    let dir = tempfile::tempdir().unwrap();
    let index = IndexBuilder::new(RankingModel::TfIdf).build(corpus()).unwrap();
    let spec = IndexSpec::new(
        RankingModel::TfIdf,
        Datastore::Relational,
        Compression::Elias,
        Optimization::None,
    )
    .unwrap();
    quill::save_index(&index, &spec, dir.path()).unwrap();

    let lazy = load_index_lazy(&spec, dir.path(), default_mapper()).unwrap();
    assert_eq!(lazy.cached_terms(), 0);
    assert_eq!(lazy.term_count(), index.term_count());
    assert_eq!(lazy.doc_count(), index.doc_count());

    for (term, list) in index.terms() {
        let lazy_list = lazy.postings(term).unwrap().unwrap();
        assert_eq!(list.as_ref(), lazy_list.as_ref());
        assert_eq!(index.idf(term), lazy.idf(term));
    }
    assert!(lazy.cached_terms() > 0);
}

#[test]
fn test_skip_pointers_survive_elias_persistence() {
    // The Elias form carries no skip fields; loading re-embeds them at
    // the standard spacing, which matches what the builder embedded.
    let dir = tempfile::tempdir().unwrap();
    let docs: Vec<DocumentInput> = (0..25)
        .map(|i| DocumentInput::raw(&format!("news_{i}"), "", "apple"))
        .collect();
    let index = IndexBuilder::new(RankingModel::Boolean)
        .skip_pointers(true)
        .build(docs)
        .unwrap();
    let spec = IndexSpec::new(
        RankingModel::Boolean,
        Datastore::DocumentStore,
        Compression::Elias,
        Optimization::SkipPointers,
    )
    .unwrap();
    quill::save_index(&index, &spec, dir.path()).unwrap();

    let loaded = load_index(&spec, dir.path(), default_mapper()).unwrap();
    assert!(loaded.has_embedded_skips());
    let original = index.postings("apple").unwrap().unwrap();
    let reloaded = loaded.postings("apple").unwrap().unwrap();
    assert_eq!(original.as_ref(), reloaded.as_ref());
    // spacing = max(2, floor(sqrt(25))) = 5
    assert_eq!(reloaded.postings[0].skip, Some(5));
}

#[test]
fn test_boolean_queries_work_after_reload() {
    let dir = tempfile::tempdir().unwrap();
    let index = IndexBuilder::new(RankingModel::Boolean).build(corpus()).unwrap();
    let spec = IndexSpec::new(
        RankingModel::Boolean,
        Datastore::DocumentStore,
        Compression::Zlib,
        Optimization::None,
    )
    .unwrap();
    quill::save_index(&index, &spec, dir.path()).unwrap();

    let loaded = load_index(&spec, dir.path(), default_mapper()).unwrap();
    let engine = BooleanQueryEngine::new(Arc::new(loaded), Arc::new(StandardAnalyzer::new()));
    assert_eq!(
        engine.query(r#""apple" AND "cherry""#).unwrap(),
        vec!["news_7"]
    );
    assert_eq!(
        engine.query(r#"PHRASE "apple" "banana""#).unwrap(),
        vec!["news_0"]
    );
}

#[test]
fn test_list_and_delete_indices() {
    let dir = tempfile::tempdir().unwrap();
    let index = IndexBuilder::new(RankingModel::Tf).build(corpus()).unwrap();

    let doc_spec = IndexSpec::new(
        RankingModel::Tf,
        Datastore::DocumentStore,
        Compression::None,
        Optimization::None,
    )
    .unwrap();
    let rel_spec = IndexSpec::new(
        RankingModel::Tf,
        Datastore::Relational,
        Compression::Elias,
        Optimization::None,
    )
    .unwrap();
    quill::save_index(&index, &doc_spec, dir.path()).unwrap();
    quill::save_index(&index, &rel_spec, dir.path()).unwrap();

    // Unrelated files in the same directory are not indexes.
    std::fs::write(dir.path().join("notes.json"), b"{}").unwrap();
    std::fs::write(dir.path().join("scratch.db"), b"").unwrap();
    std::fs::write(dir.path().join("quill_i9d9c9oxx.json"), b"{}").unwrap();

    let mut expected = vec![doc_spec.identifier(), rel_spec.identifier()];
    expected.sort();
    assert_eq!(list_indices(dir.path()).unwrap(), expected);

    delete_index(&doc_spec, dir.path()).unwrap();
    assert_eq!(list_indices(dir.path()).unwrap(), vec![rel_spec.identifier()]);

    // Deleting again reports the missing path.
    assert!(matches!(
        delete_index(&doc_spec, dir.path()),
        Err(QuillError::NotFound(_))
    ));
}

#[test]
fn test_missing_index_is_not_found_with_path() {
    let dir = tempfile::tempdir().unwrap();
    let spec = IndexSpec::new(
        RankingModel::Tf,
        Datastore::DocumentStore,
        Compression::None,
        Optimization::None,
    )
    .unwrap();
    match load_index(&spec, dir.path(), default_mapper()) {
        Err(QuillError::NotFound(path)) => {
            assert!(path.contains(&spec.identifier()));
        }
        Err(other) => panic!("expected NotFound, got {other:?}"),
        Ok(_) => panic!("expected NotFound, got an index"),
    }

    let rel_spec = IndexSpec::new(
        RankingModel::Tf,
        Datastore::Relational,
        Compression::None,
        Optimization::None,
    )
    .unwrap();
    assert!(matches!(
        load_index(&rel_spec, dir.path(), default_mapper()),
        Err(QuillError::NotFound(_))
    ));
}
