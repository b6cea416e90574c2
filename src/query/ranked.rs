//! Ranked retrieval: TAAT and DAAT execution over TF / TF-IDF indexes.
//!
//! Both strategies compute the same score function; they differ in
//! accumulation order. The thresholding and early-stopping heuristics
//! are deliberately approximate: they can drop true top-k members in
//! exchange for less work, and the tests treat that as the contract
//! rather than a defect.

use std::cmp::Ordering;
use std::sync::Arc;

use ahash::AHashMap;

use crate::analysis::Analyzer;
use crate::config::Optimization;
use crate::error::{QuillError, Result};
use crate::index::docid::{sort_doc_ids, DocIdMapper};
use crate::index::{IndexReader, RankingModel};

/// Execution order for ranked queries. Runtime-only: it never appears
/// in the index identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryMode {
    #[default]
    TermAtATime,
    DocumentAtATime,
}

/// One ranked result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: String,
    pub score: f64,
}

/// Evaluates ranked queries against a TF or TF-IDF index.
pub struct RankedQueryEngine {
    reader: Arc<dyn IndexReader>,
    analyzer: Arc<dyn Analyzer>,
    optimization: Optimization,
}

impl RankedQueryEngine {
    /// Create an engine over an index reader.
    ///
    /// Fails for Boolean indexes, which carry no usable frequencies.
    pub fn new(reader: Arc<dyn IndexReader>, analyzer: Arc<dyn Analyzer>) -> Result<Self> {
        if reader.model() == RankingModel::Boolean {
            return Err(QuillError::config(
                "ranked retrieval requires a TF or TF-IDF index",
            ));
        }
        Ok(RankedQueryEngine {
            reader,
            analyzer,
            optimization: Optimization::None,
        })
    }

    /// Enable a score heuristic (thresholding or early stopping).
    pub fn optimization(mut self, optimization: Optimization) -> Self {
        self.optimization = optimization;
        self
    }

    /// Analyze a free-text query and rank documents for it.
    pub fn query(&self, query_str: &str, top_k: usize, mode: QueryMode) -> Result<Vec<ScoredDoc>> {
        let terms = self.analyzer.analyze(query_str);
        self.query_terms(&terms, top_k, mode)
    }

    /// Rank documents for pre-analyzed query terms.
    pub fn query_terms(
        &self,
        terms: &[String],
        top_k: usize,
        mode: QueryMode,
    ) -> Result<Vec<ScoredDoc>> {
        if terms.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }
        match mode {
            QueryMode::TermAtATime => self.taat(terms, top_k),
            QueryMode::DocumentAtATime => self.daat(terms, top_k),
        }
    }

    /// Per-term score contribution: raw frequency under TF, `tf * idf`
    /// under TF-IDF. A term missing from the IDF table weighs zero.
    fn term_weight(&self, term: &str) -> f64 {
        match self.reader.model() {
            RankingModel::Tf => 1.0,
            _ => self.reader.idf(term).unwrap_or(0.0),
        }
    }

    /// Heuristic score floor for thresholding. Zero disables it.
    fn threshold(&self, num_terms: usize) -> f64 {
        if self.optimization != Optimization::Thresholding {
            return 0.0;
        }
        match self.reader.model() {
            // 10% of a rough maximum score of 10 per term.
            RankingModel::Tf => num_terms as f64 * 10.0 * 0.1,
            _ => self.reader.average_idf() * num_terms as f64 * 0.05,
        }
    }

    fn taat(&self, terms: &[String], top_k: usize) -> Result<Vec<ScoredDoc>> {
        let mut scores: AHashMap<String, f64> = AHashMap::new();

        for term in terms {
            let Some(list) = self.reader.postings(term)? else {
                continue;
            };
            let weight = self.term_weight(term);
            for posting in list.iter() {
                *scores.entry(posting.doc_id.clone()).or_insert(0.0) +=
                    posting.term_frequency as f64 * weight;
            }
            // Approximate: later terms never get to contribute once
            // enough candidates have accumulated.
            if self.optimization == Optimization::EarlyStopping && scores.len() >= top_k * 2 {
                break;
            }
        }

        let threshold = self.threshold(terms.len());
        if threshold > 0.0 {
            scores.retain(|_, score| *score >= threshold);
        }

        let mut results: Vec<ScoredDoc> = scores
            .into_iter()
            .map(|(doc_id, score)| ScoredDoc { doc_id, score })
            .collect();
        let mapper = self.reader.mapper();
        sort_scored(&mut results, mapper.as_ref());
        results.truncate(top_k);
        Ok(results)
    }

    fn daat(&self, terms: &[String], top_k: usize) -> Result<Vec<ScoredDoc>> {
        // Regroup postings by document so each document's full score
        // is computed in one pass.
        let mut doc_terms: AHashMap<String, Vec<(usize, u32)>> = AHashMap::new();
        let mut weights = Vec::with_capacity(terms.len());
        for (term_idx, term) in terms.iter().enumerate() {
            weights.push(self.term_weight(term));
            let Some(list) = self.reader.postings(term)? else {
                continue;
            };
            for posting in list.iter() {
                doc_terms
                    .entry(posting.doc_id.clone())
                    .or_default()
                    .push((term_idx, posting.term_frequency));
            }
        }

        let mapper = self.reader.mapper();
        let mut doc_ids: Vec<String> = doc_terms.keys().cloned().collect();
        sort_doc_ids(&mut doc_ids, mapper.as_ref());

        let threshold = self.threshold(terms.len());
        let mut results = Vec::new();
        for doc_id in doc_ids {
            let score: f64 = doc_terms[&doc_id]
                .iter()
                .map(|&(term_idx, tf)| tf as f64 * weights[term_idx])
                .sum();
            if threshold > 0.0 && score < threshold {
                continue;
            }
            results.push(ScoredDoc { doc_id, score });
            // Approximate: documents later in id order are never
            // scored once enough candidates have been kept.
            if self.optimization == Optimization::EarlyStopping && results.len() >= top_k * 3 {
                break;
            }
        }

        sort_scored(&mut results, mapper.as_ref());
        results.truncate(top_k);
        Ok(results)
    }
}

/// Score descending, ties broken by doc id in mapper order so TAAT and
/// DAAT produce identical rankings.
fn sort_scored(results: &mut [ScoredDoc], mapper: &dyn DocIdMapper) {
    let keys: AHashMap<String, Option<u64>> = results
        .iter()
        .map(|d| (d.doc_id.clone(), mapper.to_number(&d.doc_id).ok()))
        .collect();
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match (keys[&a.doc_id], keys[&b.doc_id]) {
                (Some(ka), Some(kb)) => ka.cmp(&kb),
                _ => a.doc_id.cmp(&b.doc_id),
            })
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::index::{DocumentInput, IndexBuilder};

    fn engine(model: RankingModel, optimization: Optimization) -> RankedQueryEngine {
        let docs = vec![
            DocumentInput::raw("news_1", "", "python python python java"),
            DocumentInput::raw("news_2", "", "python java java"),
            DocumentInput::raw("news_3", "", "java rust"),
            DocumentInput::raw("news_4", "", "rust rust rust rust"),
            DocumentInput::raw("news_5", "", "python"),
        ];
        let index = IndexBuilder::new(model).build(docs).unwrap();
        RankedQueryEngine::new(Arc::new(index), Arc::new(StandardAnalyzer::new()))
            .unwrap()
            .optimization(optimization)
    }

    #[test]
    fn test_tf_monotonicity() {
        let engine = engine(RankingModel::Tf, Optimization::None);
        let results = engine.query("python", 10, QueryMode::TermAtATime).unwrap();
        assert_eq!(results[0].doc_id, "news_1");
        assert_eq!(results[0].score, 3.0);
        assert_eq!(results[1].doc_id, "news_2");
        // Equal scores fall back to doc-id order.
        assert_eq!(results[2].doc_id, "news_5");
    }

    #[test]
    fn test_tfidf_weighs_rare_terms_higher() {
        let engine = engine(RankingModel::TfIdf, Optimization::None);
        // "rust" (df=2) outweighs "java" (df=3) at equal tf.
        let results = engine.query("rust java", 10, QueryMode::TermAtATime).unwrap();
        let rust_only = results.iter().find(|d| d.doc_id == "news_4").unwrap();
        let java_only = results.iter().find(|d| d.doc_id == "news_2").unwrap();
        assert!(rust_only.score > java_only.score);
    }

    #[test]
    fn test_taat_daat_agree_without_optimization() {
        for model in [RankingModel::Tf, RankingModel::TfIdf] {
            let engine = engine(model, Optimization::None);
            for query in ["python", "python java", "rust java python", "missing"] {
                let taat = engine.query(query, 3, QueryMode::TermAtATime).unwrap();
                let daat = engine.query(query, 3, QueryMode::DocumentAtATime).unwrap();
                assert_eq!(taat, daat, "query {query:?} under {model:?}");
            }
        }
    }

    #[test]
    fn test_unknown_terms_contribute_nothing() {
        let engine = engine(RankingModel::Tf, Optimization::None);
        assert!(engine.query("missing", 10, QueryMode::TermAtATime).unwrap().is_empty());
        let results = engine.query("python missing", 10, QueryMode::TermAtATime).unwrap();
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_thresholding_drops_low_scores() {
        // TF threshold for one term is 1.0, so tf=1 docs survive but
        // the floor rises with query length: at three query terms the
        // floor is 3.0.
        let engine = engine(RankingModel::Tf, Optimization::Thresholding);
        let results = engine
            .query("python java rust", 10, QueryMode::TermAtATime)
            .unwrap();
        assert!(results.iter().all(|d| d.score >= 3.0));
        let unfiltered = engine
            .optimization(Optimization::None)
            .query("python java rust", 10, QueryMode::TermAtATime)
            .unwrap();
        assert!(unfiltered.len() >= results.len());
    }

    #[test]
    fn test_early_stopping_is_an_approximation() {
        // With top_k=1, TAAT stops after the first term that yields
        // two candidates; "java" never contributes. This trades
        // accuracy for speed and is the documented behavior.
        let engine = engine(RankingModel::Tf, Optimization::EarlyStopping);
        let results = engine
            .query("python java", 1, QueryMode::TermAtATime)
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].doc_id, "news_1");
        assert_eq!(results[0].score, 3.0); // java's +1 was never added
    }

    #[test]
    fn test_boolean_index_rejected() {
        let docs = vec![DocumentInput::raw("news_1", "", "python")];
        let index = IndexBuilder::new(RankingModel::Boolean).build(docs).unwrap();
        assert!(matches!(
            RankedQueryEngine::new(Arc::new(index), Arc::new(StandardAnalyzer::new())),
            Err(QuillError::Config(_))
        ));
    }

    #[test]
    fn test_top_k_truncation() {
        let engine = engine(RankingModel::Tf, Optimization::None);
        let results = engine.query("python java rust", 2, QueryMode::DocumentAtATime).unwrap();
        assert_eq!(results.len(), 2);
    }
}
