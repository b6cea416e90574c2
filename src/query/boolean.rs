//! Boolean query parsing and evaluation.
//!
//! Pipeline: regex tokenizer, PHRASE folding, shunting-yard to RPN,
//! stack evaluation over doc-id sets. `NOT` is a unary complement
//! against the full document universe, so `"a" AND NOT "b"` means
//! `postings(a) ∩ (universe − postings(b))`. That is intentional and
//! covered by tests; it is not the conventional binary AND-NOT.

use std::sync::Arc;

use ahash::AHashSet;
use lazy_static::lazy_static;
use regex::Regex;

use crate::analysis::Analyzer;
use crate::error::{QuillError, Result};
use crate::index::docid::sort_doc_ids;
use crate::index::skip::{embedded_skip_map, intersect_with_skips, SkipOverlay};
use crate::index::{IndexReader, PostingList};

lazy_static! {
    static ref TOKEN_RE: Regex =
        Regex::new(r#"(?i)(\(|\)|"[^"]+"|\b(?:PHRASE|AND|OR|NOT)\b)"#).unwrap();
    static ref SIMPLE_AND_RE: Regex =
        Regex::new(r#"^"([^"]+)"\s+AND\s+"([^"]+)"$"#).unwrap();
}

/// A token of the Boolean query language.
#[derive(Debug, Clone, PartialEq)]
enum QueryToken {
    Term(String),
    Phrase(Vec<String>),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

impl QueryToken {
    fn precedence(&self) -> Option<u8> {
        match self {
            QueryToken::Not => Some(3),
            QueryToken::And => Some(2),
            QueryToken::Or => Some(1),
            _ => None,
        }
    }
}

/// Evaluates Boolean queries against an index.
pub struct BooleanQueryEngine {
    reader: Arc<dyn IndexReader>,
    analyzer: Arc<dyn Analyzer>,
    skip_enabled: bool,
}

impl BooleanQueryEngine {
    /// Create an engine over an index reader.
    pub fn new(reader: Arc<dyn IndexReader>, analyzer: Arc<dyn Analyzer>) -> Self {
        BooleanQueryEngine {
            reader,
            analyzer,
            skip_enabled: false,
        }
    }

    /// Enable the skip-pointer fast path for two-term AND queries.
    pub fn skip_pointers(mut self, enabled: bool) -> Self {
        self.skip_enabled = enabled;
        self
    }

    /// Parse and evaluate a query, returning matching doc ids in
    /// index order.
    pub fn query(&self, query_str: &str) -> Result<Vec<String>> {
        // Exact two-term AND queries go through skip-pointer
        // intersection. Anything more complex works on plain sets:
        // skip pointers do not help intermediate results.
        if self.skip_enabled {
            if let Some(caps) = SIMPLE_AND_RE.captures(query_str.trim()) {
                return self.skip_intersection(&caps[1], &caps[2]);
            }
        }

        let tokens = self.tokenize(query_str)?;
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let rpn = to_rpn(tokens)?;
        let result = self.evaluate(&rpn)?;

        let mut ids: Vec<String> = result.into_iter().collect();
        sort_doc_ids(&mut ids, self.reader.mapper().as_ref());
        Ok(ids)
    }

    /// Tokenize and fold `PHRASE "w1" "w2" ...` runs into phrase
    /// literals. Text outside the token grammar is ignored, matching
    /// the tolerant tokenizer this engine has always had.
    fn tokenize(&self, query_str: &str) -> Result<Vec<QueryToken>> {
        let mut raw: Vec<&str> = Vec::new();
        for m in TOKEN_RE.find_iter(query_str) {
            raw.push(m.as_str());
        }

        let mut tokens = Vec::with_capacity(raw.len());
        let mut i = 0;
        while i < raw.len() {
            let upper = raw[i].to_uppercase();
            match upper.as_str() {
                "(" => tokens.push(QueryToken::LParen),
                ")" => tokens.push(QueryToken::RParen),
                "AND" => tokens.push(QueryToken::And),
                "OR" => tokens.push(QueryToken::Or),
                "NOT" => tokens.push(QueryToken::Not),
                "PHRASE" => {
                    // Collect the run of quoted terms that follows.
                    // A quoted multi-word term contributes its words.
                    let mut words = Vec::new();
                    while i + 1 < raw.len() && raw[i + 1].starts_with('"') {
                        i += 1;
                        let content = raw[i].trim_matches('"');
                        words.extend(content.split_whitespace().map(str::to_string));
                    }
                    if words.is_empty() {
                        return Err(QuillError::parse(
                            "PHRASE requires at least one quoted term",
                        ));
                    }
                    tokens.push(QueryToken::Phrase(words));
                }
                _ => tokens.push(QueryToken::Term(raw[i].trim_matches('"').to_string())),
            }
            i += 1;
        }
        Ok(tokens)
    }

    fn evaluate(&self, rpn: &[QueryToken]) -> Result<AHashSet<String>> {
        let mut stack: Vec<AHashSet<String>> = Vec::new();

        for token in rpn {
            match token {
                QueryToken::Term(term) => {
                    stack.push(self.term_doc_ids(term)?);
                }
                QueryToken::Phrase(words) => {
                    stack.push(self.phrase_doc_ids(words)?);
                }
                QueryToken::And => {
                    let right = stack
                        .pop()
                        .ok_or_else(|| QuillError::evaluation("AND is missing an operand"))?;
                    let left = stack
                        .pop()
                        .ok_or_else(|| QuillError::evaluation("AND is missing an operand"))?;
                    stack.push(left.intersection(&right).cloned().collect());
                }
                QueryToken::Or => {
                    let right = stack
                        .pop()
                        .ok_or_else(|| QuillError::evaluation("OR is missing an operand"))?;
                    let left = stack
                        .pop()
                        .ok_or_else(|| QuillError::evaluation("OR is missing an operand"))?;
                    stack.push(left.union(&right).cloned().collect());
                }
                QueryToken::Not => {
                    let operand = stack
                        .pop()
                        .ok_or_else(|| QuillError::evaluation("NOT is missing an operand"))?;
                    let universe: AHashSet<String> =
                        self.reader.all_doc_ids().into_iter().collect();
                    stack.push(universe.difference(&operand).cloned().collect());
                }
                QueryToken::LParen | QueryToken::RParen => {
                    return Err(QuillError::evaluation("parenthesis leaked into RPN"));
                }
            }
        }

        if stack.len() == 1 {
            Ok(stack.pop().unwrap())
        } else {
            Err(QuillError::evaluation(format!(
                "query left {} operands on the stack; adjacent terms need an operator",
                stack.len()
            )))
        }
    }

    /// Postings lookup for one quoted term. The term runs through the
    /// same analyzer as indexing; a term the analyzer drops entirely,
    /// or one absent from the index, yields an empty set.
    fn term_doc_ids(&self, term: &str) -> Result<AHashSet<String>> {
        match self.term_postings(term)? {
            Some(list) => Ok(list.iter().map(|p| p.doc_id.clone()).collect()),
            None => Ok(AHashSet::new()),
        }
    }

    fn term_postings(&self, term: &str) -> Result<Option<Arc<PostingList>>> {
        let tokens = self.analyzer.analyze(term);
        let Some(first) = tokens.first() else {
            return Ok(None);
        };
        self.reader.postings(first)
    }

    /// Positional phrase matching: every word must appear at
    /// consecutive offsets starting from some position of the first
    /// word.
    fn phrase_doc_ids(&self, words: &[String]) -> Result<AHashSet<String>> {
        if words.len() == 1 {
            return self.term_doc_ids(&words[0]);
        }

        let mut lists = Vec::with_capacity(words.len());
        for word in words {
            match self.term_postings(word)? {
                Some(list) => lists.push(list),
                None => return Ok(AHashSet::new()),
            }
        }

        // Documents containing every word.
        let mut common: AHashSet<&str> =
            lists[0].iter().map(|p| p.doc_id.as_str()).collect();
        for list in &lists[1..] {
            let ids: AHashSet<&str> = list.iter().map(|p| p.doc_id.as_str()).collect();
            common.retain(|id| ids.contains(id));
        }

        let mut matches = AHashSet::new();
        'docs: for doc_id in common {
            let positions: Vec<&[u32]> = lists
                .iter()
                .map(|list| list.get(doc_id).map(|p| p.positions.as_slice()))
                .collect::<Option<Vec<_>>>()
                .unwrap_or_default();
            if positions.len() != lists.len() {
                continue;
            }
            for &start in positions[0] {
                if positions[1..]
                    .iter()
                    .enumerate()
                    .all(|(i, pos)| pos.binary_search(&(start + i as u32 + 1)).is_ok())
                {
                    matches.insert(doc_id.to_string());
                    continue 'docs;
                }
            }
        }
        Ok(matches)
    }

    fn skip_intersection(&self, term_a: &str, term_b: &str) -> Result<Vec<String>> {
        let (Some(list_a), Some(list_b)) =
            (self.term_postings(term_a)?, self.term_postings(term_b)?)
        else {
            return Ok(Vec::new());
        };
        let skips_a = skip_map_for(&list_a);
        let skips_b = skip_map_for(&list_b);
        let mapper = self.reader.mapper();
        let mut ids =
            intersect_with_skips(&list_a, &list_b, &skips_a, &skips_b, mapper.as_ref())?;
        sort_doc_ids(&mut ids, mapper.as_ref());
        Ok(ids)
    }
}

/// Embedded pointers when the list carries them, a runtime overlay
/// otherwise.
fn skip_map_for(list: &PostingList) -> crate::index::skip::SkipMap {
    if list.iter().any(|p| p.skip.is_some()) {
        embedded_skip_map(list)
    } else {
        SkipOverlay::build(list, None).jump_map()
    }
}

/// Shunting-yard: infix tokens to RPN. Binary operators are
/// left-associative, so operators of equal or higher precedence are
/// popped before pushing.
fn to_rpn(tokens: Vec<QueryToken>) -> Result<Vec<QueryToken>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<QueryToken> = Vec::new();

    for token in tokens {
        match token {
            QueryToken::Term(_) | QueryToken::Phrase(_) => output.push(token),
            QueryToken::LParen => operators.push(token),
            QueryToken::RParen => {
                while let Some(top) = operators.last() {
                    if *top == QueryToken::LParen {
                        break;
                    }
                    output.push(operators.pop().unwrap());
                }
                if operators.pop() != Some(QueryToken::LParen) {
                    return Err(QuillError::parse("mismatched parentheses"));
                }
            }
            op @ (QueryToken::And | QueryToken::Or | QueryToken::Not) => {
                let prec = op.precedence().unwrap();
                while let Some(top) = operators.last() {
                    match top.precedence() {
                        Some(top_prec) if top_prec >= prec => {
                            output.push(operators.pop().unwrap());
                        }
                        _ => break,
                    }
                }
                operators.push(op);
            }
        }
    }

    while let Some(op) = operators.pop() {
        if op == QueryToken::LParen {
            return Err(QuillError::parse("mismatched parentheses"));
        }
        output.push(op);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::StandardAnalyzer;
    use crate::index::{DocumentInput, IndexBuilder, RankingModel};

    fn engine() -> BooleanQueryEngine {
        let docs = vec![
            DocumentInput::raw("news_1", "", "apple banana"),
            DocumentInput::raw("news_2", "", "apple orange"),
            DocumentInput::raw("news_3", "", "banana orange"),
            DocumentInput::raw("news_4", "", "grape apple"),
            DocumentInput::raw("news_5", "", "grape banana orange"),
        ];
        let index = IndexBuilder::new(RankingModel::Boolean).build(docs).unwrap();
        BooleanQueryEngine::new(Arc::new(index), Arc::new(StandardAnalyzer::new()))
    }

    #[test]
    fn test_and() {
        assert_eq!(engine().query(r#""apple" AND "banana""#).unwrap(), vec!["news_1"]);
    }

    #[test]
    fn test_or() {
        assert_eq!(
            engine().query(r#""apple" OR "grape""#).unwrap(),
            vec!["news_1", "news_2", "news_4", "news_5"]
        );
    }

    #[test]
    fn test_not_is_unary_complement() {
        // NOT complements against the whole universe, it is not an
        // AND-NOT shorthand.
        assert_eq!(
            engine().query(r#"NOT "apple""#).unwrap(),
            vec!["news_3", "news_5"]
        );
    }

    #[test]
    fn test_and_not_composes_with_complement() {
        assert_eq!(
            engine().query(r#""banana" AND NOT "apple""#).unwrap(),
            vec!["news_3", "news_5"]
        );
    }

    #[test]
    fn test_parentheses_and_mixed_operators() {
        assert_eq!(
            engine()
                .query(r#"("apple" AND "banana") OR ("orange" AND NOT "grape")"#)
                .unwrap(),
            vec!["news_1", "news_2", "news_3"]
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // apple OR (banana AND orange)
        assert_eq!(
            engine().query(r#""apple" OR "banana" AND "orange""#).unwrap(),
            vec!["news_1", "news_2", "news_3", "news_4", "news_5"]
        );
    }

    #[test]
    fn test_case_insensitive_operators() {
        assert_eq!(
            engine().query(r#""apple" and "banana""#).unwrap(),
            vec!["news_1"]
        );
    }

    #[test]
    fn test_unknown_term_yields_empty_not_error() {
        assert!(engine().query(r#""durian""#).unwrap().is_empty());
        assert_eq!(
            engine().query(r#""apple" OR "durian""#).unwrap(),
            vec!["news_1", "news_2", "news_4"]
        );
    }

    #[test]
    fn test_mismatched_parentheses() {
        assert!(matches!(
            engine().query(r#"("apple" AND "banana""#),
            Err(QuillError::Parse(_))
        ));
        assert!(matches!(
            engine().query(r#""apple" AND "banana")"#),
            Err(QuillError::Parse(_))
        ));
    }

    #[test]
    fn test_adjacent_terms_are_an_error() {
        assert!(matches!(
            engine().query(r#""apple" "banana""#),
            Err(QuillError::Evaluation(_))
        ));
    }

    #[test]
    fn test_operator_without_operand() {
        assert!(matches!(
            engine().query(r#""apple" AND"#),
            Err(QuillError::Evaluation(_))
        ));
    }

    #[test]
    fn test_phrase_matching() {
        let docs = vec![
            DocumentInput::raw("news_1", "", "big red apple pie"),
            DocumentInput::raw("news_2", "", "red big apple"),
            DocumentInput::raw("news_3", "", "big apple red"),
        ];
        let index = IndexBuilder::new(RankingModel::Boolean).build(docs).unwrap();
        let engine =
            BooleanQueryEngine::new(Arc::new(index), Arc::new(StandardAnalyzer::new()));

        assert_eq!(
            engine.query(r#"PHRASE "big" "red" "apple""#).unwrap(),
            vec!["news_1"]
        );
        // Natural single-string form.
        assert_eq!(engine.query(r#"PHRASE "big red apple""#).unwrap(), vec!["news_1"]);
        // Adjacency matters: "apple red" only occurs in news_3.
        assert_eq!(engine.query(r#"PHRASE "apple" "red""#).unwrap(), vec!["news_3"]);
    }

    #[test]
    fn test_phrase_requires_terms() {
        assert!(matches!(
            engine().query(r#"PHRASE AND "apple""#),
            Err(QuillError::Parse(_))
        ));
    }

    #[test]
    fn test_skip_fast_path_matches_plain_and() {
        let docs: Vec<DocumentInput> = (0..40)
            .map(|i| {
                let body = if i % 3 == 0 { "apple banana" } else { "apple orange" };
                DocumentInput::raw(&format!("news_{i}"), "", body)
            })
            .collect();
        let index = IndexBuilder::new(RankingModel::Boolean)
            .skip_pointers(true)
            .build(docs)
            .unwrap();
        let reader: Arc<dyn IndexReader> = Arc::new(index);
        let plain =
            BooleanQueryEngine::new(Arc::clone(&reader), Arc::new(StandardAnalyzer::new()));
        let fast = BooleanQueryEngine::new(reader, Arc::new(StandardAnalyzer::new()))
            .skip_pointers(true);

        let query = r#""apple" AND "banana""#;
        assert_eq!(fast.query(query).unwrap(), plain.query(query).unwrap());
    }
}
