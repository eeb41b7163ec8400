//! In-process [`SearchEngine`] for tests and local runs
//!
//! Evaluates the same typed query tree that is sent to Elasticsearch, with simplified
//! relevance: each matching `must` or `should` clause scores 1, a bool with only filters
//! scores 0 and an empty bool scores 1. Function scores multiply the base score by the
//! product of their functions. Scripts run under the index write lock, which makes every
//! scripted update atomic with respect to concurrent writers.

use crate::search::engine::{RawHit, RawSearchResponse, SearchEngine};
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{BoolQuery, Query, ScoreFunction, SearchRequest};
use crate::search::script::ReactionScript;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

const MILLIS_PER_DAY: f64 = 86_400_000.0;
const GAUSS_DECAY: f64 = 0.5;

#[derive(Debug, Clone)]
struct StoredDocument {
    seq_no: u64,
    source: Map<String, Value>,
}

#[derive(Debug, Default)]
struct IndexState {
    mappings: Value,
    documents: HashMap<String, StoredDocument>,
}

#[derive(Debug, Default)]
struct EngineState {
    indices: HashMap<String, IndexState>,
    next_seq_no: u64,
}

impl EngineState {
    fn next_seq_no(&mut self) -> u64 {
        let seq_no = self.next_seq_no;
        self.next_seq_no += 1;
        seq_no
    }

    fn index(&self, index: &str) -> SearchResult<&IndexState> {
        self.indices
            .get(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))
    }

    fn index_mut(&mut self, index: &str) -> SearchResult<&mut IndexState> {
        self.indices
            .get_mut(index)
            .ok_or_else(|| SearchError::IndexNotFound(index.to_string()))
    }
}

/// Search engine holding every index in memory
#[derive(Debug, Default)]
pub struct InMemorySearchEngine {
    state: RwLock<EngineState>,
}

impl InMemorySearchEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current source of a document, if present
    pub fn document(&self, index: &str, id: &str) -> Option<Value> {
        let state = self.state.read();
        state
            .indices
            .get(index)
            .and_then(|idx| idx.documents.get(id))
            .map(|doc| Value::Object(doc.source.clone()))
    }

    /// Number of documents in an index, zero when it does not exist
    pub fn document_count(&self, index: &str) -> usize {
        self.state
            .read()
            .indices
            .get(index)
            .map_or(0, |idx| idx.documents.len())
    }

    /// Mappings an index was created with
    pub fn mappings(&self, index: &str) -> Option<Value> {
        self.state
            .read()
            .indices
            .get(index)
            .map(|idx| idx.mappings.clone())
    }
}

fn as_object(document: &Value) -> SearchResult<Map<String, Value>> {
    document
        .as_object()
        .cloned()
        .ok_or_else(|| SearchError::Serialization("Document must be a JSON object".to_string()))
}

#[async_trait]
impl SearchEngine for InMemorySearchEngine {
    async fn index_exists(&self, index: &str) -> SearchResult<bool> {
        Ok(self.state.read().indices.contains_key(index))
    }

    async fn create_index(&self, index: &str, mappings: &Value) -> SearchResult<()> {
        let mut state = self.state.write();
        if state.indices.contains_key(index) {
            return Err(SearchError::IndexInitFailed(format!(
                "Index {} already exists",
                index
            )));
        }

        state.indices.insert(
            index.to_string(),
            IndexState {
                mappings: mappings.clone(),
                documents: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn index_document(&self, index: &str, id: &str, document: &Value) -> SearchResult<()> {
        let source = as_object(document)?;
        let mut state = self.state.write();
        let seq_no = state.next_seq_no();
        state
            .index_mut(index)?
            .documents
            .insert(id.to_string(), StoredDocument { seq_no, source });
        Ok(())
    }

    async fn update_document(&self, index: &str, id: &str, partial: &Value) -> SearchResult<()> {
        let partial = as_object(partial)?;
        let mut state = self.state.write();
        let seq_no = state.next_seq_no();
        let document = state
            .index_mut(index)?
            .documents
            .get_mut(id)
            .ok_or_else(|| SearchError::DocumentNotFound(format!("{}/{}", index, id)))?;

        document.source.extend(partial);
        document.seq_no = seq_no;
        Ok(())
    }

    async fn update_by_script(
        &self,
        index: &str,
        id: &str,
        script: &ReactionScript,
    ) -> SearchResult<()> {
        let mut state = self.state.write();
        let seq_no = state.next_seq_no();
        let document = state
            .index_mut(index)?
            .documents
            .get_mut(id)
            .ok_or_else(|| SearchError::DocumentNotFound(format!("{}/{}", index, id)))?;

        script.apply(&mut document.source);
        document.seq_no = seq_no;
        Ok(())
    }

    async fn delete_document(&self, index: &str, id: &str) -> SearchResult<()> {
        let mut state = self.state.write();
        state
            .index_mut(index)?
            .documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| SearchError::DocumentNotFound(format!("{}/{}", index, id)))
    }

    async fn delete_by_query(&self, index: &str, query: &Query) -> SearchResult<u64> {
        let now = Utc::now();
        let mut state = self.state.write();
        let documents = &mut state.index_mut(index)?.documents;

        let before = documents.len();
        documents.retain(|_, doc| evaluate(query, doc, now).is_none());
        Ok((before - documents.len()) as u64)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> SearchResult<RawSearchResponse> {
        let now = Utc::now();
        let state = self.state.read();

        let mut matches: Vec<(f64, u64, &String, &StoredDocument)> = state
            .index(index)?
            .documents
            .iter()
            .filter_map(|(id, doc)| {
                evaluate(&request.query, doc, now).map(|score| (score, doc.seq_no, id, doc))
            })
            .collect();

        matches.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });

        let total = matches.len() as u64;
        let hits = matches
            .into_iter()
            .skip(usize::try_from(request.from).unwrap_or(usize::MAX))
            .take(usize::try_from(request.size).unwrap_or(usize::MAX))
            .map(|(score, _, id, doc)| RawHit {
                id: id.clone(),
                score,
                source: Value::Object(doc.source.clone()),
            })
            .collect();

        Ok(RawSearchResponse { total, hits })
    }
}

/// Score of a document for a query, `None` when it does not match
fn evaluate(query: &Query, doc: &StoredDocument, now: DateTime<Utc>) -> Option<f64> {
    let source = &doc.source;
    let matched = |hit: bool| hit.then_some(1.0);

    match query {
        Query::MatchAll => Some(1.0),
        Query::Term { field, value } => matched(term_matches(source.get(field), value)),
        Query::Range { field, gte } => matched(
            source
                .get(field)
                .and_then(Value::as_f64)
                .is_some_and(|v| v >= *gte),
        ),
        Query::Match { field, query } => {
            let terms = tokenize(query);
            let words = field_tokens(source.get(field));
            matched(terms.iter().any(|term| words.contains(term)))
        }
        Query::BoolPrefix { field, query } => {
            matched(bool_prefix_matches(&field_tokens(source.get(field)), &tokenize(query)))
        }
        Query::Bool(bool_query) => evaluate_bool(bool_query, doc, now),
        Query::FunctionScore { query, functions } => {
            let base = evaluate(query, doc, now)?;
            let factor: f64 = functions
                .iter()
                .map(|function| function_score(function, doc, now))
                .product();
            Some(base * factor)
        }
    }
}

fn evaluate_bool(query: &BoolQuery, doc: &StoredDocument, now: DateTime<Utc>) -> Option<f64> {
    for clause in &query.filter {
        evaluate(clause, doc, now)?;
    }

    let mut score = 0.0;
    for clause in &query.must {
        score += evaluate(clause, doc, now)?;
    }

    let should_scores: Vec<f64> = query
        .should
        .iter()
        .filter_map(|clause| evaluate(clause, doc, now))
        .collect();

    // Without must or filter clauses at least one should clause has to match.
    let required = match query.minimum_should_match {
        Some(minimum) => (minimum as usize).min(query.should.len()),
        None if query.must.is_empty() && query.filter.is_empty() && !query.should.is_empty() => 1,
        None => 0,
    };
    if should_scores.len() < required {
        return None;
    }
    score += should_scores.iter().sum::<f64>();

    if query.filter.is_empty() && query.must.is_empty() && query.should.is_empty() {
        return Some(1.0);
    }
    Some(score)
}

fn function_score(function: &ScoreFunction, doc: &StoredDocument, now: DateTime<Utc>) -> f64 {
    match function {
        ScoreFunction::Gauss { field, scale_days } => {
            let Some(timestamp) = doc
                .source
                .get(field)
                .and_then(Value::as_str)
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            else {
                return 1.0;
            };
            let distance = (now - timestamp.with_timezone(&Utc)).num_milliseconds().abs() as f64;
            let scale = f64::from(*scale_days) * MILLIS_PER_DAY;
            let variance = -(scale * scale) / (2.0 * GAUSS_DECAY.ln());
            (-(distance * distance) / (2.0 * variance)).exp()
        }
        ScoreFunction::FieldValueFactor { field, factor } => {
            doc.source.get(field).and_then(Value::as_f64).unwrap_or(0.0) * factor
        }
        ScoreFunction::RandomScore { .. } => random_score(doc.seq_no),
    }
}

/// Deterministic score in [0, 1) derived from a sequence number (splitmix64)
fn random_score(seq_no: u64) -> f64 {
    let mut z = seq_no.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^= z >> 31;
    (z >> 11) as f64 / (1u64 << 53) as f64
}

fn term_matches(field: Option<&Value>, expected: &Value) -> bool {
    match field {
        Some(Value::Array(values)) => values.iter().any(|value| scalar_eq(value, expected)),
        Some(value) => scalar_eq(value, expected),
        None => false,
    }
}

fn scalar_eq(value: &Value, expected: &Value) -> bool {
    match (value, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => value == expected,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn field_tokens(field: Option<&Value>) -> Vec<String> {
    match field {
        Some(Value::String(text)) => tokenize(text),
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .flat_map(tokenize)
            .collect(),
        _ => Vec::new(),
    }
}

/// Every term but the last must appear as a word, the last as a word prefix; any one suffices
fn bool_prefix_matches(words: &[String], terms: &[String]) -> bool {
    let Some((last, complete)) = terms.split_last() else {
        return false;
    };
    complete.iter().any(|term| words.contains(term))
        || words.iter().any(|word| word.starts_with(last.as_str()))
}
