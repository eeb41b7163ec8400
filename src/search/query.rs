//! Typed search queries and the builder that assembles them from filters

use crate::models::{ItemFilters, UserFilters, Visibility};
use crate::search::document::fields;
use serde::{Serialize, Serializer};
use serde_json::{json, Map, Value};
use uuid::Uuid;

/// The subset of the engine query language this service emits
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,

    /// Exact match on a keyword, boolean or numeric field; arrays match on membership
    Term { field: String, value: Value },

    /// Numeric lower bound
    Range { field: String, gte: f64 },

    /// Analyzed full-text match
    Match { field: String, query: String },

    /// Search-as-you-type match over a field and its 2/3-gram shingle subfields
    BoolPrefix { field: String, query: String },

    Bool(BoolQuery),

    FunctionScore {
        query: Box<Query>,
        functions: Vec<ScoreFunction>,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoolQuery {
    pub filter: Vec<Query>,
    pub must: Vec<Query>,
    pub should: Vec<Query>,
    pub minimum_should_match: Option<u32>,
}

/// Relevance modifiers applied by a function-score query
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreFunction {
    /// Gaussian decay away from now on a date field
    Gauss { field: String, scale_days: u32 },

    /// Linear boost by a numeric field
    FieldValueFactor { field: String, factor: f64 },

    /// Pseudo-random score seeded by a per-document value
    RandomScore { field: String },
}

impl Query {
    pub fn term(field: &str, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Render the query in Elasticsearch's JSON DSL
    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Term { field, value } => json!({ "term": { field: { "value": value } } }),
            Query::Range { field, gte } => json!({ "range": { field: { "gte": gte } } }),
            Query::Match { field, query } => json!({ "match": { field: { "query": query } } }),
            Query::BoolPrefix { field, query } => json!({
                "multi_match": {
                    "query": query,
                    "type": "bool_prefix",
                    "fields": [field, format!("{}._2gram", field), format!("{}._3gram", field)],
                }
            }),
            Query::Bool(bool_query) => {
                let mut body = Map::new();
                for (name, clauses) in [
                    ("filter", &bool_query.filter),
                    ("must", &bool_query.must),
                    ("should", &bool_query.should),
                ] {
                    if !clauses.is_empty() {
                        body.insert(
                            name.to_string(),
                            Value::Array(clauses.iter().map(Query::to_json).collect()),
                        );
                    }
                }
                if let Some(minimum) = bool_query.minimum_should_match {
                    body.insert("minimum_should_match".to_string(), json!(minimum));
                }
                json!({ "bool": body })
            }
            Query::FunctionScore { query, functions } => json!({
                "function_score": {
                    "query": query.to_json(),
                    "functions": functions.iter().map(ScoreFunction::to_json).collect::<Vec<_>>(),
                }
            }),
        }
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl ScoreFunction {
    pub fn to_json(&self) -> Value {
        match self {
            ScoreFunction::Gauss { field, scale_days } => json!({
                "gauss": { field: { "scale": format!("{}d", scale_days) } }
            }),
            ScoreFunction::FieldValueFactor { field, factor } => json!({
                "field_value_factor": { "field": field, "factor": factor }
            }),
            ScoreFunction::RandomScore { field } => json!({
                "random_score": { "field": field }
            }),
        }
    }
}

/// An executable search: query plus pagination window
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    pub from: u64,
    pub size: u64,
}

impl SearchRequest {
    pub fn new(query: Query, from: u64, size: u64) -> Self {
        Self { query, from, size }
    }

    /// Request window for a zero-based page
    pub fn page(query: Query, page: u32, page_size: u32) -> Self {
        Self::new(
            query,
            u64::from(page) * u64::from(page_size),
            u64::from(page_size),
        )
    }

    pub fn to_json(&self) -> Value {
        json!({
            "from": self.from,
            "size": self.size,
            "query": self.query.to_json(),
        })
    }
}

/// Incrementally assembles a search query from filter and ranking choices
///
/// Builders are owned by a single request; every call mutates the builder in place.
pub trait QueryBuilder: Send {
    fn with_owner_filter(&mut self, user_id: Uuid);
    fn with_visible_filter(&mut self, visible: bool);
    fn with_starred_by_user_filter(&mut self, user_id: Uuid);
    fn with_upvoted_by_user_filter(&mut self, user_id: Uuid);
    fn with_success_percentage_filter(&mut self, minimum: f64);
    fn with_title_suggestion(&mut self, title: &str);
    fn with_content_match(&mut self, content: &str);
    /// One relevance clause per tag
    fn with_tags_should(&mut self, tag_ids: &[Uuid]);
    /// One required clause per tag
    fn with_tags_filter(&mut self, tag_ids: &[Uuid]);
    fn with_username_suggestion(&mut self, username: &str);
    fn with_display_name_suggestion(&mut self, display_name: &str);
    fn set_minimum_should_match(&mut self, minimum: u32);
    fn with_time_scoring(&mut self, scale_days: u32);
    fn with_successes_scoring(&mut self, factor: f64);
    fn with_random_scoring(&mut self);
    /// Produce the final query
    fn build(&self) -> Query;
}

/// Default [`QueryBuilder`] producing a bool query, wrapped in a function score when ranked
#[derive(Debug, Clone, Default)]
pub struct BoolQueryBuilder {
    bool_query: BoolQuery,
    functions: Vec<ScoreFunction>,
    minimum_should_match: Option<u32>,
}

impl BoolQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn add_filter(&mut self, query: Query) {
        self.bool_query.filter.push(query);
    }

    fn add_should(&mut self, query: Query) {
        self.bool_query.should.push(query);
    }

    fn autocomplete(&mut self, field: &str, value: &str) {
        self.add_should(Query::BoolPrefix {
            field: field.to_string(),
            query: value.to_string(),
        });
    }
}

impl QueryBuilder for BoolQueryBuilder {
    fn with_owner_filter(&mut self, user_id: Uuid) {
        self.add_filter(Query::term(fields::USER_ID, user_id.to_string()));
    }

    fn with_visible_filter(&mut self, visible: bool) {
        self.add_filter(Query::term(fields::VISIBLE, visible));
    }

    fn with_starred_by_user_filter(&mut self, user_id: Uuid) {
        self.add_filter(Query::term(fields::STARRED_BY_USER, user_id.to_string()));
    }

    fn with_upvoted_by_user_filter(&mut self, user_id: Uuid) {
        self.add_filter(Query::term(fields::UPVOTED_BY_USER, user_id.to_string()));
    }

    fn with_success_percentage_filter(&mut self, minimum: f64) {
        self.add_filter(Query::Range {
            field: fields::SUCCESS_PERCENTAGE.to_string(),
            gte: minimum,
        });
    }

    fn with_title_suggestion(&mut self, title: &str) {
        self.autocomplete(fields::TITLE, title);
    }

    fn with_content_match(&mut self, content: &str) {
        self.add_should(Query::Match {
            field: fields::CONTENT.to_string(),
            query: content.to_string(),
        });
    }

    fn with_tags_should(&mut self, tag_ids: &[Uuid]) {
        for tag_id in tag_ids {
            self.add_should(Query::term(fields::TAGS, tag_id.to_string()));
        }
    }

    fn with_tags_filter(&mut self, tag_ids: &[Uuid]) {
        for tag_id in tag_ids {
            self.add_filter(Query::term(fields::TAGS, tag_id.to_string()));
        }
    }

    fn with_username_suggestion(&mut self, username: &str) {
        self.autocomplete(fields::USERNAME, username);
    }

    fn with_display_name_suggestion(&mut self, display_name: &str) {
        self.autocomplete(fields::DISPLAY_NAME, display_name);
    }

    fn set_minimum_should_match(&mut self, minimum: u32) {
        self.minimum_should_match = Some(minimum);
    }

    fn with_time_scoring(&mut self, scale_days: u32) {
        self.functions.push(ScoreFunction::Gauss {
            field: fields::UPDATED_AT.to_string(),
            scale_days,
        });
    }

    fn with_successes_scoring(&mut self, factor: f64) {
        self.functions.push(ScoreFunction::FieldValueFactor {
            field: fields::NUMBER_OF_SUCCESSES.to_string(),
            factor,
        });
    }

    fn with_random_scoring(&mut self) {
        self.functions.push(ScoreFunction::RandomScore {
            field: "_seq_no".to_string(),
        });
    }

    fn build(&self) -> Query {
        let mut bool_query = self.bool_query.clone();
        // The threshold only applies to should clauses that exist; a browse without text or
        // tag criteria must still match.
        let should = u32::try_from(bool_query.should.len()).unwrap_or(u32::MAX);
        bool_query.minimum_should_match = self
            .minimum_should_match
            .filter(|_| should > 0)
            .map(|minimum| minimum.min(should));

        if self.functions.is_empty() {
            return Query::Bool(bool_query);
        }

        // Filter context does not score, so ranked queries move filters into must.
        let mut scored = bool_query;
        let filters = std::mem::take(&mut scored.filter);
        scored.must.extend(filters);

        Query::FunctionScore {
            query: Box::new(Query::Bool(scored)),
            functions: self.functions.clone(),
        }
    }
}

/// Translate item filters and the requester into clauses
pub fn apply_item_filters<B>(builder: &mut B, filters: &ItemFilters, requester: Uuid)
where
    B: QueryBuilder + ?Sized,
{
    if !filters.tags.is_empty() {
        if filters.match_all_tags {
            builder.with_tags_filter(&filters.tags);
        } else {
            builder.with_tags_should(&filters.tags);
        }
    }

    if let Some(title) = non_blank(&filters.title) {
        builder.with_title_suggestion(title);
    }

    if let Some(content) = non_blank(&filters.content) {
        builder.with_content_match(content);
    }

    if filters.starred {
        builder.with_starred_by_user_filter(requester);
    }

    // Another user's upvotes are private, so this only applies to own or unscoped searches.
    let owner_is_requester = filters.user_id.map_or(true, |owner| owner == requester);
    if filters.only_upvoted && owner_is_requester {
        builder.with_upvoted_by_user_filter(requester);
    }

    if let Some(owner) = filters.user_id {
        builder.with_owner_filter(owner);
    }

    if filters.min_success_percentage > 0.0 {
        builder.with_success_percentage_filter(filters.min_success_percentage);
    }

    let viewing_own = filters.is_viewing_own(requester);
    match filters.visibility {
        Some(Visibility::NotVisible) => builder.with_visible_filter(!viewing_own),
        Some(Visibility::Visible) => builder.with_visible_filter(true),
        Some(Visibility::All) => {}
        None if !viewing_own => builder.with_visible_filter(true),
        None => {}
    }
}

/// Translate user filters into autocomplete clauses
pub fn apply_user_filters<B>(builder: &mut B, filters: &UserFilters)
where
    B: QueryBuilder + ?Sized,
{
    if let Some(username) = non_blank(&filters.username) {
        builder.with_username_suggestion(username);
    }

    if let Some(display_name) = non_blank(&filters.display_name) {
        builder.with_display_name_suggestion(display_name);
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
