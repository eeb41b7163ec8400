//! Atomic partial-update scripts for reaction membership sets and counters
//!
//! A [`ReactionScript`] is rendered to Painless for Elasticsearch and can be applied
//! directly to a JSON source by engines that execute scripts in process. Both paths run
//! the same steps in the same order.

use crate::models::{success_percentage, Reaction, Vote};
use crate::search::document::fields;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

const PROLOGUE: &str = r#"
if (ctx._source.starredByUser == null) { ctx._source.starredByUser = []; }
if (ctx._source.upvotedByUser == null) { ctx._source.upvotedByUser = []; }
if (ctx._source.downvotedByUser == null) { ctx._source.downvotedByUser = []; }
if (ctx._source.numberOfFailures == null) { ctx._source.numberOfFailures = 0; }
if (ctx._source.numberOfSuccesses == null) { ctx._source.numberOfSuccesses = 0; }
if (ctx._source.numberOfTries == null) { ctx._source.numberOfTries = 0; }
"#;

const RECOMPUTE_PERCENTAGE: &str = r#"
if (ctx._source.numberOfTries != 0) {
  ctx._source.successPercentage = (double) Math.round((double) ctx._source.numberOfSuccesses / (double) ctx._source.numberOfTries * 100) / 100;
} else {
  ctx._source.successPercentage = 0;
}
"#;

/// One mutation of an item document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    AddStarred,
    RemoveStarred,
    AddUpvoted,
    RemoveUpvoted,
    AddDownvoted,
    RemoveDownvoted,
}

impl ScriptStep {
    fn field(self) -> &'static str {
        match self {
            ScriptStep::AddStarred | ScriptStep::RemoveStarred => fields::STARRED_BY_USER,
            ScriptStep::AddUpvoted | ScriptStep::RemoveUpvoted => fields::UPVOTED_BY_USER,
            ScriptStep::AddDownvoted | ScriptStep::RemoveDownvoted => fields::DOWNVOTED_BY_USER,
        }
    }

    /// Outcome counter touched by the step, if any
    fn counter(self) -> Option<&'static str> {
        match self {
            ScriptStep::AddUpvoted | ScriptStep::RemoveUpvoted => Some(fields::NUMBER_OF_SUCCESSES),
            ScriptStep::AddDownvoted | ScriptStep::RemoveDownvoted => {
                Some(fields::NUMBER_OF_FAILURES)
            }
            ScriptStep::AddStarred | ScriptStep::RemoveStarred => None,
        }
    }

    fn is_add(self) -> bool {
        matches!(
            self,
            ScriptStep::AddStarred | ScriptStep::AddUpvoted | ScriptStep::AddDownvoted
        )
    }

    fn painless(self) -> String {
        let field = self.field();
        let Some(counter) = self.counter() else {
            return if self.is_add() {
                // Appends without a membership check.
                format!("ctx._source.{field}.add(params.{field});\n")
            } else {
                format!(
                    "for (int i = ctx._source.{field}.size() - 1; i >= 0; i--) {{\n  \
                     if (ctx._source.{field}[i] == params.{field}) {{ ctx._source.{field}.remove(i); }}\n}}\n"
                )
            };
        };

        if self.is_add() {
            format!(
                "ctx._source.{field}.add(params.{field});\n\
                 ctx._source.{counter} += 1;\n\
                 ctx._source.numberOfTries += 1;\n{RECOMPUTE_PERCENTAGE}"
            )
        } else {
            format!(
                "for (int i = ctx._source.{field}.size() - 1; i >= 0; i--) {{\n  \
                 if (ctx._source.{field}[i] == params.{field}) {{\n    \
                 ctx._source.{field}.remove(i);\n    \
                 ctx._source.{counter} -= 1;\n    \
                 ctx._source.numberOfTries -= 1;\n{RECOMPUTE_PERCENTAGE}  }}\n}}\n"
            )
        }
    }
}

/// Atomic update of one item document for one user's reaction change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReactionScript {
    steps: Vec<ScriptStep>,
    params: BTreeMap<String, String>,
}

impl ReactionScript {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, step: ScriptStep, user_id: Uuid) -> &mut Self {
        self.params
            .insert(step.field().to_string(), user_id.to_string());
        self.steps.push(step);
        self
    }

    pub fn add_starred_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::AddStarred, user_id)
    }

    pub fn remove_starred_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::RemoveStarred, user_id)
    }

    pub fn add_upvoted_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::AddUpvoted, user_id)
    }

    pub fn remove_upvoted_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::RemoveUpvoted, user_id)
    }

    pub fn add_downvoted_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::AddDownvoted, user_id)
    }

    pub fn remove_downvoted_by_user(&mut self, user_id: Uuid) -> &mut Self {
        self.push(ScriptStep::RemoveDownvoted, user_id)
    }

    /// Script for a reaction transition: star change, then the new vote, then the old vote
    pub fn for_transition(user_id: Uuid, old: &Reaction, new: &Reaction) -> Self {
        let mut script = Self::new();

        if old.starred != new.starred {
            if new.starred {
                script.add_starred_by_user(user_id);
            } else {
                script.remove_starred_by_user(user_id);
            }
        }

        if old.vote != new.vote {
            match new.vote {
                Vote::Upvote => {
                    script.add_upvoted_by_user(user_id);
                }
                Vote::Downvote => {
                    script.add_downvoted_by_user(user_id);
                }
                Vote::None => {}
            }
            match old.vote {
                Vote::Upvote => {
                    script.remove_upvoted_by_user(user_id);
                }
                Vote::Downvote => {
                    script.remove_downvoted_by_user(user_id);
                }
                Vote::None => {}
            }
        }

        script
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Painless source: the null-guard prologue followed by one fragment per step
    pub fn source(&self) -> String {
        let mut source = String::from(PROLOGUE);
        for step in &self.steps {
            source.push_str(&step.painless());
        }
        source
    }

    /// Body for the engine's scripted update endpoint
    pub fn to_json(&self) -> Value {
        json!({
            "script": {
                "lang": "painless",
                "source": self.source(),
                "params": self.params,
            }
        })
    }

    /// Execute the steps against a document source in process
    pub fn apply(&self, source: &mut Map<String, Value>) {
        for field in [
            fields::STARRED_BY_USER,
            fields::UPVOTED_BY_USER,
            fields::DOWNVOTED_BY_USER,
        ] {
            if source.get(field).map_or(true, Value::is_null) {
                source.insert(field.to_string(), json!([]));
            }
        }
        for field in [
            fields::NUMBER_OF_FAILURES,
            fields::NUMBER_OF_SUCCESSES,
            fields::NUMBER_OF_TRIES,
        ] {
            if source.get(field).map_or(true, Value::is_null) {
                source.insert(field.to_string(), json!(0));
            }
        }

        for step in &self.steps {
            let field = step.field();
            let Some(param) = self.params.get(field) else {
                continue;
            };

            if step.is_add() {
                push_member(source, field, param);
                if let Some(counter) = step.counter() {
                    adjust(source, counter, 1);
                    adjust(source, fields::NUMBER_OF_TRIES, 1);
                    recompute_percentage(source);
                }
                continue;
            }

            let removed = remove_members(source, field, param);
            if let Some(counter) = step.counter() {
                for _ in 0..removed {
                    adjust(source, counter, -1);
                    adjust(source, fields::NUMBER_OF_TRIES, -1);
                    recompute_percentage(source);
                }
            }
        }
    }
}

fn push_member(source: &mut Map<String, Value>, field: &str, member: &str) {
    if let Some(Value::Array(members)) = source.get_mut(field) {
        members.push(Value::String(member.to_string()));
    }
}

fn remove_members(source: &mut Map<String, Value>, field: &str, member: &str) -> usize {
    match source.get_mut(field) {
        Some(Value::Array(members)) => {
            let before = members.len();
            members.retain(|value| value.as_str() != Some(member));
            before - members.len()
        }
        _ => 0,
    }
}

fn counter(source: &Map<String, Value>, field: &str) -> u64 {
    source.get(field).and_then(Value::as_u64).unwrap_or(0)
}

fn adjust(source: &mut Map<String, Value>, field: &str, delta: i64) {
    let current = counter(source, field);
    let next = if delta >= 0 {
        current.saturating_add(delta.unsigned_abs())
    } else {
        current.saturating_sub(delta.unsigned_abs())
    };
    source.insert(field.to_string(), json!(next));
}

fn recompute_percentage(source: &mut Map<String, Value>) {
    let percentage = success_percentage(
        counter(source, fields::NUMBER_OF_SUCCESSES),
        counter(source, fields::NUMBER_OF_TRIES),
    );
    source.insert(fields::SUCCESS_PERCENTAGE.to_string(), json!(percentage));
}
