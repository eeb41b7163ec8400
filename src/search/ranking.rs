//! Sort modes and the scoring functions behind them

use crate::search::query::QueryBuilder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Gaussian scale for recency ranking
pub const NEW_SCALE_DAYS: u32 = 1;

pub const TRENDING_SCALE_DAYS: u32 = 1;

/// Linear factor applied to the success counter
pub const BEST_OF_ALL_TIME_UPVOTE_WEIGHT: f64 = 1.5;

pub const TRENDING_UPVOTE_WEIGHT: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum SortMode {
    /// Recently updated first
    New,
    /// Most upvoted first
    BestOfAllTime,
    /// Recent and upvoted
    Trending,
    /// Stable pseudo-random order
    Random,
}

/// Register the scoring functions of a sort mode; no mode leaves the query unranked
pub fn apply_sorting<B>(builder: &mut B, sorting: Option<SortMode>)
where
    B: QueryBuilder + ?Sized,
{
    match sorting {
        Some(SortMode::New) => builder.with_time_scoring(NEW_SCALE_DAYS),
        Some(SortMode::BestOfAllTime) => {
            builder.with_successes_scoring(BEST_OF_ALL_TIME_UPVOTE_WEIGHT)
        }
        Some(SortMode::Trending) => {
            builder.with_time_scoring(TRENDING_SCALE_DAYS);
            builder.with_successes_scoring(TRENDING_UPVOTE_WEIGHT);
        }
        Some(SortMode::Random) => builder.with_random_scoring(),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::query::{BoolQueryBuilder, Query, ScoreFunction};
    use std::str::FromStr;

    fn functions_for(sorting: Option<SortMode>) -> Vec<ScoreFunction> {
        let mut builder = BoolQueryBuilder::new();
        builder.with_visible_filter(true);
        apply_sorting(&mut builder, sorting);
        match builder.build() {
            Query::FunctionScore { functions, .. } => functions,
            Query::Bool(_) => Vec::new(),
            other => panic!("unexpected query {:?}", other),
        }
    }

    #[test]
    fn test_sort_mode_parsing() {
        assert_eq!(SortMode::from_str("BEST_OF_ALL_TIME").unwrap(), SortMode::BestOfAllTime);
        assert_eq!(SortMode::from_str("trending").unwrap(), SortMode::Trending);
        assert_eq!(SortMode::Random.to_string(), "RANDOM");
    }

    #[test]
    fn test_functions_per_mode() {
        assert!(functions_for(None).is_empty());

        assert_eq!(
            functions_for(Some(SortMode::New)),
            vec![ScoreFunction::Gauss {
                field: "updatedAt".to_string(),
                scale_days: 1
            }]
        );

        let trending = functions_for(Some(SortMode::Trending));
        assert_eq!(trending.len(), 2);
        assert!(matches!(trending[0], ScoreFunction::Gauss { .. }));
        assert!(matches!(
            trending[1],
            ScoreFunction::FieldValueFactor { factor, .. } if factor == 1.5
        ));

        assert!(matches!(
            functions_for(Some(SortMode::Random))[..],
            [ScoreFunction::RandomScore { .. }]
        ));
    }
}
