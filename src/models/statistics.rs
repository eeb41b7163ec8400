use crate::models::{Reaction, Vote};
use serde::{Deserialize, Serialize};

/// Aggregate vote statistics for one item
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    pub number_of_successes: u64,
    pub number_of_failures: u64,
    pub number_of_tries: u64,
    /// Ratio of successes to tries in [0, 1], rounded to two decimals
    pub success_percentage: f64,
}

impl Statistics {
    pub fn from_counts(successes: u64, failures: u64) -> Self {
        let tries = successes + failures;
        Self {
            number_of_successes: successes,
            number_of_failures: failures,
            number_of_tries: tries,
            success_percentage: success_percentage(successes, tries),
        }
    }

    /// Authoritative aggregation over relational reaction rows
    pub fn from_reactions<'a>(reactions: impl IntoIterator<Item = &'a Reaction>) -> Self {
        let (mut successes, mut failures) = (0, 0);
        for reaction in reactions {
            match reaction.vote {
                Vote::None => continue,
                Vote::Upvote => successes += 1,
                Vote::Downvote => failures += 1,
            }
        }
        Self::from_counts(successes, failures)
    }
}

/// `round(successes / tries, 2)`, or 0 when there are no tries
pub fn success_percentage(successes: u64, tries: u64) -> f64 {
    if tries == 0 {
        return 0.0;
    }
    (successes as f64 / tries as f64 * 100.0).round() / 100.0
}
