//! Sign-update aggregation.
//!
//! - [`majority_vote`] - coordinate-wise majority over {-1, 0, +1} votes
//! - [`VoteAccumulator`] - streaming / mergeable vote tally
//! - [`VoteAggregator`] - majority vote plus per-client agreement tracking

pub mod majority_vote;

pub use majority_vote::{majority_vote, VoteAccumulator};

use std::collections::HashMap;

use tracing::debug;

use crate::compression::CompressedUpdate;
use crate::error::SignFlError;

/// Agreement score for clients that have not voted yet.
pub const DEFAULT_AGREEMENT: f32 = 0.5;

/// Weight of the newest round in the agreement moving average.
const AGREEMENT_RATE: f32 = 0.2;

/// High-level majority-vote aggregator.
///
/// Wraps [`majority_vote`] with optional tracking of how often each client's
/// signs agree with the consensus. Sign-flipping or noisy clients drift
/// toward 0, consistent clients toward 1.
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use signvote_fl::{CompressedUpdate, VoteAggregator};
///
/// let vote = |v: [i8; 2]| CompressedUpdate::new(vec![array![v[0], v[1]].into_dyn()]).unwrap();
/// let updates = vec![vote([1, -1]), vote([1, -1]), vote([-1, 1])];
/// let ids: Vec<String> = vec!["a".into(), "b".into(), "flipper".into()];
///
/// let mut agg = VoteAggregator::new();
/// let consensus = agg.aggregate(&updates, Some(&ids)).unwrap();
///
/// assert_eq!(consensus.tensors()[0], array![1i8, -1].into_dyn());
/// assert!(agg.agreement("a") > agg.agreement("flipper"));
/// ```
#[derive(Debug, Default)]
pub struct VoteAggregator {
    agreement: HashMap<String, f32>,
    rounds: usize,
}

impl VoteAggregator {
    /// Create a new aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregate client updates by majority vote.
    ///
    /// # Arguments
    ///
    /// * `updates` - One compressed update per client
    /// * `client_ids` - Optional client identifiers for agreement tracking,
    ///   in the same order as `updates`
    pub fn aggregate(
        &mut self,
        updates: &[CompressedUpdate],
        client_ids: Option<&[String]>,
    ) -> Result<CompressedUpdate, SignFlError> {
        if let Some(ids) = client_ids {
            if ids.len() != updates.len() {
                return Err(SignFlError::ClientIdMismatch {
                    updates: updates.len(),
                    ids: ids.len(),
                });
            }
        }

        let result = majority_vote(updates)?;
        self.rounds += 1;

        if let Some(ids) = client_ids {
            self.update_agreement(ids, updates, &result);
        }

        Ok(result)
    }

    /// Agreement score for a client (default 0.5 for unknown clients).
    pub fn agreement(&self, client_id: &str) -> f32 {
        self.agreement
            .get(client_id)
            .copied()
            .unwrap_or(DEFAULT_AGREEMENT)
    }

    /// Reset all agreement scores.
    pub fn reset_agreement(&mut self) {
        self.agreement.clear();
    }

    /// Number of successful aggregations.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    /// Move each client's score toward the fraction of decided coordinates
    /// where its sign matched the consensus.
    fn update_agreement(
        &mut self,
        client_ids: &[String],
        updates: &[CompressedUpdate],
        result: &CompressedUpdate,
    ) {
        for (id, update) in client_ids.iter().zip(updates) {
            let mut decided = 0usize;
            let mut matched = 0usize;
            for (mine, consensus) in update.tensors().iter().zip(result.tensors()) {
                for (&m, &c) in mine.iter().zip(consensus.iter()) {
                    if c != 0 {
                        decided += 1;
                        if m == c {
                            matched += 1;
                        }
                    }
                }
            }
            // All-tie round carries no signal
            if decided == 0 {
                continue;
            }

            let rate = matched as f32 / decided as f32;
            let score = self.agreement.entry(id.clone()).or_insert(DEFAULT_AGREEMENT);
            *score += AGREEMENT_RATE * (rate - *score);
            debug!(client = %id, rate, score = *score, "agreement updated");
        }
    }
}
