//! Coordinate-wise majority vote over sign updates.
//!
//! Each coordinate of the result is the sign of the sum of client votes:
//! +1 if more clients voted +1 than -1, -1 for the reverse, and 0 on an
//! exact tie (zeros abstain). Summation is commutative and associative, so
//! the tally can be built in any order, split across threads, or streamed.

use ndarray::ArrayD;
use rayon::prelude::*;
use tracing::debug;

use crate::compression::{check_shapes, CompressedUpdate};
use crate::error::SignFlError;

/// Running per-coordinate vote tally.
///
/// Feed updates with [`add`](Self::add), combine partial tallies with
/// [`merge`](Self::merge), and read the consensus with
/// [`finish`](Self::finish). The first update fixes the parameter layout.
#[derive(Clone, Debug, Default)]
pub struct VoteAccumulator {
    tallies: Vec<ArrayD<i32>>,
    voters: usize,
}

impl VoteAccumulator {
    /// Create an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of updates counted so far.
    pub fn voters(&self) -> usize {
        self.voters
    }

    /// Per-coordinate vote sums.
    pub fn tallies(&self) -> &[ArrayD<i32>] {
        &self.tallies
    }

    /// Count one client's update.
    ///
    /// # Errors
    ///
    /// Shape errors if `update` is not congruent with earlier votes. The
    /// tally is unchanged on error.
    pub fn add(&mut self, update: &CompressedUpdate) -> Result<(), SignFlError> {
        if self.voters == 0 {
            self.tallies = update
                .tensors()
                .iter()
                .map(|t| t.mapv(i32::from))
                .collect();
        } else {
            self.check_layout(update.tensors().iter().map(|t| t.shape()), update.len())?;
            for (tally, signs) in self.tallies.iter_mut().zip(update.tensors()) {
                tally.zip_mut_with(signs, |t, &s| *t += i32::from(s));
            }
        }
        self.voters += 1;
        Ok(())
    }

    /// Fold another partial tally into this one.
    pub fn merge(&mut self, other: VoteAccumulator) -> Result<(), SignFlError> {
        if other.voters == 0 {
            return Ok(());
        }
        if self.voters == 0 {
            *self = other;
            return Ok(());
        }
        self.check_layout(
            other.tallies.iter().map(|t| t.shape()),
            other.tallies.len(),
        )?;
        for (tally, theirs) in self.tallies.iter_mut().zip(&other.tallies) {
            *tally += theirs;
        }
        self.voters += other.voters;
        Ok(())
    }

    /// Consensus sign per coordinate.
    ///
    /// # Errors
    ///
    /// [`SignFlError::EmptyInput`] if no votes were counted.
    pub fn finish(&self) -> Result<CompressedUpdate, SignFlError> {
        if self.voters == 0 {
            return Err(SignFlError::EmptyInput("no votes to aggregate".into()));
        }
        let tensors = self
            .tallies
            .iter()
            .map(|t| t.mapv(|sum| sum.signum() as i8))
            .collect();
        Ok(CompressedUpdate::from_signs(tensors))
    }

    /// Number of coordinates whose tally is exactly zero.
    pub fn ties(&self) -> usize {
        self.tallies
            .iter()
            .map(|t| t.iter().filter(|&&sum| sum == 0).count())
            .sum()
    }

    fn check_layout<'a>(
        &'a self,
        shapes: impl Iterator<Item = &'a [usize]>,
        len: usize,
    ) -> Result<(), SignFlError> {
        check_shapes(
            self.tallies.iter().map(|t| t.shape()),
            shapes,
            self.tallies.len(),
            len,
        )
    }
}

/// Majority vote across client updates.
///
/// # Arguments
///
/// * `updates` - One compressed update per participating client
///
/// # Errors
///
/// - [`SignFlError::EmptyInput`] if `updates` is empty
/// - [`SignFlError::ParameterCountMismatch`] / [`SignFlError::ShapeMismatch`]
///   if any client's layout differs from the first client's
///
/// # Example
///
/// ```rust
/// use ndarray::array;
/// use signvote_fl::{majority_vote, CompressedUpdate};
///
/// let vote = |v: i8| CompressedUpdate::new(vec![array![v].into_dyn()]).unwrap();
/// let updates = vec![vote(1), vote(1), vote(1), vote(-1), vote(-1)];
///
/// let consensus = majority_vote(&updates).unwrap();
/// assert_eq!(consensus.tensors()[0], array![1i8].into_dyn());
/// ```
pub fn majority_vote(updates: &[CompressedUpdate]) -> Result<CompressedUpdate, SignFlError> {
    let first = updates
        .first()
        .ok_or_else(|| SignFlError::EmptyInput("no client updates to aggregate".into()))?;

    for (client, update) in updates.iter().enumerate().skip(1) {
        first.check_congruent(update).map_err(|e| {
            debug!(client, error = %e, "rejecting incongruent update");
            e.for_client(client)
        })?;
    }

    let tally = updates
        .par_iter()
        .try_fold(VoteAccumulator::new, |mut acc, update| {
            acc.add(update)?;
            Ok::<_, SignFlError>(acc)
        })
        .try_reduce(VoteAccumulator::new, |mut a, b| {
            a.merge(b)?;
            Ok(a)
        })?;

    debug!(
        voters = tally.voters(),
        params = first.len(),
        ties = tally.ties(),
        "majority vote"
    );

    tally.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn single(values: &[i8]) -> CompressedUpdate {
        let tensor = ArrayD::from_shape_vec(vec![values.len()], values.to_vec()).unwrap();
        CompressedUpdate::new(vec![tensor]).unwrap()
    }

    #[test]
    fn test_tie_resolves_to_zero() {
        let result = majority_vote(&[single(&[1]), single(&[-1])]).unwrap();
        assert_eq!(result.tensors()[0], array![0i8].into_dyn());
    }

    #[test]
    fn test_unanimous() {
        let plus = majority_vote(&[single(&[1]), single(&[1]), single(&[1])]).unwrap();
        assert_eq!(plus.tensors()[0], array![1i8].into_dyn());

        let minus = majority_vote(&[single(&[-1]), single(&[-1]), single(&[-1])]).unwrap();
        assert_eq!(minus.tensors()[0], array![-1i8].into_dyn());
    }

    #[test]
    fn test_majority_not_mean() {
        let updates = vec![
            single(&[1]),
            single(&[1]),
            single(&[1]),
            single(&[-1]),
            single(&[-1]),
        ];
        let result = majority_vote(&updates).unwrap();
        assert_eq!(result.tensors()[0], array![1i8].into_dyn());
    }

    #[test]
    fn test_zeros_abstain() {
        // One +1 against two abstentions still wins
        let result = majority_vote(&[single(&[1]), single(&[0]), single(&[0])]).unwrap();
        assert_eq!(result.tensors()[0], array![1i8].into_dyn());

        let result = majority_vote(&[single(&[1]), single(&[-1]), single(&[0])]).unwrap();
        assert_eq!(result.tensors()[0], array![0i8].into_dyn());
    }

    #[test]
    fn test_independent_coordinates() {
        let updates = vec![
            single(&[1, -1, 0]),
            single(&[1, 1, -1]),
            single(&[-1, -1, -1]),
        ];
        let result = majority_vote(&updates).unwrap();
        assert_eq!(result.tensors()[0], array![1i8, -1, -1].into_dyn());
    }

    #[test]
    fn test_empty() {
        assert!(matches!(majority_vote(&[]), Err(SignFlError::EmptyInput(_))));
    }

    #[test]
    fn test_shape_mismatch() {
        let err = majority_vote(&[single(&[1, 0]), single(&[1])]).unwrap_err();
        assert!(err.is_shape_mismatch());
    }

    #[test]
    fn test_parameter_count_mismatch() {
        let two = CompressedUpdate::new(vec![array![1i8].into_dyn(), array![1i8].into_dyn()])
            .unwrap();
        let err = majority_vote(&[single(&[1]), two]).unwrap_err();
        assert_eq!(
            err,
            SignFlError::ParameterCountMismatch {
                client: Some(1),
                expected: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_multi_tensor_shapes_preserved() {
        let a = CompressedUpdate::new(vec![
            array![[1i8, -1], [0, 1]].into_dyn(),
            array![-1i8].into_dyn(),
        ])
        .unwrap();
        let b = CompressedUpdate::new(vec![
            array![[1i8, 1], [-1, 1]].into_dyn(),
            array![-1i8].into_dyn(),
        ])
        .unwrap();
        let result = majority_vote(&[a.clone(), b, a]).unwrap();
        assert_eq!(result.shapes(), vec![vec![2, 2], vec![1]]);
        assert_eq!(result.tensors()[0], array![[1i8, -1], [0, 1]].into_dyn());
        assert_eq!(result.tensors()[1], array![-1i8].into_dyn());
    }

    #[test]
    fn test_accumulator_streaming_matches_batch() {
        let updates = vec![single(&[1, -1, 0, 1]), single(&[-1, -1, 1, 1]), single(&[1, 0, -1, 0])];

        let mut acc = VoteAccumulator::new();
        for u in &updates {
            acc.add(u).unwrap();
        }
        assert_eq!(acc.voters(), 3);
        assert_eq!(acc.finish().unwrap(), majority_vote(&updates).unwrap());
    }

    #[test]
    fn test_accumulator_merge() {
        let updates = vec![single(&[1, -1]), single(&[1, 1]), single(&[-1, -1]), single(&[-1, -1])];

        let mut left = VoteAccumulator::new();
        left.add(&updates[0]).unwrap();
        left.add(&updates[1]).unwrap();
        let mut right = VoteAccumulator::new();
        right.add(&updates[2]).unwrap();
        right.add(&updates[3]).unwrap();

        left.merge(right).unwrap();
        assert_eq!(left.voters(), 4);
        assert_eq!(left.tallies()[0], array![0, -2].into_dyn());
        assert_eq!(left.ties(), 1);
        assert_eq!(left.finish().unwrap(), majority_vote(&updates).unwrap());
    }

    #[test]
    fn test_accumulator_merge_with_empty() {
        let mut acc = VoteAccumulator::new();
        acc.merge(VoteAccumulator::new()).unwrap();
        assert_eq!(acc.voters(), 0);

        let mut other = VoteAccumulator::new();
        other.add(&single(&[-1])).unwrap();
        acc.merge(other).unwrap();
        assert_eq!(acc.finish().unwrap().tensors()[0], array![-1i8].into_dyn());
    }

    #[test]
    fn test_accumulator_rejects_incongruent_without_counting() {
        let mut acc = VoteAccumulator::new();
        acc.add(&single(&[1, 1])).unwrap();
        assert!(acc.add(&single(&[1])).is_err());
        assert_eq!(acc.voters(), 1);
    }

    #[test]
    fn test_accumulator_empty_finish() {
        assert!(matches!(
            VoteAccumulator::new().finish(),
            Err(SignFlError::EmptyInput(_))
        ));
    }
}
