//! One communication round.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{Client, ServerModel};
use crate::accounting::CommunicationLedger;
use crate::aggregators::VoteAggregator;
use crate::compression::{CommunicationCost, CompressedUpdate};
use crate::error::SignFlError;
use crate::model::TrainableModel;

/// Summary of a completed round.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    /// Round number.
    pub round: usize,
    /// Clients that uploaded.
    pub participants: usize,
    /// Total upload cost this round.
    pub cost: CommunicationCost,
    /// Coordinates where the vote produced a nonzero direction.
    pub decided: usize,
    /// Coordinates that tied and were left unchanged.
    pub ties: usize,
}

/// Run one round: broadcast, compress, vote, apply.
///
/// 1. Server parameters are pushed to every client.
/// 2. Each client computes and compresses its local gradient.
/// 3. The uploads are majority-voted.
/// 4. The server steps along the consensus.
///
/// Costs are written to `ledger` only once the round has succeeded.
pub fn run_round<M: TrainableModel>(
    server: &mut ServerModel<M>,
    clients: &mut [Client<M>],
    aggregator: &mut VoteAggregator,
    ledger: &mut CommunicationLedger,
    round: usize,
) -> Result<RoundReport, SignFlError> {
    server.send_to(clients)?;

    let uploads = clients
        .iter_mut()
        .map(Client::compute_update)
        .collect::<Result<Vec<_>, _>>()?;

    let (ids, updates): (Vec<String>, Vec<CompressedUpdate>) = uploads
        .iter()
        .map(|u| (u.client_id.clone(), u.update.clone()))
        .unzip();

    let consensus = aggregator.aggregate(&updates, Some(&ids))?;
    server.apply(&consensus)?;

    for upload in &uploads {
        ledger.record(round, upload.client_id.as_str(), upload.cost);
    }

    let decided: usize = consensus
        .tensors()
        .iter()
        .map(|t| t.iter().filter(|&&s| s != 0).count())
        .sum();
    let report = RoundReport {
        round,
        participants: uploads.len(),
        cost: uploads.iter().map(|u| u.cost).sum(),
        decided,
        ties: consensus.element_count() - decided,
    };

    if report.decided == 0 {
        warn!(round, "consensus tied on every coordinate, model unchanged");
    }
    info!(
        round,
        participants = report.participants,
        bits = report.cost.bits,
        element_count = report.cost.element_count,
        decided = report.decided,
        "round complete"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compression::SignCompressor;
    use crate::model::{Batch, LogisticRegression};
    use ndarray::array;

    fn client(
        id: &str,
        features: ndarray::Array2<f32>,
        labels: ndarray::Array1<f32>,
    ) -> Client<LogisticRegression> {
        Client::new(
            id,
            LogisticRegression::new(2),
            Box::new(SignCompressor::new()),
            Batch::new(features, labels).unwrap(),
        )
    }

    #[test]
    fn test_round_updates_server_and_ledger() {
        let mut server = ServerModel::new(LogisticRegression::new(2), 0.1).unwrap();
        let mut clients = vec![
            client("a", array![[1.0, 0.0], [-1.0, 0.0]], array![1.0, 0.0]),
            client("b", array![[2.0, 1.0], [-2.0, -1.0]], array![1.0, 0.0]),
            client("c", array![[0.5, -1.0]], array![1.0]),
        ];
        let mut agg = VoteAggregator::new();
        let mut ledger = CommunicationLedger::new();

        let report = run_round(&mut server, &mut clients, &mut agg, &mut ledger, 0).unwrap();

        assert_eq!(report.participants, 3);
        assert_eq!(report.cost, CommunicationCost::for_elements(9));
        assert_eq!(report.decided + report.ties, 3);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.round_total(0).bits, 9 * 32);
        // Every client pushes w0 up
        assert!(server.model().weights()[0] > 0.0);
    }

    #[test]
    fn test_empty_round_records_nothing() {
        let mut server = ServerModel::new(LogisticRegression::new(2), 0.1).unwrap();
        let mut clients: Vec<Client<LogisticRegression>> = vec![];
        let mut ledger = CommunicationLedger::new();
        let err = run_round(
            &mut server,
            &mut clients,
            &mut VoteAggregator::new(),
            &mut ledger,
            0,
        )
        .unwrap_err();
        assert!(matches!(err, SignFlError::EmptyInput(_)));
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_failing_client_aborts_round() {
        let mut server = ServerModel::new(LogisticRegression::new(2), 0.1).unwrap();
        let mut clients = vec![
            client("a", array![[1.0, 0.0]], array![1.0]),
            Client::new(
                "wide",
                LogisticRegression::new(3),
                Box::new(SignCompressor::new()),
                Batch::new(array![[1.0, 0.0, 0.0]], array![1.0]).unwrap(),
            ),
        ];
        let mut ledger = CommunicationLedger::new();
        let before = server.params();

        assert!(run_round(
            &mut server,
            &mut clients,
            &mut VoteAggregator::new(),
            &mut ledger,
            0
        )
        .is_err());
        assert_eq!(server.params(), before);
        assert!(ledger.is_empty());
    }
}
