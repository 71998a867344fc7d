//! Append-only ledger of per-client communication cost.
//!
//! One record per client per round, so runs can be compared on bits sent
//! as well as on loss.

use serde::{Deserialize, Serialize};

use crate::compression::CommunicationCost;
use crate::error::SignFlError;

/// Cost of one client's upload in one round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostRecord {
    /// Round number (0-indexed).
    pub round: usize,
    /// Client that sent the update.
    pub client_id: String,
    /// Baseline bit cost (`element_count * 32`).
    pub bits: usize,
    /// Number of scalar elements sent.
    pub element_count: usize,
}

impl CostRecord {
    /// Cost as a [`CommunicationCost`].
    pub fn cost(&self) -> CommunicationCost {
        CommunicationCost {
            bits: self.bits,
            element_count: self.element_count,
        }
    }
}

/// Append-only communication ledger.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CommunicationLedger {
    entries: Vec<CostRecord>,
}

impl CommunicationLedger {
    /// Create a new, empty ledger.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Record one client's cost for `round`.
    pub fn record(&mut self, round: usize, client_id: impl Into<String>, cost: CommunicationCost) {
        self.entries.push(CostRecord {
            round,
            client_id: client_id.into(),
            bits: cost.bits,
            element_count: cost.element_count,
        });
    }

    /// Get all entries.
    pub fn entries(&self) -> &[CostRecord] {
        &self.entries
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summed cost of every upload in `round`.
    pub fn round_total(&self, round: usize) -> CommunicationCost {
        self.entries
            .iter()
            .filter(|e| e.round == round)
            .map(CostRecord::cost)
            .sum()
    }

    /// Summed cost of every upload by `client_id`.
    pub fn client_total(&self, client_id: &str) -> CommunicationCost {
        self.entries
            .iter()
            .filter(|e| e.client_id == client_id)
            .map(CostRecord::cost)
            .sum()
    }

    /// Summed cost of the whole run.
    pub fn total(&self) -> CommunicationCost {
        self.entries.iter().map(CostRecord::cost).sum()
    }

    /// Serialize the ledger to JSON.
    pub fn to_json(&self) -> Result<String, SignFlError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Restore a ledger from JSON.
    pub fn from_json(json: &str) -> Result<Self, SignFlError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_record_and_len() {
        let mut ledger = CommunicationLedger::new();
        assert!(ledger.is_empty());

        ledger.record(0, "client_0", CommunicationCost::for_elements(3));

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.entries()[0].bits, 96);
        assert_eq!(ledger.entries()[0].client_id, "client_0");
    }

    #[test]
    fn test_ledger_totals() {
        let mut ledger = CommunicationLedger::new();
        for round in 0..3 {
            for client in 0..4 {
                ledger.record(
                    round,
                    format!("client_{}", client),
                    CommunicationCost::for_elements(10),
                );
            }
        }
        assert_eq!(ledger.round_total(1).element_count, 40);
        assert_eq!(ledger.client_total("client_2").element_count, 30);
        assert_eq!(ledger.total().bits, 12 * 10 * 32);
        assert_eq!(ledger.round_total(7), CommunicationCost::default());
    }

    #[test]
    fn test_ledger_json() {
        let mut ledger = CommunicationLedger::new();
        ledger.record(2, "a", CommunicationCost::for_elements(5));
        let json = ledger.to_json().unwrap();
        let restored = CommunicationLedger::from_json(&json).unwrap();
        assert_eq!(restored.entries(), ledger.entries());
    }
}
