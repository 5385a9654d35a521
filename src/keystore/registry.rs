//! Active-algorithm registry with an append-only rotation history.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::envelope::AlgorithmId;
use crate::errors::{CipherVaultError, Result};

/// One change of the active algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationEvent {
    pub timestamp: DateTime<Utc>,
    pub from: AlgorithmId,
    pub to: AlgorithmId,
}

/// Which algorithm new envelopes are sealed with, and how it got there.
///
/// `current` always equals the `to` of the last event, or `initial` when
/// nothing has been rotated yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmRegistry {
    initial: AlgorithmId,
    current: AlgorithmId,
    #[serde(default)]
    history: Vec<RotationEvent>,
}

impl Default for AlgorithmRegistry {
    fn default() -> Self {
        Self::new(AlgorithmId::default())
    }
}

impl AlgorithmRegistry {
    pub fn new(initial: AlgorithmId) -> Self {
        Self {
            initial,
            current: initial,
            history: Vec::new(),
        }
    }

    pub fn current(&self) -> AlgorithmId {
        self.current
    }

    pub fn initial(&self) -> AlgorithmId {
        self.initial
    }

    /// Rotation events, oldest first.
    pub fn history(&self) -> &[RotationEvent] {
        &self.history
    }

    /// Make `to` the active algorithm and record the change.
    ///
    /// Rotating to the algorithm that is already active is rejected.
    pub fn rotate(&mut self, to: AlgorithmId) -> Result<RotationEvent> {
        if to == self.current {
            return Err(CipherVaultError::NoOpRotation(to.to_string()));
        }

        let now = Utc::now();
        let timestamp = match self.history.last() {
            Some(last) if now <= last.timestamp => last.timestamp + Duration::microseconds(1),
            _ => now,
        };

        let event = RotationEvent {
            timestamp,
            from: self.current,
            to,
        };
        self.history.push(event.clone());
        self.current = to;
        Ok(event)
    }

    /// Check the registry is internally consistent (used after loading).
    pub fn check_invariants(&self) -> Result<()> {
        let mut expected_from = self.initial;
        for event in &self.history {
            if event.from != expected_from || event.from == event.to {
                return Err(CipherVaultError::Storage(
                    "rotation history is inconsistent".into(),
                ));
            }
            expected_from = event.to;
        }
        if self.current != expected_from {
            return Err(CipherVaultError::Storage(
                "active algorithm does not match rotation history".into(),
            ));
        }
        if self
            .history
            .windows(2)
            .any(|pair| pair[0].timestamp > pair[1].timestamp)
        {
            return Err(CipherVaultError::Storage(
                "rotation history is out of order".into(),
            ));
        }
        Ok(())
    }
}
