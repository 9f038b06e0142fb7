//! Decoded round outcomes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Smallest total that classifies a round as HIGH.
pub const HIGH_THRESHOLD: u8 = 11;

/// Expected mean total of three fair dice.
pub const MIDPOINT: f64 = 10.5;

/// Binary classification of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Label {
    High,
    Low,
}

impl Label {
    /// Classify a dice total.
    pub fn from_total(total: u8) -> Self {
        if total >= HIGH_THRESHOLD {
            Self::High
        } else {
            Self::Low
        }
    }

    /// The other label.
    pub fn opposite(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

/// One resolved round. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutcomeEvent {
    session_id: u64,
    dice: [u8; 3],
    total: u8,
    label: Label,
}

impl OutcomeEvent {
    /// Build an outcome from raw die faces, rejecting faces outside 1..=6.
    pub fn new(session_id: u64, dice: [i64; 3]) -> Result<Self> {
        let mut faces = [0u8; 3];
        for (slot, value) in faces.iter_mut().zip(dice) {
            *slot = match u8::try_from(value) {
                Ok(face @ 1..=6) => face,
                _ => {
                    return Err(Error::decode(format!(
                        "session {session_id}: die face {value} out of range"
                    )));
                }
            };
        }

        let total = faces.iter().sum();
        Ok(Self {
            session_id,
            dice: faces,
            total,
            label: Label::from_total(total),
        })
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn dice(&self) -> [u8; 3] {
        self.dice
    }

    /// Sum of the three faces, 3..=18.
    pub fn total(&self) -> u8 {
        self.total
    }

    pub fn label(&self) -> Label {
        self.label
    }
}
