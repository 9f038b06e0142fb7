//! Strategy context - the history view handed to strategies.

use crate::state::{HistoryWindow, Label};

/// Context provided to strategies during evaluation.
///
/// Holds private copies of the labels and totals of the retained history,
/// oldest first. Strategies only ever see a shared reference, so evaluation
/// cannot disturb the store or other strategies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyContext {
    labels: Vec<Label>,
    totals: Vec<u8>,
}

impl StrategyContext {
    /// Build a context from parallel label/total sequences.
    pub fn new(labels: Vec<Label>, totals: Vec<u8>) -> Self {
        debug_assert_eq!(labels.len(), totals.len());
        Self { labels, totals }
    }

    /// Build a context from totals alone, deriving labels.
    pub fn from_totals(totals: Vec<u8>) -> Self {
        let labels = totals.iter().map(|&t| Label::from_total(t)).collect();
        Self { labels, totals }
    }

    /// Number of rounds in the context.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All labels, oldest first.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// All totals, oldest first.
    pub fn totals(&self) -> &[u8] {
        &self.totals
    }

    /// The most recent `n` labels (fewer if the history is shorter).
    pub fn recent_labels(&self, n: usize) -> &[Label] {
        &self.labels[self.labels.len().saturating_sub(n)..]
    }

    /// The most recent `n` totals (fewer if the history is shorter).
    pub fn recent_totals(&self, n: usize) -> &[u8] {
        &self.totals[self.totals.len().saturating_sub(n)..]
    }

    pub fn last_label(&self) -> Option<Label> {
        self.labels.last().copied()
    }

    pub fn last_total(&self) -> Option<u8> {
        self.totals.last().copied()
    }

    /// Label of the current run and how many rounds it has lasted.
    pub fn streak(&self) -> Option<(Label, usize)> {
        let last = self.last_label()?;
        let len = self
            .labels
            .iter()
            .rev()
            .take_while(|&&label| label == last)
            .count();
        Some((last, len))
    }

    /// Number of label changes between consecutive rounds in `labels`.
    pub fn flips(labels: &[Label]) -> usize {
        labels.windows(2).filter(|pair| pair[0] != pair[1]).count()
    }

    /// Occurrences of `label` among the most recent `n` rounds.
    pub fn count(&self, label: Label, n: usize) -> usize {
        self.recent_labels(n).iter().filter(|&&l| l == label).count()
    }

    /// Mean of the most recent `n` totals.
    pub fn mean_total(&self, n: usize) -> Option<f64> {
        let recent = self.recent_totals(n);
        if recent.is_empty() {
            return None;
        }
        let sum: u32 = recent.iter().map(|&t| u32::from(t)).sum();
        Some(f64::from(sum) / recent.len() as f64)
    }
}

impl From<&HistoryWindow> for StrategyContext {
    fn from(window: &HistoryWindow) -> Self {
        Self {
            labels: window.events().iter().map(|e| e.label()).collect(),
            totals: window.totals().to_vec(),
        }
    }
}
