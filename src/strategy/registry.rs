//! Strategy registry - owns the ordered set of rules and runs them in isolation.

use super::strategies;
use super::{Strategy, StrategyContext, StrategyMetadata, Vote};
use crate::error::{Error, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info};

/// Ordered collection of prediction rules.
///
/// Evaluation order is registration order, which keeps the aggregate
/// deterministic.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

/// Result of running one strategy for one round.
#[derive(Debug)]
pub struct StrategyOutcome {
    /// Strategy name.
    pub name: String,
    /// The vote, or why the strategy could not produce one.
    pub result: Result<Vote>,
}

impl StrategyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in strategy.
    pub fn with_defaults() -> Self {
        Self {
            strategies: strategies::builtin(),
        }
    }

    /// Register a strategy.
    pub fn register<S: Strategy + 'static>(&mut self, strategy: S) -> Result<()> {
        self.register_boxed(Box::new(strategy))
    }

    /// Register an already boxed strategy.
    pub fn register_boxed(&mut self, strategy: Box<dyn Strategy>) -> Result<()> {
        let name = strategy.name().to_string();

        if self.strategies.iter().any(|s| s.name() == name) {
            return Err(Error::invalid_input(format!(
                "Strategy '{}' already registered",
                name
            )));
        }

        info!("Registered strategy: {}", name);
        self.strategies.push(strategy);
        Ok(())
    }

    /// Number of registered strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategy names in evaluation order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Metadata for every registered strategy.
    pub fn metadata(&self) -> Vec<StrategyMetadata> {
        self.strategies.iter().map(|s| s.metadata()).collect()
    }

    /// Run every strategy against `ctx`.
    ///
    /// A strategy below its minimum history gets the fallback vote. A strategy
    /// that errors or panics yields an `Err` outcome; the others are unaffected.
    pub fn evaluate(&self, ctx: &StrategyContext) -> Vec<StrategyOutcome> {
        self.strategies
            .iter()
            .map(|strategy| StrategyOutcome {
                name: strategy.name().to_string(),
                result: Self::evaluate_one(strategy.as_ref(), ctx),
            })
            .collect()
    }

    fn evaluate_one(strategy: &dyn Strategy, ctx: &StrategyContext) -> Result<Vote> {
        if ctx.len() < strategy.min_history() {
            debug!(
                strategy = strategy.name(),
                have = ctx.len(),
                need = strategy.min_history(),
                "not enough history, using fallback vote"
            );
            return Ok(Vote::fallback());
        }

        match panic::catch_unwind(AssertUnwindSafe(|| strategy.evaluate(ctx))) {
            Ok(result) => result.map(|vote| Vote::new(vote.label, vote.confidence)),
            Err(payload) => Err(Error::strategy(
                strategy.name(),
                format!("panicked: {}", panic_message(payload.as_ref())),
            )),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Label;

    #[derive(Debug)]
    struct Fixed(&'static str, usize);

    impl Strategy for Fixed {
        fn name(&self) -> &str {
            self.0
        }

        fn min_history(&self) -> usize {
            self.1
        }

        fn evaluate(&self, _ctx: &StrategyContext) -> Result<Vote> {
            Ok(Vote::new(Label::Low, 80.0))
        }
    }

    #[derive(Debug)]
    struct Panicky;

    impl Strategy for Panicky {
        fn name(&self) -> &str {
            "panicky"
        }

        fn evaluate(&self, _ctx: &StrategyContext) -> Result<Vote> {
            panic!("index out of bounds");
        }
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let mut registry = StrategyRegistry::new();
        registry.register(Fixed("a", 1)).unwrap();
        assert!(registry.register(Fixed("a", 2)).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_min_history_uses_fallback() {
        let mut registry = StrategyRegistry::new();
        registry.register(Fixed("needs_three", 3)).unwrap();

        let ctx = StrategyContext::from_totals(vec![12, 13]);
        let outcomes = registry.evaluate(&ctx);
        assert_eq!(outcomes[0].result.as_ref().unwrap(), &Vote::fallback());

        let ctx = StrategyContext::from_totals(vec![12, 13, 4]);
        let outcomes = registry.evaluate(&ctx);
        assert_eq!(outcomes[0].result.as_ref().unwrap().label, Label::Low);
    }

    #[test]
    fn test_panic_is_isolated() {
        let mut registry = StrategyRegistry::new();
        registry.register(Fixed("before", 1)).unwrap();
        registry.register(Panicky).unwrap();
        registry.register(Fixed("after", 1)).unwrap();

        let outcomes = registry.evaluate(&StrategyContext::from_totals(vec![9]));
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(matches!(outcomes[1].result, Err(Error::Strategy { .. })));
        assert!(outcomes[2].result.is_ok());
    }

    #[test]
    fn test_defaults_have_unique_names() {
        let registry = StrategyRegistry::with_defaults();
        let mut names = registry.names();
        let count = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(count >= 10);
    }

    #[test]
    fn test_metadata_follows_registration_order() {
        let registry = StrategyRegistry::with_defaults();
        let metadata = registry.metadata();
        let names: Vec<&str> = metadata.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, registry.names());

        let imbalance = metadata
            .iter()
            .find(|m| m.name == "frequency_imbalance")
            .unwrap();
        assert_eq!(imbalance.min_history, 10);
        assert!(imbalance.tags.contains(&"frequency".to_string()));

        let empty = StrategyRegistry::new();
        assert!(empty.metadata().is_empty());
    }
}
