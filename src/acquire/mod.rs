//! Strategy chain: try each acquisition method in priority order, fall
//! through to simulated data so a reading always comes back.

use chrono::{DateTime, Utc};
use itertools::Itertools;
use tracing::{debug, warn};

/// Result of one strategy attempt. The chain treats both failure arms
/// the same way: log the reason and move on to the next strategy.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<R> {
    Reading(R),
    Unavailable(String),
    Transient(String),
}

pub trait Strategy {
    type Reading;

    fn label(&self) -> &'static str;

    /// Capability probe, evaluated once when the chain is built.
    fn ready(&self) -> bool {
        true
    }

    /// One acquisition attempt, internal retries included.
    async fn sample(&mut self) -> Outcome<Self::Reading>;
}

/// A reading plus where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquired<R> {
    pub value: R,
    pub source: &'static str,
    pub taken_at: DateTime<Utc>,
}

/// Terminal fallback. The generator is plain data, so exhausting the
/// hardware strategies can never turn into an error.
pub struct Fallback<R> {
    pub label: &'static str,
    pub generate: fn() -> R,
}

pub struct Chain<S: Strategy> {
    strategies: Vec<S>,
    fallback: Fallback<S::Reading>,
}

impl<S: Strategy> Chain<S> {
    pub fn new(candidates: Vec<S>, fallback: Fallback<S::Reading>) -> Self {
        let strategies = candidates
            .into_iter()
            .filter(|strategy| {
                let ready = strategy.ready();
                if !ready {
                    debug!(
                        strategy = strategy.label(),
                        "not usable in this environment, dropped from chain"
                    );
                }
                ready
            })
            .collect();

        Chain {
            strategies,
            fallback,
        }
    }

    pub fn describe(&self) -> String {
        self.strategies
            .iter()
            .map(|strategy| strategy.label())
            .chain(std::iter::once(self.fallback.label))
            .join(", ")
    }

    pub async fn acquire(&mut self) -> Acquired<S::Reading> {
        for strategy in &mut self.strategies {
            match strategy.sample().await {
                Outcome::Reading(value) => {
                    return Acquired {
                        value,
                        source: strategy.label(),
                        taken_at: Utc::now(),
                    }
                }
                Outcome::Unavailable(reason) => {
                    debug!(strategy = strategy.label(), %reason, "unavailable, trying next")
                }
                Outcome::Transient(reason) => {
                    warn!(strategy = strategy.label(), %reason, "read failed, trying next")
                }
            }
        }

        Acquired {
            value: (self.fallback.generate)(),
            source: self.fallback.label,
            taken_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Scripted {
        label: &'static str,
        ready: bool,
        outcomes: Vec<Outcome<u32>>,
        calls: Rc<Cell<usize>>,
    }

    impl Scripted {
        fn new(label: &'static str, outcomes: Vec<Outcome<u32>>) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let scripted = Scripted {
                label,
                ready: true,
                outcomes,
                calls: Rc::clone(&calls),
            };
            (scripted, calls)
        }
    }

    impl Strategy for Scripted {
        type Reading = u32;

        fn label(&self) -> &'static str {
            self.label
        }

        fn ready(&self) -> bool {
            self.ready
        }

        async fn sample(&mut self) -> Outcome<u32> {
            self.calls.set(self.calls.get() + 1);
            self.outcomes.remove(0)
        }
    }

    fn fixed_fallback() -> Fallback<u32> {
        fn seven() -> u32 {
            7
        }
        Fallback {
            label: "simulated",
            generate: seven,
        }
    }

    #[tokio::test]
    async fn first_success_wins() {
        let (first, first_calls) = Scripted::new("one", vec![Outcome::Reading(1)]);
        let (second, second_calls) = Scripted::new("two", vec![Outcome::Reading(2)]);
        let mut chain = Chain::new(vec![first, second], fixed_fallback());

        let acquired = chain.acquire().await;

        assert_eq!(acquired.value, 1);
        assert_eq!(acquired.source, "one");
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[tokio::test]
    async fn failures_roll_to_next_strategy() {
        let (first, _) = Scripted::new("one", vec![Outcome::Transient("checksum".to_string())]);
        let (second, _) = Scripted::new("two", vec![Outcome::Unavailable("gone".to_string())]);
        let (third, _) = Scripted::new("three", vec![Outcome::Reading(3)]);
        let mut chain = Chain::new(vec![first, second, third], fixed_fallback());

        let acquired = chain.acquire().await;

        assert_eq!(acquired.value, 3);
        assert_eq!(acquired.source, "three");
    }

    #[tokio::test]
    async fn empty_chain_falls_back() {
        let mut chain: Chain<Scripted> = Chain::new(Vec::new(), fixed_fallback());

        let acquired = chain.acquire().await;

        assert_eq!(acquired.value, 7);
        assert_eq!(acquired.source, "simulated");
    }

    #[tokio::test]
    async fn exhausted_chain_falls_back() {
        let (first, _) = Scripted::new("one", vec![Outcome::Transient("timeout".to_string())]);
        let (second, _) = Scripted::new("two", vec![Outcome::Transient("timeout".to_string())]);
        let mut chain = Chain::new(vec![first, second], fixed_fallback());

        let acquired = chain.acquire().await;

        assert_eq!(acquired.value, 7);
        assert_eq!(acquired.source, "simulated");
    }

    #[tokio::test]
    async fn unready_candidates_never_sampled() {
        let (mut absent, absent_calls) = Scripted::new("absent", vec![Outcome::Reading(1)]);
        absent.ready = false;
        let (present, _) = Scripted::new("present", vec![Outcome::Reading(2)]);
        let mut chain = Chain::new(vec![absent, present], fixed_fallback());

        let acquired = chain.acquire().await;

        assert_eq!(acquired.value, 2);
        assert_eq!(acquired.source, "present");
        assert_eq!(absent_calls.get(), 0);
    }
}
