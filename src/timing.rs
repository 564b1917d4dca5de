//! Activation scales, retrieval latency, the recency set, and the clock.
//!
//! Retrieval strength is summarized as an activation: either the raw cosine
//! between query and trace, or its log-odds transform, which makes the
//! latency model behave like classical declarative-memory activation.
//! Latency follows `F·e^(−a)`, capped at the store's maximum time.

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

// Cosine clamps for the log-odds transform: the floor absorbs non-positive
// cosines, the ceiling keeps the transform finite as cosine approaches 1.
const COS_FLOOR: f64 = 1e-6;
const COS_CEIL: f64 = 1.0 - 1e-9;

/// How a winning cosine is converted into an activation (and therefore how
/// `threshold` is interpreted).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationScale {
    /// Activation is the raw cosine similarity.
    #[default]
    Cosine,
    /// Activation is `ln(cos²/(1−cos²))`, clamped near 0 and 1.
    LogOdds,
}

impl ActivationScale {
    /// Convert a cosine into an activation on this scale.
    pub fn activation(&self, cosine: f64) -> f64 {
        match self {
            ActivationScale::Cosine => cosine,
            ActivationScale::LogOdds => cosine_to_logodds(cosine),
        }
    }
}

/// Log-odds transform of a cosine: `ln(cos²/(1−cos²))`.
///
/// Non-positive cosines clamp to the floor; cosines at 1 clamp to the
/// ceiling so the result stays finite.
pub fn cosine_to_logodds(cosine: f64) -> f64 {
    let c = cosine.clamp(COS_FLOOR, COS_CEIL);
    let c2 = c * c;
    (c2 / (1.0 - c2)).ln()
}

/// Inverse of [`cosine_to_logodds`] on (0, 1).
///
/// ```
/// use holomem::timing::{cosine_to_logodds, logodds_to_cosine};
///
/// for c in [0.01, 0.1, 0.5, 0.9, 0.999] {
///     let back = logodds_to_cosine(cosine_to_logodds(c));
///     assert!((back - c).abs() < 1e-9);
/// }
/// ```
pub fn logodds_to_cosine(logodds: f64) -> f64 {
    // numerically stable sigmoid
    let s = 1.0 / (1.0 + (-logodds).exp());
    s.sqrt()
}

/// Reaction time for an activation: `latency·e^(−activation)`, capped at
/// `maximum_time`. An activation of 0 yields exactly `latency`.
pub fn retrieval_latency(latency: f64, activation: f64, maximum_time: f64) -> f64 {
    (latency * (-activation).exp()).min(maximum_time)
}

/// Source of current simulated time, injected by the host engine.
pub trait Clock {
    fn now(&self) -> f64;
}

/// A shared simulated clock for hosts and tests.
///
/// Clones observe the same time, so the host can hold one handle and the
/// store another.
///
/// # Examples
///
/// ```
/// use holomem::{Clock, SimClock};
///
/// let clock = SimClock::new();
/// let store_side = clock.clone();
/// clock.advance(1.5);
/// assert_eq!(store_side.now(), 1.5);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SimClock {
    t: Rc<Cell<f64>>,
}

impl SimClock {
    /// A clock starting at time 0.
    pub fn new() -> Self {
        SimClock::default()
    }

    /// Advance simulated time by `dt`.
    pub fn advance(&self, dt: f64) {
        self.t.set(self.t.get() + dt);
    }

    /// Jump simulated time to `t`.
    pub fn set(&self, t: f64) {
        self.t.set(t);
    }
}

impl Clock for SimClock {
    fn now(&self) -> f64 {
        self.t.get()
    }
}

/// The recency set: a bounded queue of recently recalled value-tokens.
///
/// Each entry expires `time` after insertion; at most `size` entries are
/// resident, oldest evicted first. `require_new` requests skip resident
/// tokens.
#[derive(Clone, Debug, Default)]
pub struct Finst {
    size: usize,
    time: f64,
    entries: VecDeque<(String, f64)>,
}

impl Finst {
    pub fn new(size: usize, time: f64) -> Self {
        Finst {
            size,
            time,
            entries: VecDeque::new(),
        }
    }

    /// Record a recalled token at simulated time `now`.
    pub fn note(&mut self, token: &str, now: f64) {
        if self.size == 0 {
            return;
        }
        self.prune(now);
        self.entries.push_back((token.to_string(), now + self.time));
        while self.entries.len() > self.size {
            self.entries.pop_front();
        }
    }

    /// Whether `token` is still resident at simulated time `now`.
    pub fn contains(&mut self, token: &str, now: f64) -> bool {
        self.prune(now);
        self.entries.iter().any(|(t, _)| t == token)
    }

    /// Resident tokens at simulated time `now`.
    pub fn tokens(&mut self, now: f64) -> Vec<String> {
        self.prune(now);
        self.entries.iter().map(|(t, _)| t.clone()).collect()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    fn prune(&mut self, now: f64) {
        self.entries.retain(|(_, expiry)| *expiry > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latency_of_zero_activation_is_latency_param() {
        assert!((retrieval_latency(0.05, 0.0, 10.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn latency_is_capped() {
        assert_eq!(retrieval_latency(0.05, -40.0, 10.0), 10.0);
    }

    #[test]
    fn higher_activation_is_faster() {
        let slow = retrieval_latency(0.63, 0.1, 10.0);
        let fast = retrieval_latency(0.63, 0.9, 10.0);
        assert!(fast < slow);
    }

    #[test]
    fn logodds_is_monotonic() {
        let mut prev = f64::NEG_INFINITY;
        for i in 1..100 {
            let c = i as f64 / 100.0;
            let l = cosine_to_logodds(c);
            assert!(l > prev);
            prev = l;
        }
    }

    #[test]
    fn logodds_clamps_degenerate_cosines() {
        assert!(cosine_to_logodds(-0.5).is_finite());
        assert!(cosine_to_logodds(0.0).is_finite());
        assert!(cosine_to_logodds(1.0).is_finite());
    }

    #[test]
    fn finst_expires_entries() {
        let mut finst = Finst::new(4, 3.0);
        finst.note("a", 0.0);
        assert!(finst.contains("a", 1.0));
        assert!(!finst.contains("a", 3.5));
    }

    #[test]
    fn finst_evicts_oldest_beyond_capacity() {
        let mut finst = Finst::new(2, 100.0);
        finst.note("a", 0.0);
        finst.note("b", 1.0);
        finst.note("c", 2.0);
        assert!(!finst.contains("a", 2.0));
        assert!(finst.contains("b", 2.0));
        assert!(finst.contains("c", 2.0));
    }

    #[test]
    fn zero_capacity_finst_records_nothing() {
        let mut finst = Finst::new(0, 3.0);
        finst.note("a", 0.0);
        assert!(!finst.contains("a", 0.0));
    }
}
