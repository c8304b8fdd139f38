//! Pareto dominance between states at the same vertex.

use std::cmp::Ordering;

use crate::routing::State;

/// A quantity a search can minimize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Generalized cost.
    Weight,
    /// Seconds elapsed since the search started.
    Time,
    /// Vehicles boarded.
    Boardings,
    /// Metres walked.
    WalkDistance,
}

impl Criterion {
    fn compare(self, a: &State, b: &State) -> Ordering {
        match self {
            Criterion::Weight => a.weight().total_cmp(&b.weight()),
            Criterion::Time => a.elapsed_seconds().cmp(&b.elapsed_seconds()),
            Criterion::Boardings => a.num_boardings().cmp(&b.num_boardings()),
            Criterion::WalkDistance => a.walk_distance().total_cmp(&b.walk_distance()),
        }
    }
}

/// Decides which states at a vertex are worth keeping.
///
/// States are compared only when they could continue the same way: both
/// off board or on the same trip, travelling in the same street mode, with
/// the same path-parser states. Incomparable states never dominate each
/// other.
///
/// # Examples
///
/// ```
/// use trip_router::routing::{Criterion, DominanceFunction};
///
/// let pareto = DominanceFunction::new(vec![Criterion::Time, Criterion::Boardings]);
/// assert_eq!(pareto.criteria().len(), 2);
/// assert_eq!(DominanceFunction::minimum_weight().criteria(), &[Criterion::Weight]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DominanceFunction {
    criteria: Vec<Criterion>,
}

impl DominanceFunction {
    pub fn new(criteria: Vec<Criterion>) -> Self {
        Self { criteria }
    }

    /// Keep only the lowest-weight state among comparable ones.
    pub fn minimum_weight() -> Self {
        Self::new(vec![Criterion::Weight])
    }

    /// Keep every state that is best at something.
    pub fn pareto() -> Self {
        Self::new(vec![
            Criterion::Weight,
            Criterion::Time,
            Criterion::Boardings,
            Criterion::WalkDistance,
        ])
    }

    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    /// Returns true if `a` and `b` may be ranked against each other.
    pub fn comparable(&self, a: &State, b: &State) -> bool {
        let (da, db) = (a.data(), b.data());
        da.non_transit_mode == db.non_transit_mode
            && da.pattern == db.pattern
            && da.trip == db.trip
            && a.parser_states == b.parser_states
    }

    /// Returns true if `a` is comparable to `b` and no worse in any
    /// criterion.
    pub fn better_or_equal(&self, a: &State, b: &State) -> bool {
        self.comparable(a, b)
            && self
                .criteria
                .iter()
                .all(|c| c.compare(a, b) != Ordering::Greater)
    }

    /// Returns true if `a` is no worse than `b` in every criterion and
    /// strictly better in at least one.
    pub fn dominates(&self, a: &State, b: &State) -> bool {
        self.better_or_equal(a, b)
            && self
                .criteria
                .iter()
                .any(|c| c.compare(a, b) == Ordering::Less)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::spt::tests::state_with;

    #[test]
    fn strictly_better_dominates() {
        let f = DominanceFunction::new(vec![Criterion::Time, Criterion::Boardings]);
        let a = state_with(10.0, 100, 0);
        let b = state_with(10.0, 120, 0);
        assert!(f.dominates(&a, &b));
        assert!(!f.dominates(&b, &a));
    }

    #[test]
    fn trade_offs_do_not_dominate() {
        let f = DominanceFunction::new(vec![Criterion::Time, Criterion::Boardings]);
        let slow_direct = state_with(0.0, 100, 0);
        let fast_with_change = state_with(0.0, 80, 1);
        assert!(!f.dominates(&slow_direct, &fast_with_change));
        assert!(!f.dominates(&fast_with_change, &slow_direct));
    }

    #[test]
    fn equal_states_are_better_or_equal_but_not_dominant() {
        let f = DominanceFunction::minimum_weight();
        let a = state_with(5.0, 10, 0);
        let b = state_with(5.0, 20, 1);
        assert!(f.better_or_equal(&a, &b));
        assert!(f.better_or_equal(&b, &a));
        assert!(!f.dominates(&a, &b));
    }
}
