//! Path-acceptance automata.
//!
//! A path parser is a finite-state filter over the sequence of edge kinds a
//! path crosses. Every state carries one automaton state per parser; an
//! edge whose terminal has no transition rejects the traversal.

use std::collections::HashMap;
use std::fmt;

/// The alphabet path parsers read: one symbol per edge, in travel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Terminal {
    Street,
    Link,
    Transfer,
    Board,
    Alight,
    Ride,
}

impl Terminal {
    /// The symbol seen when the edge is crossed against the direction of
    /// travel, as arrive-by searches do.
    pub fn reversed(self) -> Self {
        match self {
            Terminal::Board => Terminal::Alight,
            Terminal::Alight => Terminal::Board,
            other => other,
        }
    }
}

/// A deterministic automaton over [`Terminal`]s.
pub trait PathParser: fmt::Debug + Send + Sync {
    fn initial_state(&self) -> usize {
        0
    }

    /// The next automaton state, or `None` to reject the path.
    fn transition(&self, state: usize, terminal: Terminal) -> Option<usize>;

    fn is_accept_state(&self, state: usize) -> bool;
}

/// A path parser described by an explicit transition table.
#[derive(Debug, Clone)]
pub struct DfaPathParser {
    transitions: HashMap<(usize, Terminal), usize>,
    accepting: Vec<usize>,
}

impl DfaPathParser {
    pub fn new(
        transitions: impl IntoIterator<Item = (usize, Terminal, usize)>,
        accepting: impl IntoIterator<Item = usize>,
    ) -> Self {
        Self {
            transitions: transitions
                .into_iter()
                .map(|(from, t, to)| ((from, t), to))
                .collect(),
            accepting: accepting.into_iter().collect(),
        }
    }

    /// Streets and transfers while off board; board, ride, then alight.
    /// A path must end off board.
    ///
    /// # Examples
    ///
    /// ```
    /// use trip_router::routing::{DfaPathParser, PathParser, Terminal};
    ///
    /// let parser = DfaPathParser::basic();
    /// let onboard = parser.transition(0, Terminal::Board).unwrap();
    /// assert!(!parser.is_accept_state(onboard));
    /// assert!(parser.transition(onboard, Terminal::Street).is_none());
    /// assert!(parser.transition(onboard, Terminal::Board).is_none());
    /// let off = parser.transition(onboard, Terminal::Alight).unwrap();
    /// assert!(parser.is_accept_state(off));
    /// ```
    pub fn basic() -> Self {
        const OFF_BOARD: usize = 0;
        const ON_BOARD: usize = 1;
        Self::new(
            [
                (OFF_BOARD, Terminal::Street, OFF_BOARD),
                (OFF_BOARD, Terminal::Link, OFF_BOARD),
                (OFF_BOARD, Terminal::Transfer, OFF_BOARD),
                (OFF_BOARD, Terminal::Board, ON_BOARD),
                (ON_BOARD, Terminal::Ride, ON_BOARD),
                (ON_BOARD, Terminal::Alight, OFF_BOARD),
            ],
            [OFF_BOARD],
        )
    }
}

impl PathParser for DfaPathParser {
    fn transition(&self, state: usize, terminal: Terminal) -> Option<usize> {
        self.transitions.get(&(state, terminal)).copied()
    }

    fn is_accept_state(&self, state: usize) -> bool {
        self.accepting.contains(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(parser: &dyn PathParser, path: &[Terminal]) -> Option<usize> {
        path.iter()
            .try_fold(parser.initial_state(), |s, t| parser.transition(s, *t))
    }

    #[test]
    fn accepts_walk_ride_walk() {
        use Terminal::*;
        let p = DfaPathParser::basic();
        let end = run(&p, &[Street, Link, Board, Ride, Ride, Alight, Link, Street]);
        assert!(end.is_some_and(|s| p.is_accept_state(s)));
    }

    #[test]
    fn rejects_double_boarding() {
        use Terminal::*;
        let p = DfaPathParser::basic();
        assert!(run(&p, &[Link, Board, Board]).is_none());
    }

    #[test]
    fn arrive_by_sequence_reads_the_same() {
        use Terminal::*;
        let p = DfaPathParser::basic();
        let forward = [Street, Link, Board, Ride, Alight, Transfer, Board, Ride, Alight, Link];
        let backward: Vec<Terminal> = forward.iter().rev().map(|t| t.reversed()).collect();
        let end = run(&p, &backward);
        assert!(end.is_some_and(|s| p.is_accept_state(s)));
    }

    #[test]
    fn unfinished_ride_is_not_accepted() {
        use Terminal::*;
        let p = DfaPathParser::basic();
        let end = run(&p, &[Street, Link, Board, Ride]).unwrap();
        assert!(!p.is_accept_state(end));
    }
}
