//! The routing core: search states, shortest-path trees, heuristics and
//! the Dijkstra and A* drivers.
//!
//! A search reads an immutable [`Graph`](crate::graph::Graph) through a
//! [`RoutingContext`], grows a [`ShortestPathTree`] of [`State`]s, and
//! reads [`GraphPath`]s back out of it.

mod astar;
mod context;
mod dijkstra;
mod editor;
mod error;
pub mod heuristic;
mod parser;
mod path;
mod path_finder;
mod queue;
mod request;
pub mod spt;
mod state;
mod strategy;

#[cfg(test)]
mod astar_tests;

pub use astar::{GenericAStar, SearchOutcome};
pub use context::{RoutingContext, StopDistanceCache};
pub use dijkstra::{DijkstraRun, GenericDijkstra};
pub use editor::StateEditor;
pub use error::SearchError;
pub use heuristic::{
    EuclideanHeuristic, LowerBoundHeuristic, RemainingWeightHeuristic, TrivialHeuristic,
};
pub use parser::{DfaPathParser, PathParser, Terminal};
pub use path::GraphPath;
pub use path_finder::{GraphPathFinder, PathSearchResult};
pub use queue::StateQueue;
pub use request::{HeuristicKind, OptimizeType, RoutingRequest, SptKind};
pub use spt::{
    BasicShortestPathTree, Criterion, DominanceFunction, MultiShortestPathTree, ShortestPathTree,
};
pub use state::{State, StateData};
pub use strategy::{
    MultiTargetTerminationStrategy, SearchTerminationStrategy, SkipEdgeStrategy,
    SkipTraverseResultStrategy,
};
