//! Multimodal trip routing.
//!
//! Searches a street and transit graph for itineraries with A* or
//! Dijkstra, keeping real-time timetables in snapshots that searches read
//! while a single writer thread applies updates.

pub mod config;
pub mod domain;
pub mod graph;
pub mod router;
pub mod routing;
pub mod timetable;
pub mod updater;
pub mod web;
