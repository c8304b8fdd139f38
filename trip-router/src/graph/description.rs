//! JSON network descriptions.
//!
//! A small serde model of streets, stops and timetables that the binary
//! loads at startup. Anything larger belongs in a real import pipeline.

use std::collections::HashMap;
use std::path::Path;

use chrono::{FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::edges::{StreetEdge, TurnRestriction, TurnRestrictionKind};
use super::{FrequencyWindow, Graph, GraphBuilder, GraphError, GraphPatch};
use crate::domain::{
    Coordinate, DistanceLibrary, EdgeId, RouteId, ServiceId, StopId, TraverseMode,
    TraverseModeSet, TripId, VertexId,
};
use crate::timetable::{Trip, TripTimes};

fn yes() -> bool {
    true
}

fn walk() -> TraverseModeSet {
    TraverseModeSet::walk_only()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionDescription {
    pub label: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetDescription {
    /// Label of the starting intersection or stop.
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub name: String,
    /// Defaults to the great-circle distance between the endpoints.
    #[serde(default)]
    pub length_m: Option<f64>,
    #[serde(default = "walk")]
    pub modes: TraverseModeSet,
    /// Also add the same street in the opposite direction.
    #[serde(default = "yes")]
    pub bidirectional: bool,
    #[serde(default = "yes")]
    pub wheelchair_accessible: bool,
    /// Index into `streets` of a street that may not follow this one.
    #[serde(default)]
    pub no_turn_onto: Vec<usize>,
    #[serde(default)]
    pub only_turn_onto: Vec<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopDescription {
    pub id: StopId,
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "yes")]
    pub wheelchair_boarding: bool,
    /// Labels of intersections to link the stop to.
    #[serde(default)]
    pub links: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferDescription {
    pub from: StopId,
    pub to: StopId,
    #[serde(default)]
    pub min_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripDescription {
    pub id: TripId,
    #[serde(default)]
    pub service: Option<ServiceId>,
    pub arrivals: Vec<i32>,
    /// Defaults to the arrival times.
    #[serde(default)]
    pub departures: Option<Vec<i32>>,
    #[serde(default = "yes")]
    pub wheelchair_accessible: bool,
    #[serde(default)]
    pub bikes_allowed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequencyDescription {
    pub trip: TripDescription,
    pub start: i32,
    pub end: i32,
    pub headway: i32,
    #[serde(default)]
    pub exact_times: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternDescription {
    pub route: RouteId,
    pub mode: TraverseMode,
    pub stops: Vec<StopId>,
    #[serde(default)]
    pub trips: Vec<TripDescription>,
    #[serde(default)]
    pub frequencies: Vec<FrequencyDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchDescription {
    /// Index into `streets` of the patched street. Bidirectional streets
    /// are patched both ways.
    pub street: usize,
    #[serde(flatten)]
    pub patch: GraphPatch,
}

/// A whole network: streets, stops, patterns and service calendar.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkDescription {
    /// Offset of the feed's local time from UTC, in seconds.
    #[serde(default)]
    pub utc_offset_secs: i32,
    #[serde(default)]
    pub intersections: Vec<IntersectionDescription>,
    #[serde(default)]
    pub streets: Vec<StreetDescription>,
    #[serde(default)]
    pub stops: Vec<StopDescription>,
    #[serde(default)]
    pub transfers: Vec<TransferDescription>,
    /// Dates on which each service runs.
    #[serde(default)]
    pub services: HashMap<ServiceId, Vec<NaiveDate>>,
    #[serde(default)]
    pub patterns: Vec<PatternDescription>,
    #[serde(default)]
    pub patches: Vec<PatchDescription>,
}

impl NetworkDescription {
    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Build the graph this description describes.
    pub fn build(&self) -> Result<Graph, GraphError> {
        let offset = FixedOffset::east_opt(self.utc_offset_secs)
            .ok_or_else(|| GraphError::InvalidOffset(self.utc_offset_secs))?;
        let mut b = GraphBuilder::new(offset);
        for (service, dates) in &self.services {
            for date in dates {
                b.service(service.clone(), *date);
            }
        }

        let mut labels: HashMap<&str, VertexId> = HashMap::new();
        for i in &self.intersections {
            let v = b.intersection(i.label.clone(), Coordinate::new(i.lat, i.lon)?)?;
            labels.insert(i.label.as_str(), v);
        }
        for s in &self.stops {
            let v = b.stop(s.id.clone(), Coordinate::new(s.lat, s.lon)?, s.wheelchair_boarding)?;
            labels.insert(s.id.as_str(), v);
            for link in &s.links {
                b.link(lookup(&labels, link)?, v)?;
            }
        }

        let streets = self.add_streets(&mut b, &labels)?;
        for t in &self.transfers {
            b.transfer(
                lookup(&labels, t.from.as_str())?,
                lookup(&labels, t.to.as_str())?,
                t.min_time,
            )?;
        }
        for p in &self.patterns {
            let trips = p
                .trips
                .iter()
                .map(|t| trip_times(t, &p.route))
                .collect::<Result<Vec<_>, _>>()?;
            let frequencies = p
                .frequencies
                .iter()
                .map(|f| {
                    let window = FrequencyWindow {
                        start: f.start,
                        end: f.end,
                        headway: f.headway,
                        exact_times: f.exact_times,
                    };
                    trip_times(&f.trip, &p.route).map(|t| (t, window))
                })
                .collect::<Result<Vec<_>, _>>()?;
            b.pattern(p.route.clone(), p.mode, p.stops.clone(), trips, frequencies)?;
        }

        let mut graph = b.build();
        for p in &self.patches {
            let edges = streets
                .get(p.street)
                .ok_or_else(|| GraphError::UnknownLabel(format!("street #{}", p.street)))?;
            for edge in edges.iter().flatten() {
                graph.add_patch(*edge, p.patch.clone())?;
            }
        }
        info!(summary = ?graph.summary(), "built graph from network description");
        Ok(graph)
    }

    /// Adds every street, then its turn restrictions once all edge handles
    /// are known. Returns the forward and, if any, backward edge per street.
    fn add_streets(
        &self,
        b: &mut GraphBuilder,
        labels: &HashMap<&str, VertexId>,
    ) -> Result<Vec<[Option<EdgeId>; 2]>, GraphError> {
        let distance = DistanceLibrary::default();
        let mut built = Vec::with_capacity(self.streets.len());
        for s in &self.streets {
            let from = lookup(labels, &s.from)?;
            let to = lookup(labels, &s.to)?;
            let length = match s.length_m {
                Some(l) => l,
                None => {
                    let at = |v| b.graph().vertex(v).map(|v| v.coordinate());
                    match (at(from), at(to)) {
                        (Some(a), Some(c)) => distance.distance(a, c),
                        _ => return Err(GraphError::MissingVertex(from)),
                    }
                }
            };
            let edge = |s: &StreetDescription| StreetEdge {
                wheelchair_accessible: s.wheelchair_accessible,
                ..StreetEdge::new(s.name.clone(), length, s.modes)
            };
            let forward = b.street(from, to, edge(s))?;
            let backward = s
                .bidirectional
                .then(|| b.street(to, from, edge(s)))
                .transpose()?;
            built.push([Some(forward), backward]);
        }

        for (i, s) in self.streets.iter().enumerate() {
            let restrictions = s
                .no_turn_onto
                .iter()
                .map(|t| (TurnRestrictionKind::No, *t))
                .chain(s.only_turn_onto.iter().map(|t| (TurnRestrictionKind::Only, *t)))
                .map(|(kind, target)| {
                    let to = built
                        .get(target)
                        .and_then(|e| e[0])
                        .ok_or_else(|| GraphError::UnknownLabel(format!("street #{target}")))?;
                    Ok(TurnRestriction { kind, to })
                })
                .collect::<Result<Vec<_>, GraphError>>()?;
            if restrictions.is_empty() {
                continue;
            }
            if let Some(forward) = built[i][0] {
                b.restrict_turns(forward, restrictions)?;
            }
        }
        Ok(built)
    }
}

fn lookup(labels: &HashMap<&str, VertexId>, label: &str) -> Result<VertexId, GraphError> {
    labels
        .get(label)
        .copied()
        .ok_or_else(|| GraphError::UnknownLabel(label.to_string()))
}

fn trip_times(t: &TripDescription, route: &RouteId) -> Result<TripTimes, GraphError> {
    let trip = Trip {
        id: t.id.clone(),
        route: route.clone(),
        service: t.service.clone(),
        wheelchair_accessible: t.wheelchair_accessible,
        bikes_allowed: t.bikes_allowed,
    };
    let departures = t.departures.clone().unwrap_or_else(|| t.arrivals.clone());
    Ok(TripTimes::new(trip, t.arrivals.clone(), departures)?)
}
