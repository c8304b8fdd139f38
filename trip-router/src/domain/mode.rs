//! Traverse modes and mode sets.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::DomainError;

/// A way of moving along an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraverseMode {
    Walk,
    Bicycle,
    Car,
    Tram,
    Subway,
    Rail,
    Bus,
    Ferry,
}

impl TraverseMode {
    const ALL: [TraverseMode; 8] = [
        TraverseMode::Walk,
        TraverseMode::Bicycle,
        TraverseMode::Car,
        TraverseMode::Tram,
        TraverseMode::Subway,
        TraverseMode::Rail,
        TraverseMode::Bus,
        TraverseMode::Ferry,
    ];

    /// Returns true for scheduled transit modes.
    pub fn is_transit(self) -> bool {
        !self.is_street()
    }

    /// Returns true for modes that move along streets.
    pub fn is_street(self) -> bool {
        matches!(
            self,
            TraverseMode::Walk | TraverseMode::Bicycle | TraverseMode::Car
        )
    }

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Upper-case name as used in requests.
    pub fn as_str(self) -> &'static str {
        match self {
            TraverseMode::Walk => "WALK",
            TraverseMode::Bicycle => "BICYCLE",
            TraverseMode::Car => "CAR",
            TraverseMode::Tram => "TRAM",
            TraverseMode::Subway => "SUBWAY",
            TraverseMode::Rail => "RAIL",
            TraverseMode::Bus => "BUS",
            TraverseMode::Ferry => "FERRY",
        }
    }
}

impl fmt::Display for TraverseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TraverseMode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraverseMode::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| DomainError::UnknownMode(s.to_string()))
    }
}

/// A set of allowed traverse modes.
///
/// # Examples
///
/// ```
/// use trip_router::domain::{TraverseMode, TraverseModeSet};
///
/// let modes: TraverseModeSet = "WALK,TRANSIT".parse().unwrap();
/// assert!(modes.contains(TraverseMode::Walk));
/// assert!(modes.contains(TraverseMode::Bus));
/// assert!(!modes.contains(TraverseMode::Car));
/// assert!(modes.allows_transit());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TraverseModeSet(u16);

impl TraverseModeSet {
    /// The empty set.
    pub fn empty() -> Self {
        Self(0)
    }

    /// Walking only.
    pub fn walk_only() -> Self {
        Self::empty().with(TraverseMode::Walk)
    }

    /// Walking plus every transit mode.
    pub fn walk_and_transit() -> Self {
        TraverseMode::ALL
            .into_iter()
            .filter(|m| m.is_transit())
            .fold(Self::walk_only(), Self::with)
    }

    /// Returns a copy of this set with `mode` added.
    pub fn with(self, mode: TraverseMode) -> Self {
        Self(self.0 | mode.bit())
    }

    /// Returns a copy of this set with `mode` removed.
    pub fn without(self, mode: TraverseMode) -> Self {
        Self(self.0 & !mode.bit())
    }

    pub fn contains(self, mode: TraverseMode) -> bool {
        self.0 & mode.bit() != 0
    }

    /// Returns true if any transit mode is allowed.
    pub fn allows_transit(self) -> bool {
        self.iter().any(TraverseMode::is_transit)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the modes in this set.
    pub fn iter(self) -> impl Iterator<Item = TraverseMode> {
        TraverseMode::ALL.into_iter().filter(move |m| self.contains(*m))
    }

    /// The street mode a search starts in: car, then bicycle, then walk.
    pub fn primary_street_mode(self) -> TraverseMode {
        if self.contains(TraverseMode::Car) {
            TraverseMode::Car
        } else if self.contains(TraverseMode::Bicycle) {
            TraverseMode::Bicycle
        } else {
            TraverseMode::Walk
        }
    }
}

impl fmt::Debug for TraverseModeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromStr for TraverseModeSet {
    type Err = DomainError;

    /// Parse a comma-separated list. `TRANSIT` expands to every transit mode.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut set = Self::empty();
        for name in s.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("TRANSIT") {
                set = TraverseMode::ALL
                    .into_iter()
                    .filter(|m| m.is_transit())
                    .fold(set, Self::with);
            } else {
                set = set.with(name.parse()?);
            }
        }
        Ok(set)
    }
}

impl FromIterator<TraverseMode> for TraverseModeSet {
    fn from_iter<I: IntoIterator<Item = TraverseMode>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl Serialize for TraverseModeSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for TraverseModeSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let modes = Vec::<TraverseMode>::deserialize(deserializer)?;
        Ok(modes.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_modes() {
        assert_eq!("walk".parse::<TraverseMode>().unwrap(), TraverseMode::Walk);
        assert_eq!("RAIL".parse::<TraverseMode>().unwrap(), TraverseMode::Rail);
        assert!("ZEPPELIN".parse::<TraverseMode>().is_err());
    }

    #[test]
    fn transit_expands() {
        let set: TraverseModeSet = "TRANSIT".parse().unwrap();
        assert!(set.contains(TraverseMode::Ferry));
        assert!(!set.contains(TraverseMode::Walk));
        assert_eq!(set.iter().count(), 5);
    }

    #[test]
    fn primary_street_mode_prefers_car() {
        let set: TraverseModeSet = "WALK,BICYCLE,CAR".parse().unwrap();
        assert_eq!(set.primary_street_mode(), TraverseMode::Car);
        assert_eq!(
            TraverseModeSet::walk_only().primary_street_mode(),
            TraverseMode::Walk
        );
    }

    #[test]
    fn with_and_without() {
        let set = TraverseModeSet::walk_only().with(TraverseMode::Bus);
        assert!(set.allows_transit());
        let set = set.without(TraverseMode::Bus);
        assert!(!set.allows_transit());
        assert!(!set.is_empty());
    }

    #[test]
    fn serde_as_list() {
        let set = TraverseModeSet::walk_only().with(TraverseMode::Rail);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"WALK\",\"RAIL\"]");
        let back: TraverseModeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }
}
