//! Closed direction and phase model.
//!
//! A `PhaseLayout` assigns every approach of the intersection to exactly one
//! signal phase. Layouts are validated once at construction; after that the
//! analyzer can rely on the partition without re-checking it.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::AnalyzerError;

/// One approach to the intersection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "north")]
    North,
    #[serde(rename = "south")]
    South,
    #[serde(rename = "east")]
    East,
    #[serde(rename = "west")]
    West,
    #[serde(rename = "road_1")]
    Road1,
    #[serde(rename = "road_2")]
    Road2,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::North,
        Direction::South,
        Direction::East,
        Direction::West,
        Direction::Road1,
        Direction::Road2,
    ];

    /// Stable machine key, matching the serialized form.
    pub fn key(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
            Direction::Road1 => "road_1",
            Direction::Road2 => "road_2",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Direction::North => "North",
            Direction::South => "South",
            Direction::East => "East",
            Direction::West => "West",
            Direction::Road1 => "Road 1",
            Direction::Road2 => "Road 2",
        };
        f.write_str(label)
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Direction::ALL
            .into_iter()
            .find(|direction| direction.key() == key)
            .ok_or_else(|| {
                AnalyzerError::InvalidConfig(format!("unknown direction '{}'", s)).into()
            })
    }
}

/// A group of directions that share a green signal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Phase {
    #[serde(rename = "phase1")]
    Phase1,
    #[serde(rename = "phase2")]
    Phase2,
    #[serde(rename = "phase3")]
    Phase3,
    #[serde(rename = "phase4")]
    Phase4,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Phase1, Phase::Phase2, Phase::Phase3, Phase::Phase4];

    pub fn key(self) -> &'static str {
        match self {
            Phase::Phase1 => "phase1",
            Phase::Phase2 => "phase2",
            Phase::Phase3 => "phase3",
            Phase::Phase4 => "phase4",
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Phase::Phase1 => 1,
            Phase::Phase2 => 2,
            Phase::Phase3 => 3,
            Phase::Phase4 => 4,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Phase {}", self.number())
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Phase::ALL
            .into_iter()
            .find(|phase| phase.key() == key)
            .ok_or_else(|| AnalyzerError::InvalidConfig(format!("unknown phase '{}'", s)).into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PhaseGroup {
    phase: Phase,
    members: Vec<Direction>,
}

/// Ordered partition of directions into phases. Phase order is cycle order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseLayout {
    groups: Vec<PhaseGroup>,
}

impl PhaseLayout {
    pub fn new(groups: Vec<(Phase, Vec<Direction>)>) -> Result<Self> {
        if groups.is_empty() {
            return Err(invalid_layout("layout needs at least one phase"));
        }
        let mut seen_phases: Vec<Phase> = Vec::with_capacity(groups.len());
        let mut seen_directions: Vec<Direction> = Vec::new();
        for (phase, members) in &groups {
            if seen_phases.contains(phase) {
                return Err(invalid_layout(&format!("{} listed twice", phase)));
            }
            if members.is_empty() {
                return Err(invalid_layout(&format!("{} has no directions", phase)));
            }
            for direction in members {
                if seen_directions.contains(direction) {
                    return Err(invalid_layout(&format!(
                        "direction {} assigned to more than one phase",
                        direction
                    )));
                }
                seen_directions.push(*direction);
            }
            seen_phases.push(*phase);
        }
        Ok(Self {
            groups: groups
                .into_iter()
                .map(|(phase, members)| PhaseGroup { phase, members })
                .collect(),
        })
    }

    /// North/south share phase 1, east/west share phase 2.
    pub fn four_way() -> Self {
        Self {
            groups: vec![
                PhaseGroup {
                    phase: Phase::Phase1,
                    members: vec![Direction::North, Direction::South],
                },
                PhaseGroup {
                    phase: Phase::Phase2,
                    members: vec![Direction::East, Direction::West],
                },
            ],
        }
    }

    pub fn two_road() -> Self {
        Self {
            groups: vec![
                PhaseGroup {
                    phase: Phase::Phase1,
                    members: vec![Direction::Road1],
                },
                PhaseGroup {
                    phase: Phase::Phase2,
                    members: vec![Direction::Road2],
                },
            ],
        }
    }

    /// Single monitored road, one phase.
    pub fn single_road() -> Self {
        Self {
            groups: vec![PhaseGroup {
                phase: Phase::Phase1,
                members: vec![Direction::Road1],
            }],
        }
    }

    /// Resolves a preset by name (`four_way`, `two_road`, `single_road`).
    pub fn preset(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().replace('-', "_").as_str() {
            "four_way" => Ok(Self::four_way()),
            "two_road" => Ok(Self::two_road()),
            "single_road" => Ok(Self::single_road()),
            other => Err(invalid_layout(&format!("unknown layout preset '{}'", other))),
        }
    }

    pub fn phases(&self) -> impl Iterator<Item = Phase> + '_ {
        self.groups.iter().map(|group| group.phase)
    }

    pub fn phase_count(&self) -> usize {
        self.groups.len()
    }

    pub fn first_phase(&self) -> Phase {
        self.groups[0].phase
    }

    /// All directions in layout order.
    pub fn directions(&self) -> impl Iterator<Item = Direction> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.members.iter().copied())
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.phase_of(direction).is_some()
    }

    pub fn phase_of(&self, direction: Direction) -> Option<Phase> {
        self.groups
            .iter()
            .find(|group| group.members.contains(&direction))
            .map(|group| group.phase)
    }

    pub fn members(&self, phase: Phase) -> &[Direction] {
        self.groups
            .iter()
            .find(|group| group.phase == phase)
            .map(|group| group.members.as_slice())
            .unwrap_or(&[])
    }

    /// Next phase in cycle order; wraps after the last phase.
    pub fn next_phase(&self, phase: Phase) -> Phase {
        let index = self
            .groups
            .iter()
            .position(|group| group.phase == phase)
            .unwrap_or(0);
        self.groups[(index + 1) % self.groups.len()].phase
    }
}

fn invalid_layout(message: &str) -> anyhow::Error {
    AnalyzerError::InvalidLayout(message.to_string()).into()
}
