//! Traffic-phase timing analyzer.
//!
//! The analyzer owns all per-direction state for one intersection:
//!
//! - density and vehicle count from the latest frame of each approach
//! - the phase clock (active phase and when it started)
//! - the signal plan (configured green per direction and the latest suggestion)
//!
//! It never reads the wall clock, never talks to a detector and never writes
//! to storage. Callers pass `Instant`s in, hand it detection boxes, and read
//! `AnalyzerStatus` / `Recommendation` values out.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::detect::DetectionBox;
use crate::error::AnalyzerError;
use crate::intersection::{Direction, Phase, PhaseLayout};

pub const DEFAULT_DENSITY_THRESHOLD: f64 = 0.3;
pub const DEFAULT_TOTAL_CYCLE_SECS: u32 = 120;
pub const DEFAULT_MIN_GREEN_SECS: u32 = 20;
pub const DEFAULT_YELLOW_SECS: u32 = 3;
pub const DEFAULT_SIGNIFICANCE_SECS: u32 = 5;
pub const DEFAULT_GREEN_SECS: u32 = 30;

/// Two aggregate densities closer than this are reported as balanced.
const DENSITY_TIE_EPSILON: f64 = 1e-9;

/// Signal timing constants.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Density above which a direction counts as congested.
    pub density_threshold: f64,
    /// Length of one full rotation through all phases.
    pub total_cycle_secs: u32,
    /// Floor applied to every phase's suggested green.
    pub min_green_secs: u32,
    /// Clearance appended after each phase's green.
    pub yellow_secs: u32,
    /// Smallest current/suggested gap worth recommending.
    pub significance_threshold_secs: u32,
    /// Green each direction starts with.
    pub default_green_secs: u32,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            density_threshold: DEFAULT_DENSITY_THRESHOLD,
            total_cycle_secs: DEFAULT_TOTAL_CYCLE_SECS,
            min_green_secs: DEFAULT_MIN_GREEN_SECS,
            yellow_secs: DEFAULT_YELLOW_SECS,
            significance_threshold_secs: DEFAULT_SIGNIFICANCE_SECS,
            default_green_secs: DEFAULT_GREEN_SECS,
        }
    }
}

impl TimingConfig {
    /// Checks the constants against a layout with `phase_count` phases.
    pub fn validate(&self, phase_count: usize) -> Result<()> {
        if !self.density_threshold.is_finite() || self.density_threshold < 0.0 {
            return Err(invalid_config("density threshold must be a non-negative number"));
        }
        if self.yellow_secs == 0 || self.min_green_secs == 0 || self.default_green_secs == 0 {
            return Err(invalid_config(
                "yellow, minimum green and default green times must be positive",
            ));
        }
        if self.significance_threshold_secs == 0 {
            return Err(invalid_config("significance threshold must be at least 1s"));
        }
        let required = phase_count as u64 * (self.min_green_secs as u64 + self.yellow_secs as u64);
        if (self.total_cycle_secs as u64) < required {
            return Err(invalid_config(&format!(
                "cycle of {}s cannot fit {} phases of {}s minimum green plus {}s yellow",
                self.total_cycle_secs, phase_count, self.min_green_secs, self.yellow_secs
            )));
        }
        Ok(())
    }
}

fn invalid_config(message: &str) -> anyhow::Error {
    AnalyzerError::InvalidConfig(message.to_string()).into()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct DirectionState {
    density: f64,
    vehicle_count: usize,
}

/// Configured and suggested green for one direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SignalTiming {
    pub current_green_secs: u32,
    /// Latest computed optimum; `None` until the first computation.
    pub suggested_green_secs: Option<u32>,
}

impl SignalTiming {
    /// Suggested minus current green, once a suggestion exists.
    pub fn difference_secs(&self) -> Option<i64> {
        self.suggested_green_secs
            .map(|suggested| i64::from(suggested) - i64::from(self.current_green_secs))
    }
}

#[derive(Clone, Copy, Debug)]
struct PhaseClock {
    current_phase: Phase,
    phase_start: Instant,
}

/// How a timing result was derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingBasis {
    /// Split of the cycle by density share.
    Proportional,
    /// No traffic observed; current timing returned unchanged.
    NoTraffic,
}

/// Result of `compute_optimal_timing`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimalTiming {
    pub basis: TimingBasis,
    /// Green per phase, in cycle order.
    pub phases: Vec<(Phase, u32)>,
    pub directions: BTreeMap<Direction, u32>,
}

impl OptimalTiming {
    pub fn green_for(&self, direction: Direction) -> Option<u32> {
        self.directions.get(&direction).copied()
    }

    pub fn phase_green(&self, phase: Phase) -> Option<u32> {
        self.phases
            .iter()
            .find(|(candidate, _)| *candidate == phase)
            .map(|(_, secs)| *secs)
    }
}

/// Operator-facing advice produced by `generate_recommendations`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Recommendation {
    IncreaseGreen {
        direction: Direction,
        current_secs: u32,
        suggested_secs: u32,
    },
    DecreaseGreen {
        direction: Direction,
        current_secs: u32,
        suggested_secs: u32,
    },
    PhaseComparison {
        busier: Phase,
        busier_density: f64,
        quieter: Phase,
        quieter_density: f64,
    },
    PhasesBalanced {
        density: f64,
    },
    Congestion {
        direction: Direction,
        density: f64,
        threshold: f64,
    },
    TimingOptimal,
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::IncreaseGreen {
                direction,
                current_secs,
                suggested_secs,
            } => write!(
                f,
                "Increase green time for {} from {}s to {}s",
                direction, current_secs, suggested_secs
            ),
            Recommendation::DecreaseGreen {
                direction,
                current_secs,
                suggested_secs,
            } => write!(
                f,
                "Decrease green time for {} from {}s to {}s",
                direction, current_secs, suggested_secs
            ),
            Recommendation::PhaseComparison {
                busier,
                busier_density,
                quieter,
                quieter_density,
            } => write!(
                f,
                "{} carries more traffic than {} (density {:.3} vs {:.3})",
                busier, quieter, busier_density, quieter_density
            ),
            Recommendation::PhasesBalanced { density } => write!(
                f,
                "Traffic is balanced across phases (density {:.3} each)",
                density
            ),
            Recommendation::Congestion {
                direction,
                density,
                threshold,
            } => write!(
                f,
                "Warning: {} is congested (density {:.3} above {:.3})",
                direction, density, threshold
            ),
            Recommendation::TimingOptimal => f.write_str("Current signal timing is optimal"),
        }
    }
}

/// Per-direction part of `AnalyzerStatus`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectionStatus {
    pub direction: Direction,
    pub phase: Phase,
    pub density: f64,
    pub vehicle_count: usize,
    pub congested: bool,
    pub current_green_secs: u32,
    pub suggested_green_secs: Option<u32>,
}

/// Consistent snapshot of the analyzer for display and logging.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalyzerStatus {
    /// Directions in layout order.
    pub directions: Vec<DirectionStatus>,
    pub current_phase: Phase,
    pub current_directions: Vec<Direction>,
    pub phase_duration_secs: u64,
    pub elapsed_secs: f64,
    pub remaining_secs: f64,
}

impl AnalyzerStatus {
    pub fn direction(&self, direction: Direction) -> Option<&DirectionStatus> {
        self.directions
            .iter()
            .find(|status| status.direction == direction)
    }
}

pub struct TimingAnalyzer {
    config: TimingConfig,
    layout: PhaseLayout,
    states: BTreeMap<Direction, DirectionState>,
    plan: BTreeMap<Direction, SignalTiming>,
    clock: PhaseClock,
}

impl TimingAnalyzer {
    /// Creates an analyzer with zero densities, default green everywhere and
    /// the layout's first phase active from `now`.
    pub fn new(config: TimingConfig, layout: PhaseLayout, now: Instant) -> Result<Self> {
        config.validate(layout.phase_count())?;
        let states = layout
            .directions()
            .map(|direction| (direction, DirectionState::default()))
            .collect();
        let plan = layout
            .directions()
            .map(|direction| {
                (
                    direction,
                    SignalTiming {
                        current_green_secs: config.default_green_secs,
                        suggested_green_secs: None,
                    },
                )
            })
            .collect();
        let clock = PhaseClock {
            current_phase: layout.first_phase(),
            phase_start: now,
        };
        Ok(Self {
            config,
            layout,
            states,
            plan,
            clock,
        })
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn layout(&self) -> &PhaseLayout {
        &self.layout
    }

    fn state(&self, direction: Direction) -> Result<&DirectionState> {
        self.states
            .get(&direction)
            .ok_or_else(|| AnalyzerError::InvalidDirection(direction).into())
    }

    fn timing(&self, direction: Direction) -> Result<&SignalTiming> {
        self.plan
            .get(&direction)
            .ok_or_else(|| AnalyzerError::InvalidDirection(direction).into())
    }

    // -------------------- Density Ingestion --------------------

    /// Replaces the direction's density and vehicle count with the values
    /// measured on one frame, and returns the new density.
    pub fn update_direction_density(
        &mut self,
        direction: Direction,
        detections: &[DetectionBox],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<f64> {
        let state = self
            .states
            .get_mut(&direction)
            .ok_or(AnalyzerError::InvalidDirection(direction))?;
        if frame_width == 0 || frame_height == 0 {
            return Err(AnalyzerError::InvalidFrameDimensions {
                width: frame_width,
                height: frame_height,
            }
            .into());
        }
        let density = if detections.is_empty() {
            0.0
        } else {
            let vehicle_area: f64 = detections.iter().map(|b| b.area() as f64).sum();
            vehicle_area / (frame_width as f64 * frame_height as f64)
        };
        state.density = density;
        state.vehicle_count = detections.len();
        Ok(density)
    }

    pub fn density(&self, direction: Direction) -> Result<f64> {
        Ok(self.state(direction)?.density)
    }

    pub fn vehicle_count(&self, direction: Direction) -> Result<usize> {
        Ok(self.state(direction)?.vehicle_count)
    }

    // -------------------- Congestion Check --------------------

    pub fn is_congested(&self, direction: Direction) -> Result<bool> {
        Ok(self.state(direction)?.density > self.config.density_threshold)
    }

    // -------------------- Phase Clock --------------------

    pub fn current_phase(&self) -> Phase {
        self.clock.current_phase
    }

    /// Green plus yellow of the phase's slowest direction.
    pub fn phase_duration(&self, phase: Phase) -> Duration {
        let longest_green = self
            .layout
            .members(phase)
            .iter()
            .filter_map(|direction| self.plan.get(direction))
            .map(|timing| timing.current_green_secs)
            .max()
            .unwrap_or(0);
        Duration::from_secs(longest_green as u64 + self.config.yellow_secs as u64)
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.clock.phase_start)
    }

    pub fn remaining_time(&self, now: Instant) -> Duration {
        self.phase_duration(self.clock.current_phase)
            .saturating_sub(self.elapsed(now))
    }

    /// Advances to the next phase once the active one has run its full
    /// duration. Returns true when the phase changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let elapsed = self.elapsed(now);
        let duration = self.phase_duration(self.clock.current_phase);
        if elapsed < duration {
            return false;
        }
        let previous = self.clock.current_phase;
        let next = self.layout.next_phase(previous);
        self.clock = PhaseClock {
            current_phase: next,
            phase_start: now,
        };
        log::info!(
            "{} -> {} after {:.1}s ({})",
            previous,
            next,
            elapsed.as_secs_f64(),
            join_directions(self.layout.members(next))
        );
        true
    }

    // -------------------- Optimal Timing --------------------

    fn phase_densities(&self) -> Vec<(Phase, f64)> {
        self.layout
            .phases()
            .map(|phase| {
                let density = self
                    .layout
                    .members(phase)
                    .iter()
                    .filter_map(|direction| self.states.get(direction))
                    .map(|state| state.density)
                    .sum();
                (phase, density)
            })
            .collect()
    }

    /// Splits the cycle across phases by aggregate density and records the
    /// result as the suggested green of every direction.
    ///
    /// Every phase but the last gets `floor(share * available)`; the last
    /// phase takes whatever remains. All phases are floored at the minimum
    /// green, so when a floor kicks in the cycle runs long rather than
    /// shortening another phase.
    pub fn compute_optimal_timing(&mut self) -> OptimalTiming {
        let phase_densities = self.phase_densities();
        let total: f64 = phase_densities.iter().map(|(_, density)| density).sum();

        let timing = if total <= 0.0 {
            log::debug!("no traffic observed; keeping current timing");
            self.current_timing()
        } else {
            self.proportional_timing(&phase_densities, total)
        };

        for (direction, secs) in &timing.directions {
            if let Some(entry) = self.plan.get_mut(direction) {
                entry.suggested_green_secs = Some(*secs);
            }
        }
        timing
    }

    fn current_timing(&self) -> OptimalTiming {
        let phases = self
            .layout
            .phases()
            .map(|phase| {
                let secs = self
                    .layout
                    .members(phase)
                    .iter()
                    .filter_map(|direction| self.plan.get(direction))
                    .map(|timing| timing.current_green_secs)
                    .max()
                    .unwrap_or(self.config.default_green_secs);
                (phase, secs)
            })
            .collect();
        let directions = self
            .plan
            .iter()
            .map(|(direction, timing)| (*direction, timing.current_green_secs))
            .collect();
        OptimalTiming {
            basis: TimingBasis::NoTraffic,
            phases,
            directions,
        }
    }

    fn proportional_timing(&self, phase_densities: &[(Phase, f64)], total: f64) -> OptimalTiming {
        let min_green = self.config.min_green_secs as i64;
        let available = self.config.total_cycle_secs as i64
            - phase_densities.len() as i64 * self.config.yellow_secs as i64;
        let last = phase_densities.len() - 1;

        let mut allocated = 0i64;
        let mut phases = Vec::with_capacity(phase_densities.len());
        for (index, (phase, density)) in phase_densities.iter().enumerate() {
            let proposed = if index < last {
                ((density / total) * available as f64).floor() as i64
            } else {
                available - allocated
            };
            let secs = proposed.max(min_green);
            allocated += secs;
            phases.push((*phase, secs as u32));
        }

        let mut directions = BTreeMap::new();
        for (phase, secs) in &phases {
            for direction in self.layout.members(*phase) {
                directions.insert(*direction, *secs);
            }
        }
        OptimalTiming {
            basis: TimingBasis::Proportional,
            phases,
            directions,
        }
    }

    // -------------------- Recommendations --------------------

    /// Compares the optimum against current timing. Never returns an empty
    /// list: when nothing needs changing the first entry is `TimingOptimal`.
    pub fn generate_recommendations(&mut self) -> Vec<Recommendation> {
        let optimal = self.compute_optimal_timing();
        let significance = self.config.significance_threshold_secs as i64;

        let mut actionable = Vec::new();
        for direction in self.layout.directions() {
            let (Some(timing), Some(suggested)) =
                (self.plan.get(&direction), optimal.green_for(direction))
            else {
                continue;
            };
            let current = timing.current_green_secs;
            let delta = suggested as i64 - current as i64;
            if delta.abs() < significance {
                continue;
            }
            let recommendation = if delta > 0 {
                Recommendation::IncreaseGreen {
                    direction,
                    current_secs: current,
                    suggested_secs: suggested,
                }
            } else {
                Recommendation::DecreaseGreen {
                    direction,
                    current_secs: current,
                    suggested_secs: suggested,
                }
            };
            actionable.push(recommendation);
        }

        let comparison = self.phase_comparison();

        let mut congestion = Vec::new();
        for direction in self.layout.directions() {
            if let Some(state) = self.states.get(&direction) {
                if state.density > self.config.density_threshold {
                    congestion.push(Recommendation::Congestion {
                        direction,
                        density: state.density,
                        threshold: self.config.density_threshold,
                    });
                }
            }
        }

        let mut out = Vec::with_capacity(actionable.len() + congestion.len() + 2);
        if actionable.is_empty() && congestion.is_empty() {
            out.push(Recommendation::TimingOptimal);
        }
        out.extend(actionable);
        out.extend(comparison);
        out.extend(congestion);
        out
    }

    fn phase_comparison(&self) -> Option<Recommendation> {
        let densities = self.phase_densities();
        let total: f64 = densities.iter().map(|(_, density)| density).sum();
        if total <= 0.0 || densities.len() < 2 {
            return None;
        }
        let mut ranked = densities;
        // stable: equal densities keep cycle order
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (busier, busier_density) = ranked[0];
        let (_, runner_up_density) = ranked[1];
        if (busier_density - runner_up_density).abs() <= DENSITY_TIE_EPSILON {
            return Some(Recommendation::PhasesBalanced {
                density: busier_density,
            });
        }
        let (quieter, quieter_density) = ranked[ranked.len() - 1];
        Some(Recommendation::PhaseComparison {
            busier,
            busier_density,
            quieter,
            quieter_density,
        })
    }

    // -------------------- Signal Plan --------------------

    pub fn signal_plan(&self) -> Vec<(Direction, SignalTiming)> {
        self.layout
            .directions()
            .filter_map(|direction| self.plan.get(&direction).map(|timing| (direction, *timing)))
            .collect()
    }

    pub fn current_green(&self, direction: Direction) -> Result<u32> {
        Ok(self.timing(direction)?.current_green_secs)
    }

    pub fn set_current_green(&mut self, direction: Direction, seconds: u32) -> Result<()> {
        let timing = self
            .plan
            .get_mut(&direction)
            .ok_or(AnalyzerError::InvalidDirection(direction))?;
        if seconds == 0 {
            return Err(AnalyzerError::InvalidGreenTime { direction, seconds }.into());
        }
        timing.current_green_secs = seconds;
        Ok(())
    }

    /// Adopts the latest suggestion as the configured green. Returns the
    /// number of directions whose green changed.
    pub fn apply_suggested_timing(&mut self) -> usize {
        let mut changed = 0;
        for (direction, timing) in self.plan.iter_mut() {
            if let Some(suggested) = timing.suggested_green_secs {
                if suggested != timing.current_green_secs {
                    log::info!(
                        "{}: green {}s -> {}s",
                        direction,
                        timing.current_green_secs,
                        suggested
                    );
                    timing.current_green_secs = suggested;
                    changed += 1;
                }
            }
        }
        changed
    }

    // -------------------- Status --------------------

    pub fn get_status(&self, now: Instant) -> AnalyzerStatus {
        let directions = self
            .layout
            .directions()
            .map(|direction| {
                let state = self.states.get(&direction).copied().unwrap_or_default();
                let timing = self.plan.get(&direction).copied().unwrap_or(SignalTiming {
                    current_green_secs: self.config.default_green_secs,
                    suggested_green_secs: None,
                });
                DirectionStatus {
                    direction,
                    phase: self
                        .layout
                        .phase_of(direction)
                        .unwrap_or(self.clock.current_phase),
                    density: state.density,
                    vehicle_count: state.vehicle_count,
                    congested: state.density > self.config.density_threshold,
                    current_green_secs: timing.current_green_secs,
                    suggested_green_secs: timing.suggested_green_secs,
                }
            })
            .collect();
        let phase = self.clock.current_phase;
        AnalyzerStatus {
            directions,
            current_phase: phase,
            current_directions: self.layout.members(phase).to_vec(),
            phase_duration_secs: self.phase_duration(phase).as_secs(),
            elapsed_secs: self.elapsed(now).as_secs_f64(),
            remaining_secs: self.remaining_time(now).as_secs_f64(),
        }
    }
}

pub(crate) fn join_directions(directions: &[Direction]) -> String {
    directions
        .iter()
        .map(|direction| direction.to_string())
        .collect::<Vec<_>>()
        .join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::analyzer_error;

    fn four_way(now: Instant) -> TimingAnalyzer {
        TimingAnalyzer::new(TimingConfig::default(), PhaseLayout::four_way(), now)
            .expect("default analyzer")
    }

    /// One `width`x`height` box on a 100x100 frame.
    fn cover(
        analyzer: &mut TimingAnalyzer,
        direction: Direction,
        width: u32,
        height: u32,
    ) -> Result<f64> {
        let boxes = vec![DetectionBox::new(0, 0, width, height)?];
        analyzer.update_direction_density(direction, &boxes, 100, 100)
    }

    #[test]
    fn density_is_box_area_over_frame_area() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        let boxes = vec![
            DetectionBox::new(0, 0, 40, 20)?,
            DetectionBox::new(50, 50, 10, 10)?,
        ];
        let density = analyzer.update_direction_density(Direction::North, &boxes, 100, 50)?;
        assert_eq!(density, 900.0 / 5000.0);
        assert_eq!(analyzer.density(Direction::North)?, density);
        assert_eq!(analyzer.vehicle_count(Direction::North)?, 2);
        Ok(())
    }

    #[test]
    fn empty_detections_reset_density_to_zero() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::East, 50, 50)?;
        let density = analyzer.update_direction_density(Direction::East, &[], 100, 100)?;
        assert_eq!(density, 0.0);
        assert_eq!(analyzer.vehicle_count(Direction::East)?, 0);
        Ok(())
    }

    #[test]
    fn ingestion_replaces_rather_than_accumulates() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::West, 50, 50)?;
        cover(&mut analyzer, Direction::West, 10, 10)?;
        assert_eq!(analyzer.density(Direction::West)?, 0.01);
        assert_eq!(analyzer.vehicle_count(Direction::West)?, 1);
        Ok(())
    }

    #[test]
    fn overlapping_boxes_are_not_clamped() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        let full = DetectionBox::new(0, 0, 100, 100)?;
        let density =
            analyzer.update_direction_density(Direction::South, &[full, full], 100, 100)?;
        assert_eq!(density, 2.0);
        Ok(())
    }

    #[test]
    fn oversized_boxes_do_not_overflow() -> Result<()> {
        let start = Instant::now();
        let mut analyzer =
            TimingAnalyzer::new(TimingConfig::default(), PhaseLayout::single_road(), start)?;
        let huge = DetectionBox::new(0, 0, u32::MAX, u32::MAX)?;
        let density =
            analyzer.update_direction_density(Direction::Road1, &[huge, huge], 640, 480)?;
        assert!(density.is_finite() && density > 1.0);
        assert_eq!(analyzer.vehicle_count(Direction::Road1)?, 2);
        Ok(())
    }

    #[test]
    fn ingestion_rejects_unknown_direction_and_bad_frames() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        let boxes = vec![DetectionBox::new(0, 0, 10, 10)?];

        let err = analyzer
            .update_direction_density(Direction::Road1, &boxes, 100, 100)
            .unwrap_err();
        assert_eq!(
            analyzer_error(&err),
            Some(&AnalyzerError::InvalidDirection(Direction::Road1))
        );

        let err = analyzer
            .update_direction_density(Direction::North, &boxes, 0, 100)
            .unwrap_err();
        assert_eq!(
            analyzer_error(&err),
            Some(&AnalyzerError::InvalidFrameDimensions {
                width: 0,
                height: 100
            })
        );
        assert_eq!(analyzer.density(Direction::North)?, 0.0);
        Ok(())
    }

    #[test]
    fn congestion_is_strictly_above_threshold() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::North, 30, 100)?;
        assert!(!analyzer.is_congested(Direction::North)?);
        cover(&mut analyzer, Direction::North, 31, 100)?;
        assert!(analyzer.is_congested(Direction::North)?);
        assert!(analyzer.is_congested(Direction::Road2).is_err());
        Ok(())
    }

    #[test]
    fn tick_switches_phase_on_inclusive_boundary() {
        let start = Instant::now();
        let mut analyzer = four_way(start);
        // 30s green + 3s yellow
        let duration = analyzer.phase_duration(Phase::Phase1);
        assert_eq!(duration, Duration::from_secs(33));

        assert!(!analyzer.tick(start + Duration::from_secs(32)));
        assert_eq!(analyzer.current_phase(), Phase::Phase1);

        assert!(analyzer.tick(start + duration));
        assert_eq!(analyzer.current_phase(), Phase::Phase2);
        assert_eq!(analyzer.elapsed(start + duration), Duration::ZERO);

        assert!(analyzer.tick(start + duration * 2));
        assert_eq!(analyzer.current_phase(), Phase::Phase1);
    }

    #[test]
    fn remaining_time_never_negative() {
        let start = Instant::now();
        let analyzer = four_way(start);
        assert_eq!(analyzer.remaining_time(start), Duration::from_secs(33));
        assert_eq!(
            analyzer.remaining_time(start + Duration::from_secs(10)),
            Duration::from_secs(23)
        );
        assert_eq!(
            analyzer.remaining_time(start + Duration::from_secs(500)),
            Duration::ZERO
        );
    }

    #[test]
    fn phase_duration_follows_slowest_member() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        analyzer.set_current_green(Direction::South, 45)?;
        assert_eq!(analyzer.phase_duration(Phase::Phase1), Duration::from_secs(48));
        assert_eq!(analyzer.phase_duration(Phase::Phase2), Duration::from_secs(33));
        Ok(())
    }

    #[test]
    fn busy_north_south_scenario() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::North, 60, 100)?;
        cover(&mut analyzer, Direction::South, 60, 100)?;
        cover(&mut analyzer, Direction::East, 10, 100)?;
        cover(&mut analyzer, Direction::West, 10, 100)?;

        let timing = analyzer.compute_optimal_timing();
        assert_eq!(timing.basis, TimingBasis::Proportional);
        assert_eq!(timing.phase_green(Phase::Phase1), Some(97));
        // 120 - 97 - 6 = 17, floored to the 20s minimum
        assert_eq!(timing.phase_green(Phase::Phase2), Some(20));
        assert_eq!(timing.green_for(Direction::North), Some(97));
        assert_eq!(timing.green_for(Direction::South), Some(97));
        assert_eq!(timing.green_for(Direction::East), Some(20));
        assert_eq!(timing.green_for(Direction::West), Some(20));
        Ok(())
    }

    #[test]
    fn unfloored_split_fills_the_cycle_exactly() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::North, 30, 100)?;
        cover(&mut analyzer, Direction::East, 10, 100)?;

        // 0.75 * 114 = 85.5 -> 85, remainder 29
        let timing = analyzer.compute_optimal_timing();
        let phase1 = timing.phase_green(Phase::Phase1).expect("phase 1");
        let phase2 = timing.phase_green(Phase::Phase2).expect("phase 2");
        assert_eq!((phase1, phase2), (85, 29));
        assert_eq!(phase1 + phase2 + 2 * 3, 120);
        Ok(())
    }

    #[test]
    fn zero_traffic_keeps_current_timing() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        analyzer.set_current_green(Direction::East, 42)?;
        let timing = analyzer.compute_optimal_timing();
        assert_eq!(timing.basis, TimingBasis::NoTraffic);
        assert_eq!(timing.green_for(Direction::North), Some(30));
        assert_eq!(timing.green_for(Direction::East), Some(42));
        assert_eq!(analyzer.current_green(Direction::East)?, 42);
        assert_eq!(analyzer.current_green(Direction::North)?, 30);
        Ok(())
    }

    #[test]
    fn three_phase_deficit_goes_to_last_phase() -> Result<()> {
        let layout = PhaseLayout::new(vec![
            (Phase::Phase1, vec![Direction::North]),
            (Phase::Phase2, vec![Direction::East]),
            (Phase::Phase3, vec![Direction::West]),
        ])?;
        let mut analyzer = TimingAnalyzer::new(TimingConfig::default(), layout, Instant::now())?;
        cover(&mut analyzer, Direction::North, 80, 100)?;
        cover(&mut analyzer, Direction::East, 10, 100)?;
        cover(&mut analyzer, Direction::West, 10, 100)?;

        // available = 120 - 9 = 111; 0.8 * 111 = 88.8 -> 88; 0.1 * 111 = 11.1 -> 20
        let timing = analyzer.compute_optimal_timing();
        assert_eq!(
            timing.phases,
            vec![(Phase::Phase1, 88), (Phase::Phase2, 20), (Phase::Phase3, 20)]
        );
        Ok(())
    }

    #[test]
    fn suggestions_are_uniform_within_a_phase() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::North, 70, 100)?;
        cover(&mut analyzer, Direction::South, 5, 100)?;
        cover(&mut analyzer, Direction::East, 20, 100)?;
        analyzer.compute_optimal_timing();
        let plan: BTreeMap<_, _> = analyzer.signal_plan().into_iter().collect();
        assert_eq!(
            plan[&Direction::North].suggested_green_secs,
            plan[&Direction::South].suggested_green_secs
        );
        assert_eq!(
            plan[&Direction::East].suggested_green_secs,
            plan[&Direction::West].suggested_green_secs
        );
        Ok(())
    }

    #[test]
    fn recommendations_for_busy_north_south() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        cover(&mut analyzer, Direction::North, 60, 100)?;
        cover(&mut analyzer, Direction::South, 60, 100)?;
        cover(&mut analyzer, Direction::East, 10, 100)?;
        cover(&mut analyzer, Direction::West, 10, 100)?;

        let recommendations = analyzer.generate_recommendations();
        assert_eq!(
            recommendations[0],
            Recommendation::IncreaseGreen {
                direction: Direction::North,
                current_secs: 30,
                suggested_secs: 97
            }
        );
        assert_eq!(
            recommendations[2],
            Recommendation::DecreaseGreen {
                direction: Direction::East,
                current_secs: 30,
                suggested_secs: 20
            }
        );
        assert!(recommendations.iter().any(|r| matches!(
            r,
            Recommendation::PhaseComparison {
                busier: Phase::Phase1,
                quieter: Phase::Phase2,
                ..
            }
        )));
        let congested: Vec<_> = recommendations
            .iter()
            .filter_map(|r| match r {
                Recommendation::Congestion { direction, .. } => Some(*direction),
                _ => None,
            })
            .collect();
        assert_eq!(congested, vec![Direction::North, Direction::South]);
        assert!(!recommendations.contains(&Recommendation::TimingOptimal));
        assert_eq!(
            recommendations[0].to_string(),
            "Increase green time for North from 30s to 97s"
        );
        Ok(())
    }

    #[test]
    fn small_differences_are_suppressed() -> Result<()> {
        let mut analyzer = four_way(Instant::now());
        // even split: 57s per phase
        cover(&mut analyzer, Direction::North, 20, 100)?;
        cover(&mut analyzer, Direction::East, 20, 100)?;
        for direction in [
            Direction::North,
            Direction::South,
            Direction::East,
            Direction::West,
        ] {
            analyzer.set_current_green(direction, 53)?;
        }
        assert_eq!(
            analyzer.generate_recommendations(),
            vec![
                Recommendation::TimingOptimal,
                Recommendation::PhasesBalanced { density: 0.2 },
            ]
        );

        // a 5s gap is significant
        analyzer.set_current_green(Direction::East, 52)?;
        let recommendations = analyzer.generate_recommendations();
        assert_eq!(
            recommendations[0],
            Recommendation::IncreaseGreen {
                direction: Direction::East,
                current_secs: 52,
                suggested_secs: 57
            }
        );
        assert!(!recommendations.contains(&Recommendation::TimingOptimal));
        Ok(())
    }

    #[test]
    fn no_traffic_yields_single_optimal_message() {
        let mut analyzer = four_way(Instant::now());
        assert_eq!(
            analyzer.generate_recommendations(),
            vec![Recommendation::TimingOptimal]
        );
    }

    #[test]
    fn apply_suggested_timing_adopts_latest_optimum() -> Result<()> {
        let start = Instant::now();
        let mut analyzer = four_way(start);
        assert_eq!(analyzer.apply_suggested_timing(), 0);

        cover(&mut analyzer, Direction::North, 60, 100)?;
        cover(&mut analyzer, Direction::South, 60, 100)?;
        cover(&mut analyzer, Direction::East, 10, 100)?;
        cover(&mut analyzer, Direction::West, 10, 100)?;
        analyzer.compute_optimal_timing();
        assert_eq!(analyzer.apply_suggested_timing(), 4);
        assert_eq!(analyzer.current_green(Direction::North)?, 97);
        assert_eq!(analyzer.phase_duration(Phase::Phase1), Duration::from_secs(100));
        assert_eq!(analyzer.phase_duration(Phase::Phase2), Duration::from_secs(23));
        Ok(())
    }

    #[test]
    fn set_current_green_validates_input() {
        let mut analyzer = four_way(Instant::now());
        assert!(analyzer.set_current_green(Direction::Road1, 30).is_err());
        let err = analyzer.set_current_green(Direction::North, 0).unwrap_err();
        assert!(matches!(
            analyzer_error(&err),
            Some(AnalyzerError::InvalidGreenTime { .. })
        ));
    }

    #[test]
    fn status_snapshot_reports_active_phase() -> Result<()> {
        let start = Instant::now();
        let mut analyzer = four_way(start);
        cover(&mut analyzer, Direction::East, 50, 100)?;
        let status = analyzer.get_status(start + Duration::from_secs(13));

        assert_eq!(status.current_phase, Phase::Phase1);
        assert_eq!(
            status.current_directions,
            vec![Direction::North, Direction::South]
        );
        assert_eq!(status.phase_duration_secs, 33);
        assert_eq!(status.elapsed_secs, 13.0);
        assert_eq!(status.remaining_secs, 20.0);

        let east = status.direction(Direction::East).expect("east status");
        assert_eq!(east.density, 0.5);
        assert_eq!(east.vehicle_count, 1);
        assert!(east.congested);
        assert_eq!(east.phase, Phase::Phase2);
        assert_eq!(east.suggested_green_secs, None);
        Ok(())
    }

    #[test]
    fn rejects_cycle_too_short_for_layout() {
        let config = TimingConfig {
            total_cycle_secs: 40,
            ..TimingConfig::default()
        };
        assert!(TimingAnalyzer::new(config, PhaseLayout::four_way(), Instant::now()).is_err());
        let config = TimingConfig {
            density_threshold: f64::NAN,
            ..TimingConfig::default()
        };
        assert!(config.validate(2).is_err());
    }
}
