use std::collections::BTreeMap;
use std::fmt;

use crate::intersection::{Direction, Phase};
use crate::record::StatusRecord;

#[derive(Clone, Debug, PartialEq)]
pub struct DirectionSummary {
    pub direction: Direction,
    pub mean_density: f64,
    pub peak_density: f64,
    pub peak_timestamp: f64,
    pub total_vehicles: u64,
}

/// Summary of a recorded session.
#[derive(Clone, Debug, PartialEq)]
pub struct TrafficReport {
    pub first_timestamp: f64,
    pub last_timestamp: f64,
    pub record_count: usize,
    /// In the direction order of the first record.
    pub directions: Vec<DirectionSummary>,
    pub mean_phase_secs: f64,
    pub mean_green_secs: f64,
    pub phase_distribution: BTreeMap<Phase, usize>,
}

impl TrafficReport {
    /// `None` when there is nothing to summarize. `yellow_secs` is subtracted
    /// from the mean phase length to estimate the mean green.
    pub fn from_records(records: &[StatusRecord], yellow_secs: u32) -> Option<Self> {
        let first = records.first()?;

        let directions = first
            .directions
            .iter()
            .map(|s| summarize(s.direction, records))
            .collect();

        let first_timestamp = records
            .iter()
            .map(|r| r.timestamp)
            .fold(f64::INFINITY, f64::min);
        let last_timestamp = records
            .iter()
            .map(|r| r.timestamp)
            .fold(f64::NEG_INFINITY, f64::max);

        let mean_phase_secs = records
            .iter()
            .map(|r| r.current_phase_secs as f64)
            .sum::<f64>()
            / records.len() as f64;

        let mut phase_distribution = BTreeMap::new();
        for record in records {
            *phase_distribution.entry(record.current_phase).or_insert(0) += 1;
        }

        Some(Self {
            first_timestamp,
            last_timestamp,
            record_count: records.len(),
            directions,
            mean_phase_secs,
            mean_green_secs: mean_phase_secs - f64::from(yellow_secs),
            phase_distribution,
        })
    }

    /// Highest vehicle total; ties go to the earliest direction.
    pub fn busiest(&self) -> Option<&DirectionSummary> {
        self.directions.iter().fold(None, |best, candidate| match best {
            Some(b) if b.total_vehicles >= candidate.total_vehicles => Some(b),
            _ => Some(candidate),
        })
    }

    /// Lowest vehicle total; ties go to the earliest direction.
    pub fn least_busy(&self) -> Option<&DirectionSummary> {
        self.directions.iter().fold(None, |best, candidate| match best {
            Some(b) if b.total_vehicles <= candidate.total_vehicles => Some(b),
            _ => Some(candidate),
        })
    }
}

fn summarize(direction: Direction, records: &[StatusRecord]) -> DirectionSummary {
    let mut sum = 0.0;
    let mut samples = 0usize;
    let mut peak: Option<(f64, f64)> = None;
    let mut total_vehicles = 0u64;
    for record in records {
        let Some(sample) = record.sample(direction) else {
            continue;
        };
        sum += sample.density;
        samples += 1;
        total_vehicles += sample.vehicle_count as u64;
        if peak.map_or(true, |(density, _)| sample.density > density) {
            peak = Some((sample.density, record.timestamp));
        }
    }
    let (peak_density, peak_timestamp) = peak.unwrap_or((0.0, 0.0));
    DirectionSummary {
        direction,
        mean_density: if samples == 0 { 0.0 } else { sum / samples as f64 },
        peak_density,
        peak_timestamp,
        total_vehicles,
    }
}

impl fmt::Display for TrafficReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "INTERSECTION TRAFFIC REPORT")?;
        writeln!(f, "{}", "=".repeat(50))?;
        writeln!(
            f,
            "Period: {:.0} to {:.0} ({} samples)",
            self.first_timestamp, self.last_timestamp, self.record_count
        )?;

        writeln!(f)?;
        writeln!(f, "Mean traffic density:")?;
        for d in &self.directions {
            writeln!(f, "  {}: {:.3}", d.direction, d.mean_density)?;
        }

        writeln!(f)?;
        writeln!(f, "Peak traffic:")?;
        for d in &self.directions {
            writeln!(
                f,
                "  {}: {:.0} (density: {:.3})",
                d.direction, d.peak_timestamp, d.peak_density
            )?;
        }

        writeln!(f)?;
        writeln!(f, "Total vehicles:")?;
        for d in &self.directions {
            writeln!(f, "  {}: {}", d.direction, d.total_vehicles)?;
        }

        writeln!(f)?;
        writeln!(f, "Signal timing:")?;
        writeln!(f, "  Mean phase time: {:.1}s", self.mean_phase_secs)?;
        writeln!(f, "  Mean green time: {:.1}s", self.mean_green_secs)?;
        let distribution = self
            .phase_distribution
            .iter()
            .map(|(phase, count)| format!("{}={}", phase, count))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "  Phase distribution: {}", distribution)?;

        if let (Some(busiest), Some(least)) = (self.busiest(), self.least_busy()) {
            writeln!(f)?;
            writeln!(
                f,
                "Busiest direction: {} ({} vehicles)",
                busiest.direction, busiest.total_vehicles
            )?;
            writeln!(
                f,
                "Least busy direction: {} ({} vehicles)",
                least.direction, least.total_vehicles
            )?;
        }
        Ok(())
    }
}
