// Dashboard summary over a user's readings
use super::reading::WaterReading;
use serde::Serialize;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total_readings: usize,
    pub profiles_tracked: usize,
    pub last_updated: Option<String>,
    pub days_tracked: i64,
    pub average_ph: Option<f64>,
    pub average_temperature: Option<f64>,
    pub latest: Option<WaterReading>,
}

impl Summary {
    /// Readings are expected oldest first, as the store keeps them.
    pub fn of(readings: &[WaterReading]) -> Self {
        let (Some(first), Some(latest)) = (readings.first(), readings.last()) else {
            return Self::empty();
        };

        let total = readings.len();
        let profiles: HashSet<String> = readings.iter().map(|r| r.name.to_lowercase()).collect();

        Self {
            total_readings: total,
            profiles_tracked: profiles.len(),
            last_updated: Some(latest.timestamp.clone()),
            days_tracked: days_between(first, latest),
            average_ph: Some(readings.iter().map(|r| r.ph).sum::<f64>() / total as f64),
            average_temperature: Some(
                readings.iter().map(|r| r.temperature).sum::<f64>() / total as f64,
            ),
            latest: Some(latest.clone()),
        }
    }

    fn empty() -> Self {
        Self {
            total_readings: 0,
            profiles_tracked: 0,
            last_updated: None,
            days_tracked: 0,
            average_ph: None,
            average_temperature: None,
            latest: None,
        }
    }
}

fn days_between(first: &WaterReading, last: &WaterReading) -> i64 {
    match (first.recorded_at(), last.recorded_at()) {
        (Some(start), Some(end)) => (end - start).num_days() + 1,
        _ => 1,
    }
}

/// Case-insensitive profile filter. An empty name keeps everything.
pub fn filter_by_profile<'a>(readings: &'a [WaterReading], name: &str) -> Vec<&'a WaterReading> {
    if name.is_empty() {
        return readings.iter().collect();
    }
    readings.iter().filter(|r| r.is_profile(name)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(name: &str, ph: f64, temperature: f64, timestamp: &str) -> WaterReading {
        WaterReading::with_timestamp(name.to_string(), ph, temperature, 0.0, timestamp.to_string())
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::of(&[]);
        assert_eq!(summary.total_readings, 0);
        assert_eq!(summary.days_tracked, 0);
        assert!(summary.latest.is_none());
    }

    #[test]
    fn test_single_reading_counts_one_day() {
        let summary = Summary::of(&[reading("Tank1", 7.0, 25.0, "2024-01-01 10:00")]);
        assert_eq!(summary.days_tracked, 1);
        assert_eq!(summary.last_updated.as_deref(), Some("2024-01-01 10:00"));
    }

    #[test]
    fn test_multi_day_summary() {
        let readings = vec![
            reading("Tank1", 6.0, 24.0, "2024-01-01 10:00"),
            reading("Reef", 8.0, 26.0, "2024-01-03 09:00:15"),
            reading("Tank1", 7.0, 22.0, "2024-01-05 11:30"),
        ];
        let summary = Summary::of(&readings);

        assert_eq!(summary.total_readings, 3);
        assert_eq!(summary.profiles_tracked, 2);
        assert_eq!(summary.days_tracked, 5);
        assert_eq!(summary.average_ph, Some(7.0));
        assert_eq!(summary.average_temperature, Some(24.0));
        assert_eq!(summary.latest.unwrap().name, "Tank1");
    }

    #[test]
    fn test_profiles_counted_case_insensitively() {
        let readings = vec![
            reading("Tank1", 7.0, 25.0, "2024-01-01 10:00"),
            reading("TANK1", 7.0, 25.0, "2024-01-02 10:00"),
            reading("Reef", 8.0, 26.0, "2024-01-03 10:00"),
        ];
        assert_eq!(Summary::of(&readings).profiles_tracked, 2);
    }

    #[test]
    fn test_unparseable_timestamp_falls_back() {
        let readings = vec![
            reading("Tank1", 7.0, 25.0, "garbage"),
            reading("Tank1", 7.0, 25.0, "2024-01-05 11:30"),
        ];
        assert_eq!(Summary::of(&readings).days_tracked, 1);
    }

    #[test]
    fn test_filter_by_profile() {
        let readings = vec![
            reading("Tank1", 7.0, 25.0, "2024-01-01 10:00"),
            reading("Reef", 8.0, 26.0, "2024-01-02 10:00"),
            reading("tank1", 7.2, 25.5, "2024-01-03 10:00"),
        ];

        assert_eq!(filter_by_profile(&readings, "TANK1").len(), 2);
        assert_eq!(filter_by_profile(&readings, "").len(), 3);
        assert!(filter_by_profile(&readings, "Guppy").is_empty());
    }
}
