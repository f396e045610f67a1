use std::time::Duration;

/// Outcome of one committed batch
#[derive(Debug, Clone, Copy)]
pub struct BatchEvent {
    pub rows: u64,
    pub duration: Duration,
}

/// Statistics aggregated over the batches of a run
#[derive(Debug, Default, Clone)]
pub struct IngestStats {
    pub batches: usize,
    pub rows: u64,
    pub batch_durations_ms: Vec<u64>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a committed batch
    pub fn record(&mut self, event: &BatchEvent) {
        self.batches += 1;
        self.rows += event.rows;
        self.batch_durations_ms
            .push(event.duration.as_millis().min(u64::MAX as u128) as u64);
    }

    /// Calculate percentile from batch durations
    pub fn percentile(&self, p: f64) -> Option<u64> {
        if self.batch_durations_ms.is_empty() {
            return None;
        }

        let mut sorted = self.batch_durations_ms.clone();
        sorted.sort_unstable();

        let index = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
        let index = index.saturating_sub(1).min(sorted.len() - 1);

        Some(sorted[index])
    }

    /// Get p50, p90, p99 percentiles
    pub fn get_percentiles(&self) -> (Option<u64>, Option<u64>, Option<u64>) {
        (
            self.percentile(50.0),
            self.percentile(90.0),
            self.percentile(99.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(rows: u64, ms: u64) -> BatchEvent {
        BatchEvent {
            rows,
            duration: Duration::from_millis(ms),
        }
    }

    #[test]
    fn test_record_accumulates() {
        let mut stats = IngestStats::new();
        stats.record(&event(100_000, 1200));
        stats.record(&event(100_000, 900));
        stats.record(&event(50_000, 400));

        assert_eq!(stats.batches, 3);
        assert_eq!(stats.rows, 250_000);
        assert_eq!(stats.batch_durations_ms, vec![1200, 900, 400]);
    }

    #[test]
    fn test_percentiles() {
        let mut stats = IngestStats::new();
        assert_eq!(stats.get_percentiles(), (None, None, None));

        for ms in 1..=100 {
            stats.record(&event(1, ms));
        }

        assert_eq!(stats.percentile(50.0), Some(50));
        assert_eq!(stats.percentile(90.0), Some(90));
        assert_eq!(stats.percentile(99.0), Some(99));
        assert_eq!(stats.percentile(0.0), Some(1));
    }
}
