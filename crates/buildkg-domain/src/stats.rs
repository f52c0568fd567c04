//! Run statistics shared by the online and batch paths

use std::fmt;

/// How a single fragment ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentOutcome {
    /// Entities were written to the graph
    Success,
    /// The provider, parser or loader failed
    Failed,
    /// Nothing to load (no response text or no entities)
    Skipped,
}

/// Counters for one run. Every processed fragment lands in exactly one bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Fragments loaded into the graph
    pub success: usize,
    /// Fragments that failed
    pub failed: usize,
    /// Fragments with nothing to load
    pub skipped: usize,
}

impl RunStats {
    /// Record one outcome
    pub fn record(&mut self, outcome: FragmentOutcome) {
        match outcome {
            FragmentOutcome::Success => self.success += 1,
            FragmentOutcome::Failed => self.failed += 1,
            FragmentOutcome::Skipped => self.skipped += 1,
        }
    }

    /// Total fragments seen
    pub fn total(&self) -> usize {
        self.success + self.failed + self.skipped
    }

    /// Fold another run's counters into this one
    pub fn merge(&mut self, other: RunStats) {
        self.success += other.success;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} success, {} failed, {} skipped",
            self.success, self.failed, self.skipped
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_total() {
        let mut stats = RunStats::default();
        stats.record(FragmentOutcome::Success);
        stats.record(FragmentOutcome::Failed);
        stats.record(FragmentOutcome::Skipped);
        stats.record(FragmentOutcome::Success);

        assert_eq!(stats.success, 2);
        assert_eq!(stats.total(), 4);
        assert_eq!(stats.to_string(), "2 success, 1 failed, 1 skipped");
    }

    #[test]
    fn test_merge() {
        let mut a = RunStats { success: 1, failed: 0, skipped: 2 };
        a.merge(RunStats { success: 3, failed: 1, skipped: 0 });
        assert_eq!(a, RunStats { success: 4, failed: 1, skipped: 2 });
    }
}
