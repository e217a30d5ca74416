use crate::common::*;

/// Step and example throughput measured between log points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Throughput {
    pub steps_per_sec: f64,
    pub examples_per_sec: f64,
}

/// Counts training steps and examples, and turns them into a [Throughput]
/// once at least `min_interval` has passed since the previous measure.
#[derive(Debug, Clone)]
pub struct ThroughputMeter {
    min_interval: Duration,
    since: Instant,
    num_steps: usize,
    num_examples: usize,
}

impl ThroughputMeter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            since: Instant::now(),
            num_steps: 0,
            num_examples: 0,
        }
    }

    pub fn record_step(&mut self, batch_size: usize) {
        self.num_steps += 1;
        self.num_examples += batch_size;
    }

    /// Measure and restart the window, or `None` if the window is too short.
    pub fn measure(&mut self) -> Option<Throughput> {
        let elapsed = self.since.elapsed();
        if elapsed < self.min_interval || elapsed.is_zero() {
            return None;
        }

        let secs = elapsed.as_secs_f64();
        let throughput = Throughput {
            steps_per_sec: self.num_steps as f64 / secs,
            examples_per_sec: self.num_examples as f64 / secs,
        };
        *self = Self::new(self.min_interval);
        Some(throughput)
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}
