//! Consecutive-failure circuit breaker

/// Counts consecutive resolution/playback failures
///
/// Any success resets the count. Once the count reaches the threshold the
/// breaker is open and playback stops.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    consecutive: u32,
    threshold: u32,
}

impl CircuitBreaker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive: 0,
            threshold: threshold.max(1),
        }
    }

    /// Record a failure, returning `true` if this one opened the breaker
    pub fn record_failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        self.consecutive == self.threshold
    }

    pub fn record_success(&mut self) {
        self.consecutive = 0;
    }

    pub fn reset(&mut self) {
        self.consecutive = 0;
    }

    pub fn is_open(&self) -> bool {
        self.consecutive >= self.threshold
    }

    pub fn count(&self) -> u32 {
        self.consecutive
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}
