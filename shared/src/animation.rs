pub const COUNTER_ANIMATION_MS: f64 = 1000.0;

/// Linear count-up from 0 to `target`, used for the summary counters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountUp {
    pub target: u64,
    pub duration_ms: f64, // milliseconds
}

impl CountUp {
    pub fn new(target: u64) -> Self {
        Self {
            target,
            duration_ms: COUNTER_ANIMATION_MS,
        }
    }

    pub fn with_duration(target: u64, duration_ms: f64) -> Self {
        Self {
            target,
            duration_ms,
        }
    }

    /// Progress in `0.0..=1.0`. A non-positive duration completes immediately.
    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Displayed integer at `elapsed_ms`. Never decreases as time advances and
    /// lands exactly on `target` once finished.
    pub fn value_at(&self, elapsed_ms: f64) -> u64 {
        let progress = self.progress(elapsed_ms);
        if progress >= 1.0 {
            return self.target;
        }
        ((progress * self.target as f64).floor() as u64).min(self.target)
    }

    pub fn is_finished(&self, elapsed_ms: f64) -> bool {
        self.progress(elapsed_ms) >= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::CountUp;

    #[test]
    fn starts_at_zero_and_ends_at_target() {
        let anim = CountUp::new(5);
        assert_eq!(anim.value_at(0.0), 0);
        assert_eq!(anim.value_at(1000.0), 5);
        assert_eq!(anim.value_at(5000.0), 5);
        assert!(anim.is_finished(1000.0));
        assert!(!anim.is_finished(999.0));
    }

    #[test]
    fn values_are_floored_and_monotonic() {
        let anim = CountUp::new(7);
        assert_eq!(anim.value_at(500.0), 3);

        let mut previous = 0;
        for step in 0..=120 {
            let value = anim.value_at(step as f64 * 16.0);
            assert!(value >= previous);
            previous = value;
        }
        assert_eq!(previous, 7);
    }

    #[test]
    fn zero_duration_finishes_immediately() {
        let anim = CountUp::with_duration(42, 0.0);
        assert_eq!(anim.value_at(0.0), 42);
        assert!(anim.is_finished(0.0));
    }

    #[test]
    fn zero_target_stays_at_zero() {
        let anim = CountUp::new(0);
        assert_eq!(anim.value_at(250.0), 0);
        assert_eq!(anim.value_at(1000.0), 0);
    }
}
