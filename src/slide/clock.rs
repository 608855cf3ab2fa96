use std::time::Instant;

/// Produces the `dt` handed to each corrector tick.
#[derive(Debug, Clone, Copy)]
pub enum TickClock {
    /// Constant simulation step.
    Fixed(f64),
    /// Wall-clock time since the previous call. Subject to frame jitter.
    Measured(Option<Instant>),
}

impl TickClock {
    pub fn fixed(dt: f64) -> Self {
        TickClock::Fixed(dt)
    }

    pub fn measured() -> Self {
        TickClock::Measured(None)
    }

    /// Seconds to use for the coming tick. Measured clocks return 0 on first use.
    pub fn next_dt(&mut self) -> f64 {
        match self {
            TickClock::Fixed(dt) => *dt,
            TickClock::Measured(last) => {
                let now = Instant::now();
                let dt = last
                    .map(|prev| now.duration_since(prev).as_secs_f64())
                    .unwrap_or(0.0);
                *last = Some(now);
                dt
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_fixed_clock_is_constant() {
        let mut clock = TickClock::fixed(0.02);
        assert_eq!(clock.next_dt(), 0.02);
        assert_eq!(clock.next_dt(), 0.02);
    }

    #[test]
    fn test_measured_clock_starts_at_zero() {
        let mut clock = TickClock::measured();
        assert_eq!(clock.next_dt(), 0.0);
        thread::sleep(Duration::from_millis(5));
        let dt = clock.next_dt();
        assert!(dt >= 0.005, "expected at least 5ms, got {}", dt);
    }
}
