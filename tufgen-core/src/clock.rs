//! Publish-time clock, pinnable for reproducible fixtures

use chrono::{DateTime, Utc};

/// Source of the wall-clock time used for metadata expiry stamps
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    /// Real system time
    System,
    /// A pinned instant, so repeated runs produce identical metadata
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// The current instant according to this clock
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(instant) => *instant,
        }
    }
}

/// Format an instant the way TUF metadata expects (`%Y-%m-%dT%H:%M:%SZ`)
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_is_stable() {
        let pinned = DateTime::from_timestamp(1_577_836_800, 0).unwrap();
        let clock = Clock::Fixed(pinned);
        assert_eq!(clock.now(), clock.now());
        assert_eq!(format_timestamp(clock.now()), "2020-01-01T00:00:00Z");
    }
}
