//! Wall-clock timing for CLI progress reporting.

use std::time::Instant;

/// A completed measurement with a human-oriented unit chosen by magnitude.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingInfo {
    pub name: Option<String>,
    pub milliseconds: f64,
    pub seconds: f64,
    pub minutes: f64,
}

impl TimingInfo {
    /// Picks minutes, seconds, or milliseconds, whichever reads best.
    pub fn format(&self) -> (f64, &'static str, &'static str) {
        if self.minutes > 1.0 {
            (self.minutes, "m", "minutes")
        } else if self.seconds > 1.0 {
            (self.seconds, "s", "seconds")
        } else {
            (self.milliseconds, "ms", "milliseconds")
        }
    }

    pub fn display(&self) -> String {
        let (value, unit_short, _) = self.format();
        format!("{:.2}{}", value, unit_short)
    }
}

/// A running timer. [`Timer::stop`] consumes it and reports the elapsed time.
#[derive(Debug)]
pub struct Timer {
    name: Option<String>,
    start: Instant,
}

/// Starts a named timer.
pub fn time(name: Option<&str>) -> Timer {
    Timer {
        name: name.map(str::to_string),
        start: Instant::now(),
    }
}

impl Timer {
    pub fn stop(self) -> TimingInfo {
        let elapsed = self.start.elapsed();
        let milliseconds = elapsed.as_secs_f64() * 1e3;
        let seconds = elapsed.as_secs_f64();
        TimingInfo {
            name: self.name,
            milliseconds,
            seconds,
            minutes: seconds / 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_selection_by_magnitude() {
        let info = TimingInfo {
            name: None,
            milliseconds: 500.0,
            seconds: 0.5,
            minutes: 0.5 / 60.0,
        };
        assert_eq!(info.format().1, "ms");

        let info = TimingInfo {
            name: None,
            milliseconds: 5000.0,
            seconds: 5.0,
            minutes: 5.0 / 60.0,
        };
        assert_eq!(info.format().1, "s");

        let info = TimingInfo {
            name: None,
            milliseconds: 120_000.0,
            seconds: 120.0,
            minutes: 2.0,
        };
        assert_eq!(info.format().1, "m");
    }

    #[test]
    fn timer_reports_elapsed_time() {
        let timer = time(Some("parse"));
        let info = timer.stop();
        assert_eq!(info.name.as_deref(), Some("parse"));
        assert!(info.milliseconds >= 0.0);
    }
}
