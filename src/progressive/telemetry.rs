//! Pass telemetry reported to the UI after each pass.

use std::time::Duration;

/// Shown for elapsed time before any pass has finished.
pub const ELAPSED_UNMEASURED: &str = "00:00:00";
/// Shown for the remaining-time estimate before any pass has finished.
pub const ETA_UNMEASURED: &str = "??:??:??";
/// Shown for the average pass time before any pass has finished.
pub const AVERAGE_UNMEASURED: &str = "????";

/// Progress of the current accumulation.
///
/// `eta` and `average` are `None` until the first pass after a reset has
/// been measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub pass: u32,
    pub target: u32,
    pub elapsed: Duration,
    pub eta: Option<Duration>,
    pub average: Option<Duration>,
}

impl Telemetry {
    /// Zeroed telemetry for a fresh accumulation.
    pub fn reset(target: u32) -> Self {
        Self { target, ..Default::default() }
    }

    /// Telemetry after `pass` passes took `elapsed` in total.
    pub fn measured(pass: u32, target: u32, elapsed: Duration) -> Self {
        if pass == 0 {
            return Self::reset(target);
        }
        let average = elapsed / pass;
        let eta = average * target.saturating_sub(pass);
        Self { pass, target, elapsed, eta: Some(eta), average: Some(average) }
    }

    pub fn is_converged(&self) -> bool {
        self.pass >= self.target
    }

    /// Fraction of the target done, 0..=1.
    pub fn progress(&self) -> f32 {
        if self.target == 0 {
            return 1.0;
        }
        (self.pass as f32 / self.target as f32).min(1.0)
    }

    pub fn pass_text(&self) -> String {
        format!("{} / {}", self.pass, self.target)
    }

    pub fn elapsed_text(&self) -> String {
        if self.pass == 0 {
            ELAPSED_UNMEASURED.to_owned()
        } else {
            format_hms(self.elapsed)
        }
    }

    pub fn eta_text(&self) -> String {
        self.eta.map_or_else(|| ETA_UNMEASURED.to_owned(), format_hms)
    }

    pub fn average_text(&self) -> String {
        self.average
            .map_or_else(|| AVERAGE_UNMEASURED.to_owned(), |d| format!("{:.0}ms", d.as_secs_f64() * 1000.0))
    }
}

/// `HH:MM:SS`; hours do not wrap at 24.
pub fn format_hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
