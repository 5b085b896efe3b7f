//! Progressive accumulation scheduler.
//!
//! One [`ProgressiveScheduler::tick`] per display refresh. A tick renders
//! one pass (sample, then resolve) while the pass counter is below the
//! target. While a pointer button is held only the first pass after a reset
//! renders, so a drag gets immediate feedback and then stops accumulating
//! until it ends.

use std::time::Instant;

use glam::Mat4;

use super::config::RenderConfig;
use super::telemetry::Telemetry;
use crate::scene::SceneGraph;
use crate::util::Result;

/// Inputs for one pass, shared by both stages.
#[derive(Debug, Clone, Copy)]
pub struct PassFrame<'a> {
    /// 1-based index of the pass being rendered. Pass 1 starts a fresh
    /// accumulation.
    pub pass: u32,
    pub config: &'a RenderConfig,
    /// Camera world transform (+Y forward, +Z up).
    pub camera: Mat4,
}

/// Backend that executes passes. The GPU implementation lives in
/// `pathtracer::compute`; tests use recording doubles.
pub trait PassStages {
    /// Replace the scene data the sample stage reads.
    fn upload_scene(&mut self, scene: &SceneGraph) -> Result<()>;

    /// Recreate accumulation resources for a new canvas size.
    fn resize(&mut self, width: u32, height: u32) -> Result<()>;

    /// Add one sample per pixel into the accumulation buffer.
    fn sample(&mut self, frame: &PassFrame<'_>) -> Result<()>;

    /// Present the accumulation buffer.
    fn resolve(&mut self, frame: &PassFrame<'_>) -> Result<()>;
}

/// Pass counter, restart time and the telemetry derived from them.
#[derive(Debug, Clone)]
pub struct ProgressiveScheduler {
    pass: u32,
    target: u32,
    restarted_at: Instant,
    telemetry: Telemetry,
}

impl ProgressiveScheduler {
    pub fn new(target: u32) -> Self {
        Self {
            pass: 0,
            target,
            restarted_at: Instant::now(),
            telemetry: Telemetry::reset(target),
        }
    }

    /// Start accumulating from scratch. Only affects future passes.
    pub fn reset(&mut self) {
        self.pass = 0;
        self.restarted_at = Instant::now();
        self.telemetry = Telemetry::reset(self.target);
    }

    /// Change the pass target and reset.
    pub fn set_target(&mut self, target: u32) {
        self.target = target;
        self.reset();
    }

    pub fn pass(&self) -> u32 {
        self.pass
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn restarted_at(&self) -> Instant {
        self.restarted_at
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn is_converged(&self) -> bool {
        self.pass >= self.target
    }

    /// Whether the next tick renders a pass.
    pub fn should_render(&self, buttons_held: bool) -> bool {
        self.pass < self.target && (self.pass == 0 || !buttons_held)
    }

    /// Run one scheduling step.
    ///
    /// `render` receives the 1-based pass index and must run the sample stage
    /// then the resolve stage. Returns the new telemetry when a pass was
    /// rendered. If `render` fails the pass counter is left unchanged.
    pub fn tick<F>(&mut self, buttons_held: bool, render: F) -> Result<Option<Telemetry>>
    where
        F: FnOnce(u32) -> Result<()>,
    {
        if !self.should_render(buttons_held) {
            return Ok(None);
        }

        let pass = self.pass + 1;
        render(pass)?;
        self.pass = pass;

        self.telemetry = Telemetry::measured(pass, self.target, self.restarted_at.elapsed());
        if self.is_converged() {
            tracing::info!(passes = pass, elapsed = ?self.telemetry.elapsed, "accumulation converged");
        }
        Ok(Some(self.telemetry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::Error;

    #[test]
    fn test_renders_exactly_target_passes() {
        let mut sched = ProgressiveScheduler::new(5);
        let mut passes = Vec::new();
        for _ in 0..20 {
            sched
                .tick(false, |p| {
                    passes.push(p);
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(passes, vec![1, 2, 3, 4, 5]);
        assert!(sched.is_converged());
        assert!(sched.tick(false, |_| panic!("converged")).unwrap().is_none());
    }

    #[test]
    fn test_first_pass_renders_while_held() {
        let mut sched = ProgressiveScheduler::new(10);
        let mut count = 0;
        for _ in 0..5 {
            sched
                .tick(true, |_| {
                    count += 1;
                    Ok(())
                })
                .unwrap();
        }
        assert_eq!(count, 1);
        assert_eq!(sched.pass(), 1);
    }

    #[test]
    fn test_failed_render_keeps_pass() {
        let mut sched = ProgressiveScheduler::new(3);
        let res = sched.tick(false, |_| Err(Error::other("lost device")));
        assert!(res.is_err());
        assert_eq!(sched.pass(), 0);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut sched = ProgressiveScheduler::new(3);
        sched.tick(false, |_| Ok(())).unwrap();
        sched.reset();
        let first = sched.restarted_at();
        sched.reset();
        assert_eq!(sched.pass(), 0);
        assert!(sched.restarted_at() >= first);
        assert_eq!(*sched.telemetry(), Telemetry::reset(3));
    }
}
