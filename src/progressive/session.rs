//! Render session: the single owner of progressive state for one canvas.
//!
//! All mutation goes through methods (or [`SessionCommand`]s) on one thread:
//! pointer events and configuration edits are applied synchronously and
//! reset accumulation before the next [`RenderSession::tick`]. Loads happen
//! elsewhere; their results come back through
//! [`RenderSession::finish_load`], which drops anything superseded.

use super::config::RenderConfig;
use super::controls::{CameraControls, CameraMotion, CanvasRect, ControlScalars, PointerEvent};
use super::scheduler::{PassFrame, PassStages, ProgressiveScheduler};
use super::telemetry::Telemetry;
use crate::scene::{LoadTicket, LoadTracker, SceneGraph};
use crate::util::{Error, Result};

/// Load progress shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadingIndicator {
    #[default]
    Hidden,
    Shown,
    /// Last load failed; holds the message.
    Failed(String),
}

/// What happened to a finished load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Scene replaced and accumulation reset.
    Applied,
    /// A newer load was started; the result was dropped.
    Superseded,
    /// The load failed; the previous scene is still active.
    Failed(Error),
}

/// Discrete session mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    Reset,
    Configure(RenderConfig),
    Pointer(PointerEvent),
    Resize { width: u32, height: u32 },
    SetCanvas(CanvasRect),
}

pub struct RenderSession<S: PassStages> {
    stages: S,
    scheduler: ProgressiveScheduler,
    config: RenderConfig,
    controls: CameraControls,
    scene: Option<SceneGraph>,
    loads: LoadTracker,
    indicator: LoadingIndicator,
    size: (u32, u32),
}

impl<S: PassStages> RenderSession<S> {
    pub fn new(stages: S, config: RenderConfig) -> Self {
        let config = config.clamped();
        Self {
            stages,
            scheduler: ProgressiveScheduler::new(config.samples),
            config,
            controls: CameraControls::new(ControlScalars::default()),
            scene: None,
            loads: LoadTracker::default(),
            indicator: LoadingIndicator::Hidden,
            size: (0, 0),
        }
    }

    pub fn with_scalars(mut self, scalars: ControlScalars) -> Self {
        self.controls.set_scalars(scalars);
        self
    }

    pub fn apply(&mut self, command: SessionCommand) -> Result<()> {
        match command {
            SessionCommand::Reset => self.reset(),
            SessionCommand::Configure(config) => self.configure(config)?,
            SessionCommand::Pointer(event) => {
                self.handle_pointer(event);
            }
            SessionCommand::Resize { width, height } => self.resize(width, height)?,
            SessionCommand::SetCanvas(rect) => self.controls.set_canvas(rect),
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.scheduler.reset();
    }

    /// Apply a new configuration. Out-of-range values are rejected; a
    /// changed value resets accumulation.
    pub fn configure(&mut self, config: RenderConfig) -> Result<()> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        tracing::debug!(?config, "render configuration changed");
        self.config = config;
        self.scheduler.set_target(config.samples);
        Ok(())
    }

    /// Feed a pointer event; resets accumulation if the camera moved.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> Option<CameraMotion> {
        let motion = self.controls.handle(event, self.scene.as_mut());
        if motion.is_some() {
            self.scheduler.reset();
        }
        motion
    }

    /// Resize the canvas. Recreates accumulation resources and resets.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let size = (width.max(1), height.max(1));
        if size == self.size {
            return Ok(());
        }
        self.stages.resize(size.0, size.1)?;
        self.size = size;
        self.scheduler.reset();
        Ok(())
    }

    /// Start a load. Any load still in flight is superseded.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.indicator = LoadingIndicator::Shown;
        self.loads.begin()
    }

    /// Commit or discard a finished load.
    ///
    /// Only the newest ticket is committed. On failure the previous scene,
    /// GPU data and accumulation are left untouched.
    pub fn finish_load(&mut self, ticket: LoadTicket, result: Result<SceneGraph>) -> LoadOutcome {
        if !self.loads.is_current(ticket) {
            tracing::debug!(?ticket, "discarding superseded load");
            return LoadOutcome::Superseded;
        }

        let uploaded = result.and_then(|scene| {
            self.stages.upload_scene(&scene)?;
            Ok(scene)
        });
        match uploaded {
            Ok(scene) => {
                tracing::info!(triangles = scene.model().triangles.len(), "scene replaced");
                self.scene = Some(scene);
                self.indicator = LoadingIndicator::Hidden;
                self.scheduler.reset();
                LoadOutcome::Applied
            }
            Err(e) => {
                tracing::warn!(error = %e, "load failed, keeping previous scene");
                self.indicator = LoadingIndicator::Failed(e.to_string());
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Render one pass if the scheduler allows it.
    ///
    /// Returns the telemetry of the rendered pass, or `None` when idle
    /// (no scene, converged, or paused by a held button).
    pub fn tick(&mut self) -> Result<Option<Telemetry>> {
        let Some(scene) = &self.scene else {
            return Ok(None);
        };
        let camera = scene.camera_world();
        let config = &self.config;
        let stages = &mut self.stages;

        self.scheduler.tick(self.controls.buttons_held(), |pass| {
            let frame = PassFrame { pass, config, camera };
            stages.sample(&frame)?;
            stages.resolve(&frame)
        })
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn scheduler(&self) -> &ProgressiveScheduler {
        &self.scheduler
    }

    pub fn telemetry(&self) -> &Telemetry {
        self.scheduler.telemetry()
    }

    pub fn controls(&self) -> &CameraControls {
        &self.controls
    }

    pub fn scene(&self) -> Option<&SceneGraph> {
        self.scene.as_ref()
    }

    pub fn indicator(&self) -> &LoadingIndicator {
        &self.indicator
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn stages(&self) -> &S {
        &self.stages
    }

    pub fn stages_mut(&mut self) -> &mut S {
        &mut self.stages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progressive::{Modifiers, PointerButton};
    use crate::scene::load_scene_from_str;

    #[derive(Default)]
    struct Counting {
        samples: u32,
        uploads: u32,
        fail_upload: bool,
    }

    impl PassStages for Counting {
        fn upload_scene(&mut self, _scene: &SceneGraph) -> Result<()> {
            if self.fail_upload {
                return Err(Error::other("out of memory"));
            }
            self.uploads += 1;
            Ok(())
        }
        fn resize(&mut self, _width: u32, _height: u32) -> Result<()> {
            Ok(())
        }
        fn sample(&mut self, _frame: &PassFrame<'_>) -> Result<()> {
            self.samples += 1;
            Ok(())
        }
        fn resolve(&mut self, _frame: &PassFrame<'_>) -> Result<()> {
            Ok(())
        }
    }

    fn tri() -> SceneGraph {
        load_scene_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", None).unwrap()
    }

    fn loaded(samples: u32) -> RenderSession<Counting> {
        let config = RenderConfig { samples, ..Default::default() };
        let mut session = RenderSession::new(Counting::default(), config);
        let ticket = session.begin_load();
        assert!(matches!(session.finish_load(ticket, Ok(tri())), LoadOutcome::Applied));
        session
    }

    #[test]
    fn test_idle_without_scene() {
        let mut session = RenderSession::new(Counting::default(), RenderConfig::default());
        assert!(session.tick().unwrap().is_none());
        assert_eq!(session.stages().samples, 0);
    }

    #[test]
    fn test_configure_resets_only_on_change() {
        let mut session = loaded(10);
        session.tick().unwrap();
        session.configure(*session.config()).unwrap();
        assert_eq!(session.scheduler().pass(), 1);

        let cfg = RenderConfig { bounces: 2, ..*session.config() };
        session.apply(SessionCommand::Configure(cfg)).unwrap();
        assert_eq!(session.scheduler().pass(), 0);

        let bad = RenderConfig { samples: 0, ..cfg };
        assert!(session.configure(bad).is_err());
        assert_eq!(session.config().bounces, 2);
    }

    #[test]
    fn test_upload_failure_keeps_scene() {
        let mut session = loaded(4);
        session.tick().unwrap();
        session.stages_mut().fail_upload = true;

        let ticket = session.begin_load();
        assert_eq!(*session.indicator(), LoadingIndicator::Shown);
        assert!(matches!(session.finish_load(ticket, Ok(tri())), LoadOutcome::Failed(_)));
        assert!(matches!(session.indicator(), LoadingIndicator::Failed(msg) if msg.contains("out of memory")));
        assert!(session.scene().is_some());
        assert_eq!(session.scheduler().pass(), 1);
    }

    #[test]
    fn test_held_button_pauses_after_first_pass() {
        let mut session = loaded(10);
        session.apply(SessionCommand::SetCanvas(CanvasRect::new(0.0, 0.0, 64.0, 64.0))).unwrap();
        session.handle_pointer(PointerEvent::Pressed { button: PointerButton::Left, x: 10.0, y: 10.0 });
        for _ in 0..4 {
            session.tick().unwrap();
        }
        assert_eq!(session.stages().samples, 1);

        let motion = session.handle_pointer(PointerEvent::Moved { x: 12.0, y: 10.0, modifiers: Modifiers::default() });
        assert_eq!(motion, Some(CameraMotion::Orbit));
        assert_eq!(session.scheduler().pass(), 0);
        session.tick().unwrap();
        assert_eq!(session.stages().samples, 2);
    }
}
