//! Model loading: request resolution, background worker, supersede policy.
//!
//! A load reads and validates the geometry, reads materials, and builds the
//! [`SceneGraph`] off the UI thread. Every request carries a [`LoadTicket`];
//! only the result for the most recent ticket may be committed, so a load
//! that completes after being superseded is discarded.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};

use super::graph::SceneGraph;
use super::mtl::{parse_mtl, read_mtl, MaterialRecord};
use super::obj::{parse_obj, read_obj};
use crate::util::{Error, Result};

/// Geometry plus optional material source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRequest {
    pub geometry: PathBuf,
    pub materials: Option<PathBuf>,
}

impl LoadRequest {
    pub fn new(geometry: impl Into<PathBuf>) -> Self {
        Self { geometry: geometry.into(), materials: None }
    }

    pub fn with_materials(mut self, materials: impl Into<PathBuf>) -> Self {
        self.materials = Some(materials.into());
        self
    }

    /// Display name for status messages.
    pub fn name(&self) -> String {
        self.geometry
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.geometry.display().to_string())
    }
}

/// Built-in scene shown before any model is loaded.
pub const DEFAULT_OBJ: &str = include_str!("../../assets/default.obj");
pub const DEFAULT_MTL: &str = include_str!("../../assets/default.mtl");

/// Load a model from disk.
///
/// With no explicit material source, the first `mtllib` next to the
/// geometry file is used if it exists. Without any materials the scene uses
/// default material values.
#[tracing::instrument(skip_all, fields(geometry = %request.geometry.display()))]
pub fn load_scene(request: &LoadRequest) -> Result<SceneGraph> {
    let model = read_obj(&request.geometry)?;

    let materials = match &request.materials {
        Some(path) => read_mtl(path)?,
        None => sibling_library(&request.geometry, &model.material_libs)
            .map(|lib| read_mtl(lib))
            .transpose()?
            .unwrap_or_default(),
    };

    tracing::info!(
        triangles = model.triangles.len(),
        materials = materials.len(),
        "model loaded"
    );
    Ok(SceneGraph::new(model, materials))
}

/// Build a scene from in-memory sources.
pub fn load_scene_from_str(geometry: &str, materials: Option<&str>) -> Result<SceneGraph> {
    let model = parse_obj(geometry)?;
    let materials: Vec<MaterialRecord> = materials.map(parse_mtl).unwrap_or_default();
    Ok(SceneGraph::new(model, materials))
}

/// The built-in scene.
pub fn default_scene() -> Result<SceneGraph> {
    load_scene_from_str(DEFAULT_OBJ, Some(DEFAULT_MTL))
}

fn sibling_library(geometry: &Path, libs: &[String]) -> Option<PathBuf> {
    let dir = geometry.parent()?;
    libs.iter().map(|lib| dir.join(lib)).find(|p| p.is_file())
}

/// Identifies one load request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Hands out tickets; only the newest one is current.
#[derive(Debug, Default)]
pub struct LoadTracker {
    epoch: u64,
}

impl LoadTracker {
    /// Start a new load, superseding any in flight.
    pub fn begin(&mut self) -> LoadTicket {
        self.epoch = self.epoch.wrapping_add(1);
        LoadTicket(self.epoch)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.epoch
    }
}

/// Commands sent to the worker.
#[derive(Debug)]
pub enum LoadCommand {
    Load { request: LoadRequest, ticket: LoadTicket },
    Stop,
}

/// A finished load.
pub struct LoadFinished {
    pub ticket: LoadTicket,
    pub request: LoadRequest,
    pub result: Result<SceneGraph>,
}

/// Handle to the background load thread.
pub struct LoadWorker {
    tx: Sender<LoadCommand>,
    rx: Receiver<LoadFinished>,
    handle: Option<JoinHandle<()>>,
}

impl LoadWorker {
    pub fn spawn() -> Self {
        let (cmd_tx, cmd_rx) = channel::<LoadCommand>();
        let (res_tx, res_rx) = channel::<LoadFinished>();

        let handle = thread::Builder::new()
            .name("pathview-loader".into())
            .spawn(move || worker_loop(cmd_rx, res_tx))
            .ok();
        if handle.is_none() {
            tracing::warn!("failed to spawn loader thread");
        }

        Self { tx: cmd_tx, rx: res_rx, handle }
    }

    /// Queue a load. Fails when the loader thread is not running, in which
    /// case no result will ever arrive for `ticket`.
    pub fn request(&self, request: LoadRequest, ticket: LoadTicket) -> Result<()> {
        self.tx
            .send(LoadCommand::Load { request, ticket })
            .map_err(|_| Error::other("loader thread is not running"))
    }

    /// Non-blocking poll for a finished load.
    pub fn try_recv(&self) -> Option<LoadFinished> {
        self.rx.try_recv().ok()
    }

    /// Blocking wait for the next finished load.
    pub fn recv(&self) -> Option<LoadFinished> {
        self.rx.recv().ok()
    }

    pub fn stop(&mut self) {
        let _ = self.tx.send(LoadCommand::Stop);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LoadWorker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn worker_loop(rx: Receiver<LoadCommand>, tx: Sender<LoadFinished>) {
    while let Ok(cmd) = rx.recv() {
        match cmd {
            LoadCommand::Load { request, ticket } => {
                let (request, ticket, stop) = drain_to_latest(&rx, request, ticket);
                if stop {
                    break;
                }
                let result = load_scene(&request);
                if let Err(e) = &result {
                    tracing::warn!(model = %request.name(), error = %e, "model load failed");
                }
                if tx.send(LoadFinished { ticket, request, result }).is_err() {
                    break;
                }
            }
            LoadCommand::Stop => break,
        }
    }
}

/// Skip queued requests that are already superseded by a newer one.
/// Returns the newest request and whether a stop was seen.
fn drain_to_latest(
    rx: &Receiver<LoadCommand>,
    mut request: LoadRequest,
    mut ticket: LoadTicket,
) -> (LoadRequest, LoadTicket, bool) {
    while let Ok(cmd) = rx.try_recv() {
        match cmd {
            LoadCommand::Load { request: r, ticket: t } => {
                request = r;
                ticket = t;
            }
            LoadCommand::Stop => return (request, ticket, true),
        }
    }
    (request, ticket, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_skips_queued_load() {
        let (cmd_tx, cmd_rx) = channel();
        let (res_tx, res_rx) = channel();
        let mut tracker = LoadTracker::default();
        cmd_tx
            .send(LoadCommand::Load { request: LoadRequest::new("never-read.obj"), ticket: tracker.begin() })
            .unwrap();
        cmd_tx.send(LoadCommand::Stop).unwrap();

        worker_loop(cmd_rx, res_tx);
        assert!(res_rx.try_recv().is_err());
    }

    #[test]
    fn test_request_after_stop_fails() {
        let mut tracker = LoadTracker::default();
        let mut worker = LoadWorker::spawn();
        worker.stop();
        let err = worker.request(LoadRequest::new("late.obj"), tracker.begin()).unwrap_err();
        assert!(err.to_string().contains("not running"));
        assert!(worker.try_recv().is_none());
    }

    #[test]
    fn test_tracker_last_load_wins() {
        let mut tracker = LoadTracker::default();
        let first = tracker.begin();
        assert!(tracker.is_current(first));
        let second = tracker.begin();
        assert!(!tracker.is_current(first));
        assert!(tracker.is_current(second));
    }

    #[test]
    fn test_default_scene_builds() {
        let scene = default_scene().unwrap();
        assert!(scene.model().triangles.len() >= 12);
        assert!(scene.materials().parsed().iter().any(|m| m.is_emissive()));
    }

    #[test]
    fn test_load_from_str_without_materials() {
        let scene = load_scene_from_str("v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n", None).unwrap();
        assert_eq!(scene.materials().parsed().len(), 0);
    }

    #[test]
    fn test_request_name() {
        let req = LoadRequest::new("/models/teapot.obj").with_materials("/models/teapot.mtl");
        assert_eq!(req.name(), "teapot.obj");
        assert_eq!(req.materials, Some(PathBuf::from("/models/teapot.mtl")));
    }
}
